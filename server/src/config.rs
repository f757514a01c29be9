//! Environment configuration

use std::env;

use scopecfg_types::prelude::*;

pub struct Config {
	pub listen: String,
	pub sign_algorithm: String,
	/// Signing is disabled when no key is set
	pub sign_key: Option<String>,
	/// Selects the structured signature format
	pub sign_key_id: Option<String>,
	pub sign_header: Option<String>,
	pub sign_trailer: bool,
	pub sign_encoding: String,
	pub acl_deny: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:8080".into(),
			sign_algorithm: "sha256".into(),
			sign_key: None,
			sign_key_id: None,
			sign_header: None,
			sign_trailer: false,
			sign_encoding: "hex".into(),
			acl_deny: Vec::new(),
		}
	}
}

impl Config {
	pub fn from_env() -> ClResult<Self> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Builds the config from any variable source, unset variables keep their default
	pub fn from_lookup<F>(lookup: F) -> ClResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();
		let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

		if let Some(listen) = var("LISTEN") {
			config.listen = listen;
		}
		if let Some(algorithm) = var("SIGN_ALGORITHM") {
			config.sign_algorithm = algorithm;
		}
		config.sign_key = var("SIGN_KEY");
		config.sign_key_id = var("SIGN_KEY_ID");
		config.sign_header = var("SIGN_HEADER");
		if let Some(trailer) = var("SIGN_TRAILER") {
			config.sign_trailer = parse_bool("SIGN_TRAILER", &trailer)?;
		}
		if let Some(encoding) = var("SIGN_ENCODING") {
			config.sign_encoding = encoding;
		}
		if let Some(deny) = var("ACL_DENY") {
			config.acl_deny = deny
				.split(',')
				.map(str::trim)
				.filter(|p| !p.is_empty())
				.map(String::from)
				.collect();
		}
		Ok(config)
	}

	/// Values stored for the Default scope
	pub fn backend_values(&self) -> Vec<(&'static str, serde_json::Value)> {
		let mut values = vec![("acl/deny", serde_json::json!(self.acl_deny))];
		let Some(key) = &self.sign_key else {
			values.push(("sign/disabled", true.into()));
			return values;
		};
		values.push(("sign/algorithm", self.sign_algorithm.clone().into()));
		values.push(("sign/key", key.clone().into()));
		values.push(("sign/trailer", self.sign_trailer.into()));
		values.push(("sign/encoding", self.sign_encoding.clone().into()));
		if let Some(key_id) = &self.sign_key_id {
			values.push(("sign/key_id", key_id.clone().into()));
		}
		if let Some(header) = &self.sign_header {
			values.push(("sign/header", header.clone().into()));
		}
		values
	}
}

fn parse_bool(name: &str, value: &str) -> ClResult<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(Error::ConfigError(format!("{} must be a boolean, got {:?}", name, value))),
	}
}


// vim: ts=4

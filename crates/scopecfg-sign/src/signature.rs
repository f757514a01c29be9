//! Signature wire formats
//!
//! Structured: `keyId="<id>",algorithm="<alg>",signature="<encoded>"`
//! Simple: `<alg> <encoded>`

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
	#[default]
	Hex,
	Base64,
}

impl Encoding {
	pub fn from_name(name: &str) -> ClResult<Self> {
		match name.to_ascii_lowercase().as_str() {
			"hex" => Ok(Encoding::Hex),
			"base64" => Ok(Encoding::Base64),
			_ => Err(Error::Fatal(format!("unknown signature encoding {}", name))),
		}
	}

	pub fn encode(self, digest: &[u8]) -> String {
		match self {
			Encoding::Hex => hex::encode(digest),
			Encoding::Base64 => BASE64.encode(digest),
		}
	}

	pub fn decode(self, value: &str) -> ClResult<Vec<u8>> {
		match self {
			Encoding::Hex => hex::decode(value).map_err(|e| Error::NotValid(format!("hex: {}", e))),
			Encoding::Base64 => {
				BASE64.decode(value).map_err(|e| Error::NotValid(format!("base64: {}", e)))
			}
		}
	}
}

impl fmt::Display for Encoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Encoding::Hex => "hex",
			Encoding::Base64 => "base64",
		})
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SignatureFormat {
	Structured { key_id: String },
	#[default]
	Simple,
}

impl SignatureFormat {
	/// Header used when none is configured
	pub fn default_header(&self) -> &'static str {
		match self {
			SignatureFormat::Structured { .. } => "content-signature",
			SignatureFormat::Simple => "content-hmac",
		}
	}
}

/// Renders a digest in the given wire format
pub fn format_signature(
	format: &SignatureFormat,
	algorithm: &str,
	encoding: Encoding,
	digest: &[u8],
) -> String {
	let signature = encoding.encode(digest);
	match format {
		SignatureFormat::Structured { key_id } => {
			format!("keyId=\"{}\",algorithm=\"{}\",signature=\"{}\"", key_id, algorithm, signature)
		}
		SignatureFormat::Simple => format!("{} {}", algorithm, signature),
	}
}

/// A signature header split into its parts. The signature stays encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSignature {
	pub key_id: Option<String>,
	pub algorithm: String,
	pub signature: String,
}

/// Parses either wire format
pub fn parse_signature(value: &str) -> ClResult<ParsedSignature> {
	let value = value.trim();
	if value.contains('=') && value.contains('"') {
		return parse_structured(value);
	}

	let (algorithm, signature) = value
		.split_once(' ')
		.ok_or_else(|| Error::NotValid("signature: expected '<algorithm> <signature>'".into()))?;
	let signature = signature.trim();
	if algorithm.is_empty() || signature.is_empty() {
		return Err(Error::NotValid("signature: empty field".into()));
	}
	Ok(ParsedSignature { key_id: None, algorithm: algorithm.into(), signature: signature.into() })
}

fn parse_structured(value: &str) -> ClResult<ParsedSignature> {
	let mut key_id = None;
	let mut algorithm = None;
	let mut signature = None;

	for field in value.split(',') {
		let (name, raw) = field
			.trim()
			.split_once('=')
			.ok_or_else(|| Error::NotValid(format!("signature: malformed field {}", field)))?;
		let unquoted = raw
			.strip_prefix('"')
			.and_then(|v| v.strip_suffix('"'))
			.ok_or_else(|| Error::NotValid(format!("signature: unquoted value for {}", name)))?;
		match name {
			"keyId" => key_id = Some(unquoted.to_string()),
			"algorithm" => algorithm = Some(unquoted.to_string()),
			"signature" => signature = Some(unquoted.to_string()),
			_ => debug!("Ignoring signature field {}", name),
		}
	}

	match (key_id, algorithm, signature) {
		(Some(key_id), Some(algorithm), Some(signature)) => {
			Ok(ParsedSignature { key_id: Some(key_id), algorithm, signature })
		}
		_ => Err(Error::NotValid("signature: keyId, algorithm and signature are required".into())),
	}
}


// vim: ts=4

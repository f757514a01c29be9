//! Body buffering and the streaming trailer body

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use http_body::{Body as _, Frame, SizeHint};
use http_body_util::BodyExt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::pool::{BufferPool, Pooled};
use crate::prelude::*;
use crate::registry::BodyHasher;

/// Collects the data frames of `body` into a pooled buffer
///
/// Trailers of the collected body are returned separately. A body longer than
/// `limit` bytes fails with `Io` as soon as the limit is crossed.
pub async fn buffer_body(
	body: Body,
	buffers: &std::sync::Arc<BufferPool>,
	limit: usize,
) -> ClResult<(Pooled<Vec<u8>>, Option<HeaderMap>)> {
	if body.size_hint().lower() > limit as u64 {
		return Err(Error::Io(format!("body exceeds {} bytes", limit)));
	}
	let mut buf = buffers.get()?;
	let mut trailers = None;
	let mut body = body;
	while let Some(frame) = body.frame().await {
		let frame = frame.map_err(|e| Error::Io(e.to_string()))?;
		match frame.into_data() {
			Ok(data) => {
				if buf.len() + data.len() > limit {
					return Err(Error::Io(format!("body exceeds {} bytes", limit)));
				}
				buf.extend_from_slice(&data);
			}
			Err(frame) => {
				if let Ok(t) = frame.into_trailers() {
					trailers = Some(t);
				}
			}
		}
	}
	Ok((buf, trailers))
}

/// Passes body data through unchanged while hashing it, then emits the
/// signature as a trailer frame
pub struct TrailerBody {
	inner: Body,
	hasher: Option<Pooled<Box<dyn BodyHasher>>>,
	header: HeaderName,
	render: Box<dyn Fn(&[u8]) -> String + Send + Sync>,
	/// Trailers sent by the inner body, merged into ours
	trailers: HeaderMap,
	done: bool,
}

impl TrailerBody {
	pub fn new<R>(
		inner: Body,
		hasher: Pooled<Box<dyn BodyHasher>>,
		header: HeaderName,
		render: R,
	) -> Self
	where
		R: Fn(&[u8]) -> String + Send + Sync + 'static,
	{
		Self {
			inner,
			hasher: Some(hasher),
			header,
			render: Box::new(render),
			trailers: HeaderMap::new(),
			done: false,
		}
	}
}

impl http_body::Body for TrailerBody {
	type Data = Bytes;
	type Error = axum::Error;

	fn poll_frame(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
	) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
		let this = self.get_mut();
		if this.done {
			return Poll::Ready(None);
		}

		loop {
			match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
				Some(Ok(frame)) => match frame.into_data() {
					Ok(data) => {
						if let Some(hasher) = this.hasher.as_mut() {
							hasher.update(&data);
						}
						return Poll::Ready(Some(Ok(Frame::data(data))));
					}
					Err(frame) => {
						if let Ok(trailers) = frame.into_trailers() {
							this.trailers.extend(trailers);
						}
					}
				},
				Some(Err(err)) => {
					// The hasher goes back to the pool, no signature is sent
					this.done = true;
					this.hasher = None;
					warn!("[sign] response body failed while streaming: {}", err);
					return Poll::Ready(Some(Err(err)));
				}
				None => {
					this.done = true;
					let Some(mut hasher) = this.hasher.take() else {
						return Poll::Ready(None);
					};
					let digest = hasher.finalize_reset();
					drop(hasher);
					let signature = (this.render)(&digest);
					match HeaderValue::from_str(&signature) {
						Ok(value) => {
							this.trailers.insert(this.header.clone(), value);
						}
						Err(_) => warn!("[sign] signature is not a valid header value"),
					}
					let trailers = std::mem::take(&mut this.trailers);
					return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
				}
			}
		}
	}

	fn is_end_stream(&self) -> bool {
		self.done
	}

	fn size_hint(&self) -> SizeHint {
		// Length is unknown up front, the response goes out chunked
		SizeHint::default()
	}
}


// vim: ts=4

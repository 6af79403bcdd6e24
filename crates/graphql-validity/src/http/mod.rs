//! HTTP request lifecycle hooks.
//!
//! A fresh [`ValidityContext`] is attached to each request before the GraphQL
//! handler runs, and the finished JSON response is passed through
//! [`finalize`](crate::finalize::finalize) on the way out. Finalization
//! failures never drop a response: the original body is delivered instead.
//! Bodies larger than [`MAX_RESPONSE_BODY`], or of unknown size, pass through
//! untouched.

use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use tracing::{error, warn};

use crate::context::ValidityContext;
use crate::finalize::finalize;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

/// Upper bound on response bodies buffered for finalization
pub const MAX_RESPONSE_BODY: usize = 16 * 1024 * 1024;

/// Attach a fresh validity context to the request and return it.
///
/// Handlers retrieve it from the request extensions as `Arc<ValidityContext>`.
pub fn on_request_start<B>(request: &mut http::Request<B>) -> Arc<ValidityContext> {
	let ctx = Arc::new(ValidityContext::new());
	request.extensions_mut().insert(Arc::clone(&ctx));
	ctx
}

/// The context attached by [`on_request_start`], if any
pub fn validity_context<B>(request: &http::Request<B>) -> Option<Arc<ValidityContext>> {
	request.extensions().get::<Arc<ValidityContext>>().cloned()
}

/// Finalize a serialized response body, falling back to the original on failure.
///
/// Calling this more than once for the same context returns later bodies
/// untouched.
pub fn on_response_ready(ctx: &ValidityContext, body: Bytes) -> Bytes {
	match finalize(ctx, &body) {
		Ok(finalized) => finalized.into_body(body),
		Err(e) => {
			warn!(
				target: "validity::http",
				request_id = %ctx.request_id(),
				error = %e,
				"failed to finalize response, delivering original body"
			);
			body
		},
	}
}

/// axum middleware wiring both hooks around the inner service.
///
/// ```ignore
/// let app = Router::new()
///     .route("/graphql", post(graphql))
///     .layer(axum::middleware::from_fn(validity_middleware));
/// ```
pub async fn validity_middleware(mut request: Request, next: Next) -> Response {
	let ctx = on_request_start(&mut request);
	let response = next.run(request).await;

	if !is_json(response.headers()) {
		return response;
	}

	// Bodies that may exceed the buffer limit are delivered without finalization
	let size = response.body().size_hint();
	if size.upper().is_none_or(|upper| upper > MAX_RESPONSE_BODY as u64) {
		warn!(
			target: "validity::http",
			request_id = %ctx.request_id(),
			lower = size.lower(),
			upper = ?size.upper(),
			"response body too large or unbounded, delivering without validation errors"
		);
		return response;
	}

	let (mut parts, body) = response.into_parts();
	let bytes = match axum::body::to_bytes(body, MAX_RESPONSE_BODY).await {
		Ok(bytes) => bytes,
		Err(e) => {
			error!(target: "validity::http", request_id = %ctx.request_id(), error = %e, "failed to read response body");
			parts.status = StatusCode::INTERNAL_SERVER_ERROR;
			parts.headers.remove(CONTENT_LENGTH);
			return Response::from_parts(parts, Body::empty());
		},
	};

	let body = on_response_ready(&ctx, bytes);
	parts.headers.remove(CONTENT_LENGTH);
	Response::from_parts(parts, Body::from(body))
}

fn is_json(headers: &HeaderMap) -> bool {
	headers
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(';').next())
		.map(|mime| {
			let mime = mime.trim();
			mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
		})
		.unwrap_or(false)
}

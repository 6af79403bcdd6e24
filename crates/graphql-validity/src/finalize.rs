//! Response finalization.
//!
//! Merges a request's accumulated validation errors into the serialized
//! GraphQL response and schedules its profiling report. The body is only
//! rewritten when it carries a top-level `data` key and there is something to
//! append; every other case reports [`Finalized::Unchanged`].

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::context::ValidityContext;
use crate::error::{FieldError, GraphQLError};
use crate::profiling::dispatch_profiling;

#[cfg(test)]
#[path = "finalize_tests.rs"]
mod tests;

/// Outcome of [`finalize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalized {
	/// Deliver the original body
	Unchanged,
	/// Deliver this body instead
	Rewritten(Bytes),
}

impl Finalized {
	/// The body to send, given the original one
	pub fn into_body(self, original: Bytes) -> Bytes {
		match self {
			Finalized::Unchanged => original,
			Finalized::Rewritten(body) => body,
		}
	}

	pub fn is_unchanged(&self) -> bool {
		matches!(self, Finalized::Unchanged)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
	#[error("response body is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("failed to serialize finalized response: {0}")]
	Serialize(#[source] serde_json::Error),
}

/// Apply the validity context to a serialized GraphQL response.
///
/// Runs at most once per context. Malformed bodies fail with
/// [`FinalizeError::Parse`] so the caller can log and fall back to the
/// original body.
pub fn finalize(ctx: &ValidityContext, body: &[u8]) -> Result<Finalized, FinalizeError> {
	if !ctx.begin_finalize() {
		return Ok(Finalized::Unchanged);
	}

	let mut response: Value = serde_json::from_slice(body)?;
	let config = ctx.config();

	if let Some(config) = &config {
		dispatch_profiling(ctx, config);
	}

	let Some(object) = response.as_object_mut().filter(|object| object.contains_key("data")) else {
		return Ok(Finalized::Unchanged);
	};

	let errors = ctx.errors();
	if errors.is_empty() {
		return Ok(Finalized::Unchanged);
	}

	let mut appended = Vec::with_capacity(errors.len());
	for error in errors {
		let error = match &config {
			Some(config) => config.wrap_error(error),
			None => error,
		};
		appended.push(response_error(&error)?);
	}
	debug!(target: "validity", request_id = %ctx.request_id(), errors = appended.len(), "appending validation errors");

	let existing = object.entry("errors").or_insert(Value::Null);
	let merged = match existing.take() {
		Value::Array(mut list) => {
			list.extend(appended);
			list
		},
		Value::Null => appended,
		previous => std::iter::once(previous).chain(appended).collect(),
	};
	*existing = Value::Array(merged);

	let body = serde_json::to_vec(&response).map_err(FinalizeError::Serialize)?;
	Ok(Finalized::Rewritten(Bytes::from(body)))
}

fn response_error(error: &FieldError) -> Result<Value, FinalizeError> {
	serde_json::to_value(GraphQLError::from(error)).map_err(FinalizeError::Serialize)
}

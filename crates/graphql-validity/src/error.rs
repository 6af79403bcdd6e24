// Field error types shared by validators, resolvers and the response finalizer

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::schema::ResponsePath;

/// Distinguishes errors meant for the end user from internal faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldErrorKind {
	/// Any error that was not explicitly marked as user facing. Subject to masking.
	#[default]
	Internal,
	/// A user-facing validity error. Never masked.
	Validity,
}

/// Position of a field in the query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
	pub line: usize,
	pub column: usize,
}

/// An error produced while validating or resolving a single field.
///
/// Validators return these as data (they are collected into the request's
/// validity context), resolvers return them as failures.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct FieldError {
	message: String,
	kind: FieldErrorKind,
	path: Option<ResponsePath>,
	locations: Vec<Location>,
}

impl FieldError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			kind: FieldErrorKind::Internal,
			path: None,
			locations: Vec::new(),
		}
	}

	/// Create a user-facing error that passes through error masking unmodified.
	pub fn validity(message: impl Into<String>) -> Self {
		Self {
			kind: FieldErrorKind::Validity,
			..Self::new(message)
		}
	}

	pub fn with_path(mut self, path: ResponsePath) -> Self {
		self.path = Some(path);
		self
	}

	pub fn with_location(mut self, location: Location) -> Self {
		self.locations.push(location);
		self
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn kind(&self) -> FieldErrorKind {
		self.kind
	}

	pub fn is_validity(&self) -> bool {
		self.kind == FieldErrorKind::Validity
	}

	pub fn path(&self) -> Option<&ResponsePath> {
		self.path.as_ref()
	}

	pub fn locations(&self) -> &[Location] {
		&self.locations
	}
}

impl From<String> for FieldError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for FieldError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

/// The `{message, locations, path}` shape of an entry in a response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphQLError {
	pub message: String,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub locations: Vec<Location>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<ResponsePath>,
}

impl GraphQLError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			locations: Vec::new(),
			path: None,
		}
	}
}

impl From<&FieldError> for GraphQLError {
	fn from(error: &FieldError) -> Self {
		Self {
			message: error.message.clone(),
			locations: error.locations.clone(),
			path: error.path.clone(),
		}
	}
}

/// Errors raised while populating the validator registry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
	#[error("invalid validator scope key '{0}'")]
	InvalidScopeKey(String),
}

/// Transform applied to unhandled errors when error wrapping is enabled.
pub trait ErrorWrapper: Send + Sync {
	fn wrap(&self, error: FieldError) -> FieldError;
}

impl<F> ErrorWrapper for F
where
	F: Fn(FieldError) -> FieldError + Send + Sync,
{
	fn wrap(&self, error: FieldError) -> FieldError {
		self(error)
	}
}

/// The default [`ErrorWrapper`], see [`mask_unhandled_error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskUnhandled;

impl ErrorWrapper for MaskUnhandled {
	fn wrap(&self, error: FieldError) -> FieldError {
		mask_unhandled_error(error)
	}
}

pub(crate) fn default_error_wrapper() -> Arc<dyn ErrorWrapper> {
	Arc::new(MaskUnhandled)
}

/// Hide internal error details from the end user.
///
/// Validity errors are returned unchanged. Anything else is logged together
/// with a fresh correlation id and replaced by an opaque message carrying
/// that id.
pub fn mask_unhandled_error(error: FieldError) -> FieldError {
	if error.is_validity() {
		return error;
	}

	let id = Uuid::new_v4();
	error!(target: "validity", error_id = %id, error = %error, "unhandled error occurred");

	FieldError {
		message: format!("An internal error occurred, with following id:{id}, please contact Administrator!"),
		kind: FieldErrorKind::Internal,
		path: error.path,
		locations: error.locations,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mask_hides_original_message() {
		let masked = mask_unhandled_error(FieldError::new("test error message"));

		assert!(!masked.message().contains("test error message"));
		assert!(masked.message().contains("An internal error occurred"));
		assert_eq!(masked.kind(), FieldErrorKind::Internal);
	}

	#[test]
	fn test_mask_uses_distinct_ids() {
		let first = mask_unhandled_error(FieldError::new("boom"));
		let second = mask_unhandled_error(FieldError::new("boom"));

		assert_ne!(first.message(), second.message());
	}

	#[test]
	fn test_validity_error_passes_through() {
		let error = FieldError::validity("test error message");
		let result = mask_unhandled_error(error);

		assert_eq!(result.message(), "test error message");
		assert!(result.is_validity());
	}

	#[test]
	fn test_response_shape_omits_empty_parts() {
		let bare = GraphQLError::from(&FieldError::new("test1"));
		assert_eq!(serde_json::to_string(&bare).unwrap(), r#"{"message":"test1"}"#);

		let located = FieldError::new("boom")
			.with_path(ResponsePath::root("hello").field("first"))
			.with_location(Location { line: 1, column: 9 });
		assert_eq!(
			serde_json::to_value(GraphQLError::from(&located)).unwrap(),
			serde_json::json!({
				"message": "boom",
				"locations": [{"line": 1, "column": 9}],
				"path": ["hello", "first"]
			})
		);
	}

	#[test]
	fn test_closure_wrapper() {
		let wrapper = |_: FieldError| FieldError::new("test");
		assert_eq!(wrapper.wrap(FieldError::new("original")).message(), "test");
	}
}

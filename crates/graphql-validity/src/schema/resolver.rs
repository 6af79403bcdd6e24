// Resolver seam: what a field resolver receives and returns

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ResponsePath, TypeRef};
use crate::context::ValidityContext;
use crate::error::{FieldError, Location};

/// Static information about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
	/// Name of the field in its parent type
	pub field_name: String,
	/// Name of the object type declaring the field
	pub parent_type: String,
	/// Declared return type of the field
	pub return_type: TypeRef,
	/// Path of this field occurrence in the response
	pub path: ResponsePath,
	/// Positions of the selections that requested the field
	pub locations: Vec<Location>,
}

impl ResolveInfo {
	pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>, return_type: TypeRef) -> Self {
		let field_name = field_name.into();
		Self {
			path: ResponsePath::root(field_name.clone()),
			field_name,
			parent_type: parent_type.into(),
			return_type,
			locations: Vec::new(),
		}
	}

	pub fn with_path(mut self, path: ResponsePath) -> Self {
		self.path = path;
		self
	}
}

/// Everything a resolver (and every validator guarding it) is called with.
///
/// The request's validity context travels here explicitly. Resolvers invoked
/// outside of an instrumented request simply carry `None`.
#[derive(Debug, Clone)]
pub struct ResolverArgs {
	/// The parent value the field is resolved on
	pub source: Arc<Value>,
	/// Field arguments with variables already substituted
	pub arguments: Arc<Map<String, Value>>,
	pub info: Arc<ResolveInfo>,
	/// Request-scoped root value supplied by the caller
	pub root_value: Arc<Value>,
	/// Per-request validity state, when the request is instrumented
	pub validity: Option<Arc<ValidityContext>>,
}

impl ResolverArgs {
	pub fn new(info: ResolveInfo) -> Self {
		Self {
			source: Arc::new(Value::Null),
			arguments: Arc::new(Map::new()),
			info: Arc::new(info),
			root_value: Arc::new(Value::Null),
			validity: None,
		}
	}

	pub fn with_source(mut self, source: Value) -> Self {
		self.source = Arc::new(source);
		self
	}

	pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
		self.arguments = Arc::new(arguments);
		self
	}

	pub fn with_root_value(mut self, root_value: Value) -> Self {
		self.root_value = Arc::new(root_value);
		self
	}

	pub fn with_validity(mut self, validity: Arc<ValidityContext>) -> Self {
		self.validity = Some(validity);
		self
	}

	pub fn argument(&self, name: &str) -> Option<&Value> {
		self.arguments.get(name)
	}
}

/// Data bundled with validation errors discovered while resolving it.
///
/// When returned through an instrumented resolver the errors are moved into
/// the request's validity context and only `data` reaches the response.
#[derive(Debug, Clone, Default)]
pub struct DataValidationResult {
	pub data: Value,
	pub errors: Vec<FieldError>,
}

impl DataValidationResult {
	pub fn new(data: Value, errors: Vec<FieldError>) -> Self {
		Self { data, errors }
	}
}

/// What a resolver produces
#[derive(Debug, Clone)]
pub enum FieldValue {
	Value(Value),
	Validated(DataValidationResult),
}

impl FieldValue {
	pub fn null() -> Self {
		FieldValue::Value(Value::Null)
	}
}

impl From<Value> for FieldValue {
	fn from(value: Value) -> Self {
		FieldValue::Value(value)
	}
}

impl From<DataValidationResult> for FieldValue {
	fn from(result: DataValidationResult) -> Self {
		FieldValue::Validated(result)
	}
}

/// A field resolver.
#[async_trait]
pub trait Resolver: Send + Sync {
	async fn resolve(&self, args: ResolverArgs) -> Result<FieldValue, FieldError>;
}

/// Adapts an async closure into a [`Resolver`]
pub struct FnResolver<F> {
	func: F,
}

#[async_trait]
impl<F, Fut> Resolver for FnResolver<F>
where
	F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<FieldValue, FieldError>> + Send + 'static,
{
	async fn resolve(&self, args: ResolverArgs) -> Result<FieldValue, FieldError> {
		(self.func)(args).await
	}
}

pub fn resolver_fn<F, Fut>(func: F) -> Arc<dyn Resolver>
where
	F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<FieldValue, FieldError>> + Send + 'static,
{
	Arc::new(FnResolver { func })
}

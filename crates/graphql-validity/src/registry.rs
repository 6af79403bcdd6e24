// Validator Registry
//
// Maps scope keys to ordered lists of validators:
// - `$`                    global, run once per request
// - `*`                    every field of every type
// - `<TypeName>`           every field whose declared return type is `TypeName`
// - `<ParentType>:<field>` one specific field

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::{FieldError, RegistryError};
use crate::schema::ResolverArgs;

/// Where a validator applies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
	Global,
	Wildcard,
	Type(String),
	Field { parent: String, field: String },
}

impl ScopeKey {
	pub fn type_name(name: impl Into<String>) -> Self {
		ScopeKey::Type(name.into())
	}

	pub fn field(parent: impl Into<String>, field: impl Into<String>) -> Self {
		ScopeKey::Field {
			parent: parent.into(),
			field: field.into(),
		}
	}
}

impl FromStr for ScopeKey {
	type Err = RegistryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || RegistryError::InvalidScopeKey(s.to_string());
		match s {
			"$" => Ok(ScopeKey::Global),
			"*" => Ok(ScopeKey::Wildcard),
			"" => Err(invalid()),
			_ => match s.split_once(':') {
				None => Ok(ScopeKey::Type(s.to_string())),
				Some((parent, field)) if !parent.is_empty() && !field.is_empty() && !field.contains(':') => {
					Ok(ScopeKey::field(parent, field))
				},
				Some(_) => Err(invalid()),
			},
		}
	}
}

impl fmt::Display for ScopeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScopeKey::Global => f.write_str("$"),
			ScopeKey::Wildcard => f.write_str("*"),
			ScopeKey::Type(name) => f.write_str(name),
			ScopeKey::Field { parent, field } => write!(f, "{parent}:{field}"),
		}
	}
}

/// What a validator hands back: errors now, errors later, or a failure.
pub enum ValidatorOutput {
	Ready(Vec<FieldError>),
	Pending(BoxFuture<'static, Result<Vec<FieldError>, FieldError>>),
	Failed(FieldError),
}

impl ValidatorOutput {
	/// No validation errors
	pub fn none() -> Self {
		ValidatorOutput::Ready(Vec::new())
	}

	/// Defer to a future resolving to anything a validator may return synchronously.
	pub fn pending<F, T>(future: F) -> Self
	where
		F: Future<Output = Result<T, FieldError>> + Send + 'static,
		T: Into<ValidatorOutput> + Send,
	{
		ValidatorOutput::Pending(Box::pin(async move {
			match future.await?.into() {
				ValidatorOutput::Ready(errors) => Ok(errors),
				ValidatorOutput::Pending(inner) => inner.await,
				ValidatorOutput::Failed(error) => Err(error),
			}
		}))
	}
}

impl fmt::Debug for ValidatorOutput {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidatorOutput::Ready(errors) => f.debug_tuple("Ready").field(errors).finish(),
			ValidatorOutput::Pending(_) => f.write_str("Pending"),
			ValidatorOutput::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
		}
	}
}

impl From<()> for ValidatorOutput {
	fn from(_: ()) -> Self {
		ValidatorOutput::none()
	}
}

impl From<FieldError> for ValidatorOutput {
	fn from(error: FieldError) -> Self {
		ValidatorOutput::Ready(vec![error])
	}
}

impl From<Option<FieldError>> for ValidatorOutput {
	fn from(error: Option<FieldError>) -> Self {
		ValidatorOutput::Ready(error.into_iter().collect())
	}
}

impl From<Vec<FieldError>> for ValidatorOutput {
	fn from(errors: Vec<FieldError>) -> Self {
		ValidatorOutput::Ready(errors)
	}
}

impl<T> From<Result<T, FieldError>> for ValidatorOutput
where
	T: Into<ValidatorOutput>,
{
	fn from(result: Result<T, FieldError>) -> Self {
		match result {
			Ok(output) => output.into(),
			Err(error) => ValidatorOutput::Failed(error),
		}
	}
}

/// A validator receives exactly the arguments the guarded resolver receives.
pub trait Validator: Send + Sync {
	fn validate(&self, args: &ResolverArgs) -> ValidatorOutput;
}

struct FnValidator<F> {
	func: F,
}

impl<F, R> Validator for FnValidator<F>
where
	F: Fn(&ResolverArgs) -> R + Send + Sync,
	R: Into<ValidatorOutput>,
{
	fn validate(&self, args: &ResolverArgs) -> ValidatorOutput {
		(self.func)(args).into()
	}
}

/// Registry of validators keyed by scope.
///
/// Lookups happen on every field resolution, so validators registered after
/// the schema has been instrumented still take effect.
#[derive(Default)]
pub struct ValidatorRegistry {
	scopes: RwLock<HashMap<ScopeKey, Vec<Arc<dyn Validator>>>>,
}

impl ValidatorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a closure validator under a textual scope key (`$`, `*`, `Type`, `Type:field`)
	pub fn register<F, R>(&self, scope: &str, func: F) -> Result<(), RegistryError>
	where
		F: Fn(&ResolverArgs) -> R + Send + Sync + 'static,
		R: Into<ValidatorOutput> + 'static,
	{
		let key = scope.parse()?;
		self.register_validator(key, Arc::new(FnValidator { func }));
		Ok(())
	}

	/// Append a validator to the list for `key`
	pub fn register_validator(&self, key: ScopeKey, validator: Arc<dyn Validator>) {
		self.scopes.write().entry(key).or_default().push(validator);
	}

	/// Remove every validator registered under `key`
	pub fn clear_scope(&self, key: &ScopeKey) {
		self.scopes.write().remove(key);
	}

	pub fn len(&self, key: &ScopeKey) -> usize {
		self.scopes.read().get(key).map_or(0, Vec::len)
	}

	pub fn is_empty(&self) -> bool {
		self.scopes.read().values().all(Vec::is_empty)
	}

	/// Global (`$`) validators
	pub fn globals(&self) -> Vec<Arc<dyn Validator>> {
		self.scopes.read().get(&ScopeKey::Global).cloned().unwrap_or_default()
	}

	/// Validators applying to one field: wildcard, then return-type, then field scope.
	pub fn validators_for(&self, parent_type: &str, field_name: &str, return_type: &str) -> Vec<Arc<dyn Validator>> {
		let scopes = self.scopes.read();
		let keys = [
			ScopeKey::Wildcard,
			ScopeKey::type_name(return_type),
			ScopeKey::field(parent_type, field_name),
		];

		keys
			.iter()
			.filter_map(|key| scopes.get(key))
			.flat_map(|validators| validators.iter().cloned())
			.collect()
	}
}

impl fmt::Debug for ValidatorRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let scopes = self.scopes.read();
		f.debug_map()
			.entries(scopes.iter().map(|(key, validators)| (key.to_string(), validators.len())))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;
	use crate::schema::{ResolveInfo, TypeRef};

	fn args() -> ResolverArgs {
		ResolverArgs::new(ResolveInfo::new("TestObj", "TestField", TypeRef::named("TestField")))
	}

	fn messages(validators: &[Arc<dyn Validator>]) -> Vec<String> {
		validators
			.iter()
			.flat_map(|v| match v.validate(&args()) {
				ValidatorOutput::Ready(errors) => errors,
				other => panic!("expected ready output, got {other:?}"),
			})
			.map(|e| e.message().to_string())
			.collect()
	}

	#[test]
	fn test_parse_scope_keys() {
		assert_eq!("$".parse::<ScopeKey>().unwrap(), ScopeKey::Global);
		assert_eq!("*".parse::<ScopeKey>().unwrap(), ScopeKey::Wildcard);
		assert_eq!("TestType".parse::<ScopeKey>().unwrap(), ScopeKey::type_name("TestType"));
		assert_eq!(
			"TestType:first".parse::<ScopeKey>().unwrap(),
			ScopeKey::field("TestType", "first")
		);

		for invalid in ["", ":first", "TestType:", "a:b:c"] {
			assert_eq!(
				invalid.parse::<ScopeKey>(),
				Err(RegistryError::InvalidScopeKey(invalid.to_string()))
			);
		}
	}

	#[test]
	fn test_scope_key_round_trips_display() {
		for key in ["$", "*", "TestType", "TestType:first"] {
			assert_eq!(key.parse::<ScopeKey>().unwrap().to_string(), key);
		}
	}

	#[test]
	fn test_lookup_concatenates_scopes_in_order() {
		let registry = ValidatorRegistry::new();
		registry.register("$", |_| FieldError::new("test1")).unwrap();
		registry.register("*", |_| FieldError::new("test2")).unwrap();
		registry.register("TestField", |_| FieldError::new("test3")).unwrap();
		registry.register("TestObj:TestField", |_| FieldError::new("test4")).unwrap();
		registry.register("Other:TestField", |_| FieldError::new("other")).unwrap();

		assert_eq!(registry.globals().len(), 1);

		let validators = registry.validators_for("TestObj", "TestField", "TestField");
		assert_eq!(messages(&validators), vec!["test2", "test3", "test4"]);
	}

	#[test]
	fn test_lookup_without_matches_is_empty() {
		let registry = ValidatorRegistry::new();
		registry.register("TestObj:other", |_| FieldError::new("nope")).unwrap();

		assert!(registry.validators_for("TestObj", "TestField", "String").is_empty());
		assert!(registry.globals().is_empty());
	}

	#[test]
	fn test_register_rejects_bad_key() {
		let registry = ValidatorRegistry::new();
		let result = registry.register("Type:", |_| ());

		assert_matches!(result, Err(RegistryError::InvalidScopeKey(_)));
		assert!(registry.is_empty());
	}

	#[test]
	fn test_clear_scope() {
		let registry = ValidatorRegistry::new();
		registry.register("*", |_| ()).unwrap();
		registry.register("*", |_| ()).unwrap();
		assert_eq!(registry.len(&ScopeKey::Wildcard), 2);

		registry.clear_scope(&ScopeKey::Wildcard);
		assert_eq!(registry.len(&ScopeKey::Wildcard), 0);
	}

	#[test]
	fn test_output_conversions() {
		assert_matches!(ValidatorOutput::from(()), ValidatorOutput::Ready(e) if e.is_empty());
		assert_matches!(ValidatorOutput::from(None::<FieldError>), ValidatorOutput::Ready(e) if e.is_empty());
		assert_matches!(
			ValidatorOutput::from(vec![FieldError::new("a"), FieldError::new("b")]),
			ValidatorOutput::Ready(e) if e.len() == 2
		);
		assert_matches!(
			ValidatorOutput::from(Err::<(), _>(FieldError::new("boom"))),
			ValidatorOutput::Failed(e) if e.message() == "boom"
		);
	}

	#[tokio::test]
	async fn test_pending_output_flattens() {
		let output = ValidatorOutput::pending(async { Ok(FieldError::new("later")) });
		let ValidatorOutput::Pending(future) = output else {
			panic!("expected pending output");
		};

		let errors = future.await.unwrap();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].message(), "later");
	}

	#[tokio::test]
	async fn test_nested_pending_output_runs_on_another_task() {
		let inner = ValidatorOutput::pending(async { Ok(vec![FieldError::new("inner")]) });
		let output = ValidatorOutput::pending(async move { Ok(inner) });
		let ValidatorOutput::Pending(future) = output else {
			panic!("expected pending output");
		};

		let errors = tokio::spawn(future).await.unwrap().unwrap();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].message(), "inner");
	}
}

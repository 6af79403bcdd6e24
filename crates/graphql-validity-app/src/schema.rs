// Demo schema and the validators guarding it

use std::sync::Arc;

use graphql_validity::{
	FieldDefinition, FieldError, Instrumentation, ObjectType, RegistryError, Schema, TypeRef, ValidatorRegistry,
	ValidityConfig,
};
use serde_json::json;
use tracing::info;

fn test_type() -> ObjectType {
	ObjectType::new("TestType")
		.field(
			FieldDefinition::new("first", TypeRef::named("String"))
				.resolve_with(|args| async move { Ok(args.source["first"].clone().into()) }),
		)
		.field(
			FieldDefinition::new("second", TypeRef::named("String"))
				.resolve_with(|args| async move { Ok(args.source["second"].clone().into()) }),
		)
}

pub fn build_schema() -> Schema {
	let query = ObjectType::new("RootQueryType").field(
		FieldDefinition::new("hello", TypeRef::named("TestType")).resolve_with(|_| async {
			Ok(json!({"first": "lala", "second": "I HAVE AN ERROR"}).into())
		}),
	);
	let mutation = ObjectType::new("Mutation").field(
		FieldDefinition::new("testMutation", TypeRef::named("TestType")).resolve_with(|_| async {
			Ok(json!({"first": "dsfs", "second": "dsfsdf"}).into())
		}),
	);

	Schema::new(query).with_mutation(mutation).with_type(test_type())
}

pub fn build_registry() -> Result<ValidatorRegistry, RegistryError> {
	let registry = ValidatorRegistry::new();
	registry.register("$", |args| {
		info!(
			target: "validity",
			field = %args.info.field_name,
			parent = %args.info.parent_type,
			"global validation ran"
		);
	})?;
	registry.register("TestType:first", |_| FieldError::validity("Wrong stuff here!"))?;
	registry.register("Mutation:testMutation", |args| match args.argument("test") {
		Some(value) if value.is_string() => None,
		_ => Some(FieldError::validity("testMutation requires a test argument")),
	})?;
	Ok(registry)
}

/// The demo schema with every resolver instrumented
pub fn instrumented_schema(config: ValidityConfig) -> Result<Schema, RegistryError> {
	let mut schema = build_schema();
	Instrumentation::new(Arc::new(build_registry()?))
		.with_config(config)
		.wrap(&mut schema);
	Ok(schema)
}

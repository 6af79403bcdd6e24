use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use super::*;
use crate::error::FieldError;
use crate::instrument::Instrumentation;
use crate::registry::ValidatorRegistry;
use crate::schema::{DataValidationResult, FieldDefinition, ObjectType, TypeRef};

fn test_schema() -> Schema {
	Schema::new(
		ObjectType::new("RootQueryType")
			.field(
				FieldDefinition::new("hello", TypeRef::named("TestType"))
					.resolve_with(|_| async { Ok(json!({"first": "1", "second": "2"}).into()) }),
			)
			.field(
				FieldDefinition::new("items", TypeRef::list(TypeRef::named("TestType")))
					.resolve_with(|_| async { Ok(json!([{"first": "ok"}, {"first": "bad"}]).into()) }),
			)
			.field(
				FieldDefinition::new("broken", TypeRef::list(TypeRef::named("String")))
					.resolve_with(|_| async { Ok(json!("not a list").into()) }),
			),
	)
	.with_mutation(
		ObjectType::new("Mutation").field(
			FieldDefinition::new("testMutation", TypeRef::named("TestType")).resolve_with(|args| async move {
				let test = args.argument("test").cloned().unwrap_or(Value::Null);
				Ok(json!({"first": test}).into())
			}),
		),
	)
	.with_type(
		ObjectType::new("TestType")
			.field(
				FieldDefinition::new("first", TypeRef::named("String")).resolve_with(|args| async move {
					match args.source["first"].as_str() {
						Some("bad") => Err(FieldError::new("bad item")),
						_ => Ok(args.source["first"].clone().into()),
					}
				}),
			)
			.field(FieldDefinition::new("second", TypeRef::named("String"))),
	)
}

async fn execute(schema: Schema, request: Request) -> Response {
	Executor::new(Arc::new(schema)).execute(request).await
}

fn messages(response: &Response) -> Vec<&str> {
	response.errors.iter().map(|e| e.message.as_str()).collect()
}

#[tokio::test]
async fn test_simple_query() {
	let response = execute(test_schema(), Request::new("{ hello { first second } }")).await;

	assert!(response.is_ok());
	assert_eq!(response.data, Some(json!({"hello": {"first": "1", "second": "2"}})));
}

#[tokio::test]
async fn test_aliases_and_typename() {
	let response = execute(
		test_schema(),
		Request::new("{ greeting: hello { a: first __typename } }"),
	)
	.await;

	assert_eq!(
		serde_json::to_string(&response).unwrap(),
		r#"{"data":{"greeting":{"a":"1","__typename":"TestType"}}}"#
	);
}

#[tokio::test]
async fn test_fragments_apply_by_type_condition() {
	let query = r#"
		query {
			hello {
				...Parts
				... on TestType { second }
				... on OtherType { missing }
			}
		}
		fragment Parts on TestType { first }
	"#;
	let response = execute(test_schema(), Request::new(query)).await;

	assert!(response.is_ok());
	assert_eq!(response.data, Some(json!({"hello": {"first": "1", "second": "2"}})));
}

#[tokio::test]
async fn test_skip_and_include() {
	let query = "query ($skip: Boolean!) { hello { first @skip(if: $skip) second @include(if: false) } }";
	let mut variables = Map::new();
	variables.insert("skip".to_string(), json!(true));

	let response = execute(test_schema(), Request::new(query).with_variables(variables)).await;

	assert_eq!(response.data, Some(json!({"hello": {}})));
}

#[tokio::test]
async fn test_variables_and_defaults() {
	let query = r#"mutation ($test: String = "default") { testMutation(test: $test) { first } }"#;

	let response = execute(test_schema(), Request::new(query)).await;
	assert_eq!(response.data, Some(json!({"testMutation": {"first": "default"}})));

	let mut variables = Map::new();
	variables.insert("test".to_string(), json!("provided"));
	let response = execute(test_schema(), Request::new(query).with_variables(variables)).await;
	assert_eq!(response.data, Some(json!({"testMutation": {"first": "provided"}})));
}

#[tokio::test]
async fn test_missing_required_variable() {
	let response = execute(test_schema(), Request::new("query ($id: ID!) { hello { first } }")).await;

	assert!(response.data.is_none());
	assert_eq!(messages(&response), vec![r#"Variable "$id" of required type "ID!" was not provided."#]);
	assert_eq!(response.errors[0].locations.len(), 1);
}

#[tokio::test]
async fn test_parse_error_has_no_data() {
	let response = execute(test_schema(), Request::new("{ hello ")).await;

	assert!(response.data.is_none());
	assert_eq!(response.errors.len(), 1);
	assert!(!response.errors[0].locations.is_empty());
}

#[tokio::test]
async fn test_operation_selection() {
	let query = "query A { hello { first } } query B { hello { second } }";

	let response = execute(test_schema(), Request::new(query)).await;
	assert_eq!(
		messages(&response),
		vec!["Must provide operation name if query contains multiple operations."]
	);

	let response = execute(test_schema(), Request::new(query).with_operation_name("B")).await;
	assert_eq!(response.data, Some(json!({"hello": {"second": "2"}})));

	let response = execute(test_schema(), Request::new(query).with_operation_name("C")).await;
	assert_eq!(messages(&response), vec![r#"Unknown operation named "C"."#]);
}

#[tokio::test]
async fn test_missing_mutation_root() {
	let schema = Schema::new(ObjectType::new("Query"));
	let response = execute(schema, Request::new("mutation { anything }")).await;

	assert!(response.data.is_none());
	assert_eq!(messages(&response), vec!["Schema is not configured for mutations."]);
}

fn ordering_root(name: &str, log: &Arc<Mutex<Vec<&'static str>>>) -> ObjectType {
	let slow_log = Arc::clone(log);
	let fast_log = Arc::clone(log);
	ObjectType::new(name)
		.field(
			FieldDefinition::new("slow", TypeRef::named("String")).resolve_with(move |_| {
				let log = Arc::clone(&slow_log);
				async move {
					tokio::time::sleep(Duration::from_millis(20)).await;
					log.lock().push("slow");
					Ok(json!("slow").into())
				}
			}),
		)
		.field(
			FieldDefinition::new("fast", TypeRef::named("String")).resolve_with(move |_| {
				let log = Arc::clone(&fast_log);
				async move {
					log.lock().push("fast");
					Ok(json!("fast").into())
				}
			}),
		)
}

#[tokio::test]
async fn test_mutation_fields_run_serially() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let schema = Schema::new(ordering_root("Query", &log)).with_mutation(ordering_root("Mutation", &log));

	let response = execute(schema, Request::new("mutation { slow fast }")).await;

	assert!(response.is_ok());
	assert_eq!(*log.lock(), vec!["slow", "fast"]);
}

#[tokio::test]
async fn test_query_fields_run_concurrently() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let schema = Schema::new(ordering_root("Query", &log));

	let response = execute(schema, Request::new("{ slow fast }")).await;

	assert_eq!(response.data, Some(json!({"slow": "slow", "fast": "fast"})));
	assert_eq!(*log.lock(), vec!["fast", "slow"]);
}

#[tokio::test]
async fn test_resolver_error_nulls_field_with_path() {
	let response = execute(test_schema(), Request::new("{ items { first } }")).await;

	assert_eq!(response.data, Some(json!({"items": [{"first": "ok"}, {"first": null}]})));
	assert_eq!(messages(&response), vec!["bad item"]);

	let error = &response.errors[0];
	assert_eq!(serde_json::to_value(&error.path).unwrap(), json!(["items", 1, "first"]));
	assert_eq!(error.locations.len(), 1);
	assert_eq!(error.locations[0].line, 1);
}

#[tokio::test]
async fn test_unknown_field() {
	let response = execute(test_schema(), Request::new("{ nope }")).await;

	assert_eq!(response.data, Some(json!({"nope": null})));
	assert_eq!(messages(&response), vec![r#"Cannot query field "nope" on type "RootQueryType"."#]);
}

#[tokio::test]
async fn test_list_type_requires_array() {
	let response = execute(test_schema(), Request::new("{ broken }")).await;

	assert_eq!(response.data, Some(json!({"broken": null})));
	assert_eq!(messages(&response), vec![r#"Expected a list for field of type "[String]"."#]);
}

fn partial_schema() -> Schema {
	Schema::new(ObjectType::new("Query").field(
		FieldDefinition::new("partial", TypeRef::named("String")).resolve_with(|_| async {
			Ok(DataValidationResult::new(json!("kept"), vec![FieldError::validity("partial")]).into())
		}),
	))
}

#[tokio::test]
async fn test_validated_result_without_context() {
	let response = execute(partial_schema(), Request::new("{ partial }")).await;

	assert_eq!(response.data, Some(json!({"partial": "kept"})));
	assert_eq!(messages(&response), vec!["partial"]);
	assert_eq!(serde_json::to_value(&response.errors[0].path).unwrap(), json!(["partial"]));
}

#[tokio::test]
async fn test_validated_result_goes_to_context() {
	let ctx = Arc::new(ValidityContext::new());
	let response = execute(partial_schema(), Request::new("{ partial }").with_validity(Arc::clone(&ctx))).await;

	assert!(response.is_ok());
	assert_eq!(response.data, Some(json!({"partial": "kept"})));
	assert_eq!(ctx.error_count(), 1);
}

#[tokio::test]
async fn test_instrumented_schema_collects_validation_errors() {
	let registry = Arc::new(ValidatorRegistry::new());
	registry
		.register("TestType:first", |_| FieldError::validity("Wrong stuff here!"))
		.unwrap();
	let mut schema = test_schema();
	Instrumentation::new(registry).wrap(&mut schema);

	let ctx = Arc::new(ValidityContext::new());
	let response = execute(schema, Request::new("{ hello { first } }").with_validity(Arc::clone(&ctx))).await;

	assert!(response.is_ok());
	assert_eq!(response.data, Some(json!({"hello": {"first": "1"}})));
	assert_eq!(ctx.errors()[0].message(), "Wrong stuff here!");
}

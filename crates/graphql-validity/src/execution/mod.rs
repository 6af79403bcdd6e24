// Minimal GraphQL executor
//
// Parses a request with async-graphql-parser, picks the operation, binds
// variables and resolves the selection set against a `Schema`. Query root
// fields resolve concurrently, mutation root fields one after another.
// Non-null propagation and input coercion are not performed.

mod resolve;

use std::sync::Arc;

use async_graphql_parser::parse_query;
use async_graphql_parser::types::{
	DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, VariableDefinition,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::context::ValidityContext;
use crate::error::{GraphQLError, Location};
use crate::schema::Schema;

use self::resolve::ExecCtx;

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;

/// A GraphQL request as posted by clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	pub query: String,
	#[serde(default)]
	pub operation_name: Option<String>,
	#[serde(default)]
	pub variables: Option<Map<String, Value>>,
	/// Value handed to every resolver as `root_value`
	#[serde(skip)]
	pub root_value: Value,
	/// Validity context of the HTTP request carrying this query
	#[serde(skip)]
	pub validity: Option<Arc<ValidityContext>>,
}

impl Request {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			..Default::default()
		}
	}

	pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
		self.operation_name = Some(name.into());
		self
	}

	pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
		self.variables = Some(variables);
		self
	}

	pub fn with_root_value(mut self, root_value: Value) -> Self {
		self.root_value = root_value;
		self
	}

	pub fn with_validity(mut self, validity: Arc<ValidityContext>) -> Self {
		self.validity = Some(validity);
		self
	}
}

/// `{"data": ..., "errors": [...]}`; `data` is absent when execution never started.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
}

impl Response {
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}
}

impl From<ExecutionError> for Response {
	fn from(error: ExecutionError) -> Self {
		let mut graphql_error = GraphQLError::new(error.to_string());
		if let Some(location) = error.location() {
			graphql_error.locations.push(location);
		}
		Self {
			data: None,
			errors: vec![graphql_error],
		}
	}
}

/// Request-level failures that prevent execution from starting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
	#[error("{message}")]
	Parse { message: String, location: Option<Location> },
	#[error("Must provide an operation.")]
	NoOperation,
	#[error("Unknown operation named \"{0}\".")]
	UnknownOperation(String),
	#[error("Must provide operation name if query contains multiple operations.")]
	OperationNameRequired,
	#[error("Schema is not configured for {0}.")]
	MissingRootType(&'static str),
	#[error("Subscriptions are not supported.")]
	UnsupportedOperation,
	#[error("{message}")]
	Variables { message: String, location: Location },
}

impl ExecutionError {
	pub fn location(&self) -> Option<Location> {
		match self {
			ExecutionError::Parse { location, .. } => *location,
			ExecutionError::Variables { location, .. } => Some(*location),
			_ => None,
		}
	}
}

impl From<async_graphql_parser::Error> for ExecutionError {
	fn from(error: async_graphql_parser::Error) -> Self {
		let location = error.positions().next().map(|pos| Location {
			line: pos.line,
			column: pos.column,
		});
		ExecutionError::Parse {
			message: error.to_string(),
			location,
		}
	}
}

/// Executes requests against a schema.
#[derive(Debug, Clone)]
pub struct Executor {
	schema: Arc<Schema>,
}

impl Executor {
	pub fn new(schema: Arc<Schema>) -> Self {
		Self { schema }
	}

	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}

	pub async fn execute(&self, request: Request) -> Response {
		let document = match parse_query(&request.query) {
			Ok(document) => document,
			Err(e) => return ExecutionError::from(e).into(),
		};
		let ExecutableDocument {
			operations,
			fragments,
		} = document;

		let operation = match select_operation(operations, request.operation_name.as_deref()) {
			Ok(operation) => operation,
			Err(e) => return e.into(),
		};

		let variables = match bind_variables(
			&operation.node.variable_definitions,
			request.variables.as_ref(),
		) {
			Ok(variables) => variables,
			Err(e) => return e.into(),
		};

		let (root, serial) = match operation.node.ty {
			OperationType::Query => (self.schema.query_type().ok_or(ExecutionError::MissingRootType("queries")), false),
			OperationType::Mutation => (
				self.schema.mutation_type().ok_or(ExecutionError::MissingRootType("mutations")),
				true,
			),
			OperationType::Subscription => (Err(ExecutionError::UnsupportedOperation), false),
		};
		let root = match root {
			Ok(root) => root,
			Err(e) => return e.into(),
		};

		debug!(target: "validity", operation = ?operation.node.ty, root = %root.name(), "executing operation");

		let ctx = ExecCtx::new(
			&self.schema,
			&fragments,
			variables,
			Arc::new(request.root_value),
			request.validity,
		);
		let data = ctx
			.execute_root(root, &operation.node.selection_set.node, serial)
			.await;

		Response {
			data: Some(data),
			errors: ctx.into_errors(),
		}
	}
}

fn select_operation(
	operations: DocumentOperations,
	operation_name: Option<&str>,
) -> Result<Positioned<OperationDefinition>, ExecutionError> {
	match operations {
		DocumentOperations::Single(operation) => Ok(operation),
		DocumentOperations::Multiple(mut operations) => match operation_name {
			Some(name) => operations
				.remove(&Name::new(name))
				.ok_or_else(|| ExecutionError::UnknownOperation(name.to_string())),
			None if operations.len() > 1 => Err(ExecutionError::OperationNameRequired),
			None => operations
				.into_values()
				.next()
				.ok_or(ExecutionError::NoOperation),
		},
	}
}

/// Values for the operation's declared variables, falling back to their defaults.
fn bind_variables(
	definitions: &[Positioned<VariableDefinition>],
	provided: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>, ExecutionError> {
	let mut variables = Map::new();
	for definition in definitions {
		let name = definition.node.name.node.as_str();
		let location = Location {
			line: definition.pos.line,
			column: definition.pos.column,
		};

		let value = match provided.and_then(|provided| provided.get(name)) {
			Some(value) => Some(value.clone()),
			None => match &definition.node.default_value {
				Some(default) => Some(default.node.clone().into_json().map_err(|e| {
					ExecutionError::Variables {
						message: format!("Invalid default value for variable \"${name}\": {e}"),
						location,
					}
				})?),
				None => None,
			},
		};

		match value {
			Some(value) => {
				variables.insert(name.to_string(), value);
			},
			None if !definition.node.var_type.node.nullable => {
				return Err(ExecutionError::Variables {
					message: format!(
						"Variable \"${name}\" of required type \"{}\" was not provided.",
						definition.node.var_type.node
					),
					location,
				});
			},
			None => {},
		}
	}
	Ok(variables)
}

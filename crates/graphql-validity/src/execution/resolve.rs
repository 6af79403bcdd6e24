// Selection set resolution for a single operation

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql_parser::types::{Directive, Field, FragmentDefinition, Selection, SelectionSet};
use async_graphql_parser::{Pos, Positioned};
use async_graphql_value::{ConstValue, Name};
use futures::future::{join_all, BoxFuture};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::context::ValidityContext;
use crate::error::{FieldError, GraphQLError, Location};
use crate::schema::{FieldValue, NamedType, ObjectType, ResolveInfo, ResolverArgs, ResponsePath, Schema, TypeRef};

type GroupedFields<'a> = IndexMap<String, Vec<&'a Positioned<Field>>>;

/// State shared by every field resolution of one operation
pub(super) struct ExecCtx<'a> {
	schema: &'a Schema,
	fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
	variables: Map<String, Value>,
	root_value: Arc<Value>,
	validity: Option<Arc<ValidityContext>>,
	errors: Mutex<Vec<GraphQLError>>,
}

impl<'a> ExecCtx<'a> {
	pub(super) fn new(
		schema: &'a Schema,
		fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
		variables: Map<String, Value>,
		root_value: Arc<Value>,
		validity: Option<Arc<ValidityContext>>,
	) -> Self {
		Self {
			schema,
			fragments,
			variables,
			root_value,
			validity,
			errors: Mutex::new(Vec::new()),
		}
	}

	pub(super) fn into_errors(self) -> Vec<GraphQLError> {
		self.errors.into_inner()
	}

	pub(super) async fn execute_root(&'a self, root: &'a ObjectType, selection_set: &'a SelectionSet, serial: bool) -> Value {
		let mut grouped = GroupedFields::new();
		self.collect_fields(root, selection_set, &mut grouped, &mut HashSet::new());
		self
			.execute_fields(root, grouped, Arc::clone(&self.root_value), None, serial)
			.await
	}

	/// Group the selected fields by response key, expanding fragments that apply to `object`.
	fn collect_fields(
		&'a self,
		object: &ObjectType,
		selection_set: &'a SelectionSet,
		grouped: &mut GroupedFields<'a>,
		visited_fragments: &mut HashSet<&'a str>,
	) {
		for selection in &selection_set.items {
			match &selection.node {
				Selection::Field(field) => {
					if !self.should_include(&field.node.directives) {
						continue;
					}
					let key = field.node.response_key().node.to_string();
					grouped.entry(key).or_default().push(field);
				},
				Selection::FragmentSpread(spread) => {
					let name = spread.node.fragment_name.node.as_str();
					if !self.should_include(&spread.node.directives) || !visited_fragments.insert(name) {
						continue;
					}
					let Some(fragment) = self.fragments.get(&spread.node.fragment_name.node) else {
						continue;
					};
					if fragment.node.type_condition.node.on.node.as_str() != object.name() {
						continue;
					}
					self.collect_fields(object, &fragment.node.selection_set.node, grouped, visited_fragments);
				},
				Selection::InlineFragment(inline) => {
					if !self.should_include(&inline.node.directives) {
						continue;
					}
					let applies = inline
						.node
						.type_condition
						.as_ref()
						.is_none_or(|condition| condition.node.on.node.as_str() == object.name());
					if applies {
						self.collect_fields(object, &inline.node.selection_set.node, grouped, visited_fragments);
					}
				},
			}
		}
	}

	fn execute_fields(
		&'a self,
		object: &'a ObjectType,
		grouped: GroupedFields<'a>,
		source: Arc<Value>,
		path: Option<ResponsePath>,
		serial: bool,
	) -> BoxFuture<'a, Value> {
		Box::pin(async move {
			let mut futures = Vec::with_capacity(grouped.len());
			for (key, fields) in grouped {
				let path = match &path {
					Some(parent) => parent.field(key.clone()),
					None => ResponsePath::root(key.clone()),
				};
				let source = Arc::clone(&source);
				futures.push(async move {
					let value = self.execute_field(object, fields, source, path).await;
					(key, value)
				});
			}

			let entries = if serial {
				let mut entries = Vec::with_capacity(futures.len());
				for future in futures {
					entries.push(future.await);
				}
				entries
			} else {
				join_all(futures).await
			};

			Value::Object(entries.into_iter().collect())
		})
	}

	async fn execute_field(
		&'a self,
		object: &'a ObjectType,
		fields: Vec<&'a Positioned<Field>>,
		source: Arc<Value>,
		path: ResponsePath,
	) -> Value {
		let Some(field) = fields.first() else {
			return Value::Null;
		};
		let name = field.node.name.node.as_str();
		let location = Some(to_location(field.pos));

		if name == "__typename" {
			return Value::String(object.name().to_string());
		}

		let Some(definition) = object.get_field(name) else {
			self.push_error(
				FieldError::new(format!("Cannot query field \"{name}\" on type \"{}\".", object.name())),
				&path,
				location,
			);
			return Value::Null;
		};

		let arguments = match self.argument_values(&field.node) {
			Ok(arguments) => arguments,
			Err(e) => {
				self.push_error(e, &path, location);
				return Value::Null;
			},
		};

		let resolved = match definition.resolver() {
			Some(resolver) => {
				let info = ResolveInfo {
					field_name: name.to_string(),
					parent_type: object.name().to_string(),
					return_type: definition.ty().clone(),
					path: path.clone(),
					locations: fields.iter().map(|f| to_location(f.pos)).collect(),
				};
				let args = ResolverArgs {
					source: Arc::clone(&source),
					arguments: Arc::new(arguments),
					info: Arc::new(info),
					root_value: Arc::clone(&self.root_value),
					validity: self.validity.clone(),
				};
				resolver.resolve(args).await
			},
			None => Ok(default_resolve(&source, name)),
		};

		let value = match resolved {
			Ok(FieldValue::Value(value)) => value,
			Ok(FieldValue::Validated(result)) => {
				match &self.validity {
					Some(ctx) => ctx.push_errors(result.errors),
					None => {
						for error in result.errors {
							self.push_error(error, &path, location);
						}
					},
				}
				result.data
			},
			Err(e) => {
				self.push_error(e, &path, location);
				return Value::Null;
			},
		};

		let selection_sets: Vec<&'a SelectionSet> = fields.iter().map(|f| &f.node.selection_set.node).collect();
		self.complete_value(definition.ty(), selection_sets, value, path).await
	}

	/// Shape a resolved value according to the field's declared type.
	fn complete_value(
		&'a self,
		ty: &'a TypeRef,
		selection_sets: Vec<&'a SelectionSet>,
		value: Value,
		path: ResponsePath,
	) -> BoxFuture<'a, Value> {
		Box::pin(async move {
			if value.is_null() {
				return Value::Null;
			}

			match ty {
				TypeRef::NonNull(inner) => self.complete_value(inner, selection_sets, value, path).await,
				TypeRef::List(inner) => {
					let Value::Array(items) = value else {
						self.push_error(
							FieldError::new(format!("Expected a list for field of type \"{ty}\".")),
							&path,
							None,
						);
						return Value::Null;
					};
					let completed = items.into_iter().enumerate().map(|(index, item)| {
						self.complete_value(inner, selection_sets.clone(), item, path.index(index))
					});
					Value::Array(join_all(completed).await)
				},
				TypeRef::Named(name) => match self.schema.get_type(name) {
					Some(NamedType::Object(object)) => {
						let mut grouped = GroupedFields::new();
						let mut visited = HashSet::new();
						for selection_set in selection_sets {
							self.collect_fields(object, selection_set, &mut grouped, &mut visited);
						}
						self
							.execute_fields(object, grouped, Arc::new(value), Some(path), false)
							.await
					},
					_ => value,
				},
			}
		})
	}

	fn argument_values(&self, field: &Field) -> Result<Map<String, Value>, FieldError> {
		let mut arguments = Map::new();
		for (name, value) in &field.arguments {
			let value = self.const_value(value.node.clone())?;
			let value = value
				.into_json()
				.map_err(|e| FieldError::new(format!("Invalid value for argument \"{}\": {e}", name.node)))?;
			arguments.insert(name.node.to_string(), value);
		}
		Ok(arguments)
	}

	fn const_value(&self, value: async_graphql_value::Value) -> Result<ConstValue, FieldError> {
		value.into_const_with(|variable| match self.variables.get(variable.as_str()) {
			Some(value) => ConstValue::from_json(value.clone())
				.map_err(|e| FieldError::new(format!("Invalid value for variable \"${variable}\": {e}"))),
			None => Ok(ConstValue::Null),
		})
	}

	/// Evaluate `@skip(if:)` and `@include(if:)`
	fn should_include(&self, directives: &[Positioned<Directive>]) -> bool {
		directives.iter().all(|directive| {
			let condition = directive
				.node
				.arguments
				.iter()
				.find(|(name, _)| name.node.as_str() == "if")
				.and_then(|(_, value)| self.const_value(value.node.clone()).ok());

			match (directive.node.name.node.as_str(), condition) {
				("skip", Some(ConstValue::Boolean(true))) => false,
				("include", Some(ConstValue::Boolean(false))) => false,
				_ => true,
			}
		})
	}

	fn push_error(&self, error: FieldError, path: &ResponsePath, location: Option<Location>) {
		let mut error = GraphQLError::from(&error);
		if error.path.is_none() {
			error.path = Some(path.clone());
		}
		if error.locations.is_empty() {
			error.locations.extend(location);
		}
		self.errors.lock().push(error);
	}
}

fn to_location(pos: Pos) -> Location {
	Location {
		line: pos.line,
		column: pos.column,
	}
}

/// Fields without a resolver read the same-named property of their source
fn default_resolve(source: &Value, field_name: &str) -> FieldValue {
	FieldValue::Value(source.get(field_name).cloned().unwrap_or(Value::Null))
}

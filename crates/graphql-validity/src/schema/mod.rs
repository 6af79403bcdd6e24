// Schema model
//
// A small, mutable GraphQL schema representation whose field resolvers are
// replaceable trait objects. This is the surface the instrumentation engine
// walks and rewrites, and what the executor resolves queries against.

mod path;
mod resolver;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;

pub use path::{PathSegment, ResponsePath};
pub use resolver::{
	resolver_fn, DataValidationResult, FieldValue, FnResolver, ResolveInfo, Resolver, ResolverArgs,
};

use crate::error::FieldError;

/// Scalars every schema knows about
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Reference to a type from a field definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
	Named(String),
	List(Box<TypeRef>),
	NonNull(Box<TypeRef>),
}

impl TypeRef {
	pub fn named(name: impl Into<String>) -> Self {
		TypeRef::Named(name.into())
	}

	pub fn list(inner: TypeRef) -> Self {
		TypeRef::List(Box::new(inner))
	}

	pub fn non_null(inner: TypeRef) -> Self {
		TypeRef::NonNull(Box::new(inner))
	}

	/// Name of the innermost named type (`[Post!]!` -> `Post`)
	pub fn named_type(&self) -> &str {
		match self {
			TypeRef::Named(name) => name,
			TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
		}
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TypeRef::Named(name) => f.write_str(name),
			TypeRef::List(inner) => write!(f, "[{inner}]"),
			TypeRef::NonNull(inner) => write!(f, "{inner}!"),
		}
	}
}

/// A field of an object type
pub struct FieldDefinition {
	name: String,
	ty: TypeRef,
	resolver: Option<Arc<dyn Resolver>>,
	processed: bool,
}

impl FieldDefinition {
	pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
		Self {
			name: name.into(),
			ty,
			resolver: None,
			processed: false,
		}
	}

	pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
		self.resolver = Some(resolver);
		self
	}

	/// Attach an async closure as this field's resolver
	pub fn resolve_with<F, Fut>(self, func: F) -> Self
	where
		F: Fn(ResolverArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<FieldValue, FieldError>> + Send + 'static,
	{
		self.with_resolver(resolver_fn(func))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn ty(&self) -> &TypeRef {
		&self.ty
	}

	pub fn resolver(&self) -> Option<&Arc<dyn Resolver>> {
		self.resolver.as_ref()
	}

	pub fn set_resolver(&mut self, resolver: Arc<dyn Resolver>) {
		self.resolver = Some(resolver);
	}

	/// Whether instrumentation already wrapped this field
	pub fn is_processed(&self) -> bool {
		self.processed
	}

	pub(crate) fn mark_processed(&mut self) {
		self.processed = true;
	}
}

impl fmt::Debug for FieldDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldDefinition")
			.field("name", &self.name)
			.field("ty", &self.ty)
			.field("has_resolver", &self.resolver.is_some())
			.field("processed", &self.processed)
			.finish()
	}
}

#[derive(Debug)]
pub struct ObjectType {
	name: String,
	fields: IndexMap<String, FieldDefinition>,
	processed: bool,
}

impl ObjectType {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			fields: IndexMap::new(),
			processed: false,
		}
	}

	pub fn field(mut self, field: FieldDefinition) -> Self {
		self.fields.insert(field.name.clone(), field);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
		self.fields.get(name)
	}

	pub fn get_field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
		self.fields.get_mut(name)
	}

	pub fn fields(&self) -> &IndexMap<String, FieldDefinition> {
		&self.fields
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
	pub name: String,
	pub values: Vec<String>,
}

/// Any named type of a schema. Only object types carry resolver-bearing fields.
#[derive(Debug)]
pub enum NamedType {
	Object(ObjectType),
	Scalar(ScalarType),
	Enum(EnumType),
}

impl NamedType {
	pub fn scalar(name: impl Into<String>) -> Self {
		NamedType::Scalar(ScalarType { name: name.into() })
	}

	pub fn name(&self) -> &str {
		match self {
			NamedType::Object(object) => &object.name,
			NamedType::Scalar(scalar) => &scalar.name,
			NamedType::Enum(enumeration) => &enumeration.name,
		}
	}

	/// The field collection, for types that expose one
	pub fn fields(&self) -> Option<&IndexMap<String, FieldDefinition>> {
		match self {
			NamedType::Object(object) => Some(&object.fields),
			NamedType::Scalar(_) | NamedType::Enum(_) => None,
		}
	}

	pub fn fields_mut(&mut self) -> Option<&mut IndexMap<String, FieldDefinition>> {
		match self {
			NamedType::Object(object) => Some(&mut object.fields),
			NamedType::Scalar(_) | NamedType::Enum(_) => None,
		}
	}

	pub fn is_processed(&self) -> bool {
		matches!(self, NamedType::Object(object) if object.processed)
	}

	pub(crate) fn mark_processed(&mut self) {
		if let NamedType::Object(object) = self {
			object.processed = true;
		}
	}
}

impl From<ObjectType> for NamedType {
	fn from(object: ObjectType) -> Self {
		NamedType::Object(object)
	}
}

impl From<EnumType> for NamedType {
	fn from(enumeration: EnumType) -> Self {
		NamedType::Enum(enumeration)
	}
}

/// A schema: its type map plus the names of the operation root types
#[derive(Debug)]
pub struct Schema {
	types: IndexMap<String, NamedType>,
	query: String,
	mutation: Option<String>,
}

impl Schema {
	pub fn new(query: ObjectType) -> Self {
		let mut types = IndexMap::new();
		for scalar in BUILTIN_SCALARS {
			types.insert(scalar.to_string(), NamedType::scalar(scalar));
		}
		let query_name = query.name.clone();
		types.insert(query_name.clone(), NamedType::Object(query));

		Self {
			types,
			query: query_name,
			mutation: None,
		}
	}

	pub fn with_mutation(mut self, mutation: ObjectType) -> Self {
		self.mutation = Some(mutation.name.clone());
		self.with_type(mutation)
	}

	/// Register an additional named type
	pub fn with_type(mut self, ty: impl Into<NamedType>) -> Self {
		let ty = ty.into();
		self.types.insert(ty.name().to_string(), ty);
		self
	}

	pub fn type_map(&self) -> &IndexMap<String, NamedType> {
		&self.types
	}

	pub fn type_map_mut(&mut self) -> &mut IndexMap<String, NamedType> {
		&mut self.types
	}

	pub fn get_type(&self, name: &str) -> Option<&NamedType> {
		self.types.get(name)
	}

	pub fn get_type_mut(&mut self, name: &str) -> Option<&mut NamedType> {
		self.types.get_mut(name)
	}

	pub fn get_object(&self, name: &str) -> Option<&ObjectType> {
		match self.types.get(name) {
			Some(NamedType::Object(object)) => Some(object),
			_ => None,
		}
	}

	pub fn query_type(&self) -> Option<&ObjectType> {
		self.get_object(&self.query)
	}

	pub fn mutation_type(&self) -> Option<&ObjectType> {
		self.mutation.as_deref().and_then(|name| self.get_object(name))
	}

	/// Look up a field by `<Type>.<field>`
	pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
		self.get_type(type_name)?.fields()?.get(field_name)
	}
}

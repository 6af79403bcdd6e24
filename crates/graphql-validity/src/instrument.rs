// Resolver instrumentation
//
// Walks a schema, a single object type or a single field and replaces every
// resolver with an `InstrumentedResolver` exactly once. Field and type
// processed markers guard against double wrapping, so overlapping or repeated
// calls are harmless.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::ValidityConfig;
use crate::context::ValidityContext;
use crate::error::FieldError;
use crate::profiling::{FieldTiming, ProfilingSample};
use crate::registry::ValidatorRegistry;
use crate::schema::{FieldDefinition, FieldValue, NamedType, Resolver, ResolverArgs, Schema};
use crate::validate::{collect_validators, run_validators};

/// What `wrap_resolvers` can be pointed at
pub enum Instrumentable<'a> {
	Schema(&'a mut Schema),
	Type(&'a mut NamedType),
	Field(&'a mut FieldDefinition),
}

impl<'a> From<&'a mut Schema> for Instrumentable<'a> {
	fn from(schema: &'a mut Schema) -> Self {
		Instrumentable::Schema(schema)
	}
}

impl<'a> From<&'a mut NamedType> for Instrumentable<'a> {
	fn from(ty: &'a mut NamedType) -> Self {
		Instrumentable::Type(ty)
	}
}

impl<'a> From<&'a mut FieldDefinition> for Instrumentable<'a> {
	fn from(field: &'a mut FieldDefinition) -> Self {
		Instrumentable::Field(field)
	}
}

/// The registry and configuration captured by every wrapped resolver.
#[derive(Debug, Clone)]
pub struct Instrumentation {
	registry: Arc<ValidatorRegistry>,
	config: Arc<ValidityConfig>,
}

impl Instrumentation {
	/// Instrumentation with the default configuration: no wrapping, no profiling
	pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
		Self {
			registry,
			config: Arc::new(ValidityConfig::default()),
		}
	}

	pub fn with_config(mut self, config: ValidityConfig) -> Self {
		self.config = Arc::new(config);
		self
	}

	pub fn registry(&self) -> &Arc<ValidatorRegistry> {
		&self.registry
	}

	pub fn config(&self) -> &Arc<ValidityConfig> {
		&self.config
	}

	pub fn wrap<'a>(&self, entity: impl Into<Instrumentable<'a>>) {
		wrap_resolvers(entity, self);
	}
}

/// Instrument every resolver reachable from `entity`.
pub fn wrap_resolvers<'a>(entity: impl Into<Instrumentable<'a>>, instrumentation: &Instrumentation) {
	match entity.into() {
		Instrumentable::Schema(schema) => wrap_schema(schema, instrumentation),
		Instrumentable::Type(ty) => wrap_type(ty, instrumentation),
		Instrumentable::Field(field) => wrap_field(field, instrumentation),
	}
}

fn wrap_schema(schema: &mut Schema, instrumentation: &Instrumentation) {
	for ty in schema.type_map_mut().values_mut() {
		wrap_type(ty, instrumentation);
	}
}

fn wrap_type(ty: &mut NamedType, instrumentation: &Instrumentation) {
	if ty.is_processed() {
		return;
	}
	let Some(fields) = ty.fields_mut() else {
		return;
	};

	for field in fields.values_mut() {
		wrap_field(field, instrumentation);
	}
	ty.mark_processed();
	debug!(target: "validity", type_name = %ty.name(), "instrumented type");
}

fn wrap_field(field: &mut FieldDefinition, instrumentation: &Instrumentation) {
	if field.is_processed() {
		return;
	}
	let Some(inner) = field.resolver().cloned() else {
		return;
	};

	field.mark_processed();
	field.set_resolver(Arc::new(InstrumentedResolver {
		inner,
		registry: Arc::clone(&instrumentation.registry),
		config: Arc::clone(&instrumentation.config),
	}));
	trace!(target: "validity", field = %field.name(), "instrumented field");
}

/// Runs the field's validators, then the original resolver.
pub struct InstrumentedResolver {
	inner: Arc<dyn Resolver>,
	registry: Arc<ValidatorRegistry>,
	config: Arc<ValidityConfig>,
}

impl InstrumentedResolver {
	/// The resolver this one wraps
	pub fn inner(&self) -> &Arc<dyn Resolver> {
		&self.inner
	}

	async fn resolve_validated(&self, ctx: &ValidityContext, args: ResolverArgs) -> Result<FieldValue, FieldError> {
		let started = Instant::now();

		let validators = collect_validators(&self.registry, ctx, &args.info);
		run_validators(&validators, &args, ctx).await?;
		let validated = Instant::now();

		let info = Arc::clone(&args.info);
		let result = self.inner.resolve(args).await;

		if self.config.enable_profiling() {
			let timing = FieldTiming::from_marks(started, validated, Instant::now());
			ctx.record_sample(ProfilingSample::new(info.path.clone(), info.field_name.clone(), timing));
		}

		match result? {
			FieldValue::Validated(result) => {
				ctx.push_errors(result.errors);
				Ok(FieldValue::Value(result.data))
			},
			value => Ok(value),
		}
	}
}

#[async_trait]
impl Resolver for InstrumentedResolver {
	async fn resolve(&self, args: ResolverArgs) -> Result<FieldValue, FieldError> {
		let result = match args.validity.clone() {
			Some(ctx) => {
				ctx.attach_config(&self.config);
				self.resolve_validated(&ctx, args).await
			},
			None => self.inner.resolve(args).await,
		};

		result.map_err(|error| self.config.wrap_error(error))
	}
}

// GraphQL validity
//
// Field-level validation and profiling for GraphQL servers:
// - Validators registered globally, per type, per field or for every field
// - Idempotent resolver instrumentation that runs them before each resolver
// - Per-request error collection merged into the final response
// - Per-field timing assembled into a profiling tree after the request
// - axum middleware wiring the request/response hooks

pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod finalize;
pub mod http;
pub mod instrument;
pub mod profiling;
pub mod registry;
pub mod schema;
pub mod validate;

pub use config::{
	LogProfilingHandler, ProfilingHandler, ProfilingHandlerCell, ValidityConfig, ValidityOptions,
	DEFAULT_PROFILING_DEBOUNCE,
};
pub use context::ValidityContext;
pub use error::{
	mask_unhandled_error, ErrorWrapper, FieldError, FieldErrorKind, GraphQLError, Location, MaskUnhandled,
	RegistryError,
};
pub use execution::{ExecutionError, Executor, Request, Response};
pub use finalize::{finalize, FinalizeError, Finalized};
pub use self::http::{on_request_start, on_response_ready, validity_context, validity_middleware};
pub use instrument::{wrap_resolvers, Instrumentable, Instrumentation, InstrumentedResolver};
pub use profiling::{dispatch_profiling, FieldProfile, FieldTiming, ProfileNode, ProfilingReport, ProfilingSample};
pub use registry::{ScopeKey, Validator, ValidatorOutput, ValidatorRegistry};
pub use schema::{
	DataValidationResult, FieldDefinition, FieldValue, NamedType, ObjectType, ResolveInfo, Resolver, ResolverArgs,
	ResponsePath, Schema, TypeRef,
};

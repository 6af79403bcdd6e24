// Validator execution: lookup, fan-out and fan-in into the validity context

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::context::ValidityContext;
use crate::error::FieldError;
use crate::registry::{Validator, ValidatorOutput, ValidatorRegistry};
use crate::schema::{ResolveInfo, ResolverArgs};

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;

/// Validators due for one field resolution.
///
/// Global validators are included only for the first field of the request
/// that gets here, and come first.
pub fn collect_validators(
	registry: &ValidatorRegistry,
	ctx: &ValidityContext,
	info: &ResolveInfo,
) -> Vec<Arc<dyn Validator>> {
	let mut validators = if ctx.claim_global_validators() {
		registry.globals()
	} else {
		Vec::new()
	};

	validators.extend(registry.validators_for(
		&info.parent_type,
		&info.field_name,
		info.return_type.named_type(),
	));
	validators
}

/// Run validators against the resolver arguments, appending their errors to `ctx`.
///
/// Ready results are appended as soon as each validator returns. Deferred
/// results are awaited together and appended in validator order. If any
/// validator failed, the earliest failure in validator order is returned once
/// every deferred validator has settled.
pub async fn run_validators(
	validators: &[Arc<dyn Validator>],
	args: &ResolverArgs,
	ctx: &ValidityContext,
) -> Result<(), FieldError> {
	if validators.is_empty() {
		return Ok(());
	}

	debug!(
		target: "validity",
		field = %args.info.path,
		parent_type = %args.info.parent_type,
		validators = validators.len(),
		"running validators"
	);

	let mut failure = FirstFailure::default();
	let mut pending = Vec::new();

	for (index, validator) in validators.iter().enumerate() {
		match validator.validate(args) {
			ValidatorOutput::Ready(errors) => ctx.push_errors(errors),
			ValidatorOutput::Pending(future) => pending.push((index, future)),
			ValidatorOutput::Failed(error) => failure.record(index, error),
		}
	}

	if !pending.is_empty() {
		let (indices, futures): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
		let results = join_all(futures).await;

		for (index, result) in indices.into_iter().zip(results) {
			match result {
				Ok(errors) => ctx.push_errors(errors),
				Err(error) => failure.record(index, error),
			}
		}
	}

	match failure.0 {
		Some((_, error)) => {
			debug!(target: "validity", field = %args.info.path, error = %error, "validator failed");
			Err(error)
		},
		None => Ok(()),
	}
}

#[derive(Default)]
struct FirstFailure(Option<(usize, FieldError)>);

impl FirstFailure {
	fn record(&mut self, index: usize, error: FieldError) {
		match &self.0 {
			Some((first, _)) if *first < index => {},
			_ => self.0 = Some((index, error)),
		}
	}
}

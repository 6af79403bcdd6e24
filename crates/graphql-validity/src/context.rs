// Per-request validity context
//
// One instance per in-flight request. Sibling fields may resolve concurrently
// on different worker threads, so every collection sits behind its own lock
// and each append is a single critical section with no await inside.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::ValidityConfig;
use crate::error::FieldError;
use crate::profiling::ProfilingSample;

/// Accumulated validation errors and profiling samples for one request.
pub struct ValidityContext {
	request_id: Uuid,
	errors: Mutex<Vec<FieldError>>,
	globals_ran: AtomicBool,
	samples: Mutex<Vec<ProfilingSample>>,
	/// Config of the first instrumented resolver that saw this request
	config: ArcSwapOption<ValidityConfig>,
	finalized: AtomicBool,
}

impl Default for ValidityContext {
	fn default() -> Self {
		Self::new()
	}
}

impl ValidityContext {
	pub fn new() -> Self {
		Self::with_request_id(Uuid::new_v4())
	}

	pub fn with_request_id(request_id: Uuid) -> Self {
		Self {
			request_id,
			errors: Mutex::new(Vec::new()),
			globals_ran: AtomicBool::new(false),
			samples: Mutex::new(Vec::new()),
			config: ArcSwapOption::empty(),
			finalized: AtomicBool::new(false),
		}
	}

	/// Correlation id handed to the profiling handler
	pub fn request_id(&self) -> Uuid {
		self.request_id
	}

	pub fn push_error(&self, error: FieldError) {
		self.errors.lock().push(error);
	}

	/// Append in order, under one lock acquisition
	pub fn push_errors(&self, errors: impl IntoIterator<Item = FieldError>) {
		self.errors.lock().extend(errors);
	}

	/// Snapshot of the accumulated errors
	pub fn errors(&self) -> Vec<FieldError> {
		self.errors.lock().clone()
	}

	pub fn error_count(&self) -> usize {
		self.errors.lock().len()
	}

	pub fn take_errors(&self) -> Vec<FieldError> {
		std::mem::take(&mut *self.errors.lock())
	}

	/// Returns true exactly once per request: for the caller that gets to run
	/// the global validators.
	pub fn claim_global_validators(&self) -> bool {
		!self.globals_ran.swap(true, Ordering::AcqRel)
	}

	pub fn globals_ran(&self) -> bool {
		self.globals_ran.load(Ordering::Acquire)
	}

	pub fn record_sample(&self, sample: ProfilingSample) {
		self.samples.lock().push(sample);
	}

	pub fn samples(&self) -> Vec<ProfilingSample> {
		self.samples.lock().clone()
	}

	pub fn take_samples(&self) -> Vec<ProfilingSample> {
		std::mem::take(&mut *self.samples.lock())
	}

	/// Remember the active config for finalize time. First writer wins;
	/// returns whether this call attached it.
	pub fn attach_config(&self, config: &Arc<ValidityConfig>) -> bool {
		let previous = self
			.config
			.compare_and_swap(&None::<Arc<ValidityConfig>>, Some(Arc::clone(config)));
		previous.is_none()
	}

	pub fn config(&self) -> Option<Arc<ValidityConfig>> {
		self.config.load_full()
	}

	/// Flip the one-shot finalize flag; false if finalization already happened.
	pub(crate) fn begin_finalize(&self) -> bool {
		!self.finalized.swap(true, Ordering::AcqRel)
	}

	pub fn is_finalized(&self) -> bool {
		self.finalized.load(Ordering::Acquire)
	}
}

impl fmt::Debug for ValidityContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValidityContext")
			.field("request_id", &self.request_id)
			.field("errors", &self.error_count())
			.field("globals_ran", &self.globals_ran())
			.field("samples", &self.samples.lock().len())
			.field("finalized", &self.is_finalized())
			.finish()
	}
}

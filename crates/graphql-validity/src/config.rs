// Validity configuration
//
// Supplied once when a schema is instrumented and captured by every wrapped
// resolver. Only the profiling handler may change afterwards, through the
// shared `ProfilingHandlerCell`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{default_error_wrapper, ErrorWrapper, FieldError};
use crate::profiling::ProfilingReport;

/// Delay between finalizing a response and handing its profile to the handler
pub const DEFAULT_PROFILING_DEBOUNCE: Duration = Duration::from_millis(10);

/// Serializable switches of the validity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidityOptions {
	/// Pass unhandled errors through the configured error wrapper
	#[serde(default)]
	pub wrap_errors: bool,
	/// Record per-field timings and report them after the response
	#[serde(default)]
	pub enable_profiling: bool,
	#[serde(default = "default_profiling_debounce_ms")]
	pub profiling_debounce_ms: u64,
}

fn default_profiling_debounce_ms() -> u64 {
	DEFAULT_PROFILING_DEBOUNCE.as_millis() as u64
}

impl Default for ValidityOptions {
	fn default() -> Self {
		Self {
			wrap_errors: false,
			enable_profiling: false,
			profiling_debounce_ms: default_profiling_debounce_ms(),
		}
	}
}

/// Receives the profile of a finished request.
pub trait ProfilingHandler: Send + Sync {
	fn handle(&self, report: ProfilingReport, request_id: Uuid);
}

impl<F> ProfilingHandler for F
where
	F: Fn(ProfilingReport, Uuid) + Send + Sync,
{
	fn handle(&self, report: ProfilingReport, request_id: Uuid) {
		self(report, request_id)
	}
}

/// Default handler: logs the profile tree as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProfilingHandler;

impl ProfilingHandler for LogProfilingHandler {
	fn handle(&self, report: ProfilingReport, request_id: Uuid) {
		match serde_json::to_string(&report) {
			Ok(profile) => info!(target: "validity::profiling", %request_id, %profile, "request profile"),
			Err(e) => info!(target: "validity::profiling", %request_id, error = %e, "unserializable request profile"),
		}
	}
}

/// Shared, swappable slot holding the active profiling handler.
///
/// Clones share the slot, so a handler set after instrumentation is seen by
/// every resolver wrapped with a config holding this cell.
#[derive(Clone)]
pub struct ProfilingHandlerCell {
	current: Arc<ArcSwap<Box<dyn ProfilingHandler>>>,
}

impl Default for ProfilingHandlerCell {
	fn default() -> Self {
		Self::new(LogProfilingHandler)
	}
}

impl ProfilingHandlerCell {
	pub fn new(handler: impl ProfilingHandler + 'static) -> Self {
		let handler: Box<dyn ProfilingHandler> = Box::new(handler);
		Self {
			current: Arc::new(ArcSwap::from_pointee(handler)),
		}
	}

	/// Replace the handler for every holder of this cell
	pub fn set(&self, handler: impl ProfilingHandler + 'static) {
		let handler: Box<dyn ProfilingHandler> = Box::new(handler);
		self.current.store(Arc::new(handler));
	}

	pub fn current(&self) -> Arc<Box<dyn ProfilingHandler>> {
		self.current.load_full()
	}
}

impl fmt::Debug for ProfilingHandlerCell {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProfilingHandlerCell").finish_non_exhaustive()
	}
}

/// Options plus the pluggable error wrapper and profiling handler.
#[derive(Clone)]
pub struct ValidityConfig {
	options: ValidityOptions,
	error_wrapper: Arc<dyn ErrorWrapper>,
	profiling_handler: ProfilingHandlerCell,
}

impl Default for ValidityConfig {
	fn default() -> Self {
		Self::new(ValidityOptions::default())
	}
}

impl ValidityConfig {
	pub fn new(options: ValidityOptions) -> Self {
		Self {
			options,
			error_wrapper: default_error_wrapper(),
			profiling_handler: ProfilingHandlerCell::default(),
		}
	}

	pub fn with_error_wrapper(mut self, wrapper: impl ErrorWrapper + 'static) -> Self {
		self.error_wrapper = Arc::new(wrapper);
		self
	}

	/// Use a fresh cell holding `handler`
	pub fn with_profiling_handler(mut self, handler: impl ProfilingHandler + 'static) -> Self {
		self.profiling_handler = ProfilingHandlerCell::new(handler);
		self
	}

	/// Use a cell shared with other configs, or kept by the caller for later swaps
	pub fn with_profiling_handler_cell(mut self, cell: ProfilingHandlerCell) -> Self {
		self.profiling_handler = cell;
		self
	}

	pub fn options(&self) -> &ValidityOptions {
		&self.options
	}

	pub fn wrap_errors(&self) -> bool {
		self.options.wrap_errors
	}

	pub fn enable_profiling(&self) -> bool {
		self.options.enable_profiling
	}

	pub fn profiling_debounce(&self) -> Duration {
		Duration::from_millis(self.options.profiling_debounce_ms)
	}

	/// Apply the error wrapper if wrapping is on. Validity errors are never wrapped.
	pub fn wrap_error(&self, error: FieldError) -> FieldError {
		if !self.options.wrap_errors || error.is_validity() {
			return error;
		}
		self.error_wrapper.wrap(error)
	}

	pub fn profiling_handler(&self) -> &ProfilingHandlerCell {
		&self.profiling_handler
	}
}

impl fmt::Debug for ValidityConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValidityConfig")
			.field("options", &self.options)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[test]
	fn test_options_defaults() {
		let options: ValidityOptions = serde_json::from_str("{}").unwrap();

		assert_eq!(options, ValidityOptions::default());
		assert!(!options.wrap_errors);
		assert!(!options.enable_profiling);
		assert_eq!(options.profiling_debounce_ms, 10);
	}

	#[test]
	fn test_options_camel_case() {
		let options: ValidityOptions =
			serde_json::from_str(r#"{"wrapErrors": true, "enableProfiling": true, "profilingDebounceMs": 50}"#).unwrap();

		assert!(options.wrap_errors);
		assert!(options.enable_profiling);
		assert_eq!(ValidityConfig::new(options).profiling_debounce(), Duration::from_millis(50));
	}

	#[test]
	fn test_options_reject_unknown_fields() {
		let result = serde_json::from_str::<ValidityOptions>(r#"{"wrap_errors": true}"#);
		assert!(result.is_err());
	}

	#[test]
	fn test_wrap_error_respects_flag() {
		let config = ValidityConfig::default().with_error_wrapper(|_: FieldError| FieldError::new("test"));
		assert_eq!(config.wrap_error(FieldError::new("original")).message(), "original");

		let config = ValidityConfig::new(ValidityOptions {
			wrap_errors: true,
			..Default::default()
		})
		.with_error_wrapper(|_: FieldError| FieldError::new("test"));
		assert_eq!(config.wrap_error(FieldError::new("original")).message(), "test");
		assert_eq!(config.wrap_error(FieldError::validity("user facing")).message(), "user facing");
	}

	#[test]
	fn test_handler_cell_swap_is_shared() {
		let calls = Arc::new(AtomicUsize::new(0));
		let cell = ProfilingHandlerCell::default();
		let config = ValidityConfig::default().with_profiling_handler_cell(cell.clone());

		let counter = Arc::clone(&calls);
		cell.set(move |_: ProfilingReport, _: Uuid| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		config
			.profiling_handler()
			.current()
			.handle(ProfilingReport::from_samples(Vec::new()), Uuid::new_v4());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}

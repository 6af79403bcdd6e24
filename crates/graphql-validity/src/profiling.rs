// Per-field timing samples and the path-folded request profile
//
// Samples are recorded by instrumented resolvers while the request runs and
// handed to the profiling handler from a detached task once the response has
// been finalized. Nothing here may fail the request.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::ValidityConfig;
use crate::context::ValidityContext;
use crate::schema::{PathSegment, ResponsePath};

/// Millisecond timings of one field resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTiming {
	/// Time spent running validators
	pub validation: u64,
	/// Time spent in the resolver itself
	pub execution: u64,
	/// Reserved, always zero
	pub fields_execution: u64,
	/// `validation + execution`
	pub total_execution: u64,
}

impl FieldTiming {
	/// Timings from the instants taken before validation, after validation,
	/// and once the resolver settled.
	pub fn from_marks(started: Instant, validated: Instant, completed: Instant) -> Self {
		let validation = validated.saturating_duration_since(started).as_millis() as u64;
		let execution = completed.saturating_duration_since(validated).as_millis() as u64;
		Self {
			validation,
			execution,
			fields_execution: 0,
			total_execution: validation + execution,
		}
	}
}

/// Profile of a single field, as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProfile {
	pub name: String,
	#[serde(flatten)]
	pub timing: FieldTiming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilingSample {
	pub path: ResponsePath,
	#[serde(flatten)]
	pub profile: FieldProfile,
}

impl ProfilingSample {
	pub fn new(path: ResponsePath, name: impl Into<String>, timing: FieldTiming) -> Self {
		Self {
			path,
			profile: FieldProfile {
				name: name.into(),
				timing,
			},
		}
	}
}

/// A node of the profile tree: the field's own profile, if it was sampled,
/// next to its children keyed by response key or list index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileNode {
	#[serde(rename = "__profile", skip_serializing_if = "Option::is_none")]
	pub profile: Option<FieldProfile>,
	#[serde(flatten)]
	pub children: IndexMap<String, ProfileNode>,
}

impl ProfileNode {
	pub fn child(&self, key: &str) -> Option<&ProfileNode> {
		self.children.get(key)
	}
}

/// The profile of one request, folded into a tree along each sample's path.
///
/// Serializes as the tree.
#[derive(Debug, Clone, Default)]
pub struct ProfilingReport {
	samples: Vec<ProfilingSample>,
	tree: ProfileNode,
}

impl ProfilingReport {
	pub fn from_samples(samples: Vec<ProfilingSample>) -> Self {
		let mut tree = ProfileNode::default();
		for sample in &samples {
			let mut node = &mut tree;
			for segment in sample.path.segments() {
				let key = match segment {
					PathSegment::Field(key) => key,
					PathSegment::Index(index) => index.to_string(),
				};
				node = node.children.entry(key).or_default();
			}
			node.profile = Some(sample.profile.clone());
		}

		Self { samples, tree }
	}

	/// Samples in recording order
	pub fn samples(&self) -> &[ProfilingSample] {
		&self.samples
	}

	pub fn tree(&self) -> &ProfileNode {
		&self.tree
	}

	/// Node at a dotted response path, e.g. `hello.first`
	pub fn get(&self, path: &str) -> Option<&ProfileNode> {
		path.split('.').try_fold(&self.tree, |node, key| node.child(key))
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}
}

impl Serialize for ProfilingReport {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.tree.serialize(serializer)
	}
}

/// Hand the request's samples to the profiling handler after the debounce delay.
///
/// Returns the spawned task, or `None` when profiling is off, nothing was
/// sampled, or no tokio runtime is available. Handler panics are caught and
/// logged.
pub fn dispatch_profiling(ctx: &ValidityContext, config: &ValidityConfig) -> Option<JoinHandle<()>> {
	if !config.enable_profiling() {
		return None;
	}

	let samples = ctx.take_samples();
	if samples.is_empty() {
		return None;
	}

	let Ok(runtime) = Handle::try_current() else {
		warn!(target: "validity::profiling", "no async runtime available, dropping request profile");
		return None;
	};

	let cell = config.profiling_handler().clone();
	let debounce = config.profiling_debounce();
	let request_id = ctx.request_id();
	debug!(target: "validity::profiling", %request_id, samples = samples.len(), "scheduling profile report");

	Some(runtime.spawn(async move {
		tokio::time::sleep(debounce).await;

		let handler = cell.current();
		let report = ProfilingReport::from_samples(samples);
		let outcome = AssertUnwindSafe(async move { handler.handle(report, request_id) })
			.catch_unwind()
			.await;

		if outcome.is_err() {
			error!(target: "validity::profiling", %request_id, "profiling handler panicked");
		}
	}))
}

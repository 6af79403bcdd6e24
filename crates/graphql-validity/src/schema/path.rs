// Response paths: the chain of selection keys from the operation root to a field

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// A single step in a [`ResponsePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
	/// A response key (the field alias, or its name when unaliased)
	Field(String),
	/// A position inside a list value
	Index(usize),
}

impl fmt::Display for PathSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PathSegment::Field(key) => f.write_str(key),
			PathSegment::Index(index) => write!(f, "{index}"),
		}
	}
}

impl Serialize for PathSegment {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			PathSegment::Field(key) => serializer.serialize_str(key),
			PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
		}
	}
}

struct PathNode {
	prev: Option<ResponsePath>,
	segment: PathSegment,
}

/// Reverse-linked path from a field occurrence up to the query root.
///
/// Extending a path is O(1) and shares the parent chain, so every field
/// resolution can carry its own path without copying.
#[derive(Clone)]
pub struct ResponsePath {
	node: Arc<PathNode>,
}

impl ResponsePath {
	/// Path of a root field
	pub fn root(key: impl Into<String>) -> Self {
		Self {
			node: Arc::new(PathNode {
				prev: None,
				segment: PathSegment::Field(key.into()),
			}),
		}
	}

	/// Path of a child field selected under this path
	pub fn field(&self, key: impl Into<String>) -> Self {
		self.push(PathSegment::Field(key.into()))
	}

	/// Path of a list item under this path
	pub fn index(&self, index: usize) -> Self {
		self.push(PathSegment::Index(index))
	}

	fn push(&self, segment: PathSegment) -> Self {
		Self {
			node: Arc::new(PathNode {
				prev: Some(self.clone()),
				segment,
			}),
		}
	}

	/// The last segment of this path
	pub fn segment(&self) -> &PathSegment {
		&self.node.segment
	}

	pub fn parent(&self) -> Option<&ResponsePath> {
		self.node.prev.as_ref()
	}

	/// Number of segments from the root
	pub fn depth(&self) -> usize {
		let mut depth = 1;
		let mut current = self.parent();
		while let Some(path) = current {
			depth += 1;
			current = path.parent();
		}
		depth
	}

	/// Segments ordered from the root down to this path's own segment
	pub fn segments(&self) -> Vec<PathSegment> {
		let mut segments = Vec::with_capacity(self.depth());
		let mut current = Some(self);
		while let Some(path) = current {
			segments.push(path.segment().clone());
			current = path.parent();
		}
		segments.reverse();
		segments
	}
}

impl PartialEq for ResponsePath {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.node, &other.node) || self.segments() == other.segments()
	}
}

impl Eq for ResponsePath {}

impl fmt::Debug for ResponsePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.segments()).finish()
	}
}

impl fmt::Display for ResponsePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, segment) in self.segments().iter().enumerate() {
			if i > 0 {
				f.write_str(".")?;
			}
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}

impl Serialize for ResponsePath {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let segments = self.segments();
		let mut seq = serializer.serialize_seq(Some(segments.len()))?;
		for segment in &segments {
			seq.serialize_element(segment)?;
		}
		seq.end()
	}
}

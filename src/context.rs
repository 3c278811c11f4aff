//! Conversion context
//!
//! Tracks the CRUD status of every destination object touched by one
//! top-level hydration call, together with the fields that failed and were
//! skipped. A context is created per call and passed down explicitly.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::MappingError;
use crate::types::CrudStatus;

// ============================================================================
// Paths and Identity
// ============================================================================

/// One step from a parent destination to a nested one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathSegment {
    pub index: u32,
    /// Element position for multi relations
    pub position: Option<usize>,
}

/// Location of a destination object relative to the top-level destination
///
/// Rendered as `$` for the root, `$.2` for the object at index 2, and
/// `$.2[1]` for the second element of the relation at index 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of a single nested object at `index`
    pub fn child(&self, index: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment {
            index,
            position: None,
        });
        Self(segments)
    }

    /// Path of element `position` of the relation at `index`
    pub fn element(&self, index: u32, position: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment {
            index,
            position: Some(position),
        });
        Self(segments)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, ".{}", segment.index)?;
            if let Some(position) = segment.position {
                write!(f, "[{}]", position)?;
            }
        }
        Ok(())
    }
}

/// Identity of a destination object within one conversion
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectIdentity {
    pub type_name: &'static str,
    pub path: FieldPath,
}

impl ObjectIdentity {
    pub fn new(type_name: &'static str, path: FieldPath) -> Self {
        Self { type_name, path }
    }

    /// Identity of a top-level destination of type `T`
    pub fn root_of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>(), FieldPath::root())
    }

    /// Identity of a destination of type `T` at `path`
    pub fn of<T: ?Sized>(path: FieldPath) -> Self {
        Self::new(std::any::type_name::<T>(), path)
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.type_name, self.path)
    }
}

// ============================================================================
// Failures
// ============================================================================

/// A field that failed to convert and was skipped
#[derive(Debug)]
pub struct FieldFailure {
    /// Destination that owns the field
    pub owner: ObjectIdentity,
    pub field: &'static str,
    pub index: u32,
    pub error: MappingError,
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} (index {}): {}",
            self.owner, self.field, self.index, self.error
        )
    }
}

// ============================================================================
// Conversion Context
// ============================================================================

/// Per-call lifecycle tracker keyed by destination identity
#[derive(Debug, Default)]
pub struct ConversionContext {
    statuses: BTreeMap<ObjectIdentity, CrudStatus>,
    failures: Vec<FieldFailure>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status of a destination; a later record for the same identity wins
    pub fn set_status(&mut self, identity: ObjectIdentity, status: CrudStatus) {
        self.statuses.insert(identity, status);
    }

    pub fn status(&self, identity: &ObjectIdentity) -> Option<CrudStatus> {
        self.statuses.get(identity).copied()
    }

    /// Status of whichever destination sits at `path`
    pub fn status_at(&self, path: &FieldPath) -> Option<CrudStatus> {
        self.statuses
            .iter()
            .find(|(identity, _)| &identity.path == path)
            .map(|(_, status)| *status)
    }

    /// All tracked statuses, ordered by type name then path
    pub fn statuses(&self) -> impl Iterator<Item = (&ObjectIdentity, CrudStatus)> {
        self.statuses
            .iter()
            .map(|(identity, status)| (identity, *status))
    }

    /// Identities tracked with the given status
    pub fn with_status(&self, status: CrudStatus) -> Vec<&ObjectIdentity> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(identity, _)| identity)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn record_failure(&mut self, failure: FieldFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

//! Core types for the attrflow evaluator.
//!
//! This module defines the fundamental types used throughout the crate for
//! identifying attributes and carrying their values. These are the domain
//! concepts that define what a dependency graph *is*; execution types live in
//! [`crate::processor`].
//!
//! # Key Types
//!
//! - [`AttrId`]: the opaque name of one attribute in the graph
//! - [`Value`]: the heterogeneous attribute value, compared structurally
//! - [`AttrMap`]: a snapshot, input overlay, or dependency view
//! - [`DirtySet`]: the attributes replaced during one evaluation pass
//!
//! # Examples
//!
//! ```rust
//! use attrflow::types::{AttrId, AttrMap};
//! use serde_json::json;
//!
//! let id: AttrId = "price".into();
//! assert_eq!(id.as_str(), "price");
//!
//! let mut snapshot = AttrMap::default();
//! snapshot.insert(id, json!(42.5));
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The heterogeneous value held by one attribute.
///
/// `serde_json::Value` gives the evaluator deep structural equality for free:
/// two values compare equal iff their entire trees match. Compute
/// implementations are the only place concrete types matter; they carry the
/// burden of extracting what they need from a `Value`.
pub type Value = serde_json::Value;

/// A full mapping of attribute id to value: a snapshot, an input overlay, or
/// the dependency view handed to a compute.
pub type AttrMap = FxHashMap<AttrId, Value>;

/// The set of attributes whose value was replaced during one pass.
pub type DirtySet = FxHashSet<AttrId>;

/// Identifies one attribute in a dependency graph.
///
/// `AttrId` is an opaque, non-empty name. Emptiness is rejected at
/// registration time (see
/// [`GraphBuilder::register`](crate::graphs::GraphBuilder::register)), so the
/// constructor stays infallible and string literals convert freely.
///
/// # Examples
///
/// ```rust
/// use attrflow::types::AttrId;
///
/// let a = AttrId::new("total");
/// let b: AttrId = "total".into();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "total");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrId(String);

impl AttrId {
    /// Create an attribute id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a borrowed string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the id is the empty string.
    ///
    /// Empty ids are never present in a compiled graph; this exists so the
    /// builder can reject them with a proper error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Developer experience: allow string literals wherever an AttrId is expected.
impl From<&str> for AttrId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AttrId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&AttrId> for AttrId {
    fn from(id: &AttrId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for AttrId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! BuildId - build identity
//!
//! The host decides what a build identity looks like (`"folder/job#42"`, a
//! database key, ...). This crate only needs it to be hashable and stable, so
//! `BuildId` is an opaque string newtype.
//!
//! Hosts without an identity scheme of their own can mint ULID-based ids with
//! [`BuildId::generate`]: they sort by creation time and need no coordination
//! between nodes.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Prefix used by [`BuildId::generate`].
const GENERATED_PREFIX: &str = "build-";

/// Opaque handle identifying one build-execution record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Mint a fresh, time-sortable id (`build-<ulid>`).
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{GENERATED_PREFIX}{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BuildId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BuildId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

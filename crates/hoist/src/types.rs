//! Shared type definitions for the hoist crate
//!
//! Types used across the analyzer, the graph and the compiler live here to
//! avoid circular module dependencies.

use std::{fmt, hash::BuildHasherDefault, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Type alias for FxHasher-based IndexSet
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Canonical identifier of a module, usually its resolved absolute path
///
/// Two specifiers that resolve to the same file always produce equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether an exported binding can be reassigned after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Mutable,
    Immutable,
    /// Proxy exports defer to the origin module
    Unknown,
}

impl Mutability {
    pub fn from_bool(mutable: bool) -> Self {
        if mutable {
            Self::Mutable
        } else {
            Self::Immutable
        }
    }

    /// Only bindings known to be immutable lose their setter
    pub fn is_mutable(self) -> bool {
        !matches!(self, Self::Immutable)
    }
}

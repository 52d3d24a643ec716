//! Whole-program analysis components
//!
//! Results computed once over the finished module graph and consulted by
//! the compiler: the registry of taken top-level names and the circular
//! dependency report.

pub mod circular_deps;
pub mod symbol_conflict_detector;

pub use circular_deps::{CircularDependencyAnalysis, CircularDependencyGroup, CycleKind};
pub use symbol_conflict_detector::{NameOwner, SymbolConflictDetector, UsedNames};

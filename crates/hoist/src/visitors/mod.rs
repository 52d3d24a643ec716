//! AST visitor implementations for hoist
//!
//! This module contains the read-only walks that turn a module's syntax tree
//! into structured export and import records.

mod export_collector;
mod import_discovery;
pub mod utils;

pub use export_collector::{ExportCollector, ExportRecord, ExportShape, commonjs_export_name};
pub use import_discovery::{ImportDiscoveryVisitor, ImportRecord, ImportShape, require_specifier};

//! Scope-hoisting compiler
//!
//! Rewrites every module of a [`ModuleGraph`](crate::module_graph::ModuleGraph)
//! into a fragment of one shared top-level scope. Modules are compiled in
//! dependency order so that every binding a module imports has already been
//! minted when the importer is rewritten.
//!
//! Per module the planning phases are: import rewrite, export rewrite,
//! namespace synthesis and deconfliction of the remaining top-level names.
//! The plan is then applied to a fresh parse of the module: module syntax is
//! stripped, symbols are renamed through the semantic model, and the tree is
//! printed with `oxc_codegen`.

mod cleanup;
mod compiler;
mod deconflict;
mod export_rewriter;
mod import_rewriter;
mod namespace_manager;
mod rewrite;


pub use compiler::{BundleCompiler, compile};

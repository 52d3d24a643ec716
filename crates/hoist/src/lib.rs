//! hoist: a scope-hoisting JavaScript bundler core
//!
//! Modules are analyzed into export and import records, linked into a
//! [`ModuleGraph`](module_graph::ModuleGraph), and compiled leaves first into
//! one flat program where every export is a uniquely named top-level variable.

pub mod analysis;
pub mod ast_builder;
pub mod bundle_compiler;
pub mod config;
pub mod error;
pub mod graph_builder;
pub mod module;
pub mod module_graph;
pub mod module_registry;
pub mod parser;
pub mod resolver;
pub mod transformation_context;
pub mod types;
pub mod visitors;

use anyhow::Result;
use log::info;

pub use crate::{
    bundle_compiler::{BundleCompiler, compile},
    config::Config,
    error::HoistError,
    graph_builder::build_graph,
    module::Module,
    module_graph::ModuleGraph,
    module_registry::{MemoryResolver, ModuleRegistry, Resolve},
    resolver::FsResolver,
    types::ModuleId,
};

/// Bundle `entries` into a single program
///
/// All entries share one graph and one compiler, so a module reachable from
/// several entries is emitted once.
pub fn bundle<R: Resolve>(entries: &[&str], resolver: R, config: &Config) -> Result<String> {
    let mut registry = ModuleRegistry::new(resolver);
    let graph = build_graph(entries, &mut registry)?;

    let mut output = String::new();
    let mut modules = 0usize;
    let mut compiler = BundleCompiler::new(&registry, &graph, config);
    for root in graph.roots() {
        compiler.compile_entry(&root, &mut |text: String| {
            modules += 1;
            output.push_str(&text);
        })?;
    }
    info!("Bundled {modules} modules from {} entries", entries.len());
    Ok(output)
}

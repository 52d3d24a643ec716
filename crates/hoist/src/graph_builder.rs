//! Graph builder that creates a [`ModuleGraph`] from entry specifiers
//!
//! Walks the import graph depth-first from every entry, loading modules
//! through the [`ModuleRegistry`]. A module is marked visited before its
//! dependencies are entered, so cycles terminate. After the walk, proxy
//! exports are resolved to a fixpoint, imports into modules that were still
//! being visited are validated, namespace requirements are marked and the
//! registry of taken top-level names is attached to the graph.

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;

use crate::{
    analysis::{CircularDependencyAnalysis, SymbolConflictDetector},
    error::HoistError,
    module_graph::{ExportOrigin, ModuleGraph},
    module_registry::{ModuleRegistry, Resolve},
    types::{FxIndexMap, ModuleId},
    visitors::{ExportRecord, ExportShape, ImportRecord, ImportShape},
};

/// Build the dependency graph of `roots`
pub fn build_graph<R: Resolve>(
    roots: &[&str],
    registry: &mut ModuleRegistry<R>,
) -> Result<ModuleGraph> {
    let mut builder = GraphBuilder::new(registry);
    for root in roots {
        builder.add_root(root)?;
    }
    builder.finish()
}

/// Import names checked once the target's export surface is complete
#[derive(Debug)]
struct PendingCheck {
    importer: ModuleId,
    target: ModuleId,
    names: Vec<String>,
}

/// Builds a ModuleGraph by walking the imports of every entry module
#[derive(Debug)]
pub struct GraphBuilder<'a, R> {
    registry: &'a mut ModuleRegistry<R>,
    graph: ModuleGraph,
    visited: FxHashSet<ModuleId>,
    in_progress: FxHashSet<ModuleId>,
    deferred: Vec<PendingCheck>,
    /// `(re-exporting module, source module)` of every `export *`
    star_exports: Vec<(ModuleId, ModuleId)>,
    conflicts: SymbolConflictDetector,
}

impl<'a, R: Resolve> GraphBuilder<'a, R> {
    pub fn new(registry: &'a mut ModuleRegistry<R>) -> Self {
        Self {
            registry,
            graph: ModuleGraph::new(),
            visited: FxHashSet::default(),
            in_progress: FxHashSet::default(),
            deferred: Vec::new(),
            star_exports: Vec::new(),
            conflicts: SymbolConflictDetector::new(),
        }
    }

    /// Resolve an entry specifier and walk everything it imports
    pub fn add_root(&mut self, specifier: &str) -> Result<ModuleId> {
        let id = self.registry.resolve(None, specifier)?;
        self.graph.edge_mut(None, &id);
        debug!("Entry module {id}");
        self.visit(&id)?;
        Ok(id)
    }

    fn visit(&mut self, id: &ModuleId) -> Result<()> {
        if !self.visited.insert(id.clone()) {
            return Ok(());
        }
        self.in_progress.insert(id.clone());
        self.graph.add_module(id);
        debug!("Visiting module {id}");

        let imports = self.registry.module(id)?.imports().to_vec();
        for (source, records) in group_by_source(imports) {
            let target = self
                .registry
                .resolve(Some(id), &source)
                .with_context(|| format!("Failed to resolve imports of {id}"))?;
            self.add_edge(id, &source, &target, &records);

            self.visit(&target)?;

            let names = checked_names(&records);
            if names.is_empty() {
                continue;
            }
            if self.in_progress.contains(&target) {
                trace!("Deferring validation of {id} -> {target}: target still in progress");
                self.deferred.push(PendingCheck {
                    importer: id.clone(),
                    target,
                    names,
                });
            } else {
                self.validate(id, &target, &names)?;
            }
        }

        let exports = self.registry.module(id)?.exports().to_vec();
        self.record_exports(id, &exports)?;
        self.conflicts.add_module(self.registry.module(id)?);

        self.in_progress.remove(id);
        self.graph.push_completed(id.clone());
        Ok(())
    }

    fn add_edge(&mut self, id: &ModuleId, source: &str, target: &ModuleId, records: &[ImportRecord]) {
        self.graph
            .add_module(id)
            .specifiers
            .insert(source.to_owned(), target.clone());

        let edge = self.graph.edge_mut(Some(id), target);
        for record in records {
            let Some(name) = record.imported_name.as_deref() else {
                continue;
            };
            edge.add_name(name);
            if name == "*" && record.shape != ImportShape::ReExportAll {
                edge.namespace = true;
            }
            if name == "default" {
                edge.default_import = true;
            }
        }
        debug!("Edge {id} -> {target} [{}]", edge.imported_names.join(", "));
    }

    fn validate(&self, importer: &ModuleId, target: &ModuleId, names: &[String]) -> Result<()> {
        let node = self
            .graph
            .node(target)
            .ok_or_else(|| HoistError::invariant(target, "module missing from the graph"))?;
        for name in names {
            trace!("Validating import of {name} from {target} in {importer}");
            if !node.provides(name) {
                return Err(HoistError::MissingExport {
                    name: name.clone(),
                    importer: importer.clone(),
                    target: target.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn record_exports(&mut self, id: &ModuleId, exports: &[ExportRecord]) -> Result<()> {
        let mut stars = Vec::new();
        for record in exports {
            match record.shape {
                ExportShape::ReExportAll => {
                    stars.push(self.proxy_source(id, record)?);
                    continue;
                }
                ExportShape::ReExportNamed => {
                    let source = self.proxy_source(id, record)?;
                    let imported = record.imported_name.as_deref().unwrap_or(&record.name);
                    let origin = self.graph.resolve_export(&source, imported);
                    trace!(
                        "Proxy export {id}:{} -> {}:{}",
                        record.name, origin.module, origin.name
                    );
                    self.graph
                        .add_module(id)
                        .proxy_exports
                        .insert(record.name.clone(), origin);
                }
                ExportShape::CommonJsDefault => {
                    let node = self.graph.add_module(id);
                    node.has_commonjs_export = true;
                    node.has_commonjs_default_export = true;
                }
                ExportShape::CommonJsNamed | ExportShape::CommonJsObjectProperty => {
                    self.graph.add_module(id).has_commonjs_export = true;
                }
                _ => {}
            }
            self.graph
                .add_module(id)
                .exported_names
                .insert(record.name.clone());
        }

        // Local exports win over names arriving through `export *`
        for source in stars {
            self.expand_star_export(id, &source);
            self.star_exports.push((id.clone(), source));
        }
        Ok(())
    }

    fn proxy_source(&self, id: &ModuleId, record: &ExportRecord) -> Result<ModuleId> {
        let specifier = record.source.as_deref().unwrap_or_default();
        self.graph
            .node(id)
            .and_then(|node| node.specifiers.get(specifier))
            .cloned()
            .ok_or_else(|| {
                HoistError::invariant(id, format!("re-export source {specifier} was never resolved"))
                    .into()
            })
    }

    /// Copy every name of `source` except `default` into `id`; returns
    /// whether anything was added
    fn expand_star_export(&mut self, id: &ModuleId, source: &ModuleId) -> bool {
        let Some(source_node) = self.graph.node(source) else {
            return false;
        };
        if source_node.has_commonjs_export {
            debug!("export * from CommonJS module {source} only exposes its static names");
        }
        let names: Vec<String> = source_node
            .exported_names
            .iter()
            .filter(|name| name.as_str() != "default")
            .cloned()
            .collect();
        let origins: Vec<(String, ExportOrigin)> = names
            .into_iter()
            .map(|name| {
                let origin = self.graph.resolve_export(source, &name);
                (name, origin)
            })
            .collect();

        let node = self.graph.add_module(id);
        let mut added = false;
        for (name, origin) in origins {
            if node.exported_names.insert(name.clone()) {
                trace!("export * adds {id}:{name} -> {}:{}", origin.module, origin.name);
                node.proxy_exports.insert(name, origin);
                added = true;
            }
        }
        added
    }

    /// Re-resolve proxies until no chain longer than one hop remains
    fn resolve_proxies(&mut self) {
        let limit = self.graph.len() + 1;
        for _ in 0..limit {
            let mut changed = false;
            for (id, source) in self.star_exports.clone() {
                changed |= self.expand_star_export(&id, &source);
            }

            let mut updates = Vec::new();
            for (id, node) in self.graph.nodes() {
                for (name, origin) in &node.proxy_exports {
                    let resolved = self.graph.resolve_export(&origin.module, &origin.name);
                    if resolved != *origin && resolved.module != *id {
                        updates.push((id.clone(), name.clone(), resolved));
                    }
                }
            }
            for (id, name, origin) in updates {
                if let Some(node) = self.graph.node_mut(&id) {
                    node.proxy_exports.insert(name, origin);
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
        warn!("Proxy exports did not settle; a re-export cycle may be present");
    }

    /// Finish the walk and annotate the graph
    pub fn finish(mut self) -> Result<ModuleGraph> {
        self.resolve_proxies();
        for check in std::mem::take(&mut self.deferred) {
            self.validate(&check.importer, &check.target, &check.names)?;
        }
        self.graph.mark_exports_all();

        let cycles = CircularDependencyAnalysis::analyze(&self.graph);
        for group in cycles.binding_cycles() {
            let members: Vec<_> = group.modules.iter().map(ModuleId::as_str).collect();
            warn!("Circular dependency between {}", members.join(", "));
        }

        self.graph.set_used_names(self.conflicts.finish());
        debug!("Built module graph with {} modules", self.graph.len());
        Ok(self.graph)
    }
}

fn group_by_source(imports: Vec<ImportRecord>) -> FxIndexMap<String, Vec<ImportRecord>> {
    let mut groups: FxIndexMap<String, Vec<ImportRecord>> = FxIndexMap::default();
    for record in imports {
        groups.entry(record.source.clone()).or_default().push(record);
    }
    groups
}

/// Names that must exist in the target: not side effects, not namespaces
fn checked_names(records: &[ImportRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.imported_name.as_deref())
        .filter(|name| *name != "*")
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::module_registry::MemoryResolver;

    fn graph(files: &[(&str, &str)]) -> Result<ModuleGraph> {
        let resolver = MemoryResolver::from_files(files.iter().copied());
        let mut registry = ModuleRegistry::new(resolver);
        build_graph(&["/index.js"], &mut registry)
    }

    #[test]
    fn test_post_order_and_edges() -> Result<()> {
        let graph = graph(&[
            ("/index.js", "import { a } from './a.js'; import './b.js';"),
            ("/a.js", "import b from './b.js'; export const a = b;"),
            ("/b.js", "export default 1;"),
        ])?;
        let order: Vec<_> = graph.order().iter().map(ModuleId::as_str).collect();
        assert_eq!(order, vec!["/b.js", "/a.js", "/index.js"]);

        let index = ModuleId::new("/index.js");
        let b = ModuleId::new("/b.js");
        assert_eq!(
            graph.edge(&index, &ModuleId::new("/a.js")).map(|e| e.imported_names.clone()),
            Some(vec!["a".to_owned()])
        );
        assert!(graph.edge(&index, &b).is_some_and(|e| !e.carries_bindings()));
        Ok(())
    }

    #[test]
    fn test_star_export_expansion() -> Result<()> {
        let graph = graph(&[
            ("/index.js", "import { x, y } from './a.js';"),
            ("/a.js", "export * from './b.js'; export const y = 2;"),
            ("/b.js", "export const x = 1, y = 0; export default 3;"),
        ])?;
        let a = graph.node(&ModuleId::new("/a.js")).expect("node");
        assert!(a.exported_names.contains("x"));
        assert!(!a.exported_names.contains("default"));
        assert_eq!(
            a.proxy_exports.get("x"),
            Some(&ExportOrigin::new(ModuleId::new("/b.js"), "x"))
        );
        assert!(!a.proxy_exports.contains_key("y"));
        Ok(())
    }

    #[test]
    fn test_cycle_terminates() -> Result<()> {
        let graph = graph(&[
            ("/index.js", "import { a } from './a.js'; export const i = a;"),
            ("/a.js", "import { i } from './index.js'; export const a = 1;"),
        ])?;
        assert!(graph.has_cycles());
        assert_eq!(graph.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_export_inside_cycle_is_reported() {
        let err = graph(&[
            ("/index.js", "import { a } from './a.js';"),
            ("/a.js", "import { nope } from './index.js'; export const a = 1;"),
        ])
        .expect_err("missing export");
        assert!(matches!(
            err.downcast_ref::<HoistError>(),
            Some(HoistError::MissingExport { name, .. }) if name == "nope"
        ));
    }
}

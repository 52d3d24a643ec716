//! Module dependency graph
//!
//! A petgraph-backed directed graph of canonical module ids. Edges point
//! from importer to imported module; a synthetic root node points at every
//! entry module. Each module node carries the export surface computed during
//! graph building, each edge the names that cross it.

use log::trace;
use petgraph::{
    Direction,
    algo::is_cyclic_directed,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use rustc_hash::FxHashMap;

use crate::{
    analysis::UsedNames,
    types::{FxIndexMap, FxIndexSet, ModuleId},
};

/// Id of the synthetic node that points at every entry module
pub const ROOT_ID: &str = ":root";

/// Where a proxy export ultimately comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportOrigin {
    pub module: ModuleId,
    pub name: String,
}

impl ExportOrigin {
    pub fn new(module: ModuleId, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

/// Export surface and flags of one module
#[derive(Debug, Clone, Default)]
pub struct ModuleNode {
    /// Every name the module makes available, proxies included
    pub exported_names: FxIndexSet<String>,
    /// Re-exported names, resolved to their non-proxy origin
    pub proxy_exports: FxIndexMap<String, ExportOrigin>,
    pub has_commonjs_export: bool,
    pub has_commonjs_default_export: bool,
    /// Some importer needs a namespace object for this module
    pub exports_all: bool,
    /// Specifiers used by this module, mapped to canonical ids
    pub specifiers: FxIndexMap<String, ModuleId>,
}

impl ModuleNode {
    /// Whether an import of `name` can be satisfied
    pub fn provides(&self, name: &str) -> bool {
        self.has_commonjs_export || self.exported_names.contains(name)
    }
}

/// Names crossing from one module to another
#[derive(Debug, Clone, Default)]
pub struct ModuleEdge {
    /// Distinct imported names in discovery order
    pub imported_names: Vec<String>,
    /// Consumed as a whole: `import * as`, `export * as` or `import()`
    pub namespace: bool,
    /// `default` is imported, by `import x from` or `require()`
    pub default_import: bool,
}

impl ModuleEdge {
    pub fn add_name(&mut self, name: &str) {
        if !self.imported_names.iter().any(|existing| existing == name) {
            self.imported_names.push(name.to_owned());
        }
    }

    /// Whether anything other than side effects crosses this edge
    pub fn carries_bindings(&self) -> bool {
        !self.imported_names.is_empty()
    }
}

#[derive(Debug)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleId, ModuleEdge>,
    node_indices: FxHashMap<ModuleId, NodeIndex>,
    modules: FxIndexMap<ModuleId, ModuleNode>,
    root: NodeIndex,
    /// Modules in the order their analysis completed, dependencies first
    order: Vec<ModuleId>,
    used_names: UsedNames,
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleGraph {
    /// Create a graph holding only the synthetic root
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root_id = ModuleId::new(ROOT_ID);
        let root = graph.add_node(root_id.clone());
        let mut node_indices = FxHashMap::default();
        node_indices.insert(root_id, root);
        Self {
            graph,
            node_indices,
            modules: FxIndexMap::default(),
            root,
            order: Vec::new(),
            used_names: UsedNames::default(),
        }
    }

    /// Add a module node if it does not exist yet
    pub fn add_module(&mut self, id: &ModuleId) -> &mut ModuleNode {
        if !self.node_indices.contains_key(id) {
            let index = self.graph.add_node(id.clone());
            self.node_indices.insert(id.clone(), index);
            trace!("Added graph node {id}");
        }
        self.modules.entry(id.clone()).or_default()
    }

    /// Get or create the edge `from -> to`; `None` for `from` means the root
    pub fn edge_mut(&mut self, from: Option<&ModuleId>, to: &ModuleId) -> &mut ModuleEdge {
        self.add_module(to);
        let from_index = match from {
            Some(id) => {
                self.add_module(id);
                self.node_indices[id]
            }
            None => self.root,
        };
        let to_index = self.node_indices[to];
        let edge = match self.graph.find_edge(from_index, to_index) {
            Some(edge) => edge,
            None => self
                .graph
                .add_edge(from_index, to_index, ModuleEdge::default()),
        };
        &mut self.graph[edge]
    }

    pub fn node(&self, id: &ModuleId) -> Option<&ModuleNode> {
        self.modules.get(id)
    }

    pub fn node_mut(&mut self, id: &ModuleId) -> Option<&mut ModuleNode> {
        self.modules.get_mut(id)
    }

    pub fn edge(&self, from: &ModuleId, to: &ModuleId) -> Option<&ModuleEdge> {
        let from = *self.node_indices.get(from)?;
        let to = *self.node_indices.get(to)?;
        self.graph.find_edge(from, to).map(|edge| &self.graph[edge])
    }

    /// Module nodes in insertion order, without the synthetic root
    pub fn nodes(&self) -> impl Iterator<Item = (&ModuleId, &ModuleNode)> {
        self.modules.iter()
    }

    /// All edges between modules as `(from, to, edge)`, root edges excluded
    pub fn edges(&self) -> impl Iterator<Item = (&ModuleId, &ModuleId, &ModuleEdge)> {
        self.graph
            .edge_references()
            .filter(|edge| edge.source() != self.root)
            .map(|edge| {
                (
                    &self.graph[edge.source()],
                    &self.graph[edge.target()],
                    edge.weight(),
                )
            })
    }

    /// Entry modules in the order they were added
    pub fn roots(&self) -> Vec<ModuleId> {
        self.outgoing(self.root)
    }

    /// Direct dependencies of a module in the order they were discovered
    pub fn dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.node_indices
            .get(id)
            .map(|index| self.outgoing(*index))
            .unwrap_or_default()
    }

    fn outgoing(&self, index: NodeIndex) -> Vec<ModuleId> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges
            .into_iter()
            .map(|(_, target)| self.graph[target].clone())
            .collect()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Follow a proxy export to its origin, or return `(id, name)` itself
    pub fn resolve_export(&self, id: &ModuleId, name: &str) -> ExportOrigin {
        self.modules
            .get(id)
            .and_then(|node| node.proxy_exports.get(name))
            .cloned()
            .unwrap_or_else(|| ExportOrigin::new(id.clone(), name))
    }

    /// Modules in post-order of the building walk
    pub fn order(&self) -> &[ModuleId] {
        &self.order
    }

    pub(crate) fn push_completed(&mut self, id: ModuleId) {
        self.order.push(id);
    }

    pub const fn used_names(&self) -> &UsedNames {
        &self.used_names
    }

    pub(crate) fn set_used_names(&mut self, used_names: UsedNames) {
        self.used_names = used_names;
    }

    /// Mark namespace requirements from the finished edges
    ///
    /// A module needs a namespace object when an importer consumes it as a
    /// whole, or imports `default` while it has CommonJS exports but no
    /// CommonJS default export.
    pub(crate) fn mark_exports_all(&mut self) {
        let mut marked = Vec::new();
        for edge in self.graph.edge_references() {
            let target = &self.graph[edge.target()];
            let Some(node) = self.modules.get(target) else {
                continue;
            };
            let weight = edge.weight();
            let commonjs_whole = weight.default_import
                && node.has_commonjs_export
                && !node.has_commonjs_default_export;
            if weight.namespace || commonjs_whole {
                marked.push(target.clone());
            }
        }
        for id in marked {
            if let Some(node) = self.modules.get_mut(&id)
                && !node.exports_all
            {
                trace!("Module {id} needs a namespace object");
                node.exports_all = true;
            }
        }
    }
}

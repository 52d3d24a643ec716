//! Circular dependency analysis
//!
//! Groups modules into strongly connected components and classifies each
//! cycle. A cycle whose edges carry no bindings (only side-effect imports)
//! can be flattened by simply not re-entering a module; a cycle that passes
//! bindings around cannot be hoisted without partial initialization.

use petgraph::{algo::tarjan_scc, graph::DiGraph};
use rustc_hash::FxHashMap;

use crate::{module_graph::ModuleGraph, types::ModuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Only side-effect imports close the cycle
    SideEffectOnly,
    /// At least one edge of the cycle imports bindings
    Bindings,
}

#[derive(Debug, Clone)]
pub struct CircularDependencyGroup {
    /// Members in graph insertion order
    pub modules: Vec<ModuleId>,
    pub kind: CycleKind,
}

#[derive(Debug, Clone, Default)]
pub struct CircularDependencyAnalysis {
    pub groups: Vec<CircularDependencyGroup>,
}

impl CircularDependencyAnalysis {
    /// Find every cycle of the module graph
    pub fn analyze(graph: &ModuleGraph) -> Self {
        let mut modules: DiGraph<ModuleId, bool> = DiGraph::new();
        let mut indices = FxHashMap::default();
        for (id, _) in graph.nodes() {
            indices.insert(id.clone(), modules.add_node(id.clone()));
        }
        for (from, to, edge) in graph.edges() {
            if let (Some(from), Some(to)) = (indices.get(from), indices.get(to)) {
                modules.add_edge(*from, *to, edge.carries_bindings());
            }
        }

        let mut groups = Vec::new();
        for mut component in tarjan_scc(&modules) {
            let self_loop = component.len() == 1 && modules.contains_edge(component[0], component[0]);
            if component.len() < 2 && !self_loop {
                continue;
            }
            component.sort();
            let members: Vec<_> = component.iter().map(|index| modules[*index].clone()).collect();
            let bindings = modules.edge_indices().any(|edge| {
                modules.edge_endpoints(edge).is_some_and(|(from, to)| {
                    component.contains(&from) && component.contains(&to)
                }) && modules[edge]
            });
            groups.push(CircularDependencyGroup {
                modules: members,
                kind: if bindings {
                    CycleKind::Bindings
                } else {
                    CycleKind::SideEffectOnly
                },
            });
        }
        Self { groups }
    }

    pub fn has_cycles(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Cycles that pass bindings between their members
    pub fn binding_cycles(&self) -> impl Iterator<Item = &CircularDependencyGroup> {
        self.groups
            .iter()
            .filter(|group| group.kind == CycleKind::Bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ModuleId> {
        names.iter().map(|name| ModuleId::new(*name)).collect()
    }

    #[test]
    fn test_classifies_cycles() {
        let mut graph = ModuleGraph::new();
        let m = ids(&["/a.js", "/b.js", "/c.js", "/d.js"]);
        graph.edge_mut(Some(&m[0]), &m[1]).add_name("x");
        graph.edge_mut(Some(&m[1]), &m[0]);
        graph.edge_mut(Some(&m[2]), &m[3]);
        graph.edge_mut(Some(&m[3]), &m[2]);

        let analysis = CircularDependencyAnalysis::analyze(&graph);
        assert_eq!(analysis.groups.len(), 2);
        let binding: Vec<_> = analysis.binding_cycles().collect();
        assert_eq!(binding.len(), 1);
        assert_eq!(binding[0].modules, ids(&["/a.js", "/b.js"]));
    }

    #[test]
    fn test_acyclic_graph() {
        let mut graph = ModuleGraph::new();
        let m = ids(&["/a.js", "/b.js"]);
        graph.edge_mut(Some(&m[0]), &m[1]).add_name("x");
        assert!(!CircularDependencyAnalysis::analyze(&graph).has_cycles());
    }
}

//! Namespace objects
//!
//! A namespace object exposes every export of a module as an accessor
//! property. Getters read the producer's hoisted variable, setters (present
//! only for reassignable exports) write it, so every consumer of the object
//! observes the same live binding.

use anyhow::Result;
use log::debug;

use super::compiler::{ModuleCompilation, Namespace};
use crate::{error::HoistError, transformation_context::TransformationType};

impl ModuleCompilation<'_> {
    /// Plan the shared namespace variable when importers need one
    pub(super) fn synthesize_namespace(&mut self) -> Result<()> {
        let (module, graph) = (self.module, self.graph);
        let id = module.id();
        let node = graph.node(id).ok_or_else(|| {
            HoistError::invariant(id, "namespace requested for a module outside the graph")
        })?;
        if !node.exports_all {
            return Ok(());
        }

        let mut properties = Vec::with_capacity(node.exported_names.len());
        for name in &node.exported_names {
            properties.push((name.clone(), self.resolve_binding(id, name)?));
        }
        let variable = self.context.bind_namespace(id);
        debug!("Declared namespace {variable} for {id}");
        self.context.record(
            id,
            TransformationType::NamespaceSynthesized {
                variable: variable.clone(),
            },
        );
        self.plan.namespace = Some(Namespace {
            variable,
            properties,
        });
        Ok(())
    }
}

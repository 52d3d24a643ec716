//! Import rewrite
//!
//! Every import is resolved through the proxy chain to the variable its
//! producer was compiled into. ES imports keep live-binding semantics by
//! renaming the local binding to the producer's variable; `require()` calls
//! are value reads and are replaced by an expression in place.

use anyhow::Result;
use log::trace;
use oxc_span::Span;

use super::compiler::{BindingTarget, ModuleCompilation, Replacement};
use crate::{
    error::HoistError,
    transformation_context::TransformationType,
    types::{FxIndexMap, ModuleId},
    visitors::{ImportRecord, ImportShape},
};

impl ModuleCompilation<'_> {
    pub(super) fn rewrite_imports(&mut self) -> Result<()> {
        let module = self.module;
        let mut destructured: FxIndexMap<Span, Vec<&ImportRecord>> = FxIndexMap::default();
        for record in module.imports() {
            match record.shape {
                // Side effects are already emitted, re-exports are resolved in the graph
                ImportShape::SideEffect | ImportShape::ReExport | ImportShape::ReExportAll => {}
                ImportShape::Dynamic => {
                    return Err(HoistError::unsupported(
                        module.id(),
                        format!("dynamic import() of {} cannot be hoisted", record.source),
                    )
                    .into());
                }
                ImportShape::Default | ImportShape::Named | ImportShape::Namespace => {
                    self.rewrite_specifier(record)?;
                }
                ImportShape::Require => self.rewrite_require(record)?,
                ImportShape::RequireDestructured => {
                    destructured.entry(record.statement).or_default().push(record);
                }
            }
        }
        for (call, records) in destructured {
            self.rewrite_destructured_require(call, &records)?;
        }
        Ok(())
    }

    fn rewrite_specifier(&mut self, record: &ImportRecord) -> Result<()> {
        let (Some(local), Some(imported)) = (record.local, record.imported_name.as_deref()) else {
            return Err(
                HoistError::invariant(self.module.id(), "import specifier without a local binding")
                    .into(),
            );
        };
        let target = self.target_of(&record.source)?;
        let resolved = self.resolve_binding(&target, imported)?;
        trace!(
            "Import {} from {target} resolves to {resolved:?}",
            record.local_name.as_deref().unwrap_or(imported)
        );
        match &resolved {
            BindingTarget::Variable { name, .. } => {
                self.plan.renames.insert(local, name.clone());
            }
            BindingTarget::Member { .. } | BindingTarget::Undefined => {
                self.plan.replaced.insert(local, resolved.clone());
            }
        }
        self.import_aliases.insert(local, resolved);
        self.record_import(target, imported);
        Ok(())
    }

    fn rewrite_require(&mut self, record: &ImportRecord) -> Result<()> {
        let target = self.target_of(&record.source)?;
        let resolved = self.resolve_binding(&target, "default")?;
        trace!(
            "require({}) in {} resolves to {resolved:?}",
            record.source,
            self.module.id()
        );
        self.plan
            .calls
            .insert(record.statement, Replacement::Value(resolved));
        self.record_import(target, "default");
        Ok(())
    }

    /// `const { a, b: c } = require("x")` reads from `{ a: <a>, b: <b> }`
    fn rewrite_destructured_require(&mut self, call: Span, records: &[&ImportRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let target = self.target_of(&first.source)?;
        let mut properties = Vec::with_capacity(records.len());
        for record in records {
            let key = record.imported_name.as_deref().unwrap_or("default");
            properties.push((key.to_owned(), self.resolve_binding(&target, key)?));
            self.record_import(target.clone(), key);
        }
        self.plan.calls.insert(call, Replacement::Object(properties));
        Ok(())
    }

    fn record_import(&mut self, from_module: ModuleId, name: &str) {
        self.context.record(
            self.module.id(),
            TransformationType::ImportRewritten {
                from_module,
                name: name.to_owned(),
            },
        );
    }
}

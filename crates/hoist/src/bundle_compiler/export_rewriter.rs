//! Export rewrite
//!
//! Mints one variable per exported name and renames the local declaration
//! to it. Export wrappers are unwrapped when the plan is applied; exports
//! without a declaration of their own get a plain `var`.

use anyhow::Result;
use log::trace;
use oxc_semantic::{SymbolFlags, SymbolId};
use oxc_span::Span;
use rustc_hash::FxHashMap;

use super::compiler::{BindingTarget, CommonJsAssignment, CommonJsTarget, ModuleCompilation};
use crate::{
    error::HoistError,
    types::FxIndexMap,
    visitors::{ExportRecord, ExportShape},
};

/// Symbols already renamed to a hoisted variable in this module
type Hoisted = FxHashMap<SymbolId, String>;

impl ModuleCompilation<'_> {
    pub(super) fn rewrite_exports(&mut self) -> Result<()> {
        let module = self.module;
        let mut statements: FxIndexMap<Span, Vec<&ExportRecord>> = FxIndexMap::default();
        for record in module.exports() {
            statements.entry(record.statement).or_default().push(record);
        }

        let mut hoisted = Hoisted::default();
        for (statement, records) in statements {
            let Some(first) = records.first().copied() else {
                continue;
            };
            match first.shape {
                ExportShape::ReExportAll | ExportShape::ReExportNamed => {}
                ExportShape::LocalSpecifier => {
                    for record in records {
                        self.export_local(record, &mut hoisted)?;
                    }
                }
                ExportShape::Function | ExportShape::Class | ExportShape::Variable { .. } => {
                    for record in records {
                        let symbol = self.symbol_of(record)?;
                        self.hoist_binding(symbol, record, &mut hoisted);
                    }
                }
                ExportShape::Default => self.export_default(first, &mut hoisted),
                ExportShape::CommonJsDefault
                | ExportShape::CommonJsNamed
                | ExportShape::CommonJsObjectProperty => {
                    self.export_commonjs(statement, &records);
                }
            }
        }
        Ok(())
    }

    fn symbol_of(&self, record: &ExportRecord) -> Result<SymbolId> {
        record.local.ok_or_else(|| {
            HoistError::invariant(
                self.module.id(),
                format!("export {} has no local binding", record.name),
            )
            .into()
        })
    }

    /// Rename `symbol` to the variable of `record`, or alias the variable it
    /// already received under another export name
    fn hoist_binding(&mut self, symbol: SymbolId, record: &ExportRecord, hoisted: &mut Hoisted) {
        let id = self.module.id();
        let mutable = record.mutable.is_mutable();
        if let Some(variable) = hoisted.get(&symbol) {
            self.context.alias_export(id, &record.name, variable, mutable);
            return;
        }
        let variable = self.context.bind_export(id, &record.name, mutable);
        trace!("Export {} of {id} hoisted as {variable}", record.name);
        self.plan.renames.insert(symbol, variable.clone());
        hoisted.insert(symbol, variable);
    }

    /// `export { a as b }` without a source
    fn export_local(&mut self, record: &ExportRecord, hoisted: &mut Hoisted) -> Result<()> {
        let module = self.module;
        let id = module.id();
        let symbol = self.symbol_of(record)?;
        if !self.scoping.symbol_flags(symbol).contains(SymbolFlags::Import) {
            self.hoist_binding(symbol, record, hoisted);
            return Ok(());
        }

        // Re-exported import bindings take whatever the import resolved to
        match self.import_aliases.get(&symbol).cloned() {
            Some(BindingTarget::Variable { name, mutable }) => {
                self.context.alias_export(id, &record.name, &name, mutable);
            }
            Some(target) => {
                let variable = self.context.bind_export(id, &record.name, false);
                self.plan
                    .inserted
                    .entry(record.statement)
                    .or_default()
                    .push((variable, target));
            }
            None => {
                return Err(HoistError::invariant(
                    id,
                    format!(
                        "re-exported import {} was never resolved",
                        record.local_name.as_deref().unwrap_or(&record.name)
                    ),
                )
                .into());
            }
        }
        Ok(())
    }

    fn export_default(&mut self, record: &ExportRecord, hoisted: &mut Hoisted) {
        // Named declarations keep their hoisting and take the default's name
        if let Some(symbol) = record.local {
            self.hoist_binding(symbol, record, hoisted);
            return;
        }
        let variable = self
            .context
            .bind_export(self.module.id(), "default", record.mutable.is_mutable());
        self.plan.default_variable = Some(variable);
    }

    /// `module.exports = e` and `exports.x = e`
    ///
    /// A name exported for the first time gets a fresh variable; a repeated
    /// assignment writes the variable minted by the first one.
    fn export_commonjs(&mut self, assignment: Span, records: &[&ExportRecord]) {
        let id = self.module.id();
        let mut targets = Vec::with_capacity(records.len());
        for record in records {
            let target = match self.context.bindings.get(id, &record.name) {
                Some(existing) => CommonJsTarget {
                    variable: existing.to_owned(),
                    fresh: false,
                },
                None => CommonJsTarget {
                    variable: self
                        .context
                        .bind_export(id, &record.name, record.mutable.is_mutable()),
                    fresh: true,
                },
            };
            targets.push(target);
        }
        let split = records
            .first()
            .is_some_and(|record| record.shape == ExportShape::CommonJsObjectProperty);
        self.plan
            .assignments
            .insert(assignment, CommonJsAssignment { split, targets });
    }
}

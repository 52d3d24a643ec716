//! Top-level name deconfliction
//!
//! Once every module shares one scope, a name declared at the top of this
//! module must not also be a host global or another module's top-level name.
//! Imports and exports already received minted names and are skipped.

use log::debug;
use oxc_semantic::{SymbolFlags, SymbolId};

use super::compiler::ModuleCompilation;
use crate::transformation_context::TransformationType;

impl ModuleCompilation<'_> {
    pub(super) fn deconflict(&mut self) {
        let (module, scoping) = (self.module, self.scoping);
        let id = module.id();
        let mut candidates: Vec<(SymbolId, &str)> = scoping
            .get_bindings(scoping.root_scope_id())
            .iter()
            .map(|(name, symbol)| (*symbol, *name))
            .collect();
        candidates.sort_unstable_by_key(|(symbol, _)| *symbol);

        for (symbol, name) in candidates {
            if scoping.symbol_flags(symbol).contains(SymbolFlags::Import)
                || self.plan.renames.contains_key(&symbol)
                || self.context.is_minted(name)
                || !self.graph.used_names().conflicts(name, id)
            {
                continue;
            }
            let renamed = self.context.mint(name);
            debug!("Renaming top-level {name} of {id} to {renamed}");
            self.plan.renames.insert(symbol, renamed.clone());
            self.context.record(
                id,
                TransformationType::Deconflicted {
                    from: name.to_owned(),
                    to: renamed,
                },
            );
        }
    }
}

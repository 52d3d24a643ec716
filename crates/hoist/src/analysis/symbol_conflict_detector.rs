//! Top-level name registry for collision avoidance
//!
//! Once all modules share one scope, a top-level name can only mean one
//! thing. [`UsedNames`] records who owns each name: a host global (referenced
//! somewhere but declared nowhere) or the first module, in dependency order,
//! that declares it at top level without exporting it. Exported bindings are
//! not recorded because the compiler always renames them.

use log::{debug, trace};

use crate::{
    module::Module,
    types::{FxIndexMap, ModuleId},
};

/// Owner of a top-level name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOwner {
    /// Referenced but never declared: assumed to be provided by the host
    Global,
    Module(ModuleId),
}

#[derive(Debug, Clone, Default)]
pub struct UsedNames {
    names: FxIndexMap<String, NameOwner>,
}

impl UsedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a host global; globals take precedence over module claims
    pub fn record_global(&mut self, name: &str) {
        self.names.insert(name.to_owned(), NameOwner::Global);
    }

    /// Claim `name` for `module` unless someone owns it already
    pub fn record_declared(&mut self, name: &str, module: &ModuleId) {
        self.names
            .entry(name.to_owned())
            .or_insert_with(|| NameOwner::Module(module.clone()));
    }

    pub fn owner(&self, name: &str) -> Option<&NameOwner> {
        self.names.get(name)
    }

    /// Whether `module` declaring `name` would clash with another owner
    pub fn conflicts(&self, name: &str, module: &ModuleId) -> bool {
        match self.names.get(name) {
            Some(NameOwner::Global) => true,
            Some(NameOwner::Module(owner)) => owner != module,
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NameOwner)> {
        self.names.iter().map(|(name, owner)| (name.as_str(), owner))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builds [`UsedNames`] from analyzed modules
#[derive(Debug, Default)]
pub struct SymbolConflictDetector {
    used_names: UsedNames,
}

impl SymbolConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the names of one module; call in dependency order
    pub fn add_module(&mut self, module: &Module) {
        for name in module.global_names() {
            self.used_names.record_global(name);
        }
        for name in module.declared_names() {
            trace!("Module {} declares top-level {name}", module.id());
            self.used_names.record_declared(name, module.id());
        }
    }

    pub fn finish(self) -> UsedNames {
        debug!("Collected {} used top-level names", self.used_names.len());
        self.used_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str, source: &str) -> Module {
        Module::parse(ModuleId::new(id), source).expect("parse")
    }

    #[test]
    fn test_globals_and_declarations() {
        let x = module("/x.js", "const x = 6; function y() { globalConflict(); }");
        let index = module(
            "/index.js",
            "import './x.js'; const x = 4; const globalConflict = ''; export const z = 1;",
        );

        let mut detector = SymbolConflictDetector::new();
        detector.add_module(&x);
        detector.add_module(&index);
        let used = detector.finish();

        assert_eq!(used.owner("globalConflict"), Some(&NameOwner::Global));
        assert_eq!(used.owner("x"), Some(&NameOwner::Module(x.id().clone())));
        assert!(used.conflicts("x", index.id()));
        assert!(!used.conflicts("x", x.id()));
        assert!(!used.conflicts("y", x.id()));
        assert_eq!(used.owner("z"), None);
    }

    #[test]
    fn test_global_overrides_earlier_claim() {
        let mut used = UsedNames::new();
        let a = ModuleId::new("/a.js");
        used.record_declared("name", &a);
        used.record_global("name");
        used.record_declared("name", &a);
        assert!(used.conflicts("name", &a));
    }
}

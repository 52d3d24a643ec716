//! Transformation context shared by every module of one compile run
//!
//! Holds the name minter, the binding variable table that maps
//! `(module, export name)` to the hoisted variable, and a log of applied
//! transformations from which the run's statistics are derived. One context
//! lives for exactly one run; minted names are never handed out twice.

use log::trace;

use crate::types::{FxIndexMap, ModuleId};

/// Mints `{prefix}{counter}_{name}` names from a monotonic counter
#[derive(Debug, Clone)]
pub struct NameMinter {
    prefix: String,
    next: u64,
}

impl NameMinter {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: start,
        }
    }

    /// A fresh name carrying `name` for readability
    pub fn mint(&mut self, name: &str) -> String {
        let minted = format!("{}{}_{}", self.prefix, self.next, name);
        self.next += 1;
        minted
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// A hoisted variable and whether consumers may assign through it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundVariable {
    pub name: String,
    pub mutable: bool,
}

/// `(module, export name) -> hoisted variable`, filled as modules compile
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    variables: FxIndexMap<(ModuleId, String), BoundVariable>,
}

impl BindingTable {
    pub fn insert(&mut self, module: &ModuleId, name: &str, variable: String, mutable: bool) {
        self.variables.insert(
            (module.clone(), name.to_owned()),
            BoundVariable {
                name: variable,
                mutable,
            },
        );
    }

    pub fn get(&self, module: &ModuleId, name: &str) -> Option<&str> {
        self.get_bound(module, name)
            .map(|variable| variable.name.as_str())
    }

    pub fn get_bound(&self, module: &ModuleId, name: &str) -> Option<&BoundVariable> {
        self.variables.get(&(module.clone(), name.to_owned()))
    }

    pub fn contains(&self, module: &ModuleId, name: &str) -> bool {
        self.get(module, name).is_some()
    }

    /// Export names bound for `module`, in minting order
    pub fn names_of<'a>(
        &'a self,
        module: &'a ModuleId,
    ) -> impl Iterator<Item = (&'a str, &'a BoundVariable)> {
        self.variables
            .iter()
            .filter(move |((owner, _), _)| owner == module)
            .map(|((_, name), variable)| (name.as_str(), variable))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Kinds of transformations applied while compiling a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformationType {
    /// An import binding now points at the producer's variable
    ImportRewritten { from_module: ModuleId, name: String },
    /// An export became a hoisted variable
    ExportHoisted { name: String, variable: String },
    /// A namespace object was declared
    NamespaceSynthesized { variable: String },
    /// A top-level name was renamed to avoid a collision
    Deconflicted { from: String, to: String },
}

#[derive(Debug, Clone)]
pub struct TransformationRecord {
    pub module: ModuleId,
    pub transformation_type: TransformationType,
}

/// Counters for one compile run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformationStats {
    pub modules_compiled: usize,
    pub imports_rewritten: usize,
    pub exports_hoisted: usize,
    pub namespaces_synthesized: usize,
    pub names_deconflicted: usize,
}

#[derive(Debug)]
pub struct TransformationContext {
    minter: NameMinter,
    pub bindings: BindingTable,
    /// Readable suffix of namespace variables
    namespace_name: String,
    pub transformations: Vec<TransformationRecord>,
    modules_compiled: usize,
}

impl TransformationContext {
    pub fn new(minter: NameMinter, namespace_name: impl Into<String>) -> Self {
        Self {
            minter,
            bindings: BindingTable::default(),
            namespace_name: namespace_name.into(),
            transformations: Vec::new(),
            modules_compiled: 0,
        }
    }

    /// Mint a fresh variable name
    pub fn mint(&mut self, name: &str) -> String {
        let minted = self.minter.mint(name);
        trace!("Minted {minted}");
        minted
    }

    /// Mint the hoisted variable of `(module, name)` and record it
    pub fn bind_export(&mut self, module: &ModuleId, name: &str, mutable: bool) -> String {
        let variable = self.mint(name);
        self.bindings.insert(module, name, variable.clone(), mutable);
        self.record(
            module,
            TransformationType::ExportHoisted {
                name: name.to_owned(),
                variable: variable.clone(),
            },
        );
        variable
    }

    /// Mint the shared namespace variable of `module`
    pub fn bind_namespace(&mut self, module: &ModuleId) -> String {
        let suffix = self.namespace_name.clone();
        let variable = self.mint(&suffix);
        self.bindings.insert(module, "*", variable.clone(), false);
        variable
    }

    /// Export `name` of `module` through an already existing variable
    pub fn alias_export(&mut self, module: &ModuleId, name: &str, variable: &str, mutable: bool) {
        trace!("Export {module}:{name} aliases {variable}");
        self.bindings
            .insert(module, name, variable.to_owned(), mutable);
    }

    pub fn namespace_variable(&self, module: &ModuleId) -> Option<&str> {
        self.bindings.get(module, "*")
    }

    /// Whether `name` came out of this context's minter
    pub fn is_minted(&self, name: &str) -> bool {
        name.strip_prefix(self.minter.prefix())
            .and_then(|rest| rest.split_once('_'))
            .is_some_and(|(counter, _)| !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn record(&mut self, module: &ModuleId, transformation_type: TransformationType) {
        self.transformations.push(TransformationRecord {
            module: module.clone(),
            transformation_type,
        });
    }

    pub fn module_compiled(&mut self) {
        self.modules_compiled += 1;
    }

    /// Summarize the transformations applied so far
    pub fn stats(&self) -> TransformationStats {
        let mut stats = TransformationStats {
            modules_compiled: self.modules_compiled,
            ..TransformationStats::default()
        };
        for record in &self.transformations {
            match record.transformation_type {
                TransformationType::ImportRewritten { .. } => stats.imports_rewritten += 1,
                TransformationType::ExportHoisted { .. } => stats.exports_hoisted += 1,
                TransformationType::NamespaceSynthesized { .. } => {
                    stats.namespaces_synthesized += 1;
                }
                TransformationType::Deconflicted { .. } => stats.names_deconflicted += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_minter_never_repeats() {
        let mut minter = NameMinter::new("_$_", 1000);
        assert_eq!(minter.mint("x"), "_$_1000_x");
        assert_eq!(minter.mint("x"), "_$_1001_x");
        assert_eq!(minter.mint("default"), "_$_1002_default");
    }

    #[test]
    fn test_binding_table_and_stats() {
        let mut context = TransformationContext::new(NameMinter::new("_$_", 1000), "all");
        let a = ModuleId::new("/a.js");
        let x = context.bind_export(&a, "x", true);
        let ns = context.bind_namespace(&a);
        context.module_compiled();

        assert_eq!(context.bindings.get(&a, "x"), Some(x.as_str()));
        assert_eq!(context.namespace_variable(&a), Some("_$_1001_all"));
        assert_eq!(ns, "_$_1001_all");
        assert!(context.is_minted(&x));
        assert!(!context.is_minted("x"));
        assert!(!context.is_minted("_$_x"));

        let names: Vec<_> = context.bindings.names_of(&a).map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x", "*"]);
        assert_eq!(
            context.stats(),
            TransformationStats {
                modules_compiled: 1,
                exports_hoisted: 1,
                ..TransformationStats::default()
            }
        );
    }
}

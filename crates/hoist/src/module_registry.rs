//! Module registry for tracking parsed modules during bundling
//!
//! The ModuleRegistry is the single source of truth for module identity
//! throughout a run: a specifier is mapped to a canonical [`ModuleId`] by a
//! [`Resolve`] implementation, and each id is loaded and parsed exactly once.
//! Every later request for the same id returns the same [`Module`].

use anyhow::Result;
use log::{debug, trace};

use crate::{
    error::HoistError,
    module::Module,
    types::{FxIndexMap, ModuleId},
};

/// Maps specifiers to canonical module ids and loads their source text
pub trait Resolve {
    /// Canonical id of `specifier` as seen from `importer`
    ///
    /// `importer` is `None` for entry modules. Equal canonical paths must
    /// produce equal ids.
    fn resolve(&self, importer: Option<&ModuleId>, specifier: &str) -> Result<ModuleId>;

    /// Source text of a resolved module
    fn load(&self, id: &ModuleId) -> Result<String>;
}

impl<R: Resolve + ?Sized> Resolve for &R {
    fn resolve(&self, importer: Option<&ModuleId>, specifier: &str) -> Result<ModuleId> {
        (**self).resolve(importer, specifier)
    }

    fn load(&self, id: &ModuleId) -> Result<String> {
        (**self).load(id)
    }
}

/// Central registry of parsed modules, keyed by canonical id
#[derive(Debug)]
pub struct ModuleRegistry<R> {
    resolver: R,
    /// Parsed modules in first-load order
    modules: FxIndexMap<ModuleId, Module>,
}

impl<R: Resolve> ModuleRegistry<R> {
    /// Create an empty registry backed by `resolver`
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            modules: FxIndexMap::default(),
        }
    }

    /// Resolve a specifier, loading and parsing the module on first sight
    pub fn resolve(&mut self, importer: Option<&ModuleId>, specifier: &str) -> Result<ModuleId> {
        let id = self.resolver.resolve(importer, specifier)?;
        if self.modules.contains_key(&id) {
            trace!("Module {id} already loaded");
            return Ok(id);
        }
        let source = self.resolver.load(&id)?;
        let module = Module::parse(id.clone(), source)?;
        debug!("Registered module {id}");
        self.modules.insert(id.clone(), module);
        Ok(id)
    }

    /// Register a module that did not come from the resolver
    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.id().clone(), module);
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    /// A module that must already be loaded
    pub fn module(&self, id: &ModuleId) -> Result<&Module> {
        self.modules
            .get(id)
            .ok_or_else(|| HoistError::invariant(id, "module was never loaded").into())
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Loaded module ids in first-load order
    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub const fn resolver(&self) -> &R {
        &self.resolver
    }
}

/// Resolver over an in-memory set of files with posix-style paths
///
/// Relative specifiers (`./`, `../`) resolve against the importer's
/// directory, absolute ones (`/`) against the root. Entry specifiers have no
/// importer and resolve against `/`. A specifier without an extension also
/// tries `.js` and `/index.js`.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: FxIndexMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, source)` pairs
    pub fn from_files<P, S>(files: impl IntoIterator<Item = (P, S)>) -> Self
    where
        P: Into<String>,
        S: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(path, source)| (path.into(), source.into()))
                .collect(),
        }
    }

    /// Add or replace one file
    pub fn add_file(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    fn unresolved(importer: Option<&ModuleId>, specifier: &str) -> anyhow::Error {
        HoistError::UnresolvedModule {
            importer: importer.cloned(),
            specifier: specifier.to_owned(),
        }
        .into()
    }
}

impl Resolve for MemoryResolver {
    fn resolve(&self, importer: Option<&ModuleId>, specifier: &str) -> Result<ModuleId> {
        let is_path = specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier.starts_with('/');
        if !is_path {
            return Err(Self::unresolved(importer, specifier));
        }

        let base = importer.map_or("/", |id| parent_directory(id.as_str()));
        let path = join_posix(base, specifier);
        [
            path.clone(),
            format!("{path}.js"),
            format!("{}/index.js", path.trim_end_matches('/')),
        ]
        .into_iter()
        .find(|candidate| self.files.contains_key(candidate))
        .map(ModuleId::new)
        .ok_or_else(|| Self::unresolved(importer, specifier))
    }

    fn load(&self, id: &ModuleId) -> Result<String> {
        self.files.get(id.as_str()).cloned().ok_or_else(|| {
            HoistError::UnresolvedModule {
                importer: None,
                specifier: id.to_string(),
            }
            .into()
        })
    }
}

fn parent_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Join and normalize posix path segments, never climbing above `/`
pub(crate) fn join_posix(base: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !specifier.starts_with('/') {
        segments.extend(base.split('/').filter(|s| !s.is_empty()));
    }
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn resolver() -> MemoryResolver {
        MemoryResolver::from_files([
            ("/index.js", "import './lib/a.js';"),
            ("/lib/a.js", "import '../b';"),
            ("/b.js", "export default 1;"),
            ("/pkg/index.js", "export const x = 1;"),
        ])
    }

    #[test]
    fn test_join_posix() {
        assert_eq!(join_posix("/a/b", "./c.js"), "/a/b/c.js");
        assert_eq!(join_posix("/a/b", "../c.js"), "/a/c.js");
        assert_eq!(join_posix("/", "../../c.js"), "/c.js");
        assert_eq!(join_posix("/a", "/x/./y.js"), "/x/y.js");
    }

    #[test]
    fn test_relative_resolution_and_probing() -> Result<()> {
        let resolver = resolver();
        assert_eq!(resolver.resolve(None, "./index.js")?.as_str(), "/index.js");
        let a = ModuleId::new("/lib/a.js");
        assert_eq!(resolver.resolve(Some(&a), "../b")?.as_str(), "/b.js");
        assert_eq!(resolver.resolve(None, "./pkg")?.as_str(), "/pkg/index.js");
        Ok(())
    }

    #[test]
    fn test_bare_and_missing_specifiers_fail() {
        let resolver = resolver();
        for specifier in ["lodash", "./missing.js"] {
            let err = resolver.resolve(None, specifier).expect_err("unresolved");
            assert!(matches!(
                err.downcast_ref::<HoistError>(),
                Some(HoistError::UnresolvedModule { .. })
            ));
        }
    }

    #[test]
    fn test_registry_loads_each_module_once() -> Result<()> {
        let mut registry = ModuleRegistry::new(resolver());
        let first = registry.resolve(None, "/b.js")?;
        let importer = ModuleId::new("/lib/a.js");
        let second = registry.resolve(Some(&importer), "../b.js")?;
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.module(&first)?.exports().len(), 1);
        assert!(registry.module(&ModuleId::new("/nope.js")).is_err());
        Ok(())
    }
}

//! Filesystem resolver
//!
//! Only path specifiers are supported: `./x`, `../x` and absolute paths.
//! Relative ones resolve against the importer's directory, or against the
//! working directory for entries. Module ids are canonical paths, so two
//! specifiers reaching the same file through different routes share a module.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{trace, warn};

use crate::{config::Config, error::HoistError, module_registry::Resolve, types::ModuleId};

#[derive(Debug, Clone)]
pub struct FsResolver {
    /// Extensions tried in order, without the dot
    extensions: Vec<String>,
    /// Base directory of entry specifiers
    root: PathBuf,
}

impl FsResolver {
    pub fn new(extensions: Vec<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            extensions,
            root: root.into(),
        }
    }

    /// Try the configured extensions from the current working directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = std::env::current_dir().context("Failed to read the current directory")?;
        Ok(Self::new(config.extensions.clone(), root))
    }

    /// `path`, then `path.<ext>`, then `path/index.<ext>`
    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![path.to_path_buf()];
        for extension in &self.extensions {
            let mut with_extension = path.as_os_str().to_owned();
            with_extension.push(".");
            with_extension.push(extension);
            candidates.push(PathBuf::from(with_extension));
        }
        for extension in &self.extensions {
            candidates.push(path.join(format!("index.{extension}")));
        }
        candidates
    }

    fn canonicalize_path(path: &Path) -> PathBuf {
        match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!("Failed to canonicalize path {}: {e}", path.display());
                path.to_path_buf()
            }
        }
    }
}

impl Resolve for FsResolver {
    fn resolve(&self, importer: Option<&ModuleId>, specifier: &str) -> Result<ModuleId> {
        let unresolved = || HoistError::UnresolvedModule {
            importer: importer.cloned(),
            specifier: specifier.to_owned(),
        };
        let is_path = specifier.starts_with("./")
            || specifier.starts_with("../")
            || Path::new(specifier).is_absolute();
        if !is_path {
            return Err(unresolved().into());
        }

        let base = importer
            .and_then(|id| Path::new(id.as_str()).parent())
            .unwrap_or(&self.root);
        let path = base.join(specifier);
        let found = self
            .candidates(&path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(unresolved)?;
        let canonical = Self::canonicalize_path(&found);
        trace!("Resolved {specifier} to {}", canonical.display());
        Ok(ModuleId::new(canonical.to_string_lossy()))
    }

    fn load(&self, id: &ModuleId) -> Result<String> {
        fs::read_to_string(id.as_str()).with_context(|| format!("Failed to read module {id}"))
    }
}

//! Error taxonomy for graph building and compilation
//!
//! Every failure aborts the whole run. Callers receive these wrapped in
//! `anyhow::Error` and can recover the variant with `downcast_ref`.

use thiserror::Error;

use crate::types::ModuleId;

#[derive(Debug, Error)]
pub enum HoistError {
    /// An import names a symbol the target module does not export
    #[error("Module {target} (imported from {importer}) is missing {} export.", quote_export(.name))]
    MissingExport {
        name: String,
        importer: ModuleId,
        target: ModuleId,
    },

    /// Syntax the bundler deliberately does not support
    #[error("Unsupported syntax in {module}: {detail}")]
    UnsupportedSyntax { module: ModuleId, detail: String },

    /// The tree does not have the shape the analyzer produced for it
    #[error("Internal invariant violated in {module}: {detail}")]
    InternalInvariant { module: ModuleId, detail: String },

    /// Two modules depend on each other's bindings
    #[error(
        "Circular import: {importer} imports {} from {target}, which is still being compiled",
        .names.join(", ")
    )]
    CircularImport {
        importer: ModuleId,
        target: ModuleId,
        names: Vec<String>,
    },

    /// The parser rejected the source text
    #[error("Failed to parse {module}: {message}")]
    Parse { module: ModuleId, message: String },

    /// A specifier could not be mapped to a module
    #[error("Cannot resolve \"{specifier}\" from {}", .importer.as_ref().map_or("<root>", ModuleId::as_str))]
    UnresolvedModule {
        importer: Option<ModuleId>,
        specifier: String,
    },
}

fn quote_export(name: &str) -> String {
    if name == "default" {
        name.to_owned()
    } else {
        format!("\"{name}\"")
    }
}

impl HoistError {
    pub(crate) fn unsupported(module: &ModuleId, detail: impl Into<String>) -> Self {
        Self::UnsupportedSyntax {
            module: module.clone(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invariant(module: &ModuleId, detail: impl Into<String>) -> Self {
        Self::InternalInvariant {
            module: module.clone(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_export_message_quotes_named_exports() {
        let err = HoistError::MissingExport {
            name: "aMissingFunction".to_owned(),
            importer: ModuleId::new("/code/index.js"),
            target: ModuleId::new("/code/a.js"),
        };
        assert_eq!(
            err.to_string(),
            "Module /code/a.js (imported from /code/index.js) is missing \"aMissingFunction\" export."
        );
    }

    #[test]
    fn test_missing_default_export_is_not_quoted() {
        let err = HoistError::MissingExport {
            name: "default".to_owned(),
            importer: ModuleId::new("/index.js"),
            target: ModuleId::new("/a.js"),
        };
        assert!(err.to_string().ends_with("is missing default export."));
    }

    #[test]
    fn test_unresolved_root_module() {
        let err = HoistError::UnresolvedModule {
            importer: None,
            specifier: "./nope.js".to_owned(),
        };
        assert_eq!(err.to_string(), "Cannot resolve \"./nope.js\" from <root>");
    }
}

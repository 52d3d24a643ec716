#![allow(clippy::disallowed_methods)]

use anyhow::Result;
use hoist::{
    HoistError, Module,
    types::{ModuleId, Mutability},
    visitors::{ExportShape, ImportShape},
};
use oxc_ast::ast::VariableDeclarationKind;
use pretty_assertions::assert_eq;

fn module(source: &str) -> Result<Module> {
    Module::parse(ModuleId::new("/module.js"), source)
}

#[test]
fn test_export_surface_of_a_mixed_module() -> Result<()> {
    let module = module(
        "export let counter = 0;\n\
         export function bump() { counter += 1; }\n\
         const secret = 1;\n\
         export { secret as revealed };\n\
         export { other } from './other.js';\n\
         export default counter;",
    )?;
    let exports: Vec<_> = module
        .exports()
        .iter()
        .map(|record| (record.name.clone(), record.shape, record.mutable))
        .collect();
    assert_eq!(
        exports,
        vec![
            (
                "counter".to_owned(),
                ExportShape::Variable {
                    kind: VariableDeclarationKind::Let,
                    nested: false
                },
                Mutability::Mutable
            ),
            ("bump".to_owned(), ExportShape::Function, Mutability::Mutable),
            ("revealed".to_owned(), ExportShape::LocalSpecifier, Mutability::Immutable),
            ("other".to_owned(), ExportShape::ReExportNamed, Mutability::Unknown),
            ("default".to_owned(), ExportShape::Default, Mutability::Immutable),
        ]
    );
    Ok(())
}

#[test]
fn test_import_records_of_a_mixed_module() -> Result<()> {
    let module = module(
        "import './polyfill.js';\n\
         import React, { useState as state } from './react.js';\n\
         import * as path from './path.js';\n\
         const fs = require('./fs.js');\n\
         const { join } = require('./path.js');",
    )?;
    let imports: Vec<_> = module
        .imports()
        .iter()
        .map(|record| {
            (
                record.source.clone(),
                record.imported_name.clone(),
                record.local_name.clone(),
                record.shape,
            )
        })
        .collect();
    let owned = |value: &str| Some(value.to_owned());
    assert_eq!(
        imports,
        vec![
            ("./polyfill.js".to_owned(), None, None, ImportShape::SideEffect),
            ("./react.js".to_owned(), owned("default"), owned("React"), ImportShape::Default),
            ("./react.js".to_owned(), owned("useState"), owned("state"), ImportShape::Named),
            ("./path.js".to_owned(), owned("*"), owned("path"), ImportShape::Namespace),
            ("./fs.js".to_owned(), owned("default"), owned("fs"), ImportShape::Require),
            ("./path.js".to_owned(), owned("join"), owned("join"), ImportShape::RequireDestructured),
        ]
    );
    Ok(())
}

#[test]
fn test_parse_errors_name_the_module() {
    let err = module("let = ;").expect_err("syntax error");
    assert!(matches!(
        err.downcast_ref::<HoistError>(),
        Some(HoistError::Parse { module, .. }) if module.as_str() == "/module.js"
    ));
}

#[test]
fn test_computed_dynamic_import_is_unsupported() {
    let err = module("import(name);").expect_err("computed specifier");
    assert!(matches!(
        err.downcast_ref::<HoistError>(),
        Some(HoistError::UnsupportedSyntax { .. })
    ));
}

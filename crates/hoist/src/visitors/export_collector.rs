//! Export collection visitor for JavaScript modules
//!
//! Identifies every binding a module makes available: ES `export`
//! statements of all forms, plus CommonJS `module.exports` / `exports.x`
//! assignments made at the top level of the module.

use std::cell::Cell;

use anyhow::Result;
use log::trace;
use oxc_ast::ast::{
    AssignmentExpression, AssignmentOperator, AssignmentTarget, BindingPatternKind, Declaration,
    ExportAllDeclaration, ExportDefaultDeclaration, ExportDefaultDeclarationKind,
    ExportNamedDeclaration, Expression, ModuleExportName, ObjectPropertyKind, Program,
    PropertyKind, VariableDeclarationKind,
};
use oxc_ast_visit::{Visit, walk};
use oxc_semantic::{ScopeFlags, ScopeId, Scoping, SymbolId};
use oxc_span::Span;

use crate::{
    error::HoistError,
    types::{ModuleId, Mutability},
    visitors::utils::{ScopeDepth, is_constant, is_global_named, reference_symbol, static_key_name},
};

/// Every syntactic form an export can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// `export * from "x"`
    ReExportAll,
    /// `export { a as b } from "x"` and `export * as ns from "x"`
    ReExportNamed,
    /// `export { a, b as c }`
    LocalSpecifier,
    /// `export function f() {}`
    Function,
    /// `export class C {}`
    Class,
    /// `export const a = 1`; `nested` leaves come from a destructuring pattern
    Variable {
        kind: VariableDeclarationKind,
        nested: bool,
    },
    /// `export default <expr>`
    Default,
    /// `module.exports = <expr>`
    CommonJsDefault,
    /// `exports.x = <expr>` and `module.exports.x = <expr>`
    CommonJsNamed,
    /// One property of `module.exports = { a, b }`
    CommonJsObjectProperty,
}

/// One named binding a module makes available
#[derive(Debug, Clone)]
pub struct ExportRecord {
    pub name: String,
    pub shape: ExportShape,
    /// Export statement, or the assignment expression for CommonJS forms
    pub statement: Span,
    /// Symbol of the local binding, when there is one
    pub local: Option<SymbolId>,
    /// Name of the local binding as written in the source
    pub local_name: Option<String>,
    pub mutable: Mutability,
    /// Name in the source module, for re-exports
    pub imported_name: Option<String>,
    /// Specifier of the source module, for re-exports
    pub source: Option<String>,
}

impl ExportRecord {
    fn new(name: impl Into<String>, shape: ExportShape, statement: Span) -> Self {
        Self {
            name: name.into(),
            shape,
            statement,
            local: None,
            local_name: None,
            mutable: Mutability::Mutable,
            imported_name: None,
            source: None,
        }
    }

    fn bound(mut self, symbol: Option<SymbolId>, name: &str) -> Self {
        self.local = symbol;
        self.local_name = Some(name.to_owned());
        self
    }

    pub fn is_proxy(&self) -> bool {
        matches!(
            self.shape,
            ExportShape::ReExportAll | ExportShape::ReExportNamed
        )
    }

    pub fn is_commonjs(&self) -> bool {
        matches!(
            self.shape,
            ExportShape::CommonJsDefault
                | ExportShape::CommonJsNamed
                | ExportShape::CommonJsObjectProperty
        )
    }
}

/// Name exported by a CommonJS assignment, if `assignment` is one
///
/// `module` and `exports` must be unshadowed globals. Whether the assignment
/// sits in the module scope is the caller's concern.
pub fn commonjs_export_name(scoping: &Scoping, assignment: &AssignmentExpression<'_>) -> Option<String> {
    if assignment.operator != AssignmentOperator::Assign {
        return None;
    }
    let AssignmentTarget::StaticMemberExpression(target) = &assignment.left else {
        return None;
    };
    if target.optional {
        return None;
    }
    let property = target.property.name.as_str();

    if is_global_named(scoping, &target.object, "module") {
        return (property == "exports").then(|| "default".to_owned());
    }
    if is_global_named(scoping, &target.object, "exports") {
        return Some(property.to_owned());
    }
    match &target.object {
        Expression::StaticMemberExpression(inner)
            if !inner.optional
                && inner.property.name == "exports"
                && is_global_named(scoping, &inner.object, "module") =>
        {
            Some(property.to_owned())
        }
        _ => None,
    }
}

/// Visitor that collects export records from a module
#[derive(Debug)]
pub struct ExportCollector<'s> {
    scoping: &'s Scoping,
    module: &'s ModuleId,
    depth: ScopeDepth,
    exports: Vec<ExportRecord>,
    error: Option<HoistError>,
}

impl<'s> ExportCollector<'s> {
    pub fn new(scoping: &'s Scoping, module: &'s ModuleId) -> Self {
        Self {
            scoping,
            module,
            depth: ScopeDepth::default(),
            exports: Vec::new(),
            error: None,
        }
    }

    /// Analyze a module and return its export records in source order
    pub fn analyze(
        program: &Program<'_>,
        scoping: &'s Scoping,
        module: &'s ModuleId,
    ) -> Result<Vec<ExportRecord>> {
        let mut collector = Self::new(scoping, module);
        collector.visit_program(program);
        if let Some(error) = collector.error {
            return Err(error.into());
        }
        trace!("Collected {} exports from {}", collector.exports.len(), module);
        Ok(collector.exports)
    }

    fn re_export_specifiers(&mut self, it: &ExportNamedDeclaration<'_>, source: &str) {
        for specifier in &it.specifiers {
            let mut record =
                ExportRecord::new(specifier.exported.name(), ExportShape::ReExportNamed, it.span);
            record.imported_name = Some(specifier.local.name().to_string());
            record.mutable = Mutability::Unknown;
            record.source = Some(source.to_owned());
            self.exports.push(record);
        }
    }

    fn local_specifiers(&mut self, it: &ExportNamedDeclaration<'_>) {
        for specifier in &it.specifiers {
            let symbol = match &specifier.local {
                ModuleExportName::IdentifierReference(ident) => reference_symbol(self.scoping, ident),
                _ => None,
            };
            let mut record =
                ExportRecord::new(specifier.exported.name(), ExportShape::LocalSpecifier, it.span)
                    .bound(symbol, &specifier.local.name());
            record.mutable = match symbol {
                Some(symbol) => Mutability::from_bool(!is_constant(self.scoping.symbol_flags(symbol))),
                None => Mutability::Mutable,
            };
            self.exports.push(record);
        }
    }

    fn declaration(&mut self, statement: Span, declaration: &Declaration<'_>) {
        match declaration {
            Declaration::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    let mut record = ExportRecord::new(id.name, ExportShape::Function, statement)
                        .bound(id.symbol_id.get(), &id.name);
                    record.mutable = Mutability::Mutable;
                    self.exports.push(record);
                }
            }
            Declaration::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    let mut record = ExportRecord::new(id.name, ExportShape::Class, statement)
                        .bound(id.symbol_id.get(), &id.name);
                    record.mutable = Mutability::Immutable;
                    self.exports.push(record);
                }
            }
            Declaration::VariableDeclaration(variables) => {
                let kind = variables.kind;
                let mutable = Mutability::from_bool(kind != VariableDeclarationKind::Const);
                for declarator in &variables.declarations {
                    let nested = !matches!(declarator.id.kind, BindingPatternKind::BindingIdentifier(_));
                    for id in declarator.id.get_binding_identifiers() {
                        let shape = ExportShape::Variable { kind, nested };
                        let mut record = ExportRecord::new(id.name, shape, statement)
                            .bound(id.symbol_id.get(), &id.name);
                        record.mutable = mutable;
                        self.exports.push(record);
                    }
                }
            }
            _ => {
                self.error.get_or_insert_with(|| {
                    HoistError::unsupported(self.module, "unknown export declaration type")
                });
            }
        }
    }

    fn default_export(&mut self, it: &ExportDefaultDeclaration<'_>) {
        let local = match &it.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => function.id.as_ref(),
            ExportDefaultDeclarationKind::ClassDeclaration(class) => class.id.as_ref(),
            _ => None,
        };
        let mut record = ExportRecord::new("default", ExportShape::Default, it.span);
        if let Some(id) = local {
            record = record.bound(id.symbol_id.get(), &id.name);
        }
        record.mutable = Mutability::Immutable;
        self.exports.push(record);
    }

    fn commonjs_assignment(&mut self, assignment: &AssignmentExpression<'_>, name: String) {
        if name == "default"
            && let Some(keys) = plain_object_keys(&assignment.right)
        {
            for key in keys {
                self.exports.push(ExportRecord::new(
                    key,
                    ExportShape::CommonJsObjectProperty,
                    assignment.span,
                ));
            }
            return;
        }
        let shape = if name == "default" {
            ExportShape::CommonJsDefault
        } else {
            ExportShape::CommonJsNamed
        };
        self.exports.push(ExportRecord::new(name, shape, assignment.span));
    }
}

/// Keys of a non-empty object literal made only of identifier-keyed plain
/// properties
fn plain_object_keys<'a>(expression: &Expression<'a>) -> Option<Vec<&'a str>> {
    let Expression::ObjectExpression(object) = expression else {
        return None;
    };
    if object.properties.is_empty() {
        return None;
    }
    object
        .properties
        .iter()
        .map(|property| match property {
            ObjectPropertyKind::ObjectProperty(property) if property.kind == PropertyKind::Init => {
                static_key_name(&property.key, property.computed)
            }
            _ => None,
        })
        .collect()
}

impl<'a> Visit<'a> for ExportCollector<'_> {
    fn enter_scope(&mut self, _flags: ScopeFlags, _scope_id: &Cell<Option<ScopeId>>) {
        self.depth.enter();
    }

    fn leave_scope(&mut self) {
        self.depth.leave();
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        let mut record = match &it.exported {
            Some(exported) => {
                let mut record = ExportRecord::new(exported.name(), ExportShape::ReExportNamed, it.span);
                record.imported_name = Some("*".to_owned());
                record
            }
            None => ExportRecord::new("*", ExportShape::ReExportAll, it.span),
        };
        record.mutable = Mutability::Unknown;
        record.source = Some(it.source.value.to_string());
        self.exports.push(record);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        match (&it.declaration, &it.source) {
            (Some(declaration), _) => self.declaration(it.span, declaration),
            (None, Some(source)) => self.re_export_specifiers(it, &source.value),
            (None, None) => self.local_specifiers(it),
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        self.default_export(it);
        walk::walk_export_default_declaration(self, it);
    }

    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        if self.depth.is_module_scope()
            && let Some(name) = commonjs_export_name(self.scoping, it)
        {
            self.commonjs_assignment(it, name);
        }
        walk::walk_assignment_expression(self, it);
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_program;

    fn exports(source: &str) -> Vec<ExportRecord> {
        let module = ModuleId::new("/test.js");
        let allocator = Allocator::default();
        let parsed = parse_program(&allocator, &module, source).expect("parse");
        ExportCollector::analyze(&parsed.program, &parsed.scoping, &module).expect("exports")
    }

    fn summary(records: &[ExportRecord]) -> Vec<(String, Mutability)> {
        records
            .iter()
            .map(|record| (record.name.clone(), record.mutable))
            .collect()
    }

    #[test]
    fn test_export_specifier_mutability() {
        let records = exports("const a = 1; let b = 2; class C {} export { a, b as c, C };");
        assert_eq!(
            summary(&records),
            vec![
                ("a".to_owned(), Mutability::Immutable),
                ("c".to_owned(), Mutability::Mutable),
                ("C".to_owned(), Mutability::Immutable),
            ]
        );
        assert!(records.iter().all(|r| r.shape == ExportShape::LocalSpecifier));
        assert_eq!(records[1].local_name.as_deref(), Some("b"));
        assert!(records.iter().all(|r| r.local.is_some()));
    }

    #[test]
    fn test_function_and_class_declarations() {
        let records = exports("export function f() {} export class K {}");
        assert_eq!(
            summary(&records),
            vec![
                ("f".to_owned(), Mutability::Mutable),
                ("K".to_owned(), Mutability::Immutable),
            ]
        );
    }

    #[test]
    fn test_nested_destructuring_leaves() {
        let records = exports("export const { a, b: [c, { d }] } = obj, e = 1;");
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
        let nested: Vec<_> = records
            .iter()
            .map(|r| matches!(r.shape, ExportShape::Variable { nested: true, .. }))
            .collect();
        assert_eq!(nested, vec![true, true, true, false]);
        assert!(records.iter().all(|r| r.mutable == Mutability::Immutable));
        assert!(records.iter().all(|r| r.statement == records[0].statement));
    }

    #[test]
    fn test_re_exports_are_proxies() {
        let records = exports("export * from './a.js'; export { x as y } from './b.js';");
        assert_eq!(records[0].name, "*");
        assert_eq!(records[0].mutable, Mutability::Unknown);
        assert_eq!(records[1].name, "y");
        assert_eq!(records[1].imported_name.as_deref(), Some("x"));
        assert_eq!(records[1].source.as_deref(), Some("./b.js"));
        assert!(records.iter().all(ExportRecord::is_proxy));
    }

    #[test]
    fn test_commonjs_assignments() {
        let records = exports(
            "module.exports = function () {}; exports.a = 1; module.exports.b = 2; function f() { exports.c = 3; }",
        );
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["default", "a", "b"]);
        assert_eq!(records[0].shape, ExportShape::CommonJsDefault);
        assert!(records.iter().all(ExportRecord::is_commonjs));
    }

    #[test]
    fn test_commonjs_in_blocks_is_ignored() {
        let records = exports("if (ok) exports.a = 1; if (ok) { exports.b = 2; } x = exports.c = 3;");
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_commonjs_object_literal_splits() {
        let records = exports("module.exports = { a, b: 2 };");
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(
            records
                .iter()
                .all(|r| r.shape == ExportShape::CommonJsObjectProperty)
        );
    }

    #[test]
    fn test_shadowed_module_is_not_commonjs() {
        let records = exports("var module = {}; module.exports = 1; var exports = {}; exports.a = 1;");
        assert!(records.is_empty());
    }

    #[test]
    fn test_default_export() {
        let records = exports("export default function named() {}");
        assert_eq!(records[0].name, "default");
        assert_eq!(records[0].mutable, Mutability::Immutable);
        assert_eq!(records[0].local_name.as_deref(), Some("named"));

        let records = exports("export default class {}");
        assert!(records[0].local.is_none());
    }
}

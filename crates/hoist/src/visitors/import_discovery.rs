//! Import discovery visitor
//!
//! Finds every binding a module consumes from another module: static import
//! declarations, re-exports with a source, literal dynamic `import()` and
//! top-level CommonJS `require()` calls.

use std::cell::Cell;

use anyhow::Result;
use log::trace;
use oxc_ast::ast::{
    Argument, BindingIdentifier, BindingPattern, BindingPatternKind, CallExpression,
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, ImportExpression, ImportPhase, Program, VariableDeclarator,
};
use oxc_ast_visit::{Visit, walk};
use oxc_semantic::{ScopeFlags, ScopeId, Scoping, SymbolId};
use oxc_span::Span;
use rustc_hash::FxHashSet;

use crate::{
    error::HoistError,
    types::ModuleId,
    visitors::utils::{ScopeDepth, is_global_named, static_key_name},
};

/// Every syntactic form an import can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportShape {
    /// `import "x"`
    SideEffect,
    /// `import a from "x"`
    Default,
    /// `import { a as b } from "x"`
    Named,
    /// `import * as ns from "x"`
    Namespace,
    /// `export { a as b } from "x"` and `export * as ns from "x"`
    ReExport,
    /// `export * from "x"`
    ReExportAll,
    /// `import("x")`
    Dynamic,
    /// `require("x")` consumed as a whole
    Require,
    /// One key of `const { a, b } = require("x")`
    RequireDestructured,
}

/// One binding a module consumes from another module
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// `None` for side-effect imports
    pub imported_name: Option<String>,
    pub local_name: Option<String>,
    /// Symbol of the local binding
    pub local: Option<SymbolId>,
    /// Import or export declaration; the call itself for `require()` and `import()`
    pub statement: Span,
    pub source: String,
    pub shape: ImportShape,
}

impl ImportRecord {
    fn new(shape: ImportShape, statement: Span, source: impl Into<String>) -> Self {
        Self {
            imported_name: None,
            local_name: None,
            local: None,
            statement,
            source: source.into(),
            shape,
        }
    }

    fn named(mut self, imported: impl Into<String>) -> Self {
        self.imported_name = Some(imported.into());
        self
    }

    fn bound(mut self, local: &BindingIdentifier<'_>) -> Self {
        self.local_name = Some(local.name.to_string());
        self.local = local.symbol_id.get();
        self
    }

    pub fn is_commonjs(&self) -> bool {
        matches!(
            self.shape,
            ImportShape::Require | ImportShape::RequireDestructured
        )
    }

    pub const fn is_dynamic(&self) -> bool {
        matches!(self.shape, ImportShape::Dynamic)
    }

    pub const fn is_proxy(&self) -> bool {
        matches!(self.shape, ImportShape::ReExport | ImportShape::ReExportAll)
    }
}

/// Source specifier of a `require("x")` call, if `call` is one
///
/// `require` must be an unshadowed global. Whether the call sits in the
/// module scope is the caller's concern.
pub fn require_specifier<'a>(scoping: &Scoping, call: &CallExpression<'a>) -> Option<&'a str> {
    if call.optional
        || call.arguments.len() != 1
        || !is_global_named(scoping, &call.callee, "require")
    {
        return None;
    }
    match &call.arguments[0] {
        Argument::StringLiteral(literal) => Some(literal.value.as_str()),
        _ => None,
    }
}

/// `(key, local)` pairs of `{ a, b: c }` where every key and value is a
/// plain identifier
fn flat_object_pattern<'p, 'a>(
    pattern: &'p BindingPattern<'a>,
) -> Option<Vec<(&'a str, &'p BindingIdentifier<'a>)>> {
    let BindingPatternKind::ObjectPattern(object) = &pattern.kind else {
        return None;
    };
    if object.properties.is_empty() || object.rest.is_some() {
        return None;
    }
    object
        .properties
        .iter()
        .map(|property| {
            let key = static_key_name(&property.key, property.computed)?;
            match &property.value.kind {
                BindingPatternKind::BindingIdentifier(local) => Some((key, local.as_ref())),
                _ => None,
            }
        })
        .collect()
}

/// Visitor that discovers import records in a module
#[derive(Debug)]
pub struct ImportDiscoveryVisitor<'s> {
    scoping: &'s Scoping,
    module: &'s ModuleId,
    depth: ScopeDepth,
    /// `require()` calls already recorded through their declarator
    claimed: FxHashSet<Span>,
    imports: Vec<ImportRecord>,
    error: Option<HoistError>,
}

impl<'s> ImportDiscoveryVisitor<'s> {
    pub fn new(scoping: &'s Scoping, module: &'s ModuleId) -> Self {
        Self {
            scoping,
            module,
            depth: ScopeDepth::default(),
            claimed: FxHashSet::default(),
            imports: Vec::new(),
            error: None,
        }
    }

    /// Discover the imports of a module in source order
    pub fn analyze(
        program: &Program<'_>,
        scoping: &'s Scoping,
        module: &'s ModuleId,
    ) -> Result<Vec<ImportRecord>> {
        let mut visitor = Self::new(scoping, module);
        visitor.visit_program(program);
        if let Some(error) = visitor.error {
            return Err(error.into());
        }
        trace!("Discovered {} imports in {}", visitor.imports.len(), module);
        Ok(visitor.imports)
    }

    fn fail(&mut self, detail: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(HoistError::unsupported(self.module, detail));
        }
    }

    fn require_call(&mut self, call: Span, specifier: &str, target: Option<&BindingPattern<'_>>) {
        if let Some(keys) = target.and_then(flat_object_pattern) {
            for (key, local) in keys {
                let record = ImportRecord::new(ImportShape::RequireDestructured, call, specifier)
                    .named(key)
                    .bound(local);
                self.imports.push(record);
            }
            return;
        }

        let mut record = ImportRecord::new(ImportShape::Require, call, specifier).named("default");
        if let Some(BindingPatternKind::BindingIdentifier(local)) = target.map(|t| &t.kind) {
            record = record.bound(local);
        }
        self.imports.push(record);
    }
}

impl<'a> Visit<'a> for ImportDiscoveryVisitor<'_> {
    fn enter_scope(&mut self, _flags: ScopeFlags, _scope_id: &Cell<Option<ScopeId>>) {
        self.depth.enter();
    }

    fn leave_scope(&mut self) {
        self.depth.leave();
    }

    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        let source = it.source.value.as_str();
        if let Some(phase) = it.phase {
            let phase = match phase {
                ImportPhase::Source => "source",
                ImportPhase::Defer => "defer",
            };
            self.fail(format!("`import {phase}` of \"{source}\" is not supported"));
            return;
        }
        let Some(specifiers) = it.specifiers.as_ref().filter(|s| !s.is_empty()) else {
            self.imports
                .push(ImportRecord::new(ImportShape::SideEffect, it.span, source));
            return;
        };
        for specifier in specifiers {
            let record = match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier) => {
                    ImportRecord::new(ImportShape::Default, it.span, source)
                        .named("default")
                        .bound(&specifier.local)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(specifier) => {
                    ImportRecord::new(ImportShape::Namespace, it.span, source)
                        .named("*")
                        .bound(&specifier.local)
                }
                ImportDeclarationSpecifier::ImportSpecifier(specifier) => {
                    ImportRecord::new(ImportShape::Named, it.span, source)
                        .named(specifier.imported.name())
                        .bound(&specifier.local)
                }
            };
            self.imports.push(record);
        }
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            for specifier in &it.specifiers {
                let mut record = ImportRecord::new(ImportShape::ReExport, it.span, source.value)
                    .named(specifier.local.name());
                record.local_name = Some(specifier.exported.name().to_string());
                self.imports.push(record);
            }
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        let shape = if it.exported.is_some() {
            ImportShape::ReExport
        } else {
            ImportShape::ReExportAll
        };
        let mut record = ImportRecord::new(shape, it.span, it.source.value).named("*");
        record.local_name = it.exported.as_ref().map(|name| name.name().to_string());
        self.imports.push(record);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        match &it.source {
            Expression::StringLiteral(literal) => {
                self.imports.push(
                    ImportRecord::new(ImportShape::Dynamic, it.span, literal.value).named("*"),
                );
            }
            _ => self.fail("import() requires a string literal argument"),
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if self.depth.is_module_scope()
            && let Some(Expression::CallExpression(call)) = &it.init
            && let Some(specifier) = require_specifier(self.scoping, call)
        {
            self.claimed.insert(call.span);
            self.require_call(call.span, specifier, Some(&it.id));
        }
        walk::walk_variable_declarator(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if self.depth.is_module_scope()
            && !self.claimed.contains(&it.span)
            && let Some(specifier) = require_specifier(self.scoping, it)
        {
            self.require_call(it.span, specifier, None);
        }
        walk::walk_call_expression(self, it);
    }
}

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_program;

    fn imports(source: &str) -> Result<Vec<ImportRecord>> {
        let module = ModuleId::new("/test.js");
        let allocator = Allocator::default();
        let parsed = parse_program(&allocator, &module, source)?;
        ImportDiscoveryVisitor::analyze(&parsed.program, &parsed.scoping, &module)
    }

    fn summary(records: &[ImportRecord]) -> Vec<(Option<&str>, Option<&str>, ImportShape)> {
        records
            .iter()
            .map(|r| (r.imported_name.as_deref(), r.local_name.as_deref(), r.shape))
            .collect()
    }

    #[test]
    fn test_static_import_forms() {
        let records = imports(
            "import './side.js'; import d, { a as b, c } from './x.js'; import * as ns from './y.js';",
        )
        .expect("imports");
        assert_eq!(
            summary(&records),
            vec![
                (None, None, ImportShape::SideEffect),
                (Some("default"), Some("d"), ImportShape::Default),
                (Some("a"), Some("b"), ImportShape::Named),
                (Some("c"), Some("c"), ImportShape::Named),
                (Some("*"), Some("ns"), ImportShape::Namespace),
            ]
        );
        assert_eq!(records[4].source, "./y.js");
        assert!(records[1].local.is_some());
    }

    #[test]
    fn test_import_phase_is_rejected() {
        let err = imports("import defer * as ns from './x.js'; ns.run();")
            .expect_err("deferred import");
        match err.downcast_ref::<HoistError>() {
            Some(HoistError::UnsupportedSyntax { module, detail }) => {
                assert_eq!(module.as_str(), "/test.js");
                assert!(detail.contains("import defer"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_re_exports_are_proxies() {
        let records =
            imports("export { a as b } from './a.js'; export * from './b.js';").expect("imports");
        assert_eq!(
            summary(&records),
            vec![
                (Some("a"), Some("b"), ImportShape::ReExport),
                (Some("*"), None, ImportShape::ReExportAll),
            ]
        );
        assert!(records.iter().all(ImportRecord::is_proxy));
    }

    #[test]
    fn test_dynamic_import() {
        let records = imports("import('./lazy.js').then(m => m);").expect("imports");
        assert_eq!(records.len(), 1);
        assert!(records[0].is_dynamic());
        assert_eq!(records[0].imported_name.as_deref(), Some("*"));

        let err = imports("import(name);").expect_err("non-literal import()");
        assert!(matches!(
            err.downcast_ref::<HoistError>(),
            Some(HoistError::UnsupportedSyntax { .. })
        ));
    }

    #[test]
    fn test_require_forms() {
        let records = imports(
            "const { a, b: c } = require('./x.js'); const whole = require('./y.js'); require('./z.js'); const [first] = require('./w.js');",
        )
        .expect("imports");
        assert_eq!(
            summary(&records),
            vec![
                (Some("a"), Some("a"), ImportShape::RequireDestructured),
                (Some("b"), Some("c"), ImportShape::RequireDestructured),
                (Some("default"), Some("whole"), ImportShape::Require),
                (Some("default"), None, ImportShape::Require),
                (Some("default"), None, ImportShape::Require),
            ]
        );
        assert!(records.iter().all(ImportRecord::is_commonjs));
        assert_eq!(records[0].statement, records[1].statement);
    }

    #[test]
    fn test_nested_or_shadowed_require_is_ignored() {
        let records = imports(
            "function load() { return require('./a.js'); } { const require = f; require('./b.js'); }",
        )
        .expect("imports");
        assert!(records.is_empty());
    }
}

//! Module analyzer
//!
//! A [`Module`] owns the source text of one module together with the records
//! the analyzer extracted from it. Analysis parses into a scratch arena that
//! is dropped as soon as the records are collected; the compiler calls
//! [`Module::parse_in`] to get a fresh tree it can rewrite. Parsing is
//! deterministic, so symbol ids and spans recorded during analysis identify
//! the same nodes in every later parse.

use anyhow::Result;
use log::debug;
use oxc_allocator::Allocator;
use oxc_semantic::{SymbolFlags, SymbolId};
use rustc_hash::FxHashSet;

use crate::{
    parser::{ParsedProgram, parse_program},
    types::ModuleId,
    visitors::{ExportCollector, ExportRecord, ImportDiscoveryVisitor, ImportRecord},
};

#[derive(Debug, Clone)]
pub struct Module {
    id: ModuleId,
    source: String,
    exports: Vec<ExportRecord>,
    imports: Vec<ImportRecord>,
    declared_names: Vec<String>,
    global_names: Vec<String>,
}

impl Module {
    /// Parse and analyze source text
    pub fn parse(id: ModuleId, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let allocator = Allocator::default();
        let ParsedProgram { program, scoping } = parse_program(&allocator, &id, &source)?;

        let exports = ExportCollector::analyze(&program, &scoping, &id)?;
        let imports = ImportDiscoveryVisitor::analyze(&program, &scoping, &id)?;

        let exported: FxHashSet<SymbolId> = exports.iter().filter_map(|record| record.local).collect();
        let mut root: Vec<(&str, SymbolId)> = scoping
            .get_bindings(scoping.root_scope_id())
            .iter()
            .map(|(name, symbol)| (*name, *symbol))
            .collect();
        root.sort_unstable_by_key(|(_, symbol)| *symbol);
        let declared_names = root
            .into_iter()
            .filter(|(_, symbol)| {
                !exported.contains(symbol) && !scoping.symbol_flags(*symbol).contains(SymbolFlags::Import)
            })
            .map(|(name, _)| name.to_owned())
            .collect();

        let mut global_names: Vec<String> = scoping
            .root_unresolved_references()
            .keys()
            .map(|name| (*name).to_owned())
            .collect();
        global_names.sort_unstable();

        debug!(
            "Analyzed module {} ({} exports, {} imports)",
            id,
            exports.len(),
            imports.len()
        );
        Ok(Self {
            id,
            source,
            exports,
            imports,
            declared_names,
            global_names,
        })
    }

    #[inline]
    pub const fn id(&self) -> &ModuleId {
        &self.id
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Export records in source order
    #[inline]
    pub fn exports(&self) -> &[ExportRecord] {
        &self.exports
    }

    /// Import records in source order
    #[inline]
    pub fn imports(&self) -> &[ImportRecord] {
        &self.imports
    }

    /// Top-level bindings that are neither imported nor exported, in
    /// declaration order
    #[inline]
    pub fn declared_names(&self) -> &[String] {
        &self.declared_names
    }

    /// Names referenced anywhere in the module without a declaration
    #[inline]
    pub fn global_names(&self) -> &[String] {
        &self.global_names
    }

    /// Parse the module again into `allocator`
    pub fn parse_in<'a>(&self, allocator: &'a Allocator) -> Result<ParsedProgram<'a>> {
        parse_program(allocator, &self.id, &self.source)
    }
}

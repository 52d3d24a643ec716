//! Source text to an analyzed oxc [`Program`]
//!
//! Parsing is delegated to `oxc_parser` and the symbol table to
//! `oxc_semantic`. Both run in a caller-provided arena, so the analyzer can
//! drop a tree as soon as its records are collected and the compiler can
//! re-parse a module into a fresh arena when it rewrites it.

use anyhow::Result;
use log::trace;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::{Scoping, SemanticBuilder};
use oxc_span::SourceType;

use crate::{error::HoistError, types::ModuleId};

/// A parsed module together with its scope and symbol table
#[derive(Debug)]
pub struct ParsedProgram<'a> {
    pub program: Program<'a>,
    pub scoping: Scoping,
}

fn parse_error(module: &ModuleId, messages: impl Iterator<Item = String>) -> HoistError {
    HoistError::Parse {
        module: module.clone(),
        message: messages.collect::<Vec<_>>().join("; "),
    }
}

/// Parse `source` as an ES module into `allocator`
///
/// The source text is copied into the arena, so the returned tree does not
/// borrow from the caller's string.
pub fn parse_program<'a>(
    allocator: &'a Allocator,
    module: &ModuleId,
    source: &str,
) -> Result<ParsedProgram<'a>> {
    let source = allocator.alloc_str(source);
    let ParserReturn {
        program,
        errors,
        panicked,
        ..
    } = Parser::new(allocator, source, SourceType::mjs()).parse();
    if panicked || !errors.is_empty() {
        return Err(parse_error(module, errors.iter().map(ToString::to_string)).into());
    }

    let semantic = SemanticBuilder::new().build(&program);
    if !semantic.errors.is_empty() {
        return Err(parse_error(module, semantic.errors.iter().map(ToString::to_string)).into());
    }
    let scoping = semantic.semantic.into_scoping();
    trace!(
        "Parsed {module}: {} statements, {} symbols",
        program.body.len(),
        scoping.symbols_len()
    );
    Ok(ParsedProgram { program, scoping })
}

#![allow(dead_code)]

use anyhow::Result;
use hoist::{Config, MemoryResolver, bundle, parser::parse_program, types::ModuleId};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use pretty_assertions::assert_eq;

/// Bundle in-memory `files` starting from the first one
pub fn bundle_files(files: &[(&str, &str)]) -> Result<String> {
    bundle_entries(files, &[files[0].0])
}

pub fn bundle_entries(files: &[(&str, &str)], entries: &[&str]) -> Result<String> {
    let resolver = MemoryResolver::from_files(files.iter().copied());
    bundle(entries, resolver, &Config::default())
}

/// Parse `source` as a module, failing on syntax errors
pub fn parse_check(source: &str) -> Result<()> {
    let allocator = Allocator::default();
    parse_program(&allocator, &ModuleId::new("/bundle.js"), source)?;
    Ok(())
}

/// Parse and re-print, so formatting differences do not matter
pub fn normalize(source: &str) -> String {
    let allocator = Allocator::default();
    let parsed =
        parse_program(&allocator, &ModuleId::new("/expected.js"), source).expect("valid JavaScript");
    Codegen::new().build(&parsed.program).code
}

#[track_caller]
pub fn assert_js_eq(actual: &str, expected: &str) {
    assert_eq!(normalize(actual), normalize(expected));
}

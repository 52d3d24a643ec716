//! Shared utilities for visitor implementations

use oxc_ast::ast::{Expression, IdentifierReference, PropertyKey};
use oxc_semantic::{Scoping, SymbolFlags, SymbolId};

/// Symbol an identifier reference resolves to, `None` for globals
pub fn reference_symbol(scoping: &Scoping, ident: &IdentifierReference<'_>) -> Option<SymbolId> {
    ident
        .reference_id
        .get()
        .and_then(|reference| scoping.get_reference(reference).symbol_id())
}

/// `ident` is `name` and is not shadowed by any declaration of the module
pub fn is_global_named(scoping: &Scoping, expression: &Expression<'_>, name: &str) -> bool {
    match expression {
        Expression::Identifier(ident) => {
            ident.name == name && reference_symbol(scoping, ident).is_none()
        }
        _ => false,
    }
}

/// Name of a non-computed identifier key
pub fn static_key_name<'a>(key: &PropertyKey<'a>, computed: bool) -> Option<&'a str> {
    match key {
        PropertyKey::StaticIdentifier(ident) if !computed => Some(ident.name.as_str()),
        _ => None,
    }
}

/// Bindings that can never be reassigned: `const`, classes and imports
pub fn is_constant(flags: SymbolFlags) -> bool {
    flags.intersects(SymbolFlags::ConstVariable | SymbolFlags::Class | SymbolFlags::Import)
}

/// Tracks how deep a visitor is below the module scope
///
/// The program itself is the first scope entered, so the module scope is
/// depth one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeDepth(usize);

impl ScopeDepth {
    pub fn enter(&mut self) {
        self.0 += 1;
    }

    pub fn leave(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    pub const fn is_module_scope(self) -> bool {
        self.0 == 1
    }
}

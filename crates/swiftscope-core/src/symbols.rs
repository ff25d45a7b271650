//! Symbol and symbolic-reference resolution seams.

use std::collections::HashMap;

use crate::address::Address;

/// Names code addresses (method implementations).
pub trait SymbolResolver {
    /// Demangled symbol at `address`, if any.
    fn symbol_name(&self, address: Address) -> Option<String>;
}

/// Turns a mangled type name (which may embed symbolic references) into a
/// canonical type name such as `Swift.Int`.
///
/// The decoders only hand over the address of the mangled name; they never
/// interpret the mangling grammar themselves.
pub trait SymbolicReferenceResolver {
    fn resolve(&self, mangled_name: Address) -> Option<String>;
}

/// Resolves nothing. Method entries get no names and fields no type names.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn symbol_name(&self, _address: Address) -> Option<String> {
        None
    }
}

impl SymbolicReferenceResolver for NoSymbols {
    fn resolve(&self, _mangled_name: Address) -> Option<String> {
        None
    }
}

/// Address-keyed name table, usable for both symbols and mangled names.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: HashMap<Address, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, name: impl Into<String>) {
        self.names.insert(address, name.into());
    }

    pub fn with(mut self, address: Address, name: impl Into<String>) -> Self {
        self.insert(address, name);
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn symbol_name(&self, address: Address) -> Option<String> {
        self.names.get(&address).cloned()
    }
}

impl SymbolicReferenceResolver for SymbolTable {
    fn resolve(&self, mangled_name: Address) -> Option<String> {
        self.names.get(&mangled_name).cloned()
    }
}

//! The process being inspected, as seen through its collaborators.

use std::rc::Rc;

use swiftscope_abi::DecodeLimits;
use swiftscope_core::{
    Address, Memory, NativeCall, NativeInvoker, NoSymbols, SymbolResolver,
    SymbolicReferenceResolver,
};

use crate::Result;
use crate::config::Config;

/// Handles to the target's memory, code and symbols.
///
/// Cheap to clone; every type and value built from it keeps a copy.
#[derive(Clone)]
pub struct Target {
    memory: Rc<dyn Memory>,
    invoker: Rc<dyn NativeInvoker>,
    symbols: Rc<dyn SymbolResolver>,
    references: Rc<dyn SymbolicReferenceResolver>,
    config: Config,
}

impl Target {
    /// A target without symbol information.
    pub fn new(memory: Rc<dyn Memory>, invoker: Rc<dyn NativeInvoker>) -> Self {
        Self {
            memory,
            invoker,
            symbols: Rc::new(NoSymbols),
            references: Rc::new(NoSymbols),
            config: Config::default(),
        }
    }

    pub fn with_symbols(mut self, symbols: Rc<dyn SymbolResolver>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_references(mut self, references: Rc<dyn SymbolicReferenceResolver>) -> Self {
        self.references = references;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn memory(&self) -> &dyn Memory {
        &*self.memory
    }

    pub(crate) fn memory_handle(&self) -> Rc<dyn Memory> {
        Rc::clone(&self.memory)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.config.limits
    }

    pub fn symbol_name(&self, address: Address) -> Option<String> {
        self.symbols.symbol_name(address)
    }

    pub fn resolve_type_name(&self, mangled_name: Address) -> Option<String> {
        self.references.resolve(mangled_name)
    }

    pub fn call(&self, call: NativeCall<'_>) -> Result<u64> {
        tracing::trace!(function = %call.function, args = call.args.len(), "native call");
        Ok(self.invoker.invoke(call)?)
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target").field("config", &self.config).finish_non_exhaustive()
    }
}

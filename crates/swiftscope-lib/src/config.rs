//! Decoding configuration.

use swiftscope_abi::DecodeLimits;

/// Configuration for building types from descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Upper bounds applied to untrusted metadata
    pub limits: DecodeLimits,
    /// Name vtable entries through the symbol resolver
    pub resolve_method_names: bool,
    /// Build initializer capabilities from `Init` method symbols
    pub bind_initializers: bool,
    /// Check enum case classification against the descriptor's counts
    pub verify_enum_cases: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: DecodeLimits::default(),
            resolve_method_names: true,
            bind_initializers: true,
            verify_enum_cases: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn resolve_method_names(mut self, value: bool) -> Self {
        self.resolve_method_names = value;
        self
    }

    /// Initializers need method names; disabling name resolution disables
    /// them too.
    pub fn bind_initializers(mut self, value: bool) -> Self {
        self.bind_initializers = value;
        self
    }

    pub fn verify_enum_cases(mut self, value: bool) -> Self {
        self.verify_enum_cases = value;
        self
    }
}

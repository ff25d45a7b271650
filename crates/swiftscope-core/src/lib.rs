#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Target-process seams for swiftscope.
//!
//! The metadata decoders never touch a process directly. Everything they
//! need from the outside world goes through the traits defined here:
//! - [`Memory`]: typed reads, writes, allocation
//! - [`NativeInvoker`]: calling a function in the target
//! - [`SymbolResolver`] / [`SymbolicReferenceResolver`]: naming addresses
//!
//! Two in-memory implementations ship with the crate so tooling and tests
//! can run against a synthetic image instead of a live process:
//! [`MemoryImage`] (with [`ImageBuilder`] to lay it out) and
//! [`FunctionTable`].

mod address;
mod image;
mod invoke;
mod memory;
mod symbols;

#[cfg(test)]
mod address_tests;

pub use address::{Address, POINTER_SIZE};
pub use image::{FunctionTable, ImageBuilder, MemoryImage, NativeFn};
pub use invoke::{CallError, NativeCall, NativeInvoker};
pub use memory::{Memory, MemoryError};
pub use symbols::{NoSymbols, SymbolResolver, SymbolTable, SymbolicReferenceResolver};

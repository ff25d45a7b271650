//! Swift type and value model over runtime metadata.
//!
//! # Example
//!
//! ```ignore
//! use swiftscope_lib::{Registry, Target};
//!
//! let target = Target::new(memory, invoker).with_symbols(symbols);
//! let mut registry = Registry::new(target);
//! registry.load_type_records(section, count)?;
//! if let Some(big) = registry.type_by_name("dummy.BigStruct") {
//!     println!("{}", big.to_json()?);
//! }
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod registry;
pub mod signature;
pub mod target;
pub mod types;
pub mod value;


pub use config::Config;
pub use registry::{Registry, TypeRegistry};
pub use signature::MethodSignature;
pub use swiftscope_abi::DecodeLimits;
pub use target::Target;
pub use types::{
    Argument, Class, Conformance, Enum, EnumCase, FieldDetails, Initializer, MethodDetails,
    Protocol, ProtocolComposition, Struct, Type, TypeInfo,
};
pub use value::{EnumValue, ObjectInstance, RuntimeInstance, StructValue, ValueInstance};

use swiftscope_abi::{DecodeError, Precondition};
use swiftscope_core::{CallError, MemoryError};

/// Errors surfaced by the type and value model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// A call into the target failed.
    #[error(transparent)]
    Call(#[from] CallError),

    /// The type registry has no type by this name.
    #[error("unknown type `{0}`")]
    UnknownType(String),
}

impl From<swiftscope_abi::Error> for Error {
    fn from(err: swiftscope_abi::Error) -> Self {
        match err {
            swiftscope_abi::Error::Memory(e) => Self::Memory(e),
            swiftscope_abi::Error::Decode(e) => Self::Decode(e),
            swiftscope_abi::Error::Precondition(e) => Self::Precondition(e),
        }
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, Error>;

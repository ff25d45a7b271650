//! Decoder errors.
//!
//! Three classes, never retried:
//! - [`MemoryError`]: a read hit unmapped or misaligned memory
//! - [`DecodeError`]: the bytes do not describe what the ABI says they should
//! - [`Precondition`]: the caller asked for something the type cannot provide

use swiftscope_core::{Address, MemoryError};

use crate::kind::{ContextDescriptorKind, MetadataKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown context descriptor kind {raw} at {address}")]
    UnknownContextKind { address: Address, raw: u8 },
    #[error("unknown metadata kind {raw:#x} at {address}")]
    UnknownMetadataKind { address: Address, raw: u64 },
    #[error("unknown method descriptor kind {raw} at {address}")]
    UnknownMethodKind { address: Address, raw: u8 },
    #[error("unknown field descriptor kind {raw} at {address}")]
    UnknownFieldDescriptorKind { address: Address, raw: u16 },
    #[error("unknown type reference kind {raw} at {address}")]
    UnknownTypeReferenceKind { address: Address, raw: u8 },
    #[error("expected a {expected} descriptor at {address}, found {found:?}")]
    UnexpectedKind {
        address: Address,
        expected: &'static str,
        found: ContextDescriptorKind,
    },
    #[error("string at {address} is not valid UTF-8")]
    InvalidUtf8 { address: Address },
    #[error("string at {address} is not terminated within {limit} bytes")]
    UnterminatedString { address: Address, limit: usize },
    #[error("required relative pointer at {address} is null")]
    NullPointer { address: Address },
    #[error("vtable at {start} with {size} slots overflows the address space")]
    VTableOverflow { start: Address, size: u32 },
    #[error("vtable at {start} declares {size} slots (limit {limit})")]
    VTableTooLarge { start: Address, size: u32, limit: u32 },
    #[error("field descriptor at {address} declares {count} fields (limit {limit})")]
    TooManyFields {
        address: Address,
        count: u32,
        limit: u32,
    },
    #[error("field record size {size} at {address} is smaller than {min}")]
    FieldRecordSize { address: Address, size: u16, min: u16 },
    #[error(
        "enum at {address}: field records hold {payload} payload and {empty} empty cases, \
         descriptor declares {expected_payload} and {expected_empty}"
    )]
    EnumCaseMismatch {
        address: Address,
        payload: u32,
        empty: u32,
        expected_payload: u32,
        expected_empty: u32,
    },
    #[error("enum at {address} declares {payload} payload and {empty} empty cases, overflowing the case count")]
    CaseCountOverflow { address: Address, payload: u32, empty: u32 },
    #[error("context at {address} has no enclosing module within {depth} levels")]
    MissingModule { address: Address, depth: usize },
}

/// Caller misuse. Always fatal to the current operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    #[error("metadata kind {kind:?} has no value witness table")]
    NoValueWitnesses { kind: MetadataKind },
    #[error("`{type_name}` is generic; its layout depends on the instantiation")]
    GenericLayout { type_name: String },
    #[error("`{type_name}` is generic and has no unspecialized metadata")]
    NoMetadata { type_name: String },
    #[error("`{type_name}` has no enum value witnesses")]
    NoEnumWitnesses { type_name: String },
    #[error("case `{case}` requires an associated value")]
    PayloadRequired { case: String },
    #[error("case `{case}` has no associated value")]
    UnexpectedPayload { case: String },
    #[error("enum `{type_name}` has no empty value")]
    EmptyEnumValue { type_name: String },
    #[error("`{type_name}` has no case `{case}`")]
    UnknownCase { type_name: String, case: String },
    #[error("case index {index} out of range for {count} cases")]
    CaseIndexOutOfRange { index: usize, count: usize },
    #[error("`{name}` takes {expected} arguments, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument {index} of `{name}` expects `{expected}`, got `{actual}`")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("argument {index} of `{name}` is a {size}-byte value; only single-word values can be passed")]
    UnsupportedArgument {
        name: String,
        index: usize,
        size: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Precondition(#[from] Precondition),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Upper bounds applied while decoding untrusted metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Longest NUL-terminated name read before giving up.
    pub max_name_len: usize,
    /// Largest vtable (in slots) a class descriptor may declare.
    pub max_vtable_size: u32,
    /// Largest field count a field descriptor may declare.
    pub max_fields: u32,
    /// Deepest parent chain walked when looking for the module context.
    pub max_context_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_name_len: 4096,
            max_vtable_size: 1 << 16,
            max_fields: 1 << 16,
            max_context_depth: 64,
        }
    }
}

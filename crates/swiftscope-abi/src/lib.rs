#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Decoders for Swift runtime type metadata (64-bit layout).
//!
//! This crate contains:
//! - Relative pointer resolution and packed flag words
//! - Context descriptors (module, protocol, class, struct, enum)
//! - Value witness tables, field descriptors, class vtables
//! - Type metadata and protocol conformance records
//!
//! All reads go through [`swiftscope_core::Memory`]; nothing here calls
//! into the target.

pub mod conformance;
pub mod descriptor;
pub mod error;
pub mod flags;
pub mod kind;
pub mod layout;
pub mod metadata;
pub mod records;
pub mod relative;
pub mod strings;
pub mod vtable;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

#[cfg(test)]
mod vtable_tests;

pub use conformance::{
    ProtocolConformanceDescriptor, TypeMetadataRecord, TypeReference, read_conformance_records,
    read_type_records,
};
pub use descriptor::{
    CaseKind, ClassDescriptor, ContextDescriptor, Descriptor, EnumDescriptor, ModuleDescriptor,
    ProtocolDescriptor, StructDescriptor, TypeContextDescriptor,
};
pub use error::{DecodeError, DecodeLimits, Error, Precondition, Result};
pub use flags::{
    ConformanceFlags, ContextDescriptorFlags, FieldRecordFlags, MethodDescriptorFlags,
    ProtocolContextDescriptorFlags, TypeContextDescriptorFlags, ValueWitnessFlags,
};
pub use kind::{
    ContextDescriptorKind, FieldDescriptorKind, MetadataInitialization, MetadataKind, MethodKind,
    ProtocolClassConstraint, TypeReferenceKind,
};
pub use metadata::{EnumValueWitnesses, Metadata, TypeLayout, ValueWitnessTable};
pub use records::{FieldDescriptor, FieldRecord};
pub use relative::{RelativeKind, RelativePointer};
pub use vtable::{MethodDescriptor, VTableDescriptorHeader};

//! Field offsets of the 64-bit Swift metadata ABI.
//!
//! Every offset is relative to the start of its record. A 32-bit target would
//! need a parallel table; only 64-bit layouts are described here.

/// Fields common to every context descriptor.
pub mod context {
    pub const FLAGS: u64 = 0x0;
    /// Indirectable relative pointer to the parent context.
    pub const PARENT: u64 = 0x4;
}

pub mod module {
    pub const NAME: u64 = 0x8;
}

/// Fields shared by class, struct and enum descriptors.
pub mod type_context {
    pub const NAME: u64 = 0x8;
    pub const ACCESS_FUNCTION: u64 = 0xC;
    pub const FIELDS: u64 = 0x10;
}

pub mod class {
    pub const SUPERCLASS_TYPE: u64 = 0x14;
    pub const METADATA_NEGATIVE_SIZE_IN_WORDS: u64 = 0x18;
    pub const METADATA_POSITIVE_SIZE_IN_WORDS: u64 = 0x1C;
    pub const NUM_IMMEDIATE_MEMBERS: u64 = 0x20;
    pub const NUM_FIELDS: u64 = 0x24;
    pub const FIELD_OFFSET_VECTOR_OFFSET: u64 = 0x28;
    /// First trailing object of a non-generic class descriptor.
    pub const TRAILING_OBJECTS: u64 = 0x2C;

    pub const RESILIENT_SUPERCLASS_SIZE: u64 = 4;
    pub const FOREIGN_METADATA_INITIALIZATION_SIZE: u64 = 4;
    pub const SINGLETON_METADATA_INITIALIZATION_SIZE: u64 = 12;
}

pub mod vtable_header {
    pub const VTABLE_OFFSET: u64 = 0x0;
    pub const VTABLE_SIZE: u64 = 0x4;
    pub const SIZE: u64 = 0x8;
}

pub mod method {
    pub const FLAGS: u64 = 0x0;
    pub const IMPL: u64 = 0x4;
    pub const SIZE: u64 = 0x8;
}

pub mod struct_descriptor {
    pub const NUM_FIELDS: u64 = 0x14;
    pub const FIELD_OFFSET_VECTOR_OFFSET: u64 = 0x18;
}

pub mod enum_descriptor {
    /// Low 24 bits: payload case count. High 8 bits: payload size offset.
    pub const NUM_PAYLOAD_CASES_AND_PAYLOAD_SIZE_OFFSET: u64 = 0x14;
    pub const NUM_EMPTY_CASES: u64 = 0x18;

    pub const PAYLOAD_CASES_MASK: u32 = 0x00FF_FFFF;
    pub const PAYLOAD_SIZE_OFFSET_SHIFT: u32 = 24;
}

pub mod protocol {
    pub const NAME: u64 = 0x8;
    pub const NUM_REQUIREMENTS_IN_SIGNATURE: u64 = 0xC;
    pub const NUM_REQUIREMENTS: u64 = 0x10;
    pub const REQUIREMENTS: u64 = 0x14;
    pub const SUPERCLASS: u64 = 0x18;
    pub const ASSOCIATED_TYPE_NAMES: u64 = 0x1C;
}

pub mod metadata {
    pub const KIND: u64 = 0x0;
    /// Value metadata only: pointer to the nominal type descriptor.
    pub const DESCRIPTION: u64 = 0x8;
    /// Values above this are an isa pointer, i.e. class metadata.
    pub const LAST_ENUMERATED_KIND: u64 = 0x7FF;
}

pub mod value_witness {
    pub const INITIALIZE_BUFFER_WITH_COPY_OF_BUFFER: u64 = 0x00;
    pub const DESTROY: u64 = 0x08;
    pub const INITIALIZE_WITH_COPY: u64 = 0x10;
    pub const ASSIGN_WITH_COPY: u64 = 0x18;
    pub const INITIALIZE_WITH_TAKE: u64 = 0x20;
    pub const ASSIGN_WITH_TAKE: u64 = 0x28;
    pub const GET_ENUM_TAG_SINGLE_PAYLOAD: u64 = 0x30;
    pub const STORE_ENUM_TAG_SINGLE_PAYLOAD: u64 = 0x38;
    pub const SIZE: u64 = 0x40;
    pub const STRIDE: u64 = 0x48;
    pub const FLAGS: u64 = 0x50;
    pub const EXTRA_INHABITANT_COUNT: u64 = 0x54;
    pub const TABLE_SIZE: u64 = 0x58;

    // Enum value witness extension.
    pub const GET_ENUM_TAG: u64 = 0x58;
    pub const DESTRUCTIVE_PROJECT_ENUM_DATA: u64 = 0x60;
    pub const DESTRUCTIVE_INJECT_ENUM_TAG: u64 = 0x68;
    pub const ENUM_TABLE_SIZE: u64 = 0x70;
}

pub mod field_descriptor {
    pub const MANGLED_TYPE_NAME: u64 = 0x0;
    pub const SUPERCLASS: u64 = 0x4;
    pub const KIND: u64 = 0x8;
    pub const FIELD_RECORD_SIZE: u64 = 0xA;
    pub const NUM_FIELDS: u64 = 0xC;
    pub const RECORDS: u64 = 0x10;
}

pub mod field_record {
    pub const FLAGS: u64 = 0x0;
    pub const MANGLED_TYPE_NAME: u64 = 0x4;
    pub const FIELD_NAME: u64 = 0x8;
    pub const SIZE: u64 = 0xC;
}

pub mod conformance {
    pub const PROTOCOL: u64 = 0x0;
    pub const TYPE_REF: u64 = 0x4;
    pub const WITNESS_TABLE_PATTERN: u64 = 0x8;
    pub const FLAGS: u64 = 0xC;
}

/// `__swift5_types` and `__swift5_proto` entries are one relative pointer each.
pub const RECORD_SIZE: u64 = 4;

/// Low bits of a type metadata record holding its `TypeReferenceKind`.
pub const TYPE_RECORD_KIND_MASK: u32 = 0x3;

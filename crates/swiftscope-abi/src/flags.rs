//! Typed views over packed metadata flag words.
//!
//! All bit numbers below are little-endian (bit 0 is the least significant).

use bitflags::bitflags;

use crate::kind::{
    ContextDescriptorKind, MetadataInitialization, MethodKind, ProtocolClassConstraint,
    TypeReferenceKind,
};

/// Leading 32-bit word of every context descriptor.
///
/// Layout:
/// - Bits 0-4: kind
/// - Bit 6: unique
/// - Bit 7: generic
/// - Bits 8-15: version
/// - Bits 16-31: kind-specific flags
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextDescriptorFlags(u32);

impl ContextDescriptorFlags {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn kind_raw(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    pub fn kind(self) -> Option<ContextDescriptorKind> {
        ContextDescriptorKind::from_u8(self.kind_raw())
    }

    pub const fn is_unique(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub const fn is_generic(self) -> bool {
        self.0 & 0x80 != 0
    }

    pub const fn version(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn kind_specific_flags(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// Kind-specific flags of class, struct and enum descriptors.
///
/// Layout:
/// - Bits 0-1: metadata initialization
/// - Bit 2: has import info
/// - Bit 3: has canonical metadata prespecializations
/// - Bit 4: has layout string
/// - Bit 7: class is actor
/// - Bit 8: class is default actor
/// - Bits 9-11: class resilient superclass reference kind
/// - Bit 12: class immediate members are negative
/// - Bit 13: class has resilient superclass
/// - Bit 14: class has override table
/// - Bit 15: class has vtable
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeContextDescriptorFlags(u16);

impl TypeContextDescriptorFlags {
    pub const HAS_VTABLE_BIT: u16 = 15;

    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    const fn bit(self, n: u16) -> bool {
        self.0 & (1 << n) != 0
    }

    /// Bit pattern `0b11` is reserved and reported as `None`.
    pub fn metadata_initialization(self) -> Option<MetadataInitialization> {
        match self.0 & 0x3 {
            0 => Some(MetadataInitialization::None),
            1 => Some(MetadataInitialization::Singleton),
            2 => Some(MetadataInitialization::Foreign),
            _ => None,
        }
    }

    pub const fn has_import_info(self) -> bool {
        self.bit(2)
    }

    pub const fn has_canonical_metadata_prespecializations(self) -> bool {
        self.bit(3)
    }

    pub const fn has_layout_string(self) -> bool {
        self.bit(4)
    }

    pub const fn class_is_actor(self) -> bool {
        self.bit(7)
    }

    pub const fn class_is_default_actor(self) -> bool {
        self.bit(8)
    }

    pub const fn class_resilient_superclass_reference_kind(self) -> u8 {
        ((self.0 >> 9) & 0x7) as u8
    }

    pub const fn class_are_immediate_members_negative(self) -> bool {
        self.bit(12)
    }

    pub const fn class_has_resilient_superclass(self) -> bool {
        self.bit(13)
    }

    pub const fn class_has_override_table(self) -> bool {
        self.bit(14)
    }

    pub const fn class_has_vtable(self) -> bool {
        self.bit(Self::HAS_VTABLE_BIT)
    }
}

/// Kind-specific flags of protocol descriptors.
///
/// Layout:
/// - Bit 0: class constraint (0 = class-only, 1 = any)
/// - Bit 1: resilient
/// - Bits 2-7: special protocol kind
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ProtocolContextDescriptorFlags(u16);

impl ProtocolContextDescriptorFlags {
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn class_constraint(self) -> ProtocolClassConstraint {
        if self.0 & 0x1 == 0 {
            ProtocolClassConstraint::Class
        } else {
            ProtocolClassConstraint::Any
        }
    }

    pub const fn is_resilient(self) -> bool {
        self.0 & 0x2 != 0
    }

    pub const fn special_protocol(self) -> u8 {
        ((self.0 >> 2) & 0x3F) as u8
    }
}

/// Flags word of a vtable method descriptor.
///
/// Layout:
/// - Bits 0-3: kind
/// - Bit 4: instance
/// - Bit 5: dynamic
/// - Bit 6: async
/// - Bits 16-31: extra discriminator (pointer authentication)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MethodDescriptorFlags(u32);

impl MethodDescriptorFlags {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn kind_raw(self) -> u8 {
        (self.0 & 0x0F) as u8
    }

    pub fn kind(self) -> Option<MethodKind> {
        MethodKind::from_u8(self.kind_raw())
    }

    pub const fn is_instance(self) -> bool {
        self.0 & 0x10 != 0
    }

    pub const fn is_dynamic(self) -> bool {
        self.0 & 0x20 != 0
    }

    pub const fn is_async(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub const fn extra_discriminator(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

bitflags! {
    /// Flags word of a value witness table.
    ///
    /// The low byte is not a flag: it holds `alignment - 1`.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct ValueWitnessFlags: u32 {
        const ALIGNMENT_MASK = 0x0000_00FF;
        const IS_NON_POD = 0x0001_0000;
        const IS_NON_INLINE = 0x0002_0000;
        const HAS_SPARE_BITS = 0x0008_0000;
        const IS_NON_BITWISE_TAKABLE = 0x0010_0000;
        const HAS_ENUM_WITNESSES = 0x0020_0000;
        const INCOMPLETE = 0x0040_0000;
        const IS_NON_COPYABLE = 0x0080_0000;
        const IS_NON_BITWISE_BORROWABLE = 0x0100_0000;
    }
}

impl ValueWitnessFlags {
    pub const fn alignment_mask(self) -> u64 {
        (self.bits() & 0xFF) as u64
    }

    pub const fn alignment(self) -> u64 {
        self.alignment_mask() + 1
    }

    pub const fn is_pod(self) -> bool {
        !self.contains(Self::IS_NON_POD)
    }

    pub const fn is_inline_storage(self) -> bool {
        !self.contains(Self::IS_NON_INLINE)
    }

    pub const fn is_bitwise_takable(self) -> bool {
        !self.contains(Self::IS_NON_BITWISE_TAKABLE)
    }

    pub const fn has_enum_witnesses(self) -> bool {
        self.contains(Self::HAS_ENUM_WITNESSES)
    }

    pub const fn is_incomplete(self) -> bool {
        self.contains(Self::INCOMPLETE)
    }

    pub const fn is_copyable(self) -> bool {
        !self.contains(Self::IS_NON_COPYABLE)
    }
}

bitflags! {
    /// Flags word of a field record.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct FieldRecordFlags: u32 {
        const IS_INDIRECT_CASE = 0x1;
        const IS_VAR = 0x2;
        const IS_ARTIFICIAL = 0x4;
    }
}

/// Flags word of a protocol conformance descriptor.
///
/// Layout:
/// - Bits 3-5: type reference kind
/// - Bit 6: retroactive
/// - Bit 7: synthesized non-unique
/// - Bits 8-15: number of conditional requirements
/// - Bit 16: has resilient witnesses
/// - Bit 17: has generic witness table
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConformanceFlags(u32);

impl ConformanceFlags {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn type_reference_kind_raw(self) -> u8 {
        ((self.0 >> 3) & 0x7) as u8
    }

    pub fn type_reference_kind(self) -> Option<TypeReferenceKind> {
        TypeReferenceKind::from_u8(self.type_reference_kind_raw())
    }

    pub const fn is_retroactive(self) -> bool {
        self.0 & (1 << 6) != 0
    }

    pub const fn is_synthesized_non_unique(self) -> bool {
        self.0 & (1 << 7) != 0
    }

    pub const fn num_conditional_requirements(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn has_resilient_witnesses(self) -> bool {
        self.0 & (1 << 16) != 0
    }

    pub const fn has_generic_witness_table(self) -> bool {
        self.0 & (1 << 17) != 0
    }
}

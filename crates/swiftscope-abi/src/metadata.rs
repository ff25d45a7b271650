//! Metadata records and their value witness tables.

use swiftscope_core::{Address, Memory, MemoryError, POINTER_SIZE};

use crate::error::{DecodeError, Precondition, Result};
use crate::flags::ValueWitnessFlags;
use crate::kind::MetadataKind;
use crate::layout;
use crate::layout::value_witness as vw;

/// A metadata record: the runtime's handle for a concrete type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    address: Address,
    kind: MetadataKind,
}

impl Metadata {
    pub fn read(memory: &dyn Memory, address: Address) -> Result<Self> {
        let raw = memory.read_u64(address.add(layout::metadata::KIND))?;
        let kind =
            MetadataKind::from_raw(raw).ok_or(DecodeError::UnknownMetadataKind { address, raw })?;
        Ok(Self { address, kind })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    /// Nominal type descriptor of value metadata.
    pub fn description(&self, memory: &dyn Memory) -> Result<Option<Address>> {
        self.require_value_kind()?;
        let description = memory.read_pointer(self.address.add(layout::metadata::DESCRIPTION))?;
        Ok(description.non_null())
    }

    /// The table pointed to by the word one pointer below the metadata.
    ///
    /// Only struct and enum (including optional) metadata carry one.
    pub fn value_witnesses(&self, memory: &dyn Memory) -> Result<ValueWitnessTable> {
        self.require_value_kind()?;
        let table = memory.read_pointer(self.address.sub(POINTER_SIZE))?;
        Ok(ValueWitnessTable::read(memory, table)?)
    }

    pub fn type_layout(&self, memory: &dyn Memory) -> Result<TypeLayout> {
        Ok(self.value_witnesses(memory)?.layout())
    }

    /// Struct field offsets: `count` u32 entries starting
    /// `vector_offset` words into the metadata.
    pub fn field_offsets(
        &self,
        memory: &dyn Memory,
        vector_offset: u32,
        count: u32,
    ) -> Result<Vec<u32>> {
        self.require_value_kind()?;
        let start = self.address.add(vector_offset as u64 * POINTER_SIZE);
        (0..count as u64)
            .map(|i| Ok(memory.read_u32(start.add(i * 4))?))
            .collect()
    }

    fn require_value_kind(&self) -> Result<()> {
        if self.kind.has_value_witnesses() {
            Ok(())
        } else {
            Err(Precondition::NoValueWitnesses { kind: self.kind }.into())
        }
    }
}

/// Size, stride, flags and extra inhabitants of a value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: u64,
    pub stride: u64,
    pub flags: ValueWitnessFlags,
    pub extra_inhabitant_count: u32,
}

impl TypeLayout {
    pub fn alignment(&self) -> u64 {
        self.flags.alignment()
    }
}

/// Value witness table (64-bit layout).
///
/// Function slots hold code addresses; invoking them is the caller's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueWitnessTable {
    pub address: Address,
    pub initialize_buffer_with_copy_of_buffer: Address,
    pub destroy: Address,
    pub initialize_with_copy: Address,
    pub assign_with_copy: Address,
    pub initialize_with_take: Address,
    pub assign_with_take: Address,
    pub get_enum_tag_single_payload: Address,
    pub store_enum_tag_single_payload: Address,
    pub size: u64,
    pub stride: u64,
    pub flags: ValueWitnessFlags,
    pub extra_inhabitant_count: u32,
    /// Present when `flags` has `HAS_ENUM_WITNESSES`.
    pub enum_witnesses: Option<EnumValueWitnesses>,
}

/// Enum extension of the value witness table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumValueWitnesses {
    /// `unsigned (*)(const OpaqueValue *, const Metadata *)`
    pub get_enum_tag: Address,
    /// `void (*)(OpaqueValue *, const Metadata *)`
    pub destructive_project_enum_data: Address,
    /// `void (*)(OpaqueValue *, unsigned, const Metadata *)`
    pub destructive_inject_enum_tag: Address,
}

impl ValueWitnessTable {
    pub fn read(memory: &dyn Memory, address: Address) -> std::result::Result<Self, MemoryError> {
        let pointer = |offset| memory.read_pointer(address.add(offset));
        let flags = ValueWitnessFlags::from_bits_retain(memory.read_u32(address.add(vw::FLAGS))?);

        let enum_witnesses = if flags.has_enum_witnesses() {
            Some(EnumValueWitnesses {
                get_enum_tag: pointer(vw::GET_ENUM_TAG)?,
                destructive_project_enum_data: pointer(vw::DESTRUCTIVE_PROJECT_ENUM_DATA)?,
                destructive_inject_enum_tag: pointer(vw::DESTRUCTIVE_INJECT_ENUM_TAG)?,
            })
        } else {
            None
        };

        Ok(Self {
            address,
            initialize_buffer_with_copy_of_buffer: pointer(vw::INITIALIZE_BUFFER_WITH_COPY_OF_BUFFER)?,
            destroy: pointer(vw::DESTROY)?,
            initialize_with_copy: pointer(vw::INITIALIZE_WITH_COPY)?,
            assign_with_copy: pointer(vw::ASSIGN_WITH_COPY)?,
            initialize_with_take: pointer(vw::INITIALIZE_WITH_TAKE)?,
            assign_with_take: pointer(vw::ASSIGN_WITH_TAKE)?,
            get_enum_tag_single_payload: pointer(vw::GET_ENUM_TAG_SINGLE_PAYLOAD)?,
            store_enum_tag_single_payload: pointer(vw::STORE_ENUM_TAG_SINGLE_PAYLOAD)?,
            size: memory.read_u64(address.add(vw::SIZE))?,
            stride: memory.read_u64(address.add(vw::STRIDE))?,
            flags,
            extra_inhabitant_count: memory.read_u32(address.add(vw::EXTRA_INHABITANT_COUNT))?,
            enum_witnesses,
        })
    }

    pub fn layout(&self) -> TypeLayout {
        TypeLayout {
            size: self.size,
            stride: self.stride,
            flags: self.flags,
            extra_inhabitant_count: self.extra_inhabitant_count,
        }
    }
}

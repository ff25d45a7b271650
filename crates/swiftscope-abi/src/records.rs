//! Field descriptors (`__swift5_fieldmd`).

use swiftscope_core::{Address, Memory};

use crate::error::{DecodeError, DecodeLimits, Result};
use crate::flags::FieldRecordFlags;
use crate::kind::FieldDescriptorKind;
use crate::layout::{field_descriptor as fd, field_record as fr};
use crate::relative::RelativePointer;
use crate::strings::read_c_string;

/// A field descriptor with its records, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub address: Address,
    pub kind: FieldDescriptorKind,
    pub mangled_type_name: Option<Address>,
    pub superclass: Option<Address>,
    records: Vec<FieldRecord>,
}

/// One stored property or enum case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRecord {
    pub flags: FieldRecordFlags,
    /// Mangled type name, handed to a symbolic reference resolver as is.
    /// Enum cases without a payload have none.
    pub mangled_type_name: Option<Address>,
    pub name: String,
}

impl FieldRecord {
    pub fn is_var(&self) -> bool {
        self.flags.contains(FieldRecordFlags::IS_VAR)
    }

    pub fn is_indirect_case(&self) -> bool {
        self.flags.contains(FieldRecordFlags::IS_INDIRECT_CASE)
    }
}

impl FieldDescriptor {
    pub fn read(memory: &dyn Memory, address: Address, limits: &DecodeLimits) -> Result<Self> {
        let raw_kind = memory.read_u16(address.add(fd::KIND))?;
        let kind = FieldDescriptorKind::from_u16(raw_kind).ok_or(
            DecodeError::UnknownFieldDescriptorKind {
                address,
                raw: raw_kind,
            },
        )?;
        let record_size = memory.read_u16(address.add(fd::FIELD_RECORD_SIZE))?;
        let count = memory.read_u32(address.add(fd::NUM_FIELDS))?;
        if count > limits.max_fields {
            return Err(DecodeError::TooManyFields {
                address,
                count,
                limit: limits.max_fields,
            }
            .into());
        }
        if count > 0 && (record_size as u64) < fr::SIZE {
            return Err(DecodeError::FieldRecordSize {
                address,
                size: record_size,
                min: fr::SIZE as u16,
            }
            .into());
        }

        let first = address.add(fd::RECORDS);
        let records = (0..count as u64)
            .map(|i| FieldRecord::read(memory, first.add(i * record_size as u64), limits))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            address,
            kind,
            mangled_type_name: RelativePointer::direct(address.add(fd::MANGLED_TYPE_NAME))
                .resolve(memory)?,
            superclass: RelativePointer::direct(address.add(fd::SUPERCLASS)).resolve(memory)?,
            records,
        })
    }

    pub fn num_fields(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }
}

impl FieldRecord {
    fn read(memory: &dyn Memory, address: Address, limits: &DecodeLimits) -> Result<Self> {
        let flags = FieldRecordFlags::from_bits_retain(memory.read_u32(address.add(fr::FLAGS))?);
        let mangled_type_name =
            RelativePointer::direct(address.add(fr::MANGLED_TYPE_NAME)).resolve(memory)?;
        let name_at = address.add(fr::FIELD_NAME);
        let name = match RelativePointer::direct(name_at).resolve(memory)? {
            Some(target) => read_c_string(memory, target, limits)?,
            None => String::new(),
        };
        Ok(Self {
            flags,
            mangled_type_name,
            name,
        })
    }
}

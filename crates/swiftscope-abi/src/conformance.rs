//! Type metadata records (`__swift5_types`) and protocol conformance
//! records (`__swift5_proto`).

use swiftscope_core::{Address, Memory};

use crate::error::{DecodeError, Result};
use crate::flags::ConformanceFlags;
use crate::kind::TypeReferenceKind;
use crate::layout;
use crate::relative::{self, RelativePointer};

/// What a type record or conformance points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeReference {
    /// A context descriptor, after following any indirection.
    Descriptor(Address),
    /// A NUL-terminated Objective-C class name.
    ObjCClassName(Address),
    /// A slot holding an Objective-C class object.
    IndirectObjCClass(Address),
}

impl TypeReference {
    /// Interpret an already-resolved `target` according to `kind`.
    pub fn from_target(
        memory: &dyn Memory,
        kind: TypeReferenceKind,
        target: Address,
    ) -> Result<Option<Self>> {
        Ok(match kind {
            TypeReferenceKind::DirectTypeDescriptor => Some(Self::Descriptor(target)),
            TypeReferenceKind::IndirectTypeDescriptor => {
                memory.read_pointer(target)?.non_null().map(Self::Descriptor)
            }
            TypeReferenceKind::DirectObjCClassName => Some(Self::ObjCClassName(target)),
            TypeReferenceKind::IndirectObjCClass => Some(Self::IndirectObjCClass(target)),
        })
    }

    pub fn descriptor(self) -> Option<Address> {
        match self {
            Self::Descriptor(address) => Some(address),
            Self::ObjCClassName(_) | Self::IndirectObjCClass(_) => None,
        }
    }
}

/// Entry of the type metadata record section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeMetadataRecord {
    pub address: Address,
    pub reference: Option<TypeReference>,
}

impl TypeMetadataRecord {
    pub fn read(memory: &dyn Memory, address: Address) -> Result<Self> {
        let (target, raw_kind) =
            relative::resolve_int_pair(memory, address, layout::TYPE_RECORD_KIND_MASK)?;
        let kind = TypeReferenceKind::from_u8(raw_kind as u8).ok_or(
            DecodeError::UnknownTypeReferenceKind {
                address,
                raw: raw_kind as u8,
            },
        )?;
        let reference = match target {
            Some(target) => TypeReference::from_target(memory, kind, target)?,
            None => None,
        };
        Ok(Self { address, reference })
    }
}

/// Read `count` consecutive type metadata records starting at `section`.
pub fn read_type_records(
    memory: &dyn Memory,
    section: Address,
    count: usize,
) -> Result<Vec<TypeMetadataRecord>> {
    (0..count as u64)
        .map(|i| TypeMetadataRecord::read(memory, section.add(i * layout::RECORD_SIZE)))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolConformanceDescriptor {
    pub address: Address,
    /// Protocol descriptor; `None` for a null reference.
    pub protocol: Option<Address>,
    pub conforming_type: Option<TypeReference>,
    pub witness_table_pattern: Option<Address>,
    pub flags: ConformanceFlags,
}

impl ProtocolConformanceDescriptor {
    pub fn read(memory: &dyn Memory, address: Address) -> Result<Self> {
        let field = |offset| address.add(offset);
        let flags = ConformanceFlags::new(memory.read_u32(field(layout::conformance::FLAGS))?);
        let kind = flags
            .type_reference_kind()
            .ok_or(DecodeError::UnknownTypeReferenceKind {
                address,
                raw: flags.type_reference_kind_raw(),
            })?;

        let protocol =
            RelativePointer::indirectable(field(layout::conformance::PROTOCOL)).resolve(memory)?;
        let conforming_type =
            match RelativePointer::direct(field(layout::conformance::TYPE_REF)).resolve(memory)? {
                Some(target) => TypeReference::from_target(memory, kind, target)?,
                None => None,
            };
        let witness_table_pattern =
            RelativePointer::direct(field(layout::conformance::WITNESS_TABLE_PATTERN))
                .resolve(memory)?;

        Ok(Self {
            address,
            protocol,
            conforming_type,
            witness_table_pattern,
            flags,
        })
    }
}

/// Read `count` conformance records, each a direct relative pointer to a
/// [`ProtocolConformanceDescriptor`]. Null records are dropped.
pub fn read_conformance_records(
    memory: &dyn Memory,
    section: Address,
    count: usize,
) -> Result<Vec<ProtocolConformanceDescriptor>> {
    let mut conformances = Vec::with_capacity(count);
    for i in 0..count as u64 {
        let at = section.add(i * layout::RECORD_SIZE);
        if let Some(descriptor) = RelativePointer::direct(at).resolve(memory)? {
            conformances.push(ProtocolConformanceDescriptor::read(memory, descriptor)?);
        }
    }
    Ok(conformances)
}

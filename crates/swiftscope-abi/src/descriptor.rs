//! Context descriptor hierarchy.
//!
//! [`ContextDescriptor::decode`] is the single place the kind bits are
//! inspected. Everything downstream matches on the returned variant.

use std::ops::Deref;

use swiftscope_core::{Address, Memory};

use crate::error::{DecodeError, DecodeLimits, Result};
use crate::flags::{ContextDescriptorFlags, ProtocolContextDescriptorFlags, TypeContextDescriptorFlags};
use crate::kind::{ContextDescriptorKind, MetadataInitialization, ProtocolClassConstraint};
use crate::layout;
use crate::records::FieldDescriptor;
use crate::relative::RelativePointer;
use crate::strings::read_relative_name;
use crate::vtable::{self, MethodDescriptor, VTableDescriptorHeader};

/// Address plus the decoded leading flags word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor {
    address: Address,
    flags: ContextDescriptorFlags,
    kind: ContextDescriptorKind,
}

impl Descriptor {
    pub fn read(memory: &dyn Memory, address: Address) -> Result<Self> {
        let flags = ContextDescriptorFlags::new(memory.read_u32(address.add(layout::context::FLAGS))?);
        let kind = flags.kind().ok_or(DecodeError::UnknownContextKind {
            address,
            raw: flags.kind_raw(),
        })?;
        Ok(Self {
            address,
            flags,
            kind,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn flags(&self) -> ContextDescriptorFlags {
        self.flags
    }

    pub fn kind(&self) -> ContextDescriptorKind {
        self.kind
    }

    pub fn is_generic(&self) -> bool {
        self.flags.is_generic()
    }

    pub fn kind_specific_flags(&self) -> u16 {
        self.flags.kind_specific_flags()
    }

    /// Enclosing context, `None` at the root.
    pub fn parent(&self, memory: &dyn Memory) -> Result<Option<Address>> {
        let at = self.address.add(layout::context::PARENT);
        Ok(RelativePointer::indirectable(at).resolve(memory)?)
    }

    /// Name of the nearest enclosing module context.
    pub fn module_name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        let mut current = *self;
        for _ in 0..limits.max_context_depth {
            let Some(parent) = current.parent(memory)? else {
                break;
            };
            current = Descriptor::read(memory, parent)?;
            if current.kind == ContextDescriptorKind::Module {
                return ModuleDescriptor { header: current }.name(memory, limits);
            }
        }
        Err(DecodeError::MissingModule {
            address: self.address,
            depth: limits.max_context_depth,
        }
        .into())
    }
}

/// A decoded context descriptor, one variant per modelled kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextDescriptor {
    Module(ModuleDescriptor),
    Protocol(ProtocolDescriptor),
    Class(ClassDescriptor),
    Struct(StructDescriptor),
    Enum(EnumDescriptor),
    /// Extension, anonymous and opaque type contexts.
    Other(Descriptor),
}

impl ContextDescriptor {
    pub fn decode(memory: &dyn Memory, address: Address) -> Result<Self> {
        let header = Descriptor::read(memory, address)?;
        tracing::trace!(%address, kind = ?header.kind, "decoded context descriptor");
        let ty = TypeContextDescriptor { header };
        Ok(match header.kind {
            ContextDescriptorKind::Module => Self::Module(ModuleDescriptor { header }),
            ContextDescriptorKind::Protocol => Self::Protocol(ProtocolDescriptor { header }),
            ContextDescriptorKind::Class => Self::Class(ClassDescriptor { ty }),
            ContextDescriptorKind::Struct => Self::Struct(StructDescriptor { ty }),
            ContextDescriptorKind::Enum => Self::Enum(EnumDescriptor { ty }),
            ContextDescriptorKind::Extension
            | ContextDescriptorKind::Anonymous
            | ContextDescriptorKind::OpaqueType => Self::Other(header),
        })
    }

    pub fn header(&self) -> &Descriptor {
        match self {
            Self::Module(d) => &d.header,
            Self::Protocol(d) => &d.header,
            Self::Class(d) => &d.ty.header,
            Self::Struct(d) => &d.ty.header,
            Self::Enum(d) => &d.ty.header,
            Self::Other(d) => d,
        }
    }

    /// The shared type context of class, struct and enum descriptors.
    pub fn as_type(&self) -> Option<&TypeContextDescriptor> {
        match self {
            Self::Class(d) => Some(&d.ty),
            Self::Struct(d) => Some(&d.ty),
            Self::Enum(d) => Some(&d.ty),
            _ => None,
        }
    }

    pub fn expect_protocol(self) -> Result<ProtocolDescriptor> {
        match self {
            Self::Protocol(d) => Ok(d),
            other => Err(other.unexpected("protocol")),
        }
    }

    fn unexpected(&self, expected: &'static str) -> crate::Error {
        let header = self.header();
        DecodeError::UnexpectedKind {
            address: header.address,
            expected,
            found: header.kind,
        }
        .into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleDescriptor {
    header: Descriptor,
}

impl ModuleDescriptor {
    pub fn header(&self) -> &Descriptor {
        &self.header
    }

    pub fn name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        read_relative_name(memory, self.header.address.add(layout::module::NAME), limits)
    }
}

/// Fields shared by class, struct and enum descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeContextDescriptor {
    header: Descriptor,
}

impl TypeContextDescriptor {
    pub fn header(&self) -> &Descriptor {
        &self.header
    }

    pub fn address(&self) -> Address {
        self.header.address
    }

    pub fn is_generic(&self) -> bool {
        self.header.is_generic()
    }

    pub fn flags(&self) -> TypeContextDescriptorFlags {
        TypeContextDescriptorFlags::new(self.header.kind_specific_flags())
    }

    pub fn name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        read_relative_name(memory, self.field(layout::type_context::NAME), limits)
    }

    pub fn module_name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        self.header.module_name(memory, limits)
    }

    /// The zero-argument metadata access function.
    pub fn access_function(&self, memory: &dyn Memory) -> Result<Address> {
        let at = self.field(layout::type_context::ACCESS_FUNCTION);
        let function = RelativePointer::direct(at).resolve(memory)?;
        Ok(function.ok_or(DecodeError::NullPointer { address: at })?)
    }

    /// The field descriptor, `None` when the type is not reflectable.
    pub fn fields_address(&self, memory: &dyn Memory) -> Result<Option<Address>> {
        let at = self.field(layout::type_context::FIELDS);
        Ok(RelativePointer::direct(at).resolve(memory)?)
    }

    pub fn is_reflectable(&self, memory: &dyn Memory) -> Result<bool> {
        Ok(self.fields_address(memory)?.is_some())
    }

    pub fn fields(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<Option<FieldDescriptor>> {
        match self.fields_address(memory)? {
            Some(address) => FieldDescriptor::read(memory, address, limits).map(Some),
            None => Ok(None),
        }
    }

    fn field(&self, offset: u64) -> Address {
        self.header.address.add(offset)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassDescriptor {
    ty: TypeContextDescriptor,
}

impl Deref for ClassDescriptor {
    type Target = TypeContextDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.ty
    }
}

impl ClassDescriptor {
    pub fn has_vtable(&self) -> bool {
        self.flags().class_has_vtable()
    }

    pub fn superclass_type(&self, memory: &dyn Memory) -> Result<Option<Address>> {
        let at = self.field(layout::class::SUPERCLASS_TYPE);
        Ok(RelativePointer::direct(at).resolve(memory)?)
    }

    pub fn num_immediate_members(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::class::NUM_IMMEDIATE_MEMBERS))?)
    }

    pub fn num_fields(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::class::NUM_FIELDS))?)
    }

    pub fn field_offset_vector_offset(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::class::FIELD_OFFSET_VECTOR_OFFSET))?)
    }

    /// Address of the vtable header of a non-generic class.
    ///
    /// Trailing objects that precede the header are skipped here:
    /// resilient superclass, then foreign or singleton metadata
    /// initialization.
    pub fn vtable_header_address(&self) -> Address {
        let flags = self.flags();
        let mut offset = layout::class::TRAILING_OBJECTS;
        if flags.class_has_resilient_superclass() {
            offset += layout::class::RESILIENT_SUPERCLASS_SIZE;
        }
        match flags.metadata_initialization() {
            Some(MetadataInitialization::Foreign) => {
                offset += layout::class::FOREIGN_METADATA_INITIALIZATION_SIZE
            }
            Some(MetadataInitialization::Singleton) => {
                offset += layout::class::SINGLETON_METADATA_INITIALIZATION_SIZE
            }
            Some(MetadataInitialization::None) | None => {}
        }
        self.field(offset)
    }

    /// The vtable header, `None` when the class has no vtable or is generic.
    pub fn vtable_header(&self, memory: &dyn Memory) -> Result<Option<VTableDescriptorHeader>> {
        if !self.has_vtable() || self.is_generic() {
            return Ok(None);
        }
        VTableDescriptorHeader::read(memory, self.vtable_header_address()).map(Some)
    }

    /// Methods with a non-null implementation, in vtable order.
    ///
    /// Empty for classes without a vtable and for generic classes.
    pub fn methods(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<Vec<MethodDescriptor>> {
        match self.vtable_header(memory)? {
            Some(header) => vtable::read_methods(memory, &header, limits),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructDescriptor {
    ty: TypeContextDescriptor,
}

impl Deref for StructDescriptor {
    type Target = TypeContextDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.ty
    }
}

impl StructDescriptor {
    pub fn num_fields(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::struct_descriptor::NUM_FIELDS))?)
    }

    /// Offset, in words from the metadata address, of the field offset vector.
    pub fn field_offset_vector_offset(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::struct_descriptor::FIELD_OFFSET_VECTOR_OFFSET))?)
    }

    pub fn has_field_offset_vector(&self, memory: &dyn Memory) -> Result<bool> {
        Ok(self.field_offset_vector_offset(memory)? != 0)
    }
}

/// Whether an enum case carries an associated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseKind {
    Payload,
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    ty: TypeContextDescriptor,
}

impl Deref for EnumDescriptor {
    type Target = TypeContextDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.ty
    }
}

impl EnumDescriptor {
    pub fn num_payload_cases(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(self.payload_word(memory)? & layout::enum_descriptor::PAYLOAD_CASES_MASK)
    }

    pub fn payload_size_offset(&self, memory: &dyn Memory) -> Result<u8> {
        Ok((self.payload_word(memory)? >> layout::enum_descriptor::PAYLOAD_SIZE_OFFSET_SHIFT) as u8)
    }

    pub fn num_empty_cases(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.field(layout::enum_descriptor::NUM_EMPTY_CASES))?)
    }

    pub fn num_cases(&self, memory: &dyn Memory) -> Result<u32> {
        let payload = self.num_payload_cases(memory)?;
        let empty = self.num_empty_cases(memory)?;
        payload.checked_add(empty).ok_or_else(|| {
            DecodeError::CaseCountOverflow {
                address: self.address(),
                payload,
                empty,
            }
            .into()
        })
    }

    /// Classify each case of `fields` in record order.
    ///
    /// A case carries a payload iff its record names a type. With `verify`
    /// set, the resulting counts must match the descriptor's.
    pub fn classify_cases(
        &self,
        memory: &dyn Memory,
        fields: &FieldDescriptor,
        verify: bool,
    ) -> Result<Vec<CaseKind>> {
        let cases: Vec<CaseKind> = fields
            .records()
            .iter()
            .map(|record| {
                if record.mangled_type_name.is_some() {
                    CaseKind::Payload
                } else {
                    CaseKind::Empty
                }
            })
            .collect();

        if verify {
            let payload = cases.iter().filter(|c| **c == CaseKind::Payload).count() as u32;
            let empty = cases.len() as u32 - payload;
            let expected_payload = self.num_payload_cases(memory)?;
            let expected_empty = self.num_empty_cases(memory)?;
            if (payload, empty) != (expected_payload, expected_empty) {
                return Err(DecodeError::EnumCaseMismatch {
                    address: self.address(),
                    payload,
                    empty,
                    expected_payload,
                    expected_empty,
                }
                .into());
            }
        }
        Ok(cases)
    }

    /// Whether the case at 0-based `index` carries a payload.
    ///
    /// `None` when the enum is not reflectable or `index` is out of range.
    pub fn is_payload_case(
        &self,
        memory: &dyn Memory,
        limits: &DecodeLimits,
        index: usize,
    ) -> Result<Option<bool>> {
        let Some(fields) = self.fields(memory, limits)? else {
            return Ok(None);
        };
        let cases = self.classify_cases(memory, &fields, false)?;
        Ok(cases.get(index).map(|c| *c == CaseKind::Payload))
    }

    fn payload_word(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(
            self.field(layout::enum_descriptor::NUM_PAYLOAD_CASES_AND_PAYLOAD_SIZE_OFFSET),
        )?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    header: Descriptor,
}

impl ProtocolDescriptor {
    pub fn header(&self) -> &Descriptor {
        &self.header
    }

    pub fn address(&self) -> Address {
        self.header.address
    }

    pub fn flags(&self) -> ProtocolContextDescriptorFlags {
        ProtocolContextDescriptorFlags::new(self.header.kind_specific_flags())
    }

    pub fn name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        read_relative_name(memory, self.header.address.add(layout::protocol::NAME), limits)
    }

    pub fn module_name(&self, memory: &dyn Memory, limits: &DecodeLimits) -> Result<String> {
        self.header.module_name(memory, limits)
    }

    pub fn num_requirements_in_signature(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.header.address.add(layout::protocol::NUM_REQUIREMENTS_IN_SIGNATURE))?)
    }

    pub fn num_requirements(&self, memory: &dyn Memory) -> Result<u32> {
        Ok(memory.read_u32(self.header.address.add(layout::protocol::NUM_REQUIREMENTS))?)
    }

    pub fn is_class_only(&self) -> bool {
        self.flags().class_constraint() == ProtocolClassConstraint::Class
    }
}

//! Emitters for synthetic metadata, laid out with [`ImageBuilder`].
//!
//! Each emitter pushes one record in its 64-bit ABI layout, followed by any
//! strings it owns, and returns the record's address. Cross references are
//! passed in as already-emitted addresses.

use swiftscope_core::{Address, ImageBuilder};

use crate::flags::{TypeContextDescriptorFlags, ValueWitnessFlags};
use crate::kind::{ContextDescriptorKind, FieldDescriptorKind, MetadataInitialization, MethodKind, MetadataKind};
use crate::layout;
use crate::metadata::EnumValueWitnesses;

/// Word index of the field offset vector in metadata from
/// [`emit_value_metadata`].
pub const VALUE_METADATA_FIELD_OFFSET_VECTOR: u32 = 2;

/// Vtable offset written into emitted class descriptors, in words.
pub const CLASS_VTABLE_OFFSET: u32 = 10;

fn context_flags(kind: ContextDescriptorKind, generic: bool, kind_specific: u16) -> u32 {
    let mut flags = kind as u32 | 0x40;
    if generic {
        flags |= 0x80;
    }
    flags | (kind_specific as u32) << 16
}

fn push_context_header(b: &mut ImageBuilder, flags: u32, parent: Option<Address>) -> Address {
    b.align(4);
    let at = b.push_u32(flags);
    b.push_u32(0);
    b.patch_relative(at.add(layout::context::PARENT), parent);
    at
}

fn patch_name(b: &mut ImageBuilder, at: Address, name: &str) {
    let target = b.push_cstr(name);
    b.patch_relative(at, Some(target));
}

pub fn emit_module(b: &mut ImageBuilder, name: &str) -> Address {
    let at = push_context_header(b, context_flags(ContextDescriptorKind::Module, false, 0), None);
    b.push_u32(0);
    patch_name(b, at.add(layout::module::NAME), name);
    at
}

/// A descriptor of a kind the decoders do not model (`Extension`, ...).
pub fn emit_context(b: &mut ImageBuilder, kind: ContextDescriptorKind, parent: Option<Address>) -> Address {
    push_context_header(b, context_flags(kind, false, 0), parent)
}

/// A raw flags word, for malformed-kind tests.
pub fn emit_raw_context(b: &mut ImageBuilder, flags: u32) -> Address {
    push_context_header(b, flags, None)
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec<'a> {
    pub name: &'a str,
    /// Stored as a C string; resolvers see its address.
    pub mangled_type: Option<&'a str>,
    pub is_var: bool,
}

impl<'a> FieldSpec<'a> {
    pub fn new(name: &'a str, mangled_type: &'a str) -> Self {
        Self {
            name,
            mangled_type: Some(mangled_type),
            is_var: false,
        }
    }

    pub fn var(name: &'a str, mangled_type: &'a str) -> Self {
        Self {
            is_var: true,
            ..Self::new(name, mangled_type)
        }
    }

    /// An enum case without a payload.
    pub fn case(name: &'a str) -> Self {
        Self {
            name,
            mangled_type: None,
            is_var: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmittedFields {
    pub address: Address,
    /// Per record, the address of its mangled type name.
    pub mangled_names: Vec<Option<Address>>,
}

pub fn emit_field_descriptor(
    b: &mut ImageBuilder,
    kind: FieldDescriptorKind,
    fields: &[FieldSpec<'_>],
) -> EmittedFields {
    emit_field_descriptor_with_record_size(b, kind, fields, layout::field_record::SIZE as u16)
}

/// As [`emit_field_descriptor`], declaring `record_size` bytes per record.
/// Records are padded with zeros when `record_size` exceeds the ABI size.
pub fn emit_field_descriptor_with_record_size(
    b: &mut ImageBuilder,
    kind: FieldDescriptorKind,
    fields: &[FieldSpec<'_>],
    record_size: u16,
) -> EmittedFields {
    b.align(4);
    let at = b.push_u32(0);
    b.push_u32(0);
    b.push_u16(kind as u16);
    b.push_u16(record_size);
    b.push_u32(fields.len() as u32);

    let mut records = Vec::with_capacity(fields.len());
    for field in fields {
        let record = b.cursor();
        let flags = if field.is_var { 0x2 } else { 0 };
        b.push_u32(flags);
        b.push_u32(0);
        b.push_u32(0);
        b.reserve((record_size as usize).saturating_sub(layout::field_record::SIZE as usize));
        records.push(record);
    }

    let mut mangled_names = Vec::with_capacity(fields.len());
    for (field, record) in fields.iter().zip(&records) {
        let mangled = field.mangled_type.map(|name| b.push_cstr(name));
        if mangled.is_some() {
            b.patch_relative(record.add(layout::field_record::MANGLED_TYPE_NAME), mangled);
        }
        patch_name(b, record.add(layout::field_record::FIELD_NAME), field.name);
        mangled_names.push(mangled);
    }
    EmittedFields {
        address: at,
        mangled_names,
    }
}

/// Fields shared by class, struct and enum descriptors.
#[derive(Clone, Copy, Debug)]
pub struct TypeSpec<'a> {
    pub name: &'a str,
    pub parent: Address,
    pub access_function: Option<Address>,
    pub fields: Option<Address>,
    pub generic: bool,
}

impl<'a> TypeSpec<'a> {
    pub fn new(name: &'a str, parent: Address) -> Self {
        Self {
            name,
            parent,
            access_function: None,
            fields: None,
            generic: false,
        }
    }

    pub fn access_function(mut self, function: Address) -> Self {
        self.access_function = Some(function);
        self
    }

    pub fn fields(mut self, fields: Address) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }
}

fn push_type_header(
    b: &mut ImageBuilder,
    kind: ContextDescriptorKind,
    spec: &TypeSpec<'_>,
    kind_specific: u16,
) -> Address {
    let flags = context_flags(kind, spec.generic, kind_specific);
    let at = push_context_header(b, flags, Some(spec.parent));
    b.push_u32(0);
    b.push_u32(0);
    b.push_u32(0);
    b.patch_relative(at.add(layout::type_context::ACCESS_FUNCTION), spec.access_function);
    b.patch_relative(at.add(layout::type_context::FIELDS), spec.fields);
    at
}

pub fn emit_struct(b: &mut ImageBuilder, spec: &TypeSpec<'_>, num_fields: u32, field_offset_vector_offset: u32) -> Address {
    let at = push_type_header(b, ContextDescriptorKind::Struct, spec, 0);
    b.push_u32(num_fields);
    b.push_u32(field_offset_vector_offset);
    patch_name(b, at.add(layout::type_context::NAME), spec.name);
    at
}

pub fn emit_enum(b: &mut ImageBuilder, spec: &TypeSpec<'_>, num_payload_cases: u32, num_empty_cases: u32) -> Address {
    let at = push_type_header(b, ContextDescriptorKind::Enum, spec, 0);
    b.push_u32(num_payload_cases & layout::enum_descriptor::PAYLOAD_CASES_MASK);
    b.push_u32(num_empty_cases);
    patch_name(b, at.add(layout::type_context::NAME), spec.name);
    at
}

#[derive(Clone, Copy, Debug)]
pub struct MethodSpec {
    pub kind: MethodKind,
    pub instance: bool,
    /// `None` emits a null implementation slot.
    pub implementation: Option<Address>,
}

impl MethodSpec {
    pub fn method(implementation: Address) -> Self {
        Self {
            kind: MethodKind::Method,
            instance: true,
            implementation: Some(implementation),
        }
    }

    pub fn init(implementation: Address) -> Self {
        Self {
            kind: MethodKind::Init,
            instance: false,
            implementation: Some(implementation),
        }
    }

    pub fn null(kind: MethodKind) -> Self {
        Self {
            kind,
            instance: true,
            implementation: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClassSpec<'a> {
    pub ty: TypeSpec<'a>,
    pub num_fields: u32,
    pub field_offset_vector_offset: u32,
    /// `None` clears the has-vtable bit.
    pub methods: Option<&'a [MethodSpec]>,
    pub resilient_superclass: bool,
    pub metadata_initialization: MetadataInitialization,
}

impl<'a> ClassSpec<'a> {
    pub fn new(ty: TypeSpec<'a>) -> Self {
        Self {
            ty,
            num_fields: 0,
            field_offset_vector_offset: 0,
            methods: None,
            resilient_superclass: false,
            metadata_initialization: MetadataInitialization::None,
        }
    }

    pub fn methods(mut self, methods: &'a [MethodSpec]) -> Self {
        self.methods = Some(methods);
        self
    }
}

pub fn emit_class(b: &mut ImageBuilder, spec: &ClassSpec<'_>) -> Address {
    let mut kind_specific = match spec.metadata_initialization {
        MetadataInitialization::None => 0,
        MetadataInitialization::Singleton => 1,
        MetadataInitialization::Foreign => 2,
    };
    if spec.resilient_superclass {
        kind_specific |= 1 << 13;
    }
    if spec.methods.is_some() {
        kind_specific |= 1 << TypeContextDescriptorFlags::HAS_VTABLE_BIT;
    }
    let num_methods = spec.methods.map_or(0, |m| m.len() as u32);

    let at = push_type_header(b, ContextDescriptorKind::Class, &spec.ty, kind_specific);
    b.push_u32(0);
    b.push_u32(2);
    b.push_u32(CLASS_VTABLE_OFFSET + num_methods);
    b.push_u32(num_methods);
    b.push_u32(spec.num_fields);
    b.push_u32(spec.field_offset_vector_offset);

    if spec.resilient_superclass {
        b.push_u32(0);
    }
    match spec.metadata_initialization {
        MetadataInitialization::None => {}
        MetadataInitialization::Foreign => {
            b.reserve(layout::class::FOREIGN_METADATA_INITIALIZATION_SIZE as usize);
        }
        MetadataInitialization::Singleton => {
            b.reserve(layout::class::SINGLETON_METADATA_INITIALIZATION_SIZE as usize);
        }
    }

    if let Some(methods) = spec.methods {
        b.push_u32(CLASS_VTABLE_OFFSET);
        b.push_u32(methods.len() as u32);
        for method in methods {
            let mut flags = method.kind as u32;
            if method.instance {
                flags |= 0x10;
            }
            let slot = b.push_u32(flags);
            b.push_u32(0);
            b.patch_relative(slot.add(layout::method::IMPL), method.implementation);
        }
    }

    patch_name(b, at.add(layout::type_context::NAME), spec.ty.name);
    at
}

pub fn emit_protocol(
    b: &mut ImageBuilder,
    name: &str,
    parent: Address,
    num_requirements: u32,
    class_only: bool,
) -> Address {
    let kind_specific = if class_only { 0 } else { 1 };
    let flags = context_flags(ContextDescriptorKind::Protocol, false, kind_specific);
    let at = push_context_header(b, flags, Some(parent));
    b.push_u32(0);
    b.push_u32(0);
    b.push_u32(num_requirements);
    b.push_u32(0);
    b.push_u32(0);
    b.push_u32(0);
    patch_name(b, at.add(layout::protocol::NAME), name);
    at
}

/// Value witness table and metadata record of a struct or enum.
#[derive(Clone, Debug)]
pub struct ValueMetadataSpec {
    pub kind: MetadataKind,
    pub description: Address,
    pub size: u64,
    pub stride: u64,
    pub flags: ValueWitnessFlags,
    pub extra_inhabitant_count: u32,
    pub destroy: Address,
    pub initialize_with_copy: Address,
    /// Appended when set; also sets `HAS_ENUM_WITNESSES`.
    pub enum_witnesses: Option<EnumValueWitnesses>,
    /// Emitted at [`VALUE_METADATA_FIELD_OFFSET_VECTOR`].
    pub field_offsets: Vec<u32>,
}

impl ValueMetadataSpec {
    /// Plain-data layout with alignment equal to `size` (capped at 8).
    pub fn pod(kind: MetadataKind, description: Address, size: u64) -> Self {
        let align = size.clamp(1, 8);
        Self {
            kind,
            description,
            size,
            stride: size.max(1).next_multiple_of(align),
            flags: ValueWitnessFlags::from_bits_retain((align - 1) as u32),
            extra_inhabitant_count: 0,
            destroy: Address::NULL,
            initialize_with_copy: Address::NULL,
            enum_witnesses: None,
            field_offsets: Vec::new(),
        }
    }
}

/// Emit the witness table, then the metadata record with the table pointer
/// in the word before it. Returns the metadata address.
pub fn emit_value_metadata(b: &mut ImageBuilder, spec: &ValueMetadataSpec) -> Address {
    let mut flags = spec.flags;
    if spec.enum_witnesses.is_some() {
        flags |= ValueWitnessFlags::HAS_ENUM_WITNESSES;
    }

    b.align(8);
    let table = b.push_pointer(Address::NULL);
    b.push_pointer(spec.destroy);
    b.push_pointer(spec.initialize_with_copy);
    for _ in 0..5 {
        b.push_pointer(Address::NULL);
    }
    b.push_u64(spec.size);
    b.push_u64(spec.stride);
    b.push_u32(flags.bits());
    b.push_u32(spec.extra_inhabitant_count);
    if let Some(witnesses) = spec.enum_witnesses {
        b.push_pointer(witnesses.get_enum_tag);
        b.push_pointer(witnesses.destructive_project_enum_data);
        b.push_pointer(witnesses.destructive_inject_enum_tag);
    }

    b.push_pointer(table);
    let metadata = b.push_u64(spec.kind.raw());
    b.push_pointer(spec.description);
    for offset in &spec.field_offsets {
        b.push_u32(*offset);
    }
    b.align(8);
    metadata
}

/// Minimal class metadata: an isa word (pointing at itself, so it reads as
/// a class) followed by the descriptor pointer.
pub fn emit_class_metadata(b: &mut ImageBuilder, description: Address) -> Address {
    b.align(8);
    let metadata = b.push_pointer(Address::NULL);
    b.patch_pointer(metadata, metadata);
    b.push_pointer(description);
    metadata
}

/// A `__swift5_types` style section of direct records.
pub fn emit_type_records(b: &mut ImageBuilder, descriptors: &[Address]) -> Address {
    b.align(4);
    let section = b.cursor();
    for descriptor in descriptors {
        let at = b.push_u32(0);
        b.patch_relative(at, Some(*descriptor));
    }
    section
}

/// A conformance of the type at `type_descriptor` to `protocol`, referring
/// to the type directly.
pub fn emit_conformance(
    b: &mut ImageBuilder,
    protocol: Address,
    type_descriptor: Address,
    witness_table: Option<Address>,
) -> Address {
    b.align(4);
    let at = b.push_u32(0);
    b.push_u32(0);
    b.push_u32(0);
    b.push_u32(0);
    b.patch_relative(at.add(layout::conformance::PROTOCOL), Some(protocol));
    b.patch_relative(at.add(layout::conformance::TYPE_REF), Some(type_descriptor));
    b.patch_relative(at.add(layout::conformance::WITNESS_TABLE_PATTERN), witness_table);
    at
}

/// A `__swift5_proto` style section.
pub fn emit_conformance_records(b: &mut ImageBuilder, conformances: &[Address]) -> Address {
    emit_type_records(b, conformances)
}

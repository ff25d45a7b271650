//! Discriminants decoded from metadata words.
//!
//! Each `from_*` returns `None` for values the ABI does not define; callers
//! turn that into a [`DecodeError`](crate::DecodeError) carrying the address.

use serde::Serialize;

use crate::layout;

/// Context descriptor kind (bits 0-4 of the flags word).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ContextDescriptorKind {
    Module = 0,
    Extension = 1,
    Anonymous = 2,
    Protocol = 3,
    OpaqueType = 4,
    Class = 16,
    Struct = 17,
    Enum = 18,
}

impl ContextDescriptorKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Module),
            1 => Some(Self::Extension),
            2 => Some(Self::Anonymous),
            3 => Some(Self::Protocol),
            4 => Some(Self::OpaqueType),
            16 => Some(Self::Class),
            17 => Some(Self::Struct),
            18 => Some(Self::Enum),
            _ => None,
        }
    }

    /// Class, struct or enum.
    pub fn is_type(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Enum)
    }
}

/// Kind word at the start of a metadata record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MetadataKind {
    Class,
    Struct,
    Enum,
    Optional,
    ForeignClass,
    ForeignReferenceType,
    Opaque,
    Tuple,
    Function,
    Existential,
    Metatype,
    ObjCClassWrapper,
    ExistentialMetatype,
    ExtendedExistential,
    FixedArray,
    HeapLocalVariable,
    HeapGenericLocalVariable,
    ErrorObject,
    Task,
    Job,
}

impl MetadataKind {
    /// Decode a pointer-sized kind word.
    ///
    /// Anything above the last enumerated kind is an isa pointer.
    pub fn from_raw(v: u64) -> Option<Self> {
        if v > layout::metadata::LAST_ENUMERATED_KIND {
            return Some(Self::Class);
        }
        match v {
            0x000 => Some(Self::Class),
            0x200 => Some(Self::Struct),
            0x201 => Some(Self::Enum),
            0x202 => Some(Self::Optional),
            0x203 => Some(Self::ForeignClass),
            0x204 => Some(Self::ForeignReferenceType),
            0x300 => Some(Self::Opaque),
            0x301 => Some(Self::Tuple),
            0x302 => Some(Self::Function),
            0x303 => Some(Self::Existential),
            0x304 => Some(Self::Metatype),
            0x305 => Some(Self::ObjCClassWrapper),
            0x306 => Some(Self::ExistentialMetatype),
            0x307 => Some(Self::ExtendedExistential),
            0x308 => Some(Self::FixedArray),
            0x400 => Some(Self::HeapLocalVariable),
            0x500 => Some(Self::HeapGenericLocalVariable),
            0x501 => Some(Self::ErrorObject),
            0x502 => Some(Self::Task),
            0x503 => Some(Self::Job),
            _ => None,
        }
    }

    /// The canonical raw value (`0` for classes).
    pub fn raw(self) -> u64 {
        match self {
            Self::Class => 0x000,
            Self::Struct => 0x200,
            Self::Enum => 0x201,
            Self::Optional => 0x202,
            Self::ForeignClass => 0x203,
            Self::ForeignReferenceType => 0x204,
            Self::Opaque => 0x300,
            Self::Tuple => 0x301,
            Self::Function => 0x302,
            Self::Existential => 0x303,
            Self::Metatype => 0x304,
            Self::ObjCClassWrapper => 0x305,
            Self::ExistentialMetatype => 0x306,
            Self::ExtendedExistential => 0x307,
            Self::FixedArray => 0x308,
            Self::HeapLocalVariable => 0x400,
            Self::HeapGenericLocalVariable => 0x500,
            Self::ErrorObject => 0x501,
            Self::Task => 0x502,
            Self::Job => 0x503,
        }
    }

    /// Kinds whose metadata is preceded by a value witness table pointer.
    pub fn has_value_witnesses(self) -> bool {
        matches!(self, Self::Struct | Self::Enum | Self::Optional)
    }
}

/// Method descriptor kind (low nibble of the method flags).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[repr(u8)]
pub enum MethodKind {
    Method = 0,
    Init = 1,
    Getter = 2,
    Setter = 3,
    ModifyCoroutine = 4,
    ReadCoroutine = 5,
}

impl MethodKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Method),
            1 => Some(Self::Init),
            2 => Some(Self::Getter),
            3 => Some(Self::Setter),
            4 => Some(Self::ModifyCoroutine),
            5 => Some(Self::ReadCoroutine),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Method => "Method",
            Self::Init => "Init",
            Self::Getter => "Getter",
            Self::Setter => "Setter",
            Self::ModifyCoroutine => "ModifyCoroutine",
            Self::ReadCoroutine => "ReadCoroutine",
        }
    }
}

/// Kind of a field descriptor record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u16)]
pub enum FieldDescriptorKind {
    Struct = 0,
    Class = 1,
    Enum = 2,
    MultiPayloadEnum = 3,
    Protocol = 4,
    ClassProtocol = 5,
    ObjCProtocol = 6,
    ObjCClass = 7,
}

impl FieldDescriptorKind {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(Self::Struct),
            1 => Some(Self::Class),
            2 => Some(Self::Enum),
            3 => Some(Self::MultiPayloadEnum),
            4 => Some(Self::Protocol),
            5 => Some(Self::ClassProtocol),
            6 => Some(Self::ObjCProtocol),
            7 => Some(Self::ObjCClass),
            _ => None,
        }
    }

    pub fn is_enum(self) -> bool {
        matches!(self, Self::Enum | Self::MultiPayloadEnum)
    }
}

/// How a conformance or type record refers to its type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum TypeReferenceKind {
    DirectTypeDescriptor = 0,
    IndirectTypeDescriptor = 1,
    DirectObjCClassName = 2,
    IndirectObjCClass = 3,
}

impl TypeReferenceKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::DirectTypeDescriptor),
            1 => Some(Self::IndirectTypeDescriptor),
            2 => Some(Self::DirectObjCClassName),
            3 => Some(Self::IndirectObjCClass),
            _ => None,
        }
    }
}

/// Class constraint of a protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProtocolClassConstraint {
    /// Only classes may conform (`AnyObject`).
    Class,
    Any,
}

/// Metadata initialization strategy of a type descriptor (bits 0-1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MetadataInitialization {
    None,
    Singleton,
    Foreign,
}

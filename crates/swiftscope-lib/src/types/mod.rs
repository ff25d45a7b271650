//! The type facade: classes, structs, enums and protocols.

use std::cell::{Ref, RefCell};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};
use swiftscope_abi::{ContextDescriptor, DecodeError, TypeContextDescriptor, TypeLayout};
use swiftscope_core::{Address, NativeCall};

use crate::Result;
use crate::target::Target;

mod class;
mod enumeration;
mod protocol;
mod structure;
mod value_type;

#[cfg(test)]
mod class_tests;
#[cfg(test)]
mod protocol_tests;
#[cfg(test)]
mod structure_tests;
#[cfg(test)]
pub(crate) mod test_image;

pub use class::{Argument, Class, Initializer, MethodDetails};
pub use enumeration::{Enum, EnumCase};
pub use protocol::{Conformance, Protocol, ProtocolComposition};
pub use structure::Struct;
pub(crate) use value_type::ValueTypeCore;

/// A stored property or enum case as seen by tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetails {
    pub name: String,
    /// Canonical type name, when the symbolic reference resolver knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub is_var: bool,
}

/// What every nominal type knows about itself.
#[derive(Debug)]
pub struct TypeInfo {
    target: Target,
    descriptor: TypeContextDescriptor,
    name: String,
    module_name: String,
    metadata: Option<Address>,
    fields: Option<Vec<FieldDetails>>,
    conformances: RefCell<IndexMap<String, Conformance>>,
}

impl TypeInfo {
    /// Decode names and fields, and fetch metadata through the access
    /// function unless the type is generic.
    pub(crate) fn read(target: &Target, descriptor: TypeContextDescriptor) -> Result<Self> {
        let memory = target.memory();
        let limits = target.limits();
        let name = descriptor.name(memory, limits)?;
        let module_name = descriptor.module_name(memory, limits)?;

        let metadata = if descriptor.is_generic() {
            None
        } else {
            let function = descriptor.access_function(memory)?;
            Some(Address::new(target.call(NativeCall::new(function))?))
        };

        let fields = match descriptor.fields(memory, limits)? {
            Some(record) if record.num_fields() > 0 => Some(
                record
                    .records()
                    .iter()
                    .map(|r| FieldDetails {
                        name: r.name.clone(),
                        type_name: r.mangled_type_name.and_then(|m| target.resolve_type_name(m)),
                        is_var: r.is_var(),
                    })
                    .collect(),
            ),
            // Zero fields and no field metadata read the same.
            _ => None,
        };

        tracing::trace!(%module_name, %name, ?metadata, "read type");
        Ok(Self {
            target: target.clone(),
            descriptor,
            name,
            module_name,
            metadata,
            fields,
            conformances: RefCell::new(IndexMap::new()),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn descriptor(&self) -> &TypeContextDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// `Module.Name`, the key types are registered under.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module_name, self.name)
    }

    pub fn is_generic(&self) -> bool {
        self.descriptor.is_generic()
    }

    /// Metadata address returned by the type's access function.
    ///
    /// Generic types are never instantiated. Their access function is not
    /// called, so this is `None` and no witness table is read.
    pub fn metadata(&self) -> Option<Address> {
        self.metadata
    }

    /// `None` when the type is not reflectable or has no fields.
    pub fn fields(&self) -> Option<&[FieldDetails]> {
        self.fields.as_deref()
    }

    pub fn conformances(&self) -> Ref<'_, IndexMap<String, Conformance>> {
        self.conformances.borrow()
    }

    pub fn conforms_to(&self, protocol: &str) -> bool {
        self.conformances.borrow().contains_key(protocol)
    }

    pub(crate) fn add_conformance(&self, conformance: Conformance) {
        let key = conformance.protocol.name().to_owned();
        self.conformances.borrow_mut().insert(key, conformance);
    }

    fn snapshot(&self) -> serde_json::Map<String, Value> {
        let mut object = serde_json::Map::new();
        if let Some(fields) = &self.fields {
            object.insert("fields".into(), json!(fields));
        }
        let borrowed = self.conformances.borrow();
        let conformances: Vec<&str> = borrowed.keys().map(String::as_str).collect();
        object.insert("conformances".into(), json!(conformances));
        object
    }
}

/// A nominal type, one variant per descriptor kind.
#[derive(Debug)]
pub enum Type {
    Class(Class),
    Struct(Struct),
    Enum(Enum),
}

impl Type {
    /// Build the facade for the type descriptor at `address`.
    pub fn from_descriptor(target: &Target, address: Address) -> Result<Self> {
        match ContextDescriptor::decode(target.memory(), address)? {
            ContextDescriptor::Class(d) => Class::read(target, d).map(Self::Class),
            ContextDescriptor::Struct(d) => Struct::read(target, d).map(Self::Struct),
            ContextDescriptor::Enum(d) => Enum::read(target, d).map(Self::Enum),
            other => Err(DecodeError::UnexpectedKind {
                address,
                expected: "type",
                found: other.header().kind(),
            }
            .into()),
        }
    }

    pub fn info(&self) -> &TypeInfo {
        match self {
            Self::Class(c) => c.info(),
            Self::Struct(s) => s.info(),
            Self::Enum(e) => e.info(),
        }
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    pub fn qualified_name(&self) -> String {
        self.info().qualified_name()
    }

    /// Layout of non-generic value types.
    pub fn type_layout(&self) -> Option<TypeLayout> {
        match self {
            Self::Class(_) => None,
            Self::Struct(s) => s.type_layout(),
            Self::Enum(e) => e.type_layout(),
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enum> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// `{fields, conformances}`, plus `methods` for classes.
    pub fn to_json(&self) -> Result<Value> {
        match self {
            Self::Class(c) => c.to_json(),
            Self::Struct(_) | Self::Enum(_) => Ok(Value::Object(self.info().snapshot())),
        }
    }
}

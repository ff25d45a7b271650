//! Explicit registry of the types and protocols found in a target.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use swiftscope_abi::{ContextDescriptor, read_conformance_records, read_type_records};
use swiftscope_core::Address;

use crate::Result;
use crate::target::Target;
use crate::types::{Conformance, Protocol, Type};

/// Looks types up by qualified name (`Module.Name`).
pub trait TypeRegistry {
    fn type_by_name(&self, name: &str) -> Option<&Type>;
}

/// Types and protocols indexed by qualified name and by descriptor.
///
/// Populated explicitly from type and conformance record sections; passed
/// by reference to whatever needs lookups.
#[derive(Debug)]
pub struct Registry {
    target: Target,
    types: IndexMap<String, Type>,
    protocols: IndexMap<String, Protocol>,
    type_descriptors: HashMap<Address, String>,
    protocol_descriptors: HashMap<Address, String>,
}

impl Registry {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            types: IndexMap::new(),
            protocols: IndexMap::new(),
            type_descriptors: HashMap::new(),
            protocol_descriptors: HashMap::new(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Register every type and protocol referenced from `count` type
    /// metadata records at `section`. Returns how many were new.
    pub fn load_type_records(&mut self, section: Address, count: usize) -> Result<usize> {
        let records = read_type_records(self.target.memory(), section, count)?;
        let before = self.types.len() + self.protocols.len();
        for record in records {
            let Some(descriptor) = record.reference.and_then(|r| r.descriptor()) else {
                tracing::trace!(record = %record.address, "skipping non-descriptor type record");
                continue;
            };
            match ContextDescriptor::decode(self.target.memory(), descriptor)? {
                ContextDescriptor::Protocol(_) => {
                    self.register_protocol(descriptor)?;
                }
                d if d.as_type().is_some() => {
                    self.register_type(descriptor)?;
                }
                d => {
                    tracing::trace!(%descriptor, kind = ?d.header().kind(), "skipping context");
                }
            }
        }
        Ok(self.types.len() + self.protocols.len() - before)
    }

    /// Register the type at `descriptor`; already registered types are
    /// returned as is.
    ///
    /// When another descriptor already claimed the qualified name, the
    /// first type stays registered and is returned. `descriptor` is then
    /// left unmapped.
    pub fn register_type(&mut self, descriptor: Address) -> Result<&Type> {
        if let Some(name) = self.type_descriptors.get(&descriptor) {
            return Ok(&self.types[name]);
        }
        let ty = Type::from_descriptor(&self.target, descriptor)?;
        match self.types.entry(ty.qualified_name()) {
            Entry::Occupied(entry) => {
                let existing = entry.get().info().descriptor().address();
                tracing::warn!(name = %entry.key(), %descriptor, %existing, "duplicate type name");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                tracing::debug!(name = %entry.key(), %descriptor, "registered type");
                self.type_descriptors.insert(descriptor, entry.key().clone());
                Ok(entry.insert(ty))
            }
        }
    }

    pub fn register_protocol(&mut self, descriptor: Address) -> Result<&Protocol> {
        if let Some(name) = self.protocol_descriptors.get(&descriptor) {
            return Ok(&self.protocols[name]);
        }
        let protocol = Protocol::read(&self.target, descriptor)?;
        let name = protocol.qualified_name();
        tracing::debug!(%name, %descriptor, "registered protocol");
        self.protocol_descriptors.insert(descriptor, name.clone());
        Ok(self.protocols.entry(name).or_insert(protocol))
    }

    /// Attach `count` conformance records at `section` to their types,
    /// registering protocols and types on the way. Conformances of types
    /// the registry cannot name (Objective-C classes) are skipped.
    /// Returns how many conformances were attached.
    pub fn load_conformance_records(&mut self, section: Address, count: usize) -> Result<usize> {
        let conformances = read_conformance_records(self.target.memory(), section, count)?;
        let mut attached = 0;
        for conformance in conformances {
            let (Some(protocol), Some(descriptor)) = (
                conformance.protocol,
                conformance.conforming_type.and_then(|t| t.descriptor()),
            ) else {
                tracing::trace!(conformance = %conformance.address, "skipping conformance");
                continue;
            };
            let protocol = self.register_protocol(protocol)?.clone();
            let ty = self.register_type(descriptor)?;
            if ty.info().descriptor().address() != descriptor {
                tracing::debug!(%descriptor, ty = ty.name(), "skipping conformance of shadowed type");
                continue;
            }
            tracing::trace!(ty = ty.name(), protocol = protocol.name(), "attached conformance");
            ty.info().add_conformance(Conformance {
                protocol,
                witness_table: conformance.witness_table_pattern,
            });
            attached += 1;
        }
        Ok(attached)
    }

    pub fn type_by_name(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn protocol_by_name(&self, name: &str) -> Option<&Protocol> {
        self.protocols.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    pub fn protocols(&self) -> impl Iterator<Item = &Protocol> {
        self.protocols.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeRegistry for Registry {
    fn type_by_name(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }
}

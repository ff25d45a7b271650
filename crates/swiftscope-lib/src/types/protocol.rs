use serde_json::{Value, json};
use swiftscope_abi::{ContextDescriptor, ProtocolDescriptor};
use swiftscope_core::Address;

use crate::Result;
use crate::target::Target;

/// A protocol, decoded once from its descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocol {
    descriptor: ProtocolDescriptor,
    name: String,
    module_name: String,
    num_requirements: u32,
    is_class_only: bool,
}

impl Protocol {
    pub fn read(target: &Target, address: Address) -> Result<Self> {
        let memory = target.memory();
        let limits = target.limits();
        let descriptor = ContextDescriptor::decode(memory, address)?.expect_protocol()?;
        Ok(Self {
            name: descriptor.name(memory, limits)?,
            module_name: descriptor.module_name(memory, limits)?,
            num_requirements: descriptor.num_requirements(memory)?,
            is_class_only: descriptor.is_class_only(),
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module_name, self.name)
    }

    pub fn num_requirements(&self) -> u32 {
        self.num_requirements
    }

    /// Only classes may conform.
    pub fn is_class_only(&self) -> bool {
        self.is_class_only
    }

    pub fn to_json(&self) -> Value {
        json!({
            "numRequirements": self.num_requirements,
            "isClassOnly": self.is_class_only,
        })
    }
}

/// `P & Q & ...`; class-only when any member is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolComposition {
    protocols: Vec<Protocol>,
    is_class_only: bool,
}

impl ProtocolComposition {
    pub fn new(protocols: Vec<Protocol>) -> Self {
        let is_class_only = protocols.iter().any(Protocol::is_class_only);
        Self {
            protocols,
            is_class_only,
        }
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn num_protocols(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_class_only(&self) -> bool {
        self.is_class_only
    }
}

/// A type's conformance to a protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conformance {
    pub protocol: Protocol,
    /// Witness table pattern from the conformance descriptor.
    pub witness_table: Option<Address>,
}

//! Live values in target memory.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use swiftscope_abi::TypeLayout;
use swiftscope_core::{Address, Memory, MemoryError, NativeCall};

use crate::Result;
use crate::types::ValueTypeCore;

/// A region of target memory holding one value.
///
/// Owned regions are released through [`Memory::free`] on drop; views over
/// caller memory are never released.
pub struct ValueInstance {
    memory: Rc<dyn Memory>,
    address: Address,
    size: u64,
    owned: bool,
}

impl ValueInstance {
    /// Allocate `size` zeroed bytes (at least one).
    pub fn allocate(memory: Rc<dyn Memory>, size: u64) -> Result<Self> {
        let len = usize::try_from(size.max(1)).map_err(|_| MemoryError::OutOfMemory(usize::MAX))?;
        let address = memory.allocate(len)?;
        tracing::trace!(%address, size, "allocated value buffer");
        Ok(Self {
            memory,
            address,
            size,
            owned: true,
        })
    }

    pub fn view(memory: Rc<dyn Memory>, address: Address, size: u64) -> Self {
        Self {
            memory,
            address,
            size,
            owned: false,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0; self.size as usize];
        self.memory.read_bytes(self.address, &mut buf)?;
        Ok(buf)
    }
}

impl Drop for ValueInstance {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Err(err) = self.memory.free(self.address) {
            tracing::warn!(address = %self.address, %err, "failed to release value buffer");
        }
    }
}

impl std::fmt::Debug for ValueInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueInstance")
            .field("address", &self.address)
            .field("size", &self.size)
            .field("owned", &self.owned)
            .finish()
    }
}

/// A struct value.
#[derive(Debug)]
pub struct StructValue {
    core: Rc<ValueTypeCore>,
    instance: ValueInstance,
}

impl StructValue {
    pub(crate) fn new(core: Rc<ValueTypeCore>, instance: ValueInstance) -> Self {
        Self { core, instance }
    }

    pub fn type_name(&self) -> String {
        self.core.info.qualified_name()
    }

    pub fn type_layout(&self) -> Option<TypeLayout> {
        self.core.layout()
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    pub fn instance(&self) -> &ValueInstance {
        &self.instance
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        self.instance.read_bytes()
    }
}

/// An enum value.
///
/// Built from a tag, its storage is materialized on first use of
/// [`address`](Self::address): the payload is copied in with its own type's
/// witnesses, then the tag is injected. Built over memory, its tag is read
/// on first use of [`tag`](Self::tag).
#[derive(Debug)]
pub struct EnumValue {
    core: Rc<ValueTypeCore>,
    tag: OnceCell<u32>,
    payload: Option<Box<RuntimeInstance>>,
    storage: OnceCell<ValueInstance>,
}

impl EnumValue {
    pub(crate) fn with_tag(core: Rc<ValueTypeCore>, tag: u32, payload: Option<RuntimeInstance>) -> Self {
        Self {
            core,
            tag: OnceCell::with_value(tag),
            payload: payload.map(Box::new),
            storage: OnceCell::new(),
        }
    }

    pub(crate) fn from_instance(core: Rc<ValueTypeCore>, instance: ValueInstance) -> Self {
        Self {
            core,
            tag: OnceCell::new(),
            payload: None,
            storage: OnceCell::with_value(instance),
        }
    }

    pub fn type_name(&self) -> String {
        self.core.info.qualified_name()
    }

    /// Case tag, as the index of the case in declaration order.
    pub fn tag(&self) -> Result<u32> {
        self.tag.get_or_try_init(|| self.read_tag()).copied()
    }

    /// The payload this value was constructed with.
    pub fn payload(&self) -> Option<&RuntimeInstance> {
        self.payload.as_deref()
    }

    pub fn address(&self) -> Result<Address> {
        Ok(self.instance()?.address())
    }

    pub fn instance(&self) -> Result<&ValueInstance> {
        self.storage.get_or_try_init(|| self.materialize())
    }

    fn read_tag(&self) -> Result<u32> {
        let witnesses = self.core.enum_witnesses()?;
        let metadata = self.core.require_metadata()?;
        let address = self.address()?;
        let args = [address.get(), metadata.get()];
        let tag = self
            .core
            .target()
            .call(NativeCall::with_args(witnesses.get_enum_tag, &args))?;
        Ok(tag as u32)
    }

    fn materialize(&self) -> Result<ValueInstance> {
        let witnesses = self.core.enum_witnesses()?;
        let metadata = self.core.require_metadata()?;
        let tag = self.tag()?;
        let instance = self.core.allocate()?;
        if let Some(payload) = &self.payload {
            payload.copy_into(self.core.target().memory(), instance.address())?;
        }
        let args = [instance.address().get(), tag as u64, metadata.get()];
        self.core
            .target()
            .call(NativeCall::with_args(witnesses.destructive_inject_enum_tag, &args))?;
        tracing::trace!(address = %instance.address(), tag, "materialized enum value");
        Ok(instance)
    }
}

/// A class instance pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInstance {
    address: Address,
    metadata: Address,
    class_name: String,
}

impl ObjectInstance {
    pub fn new(address: Address, metadata: Address, class_name: String) -> Self {
        Self {
            address,
            metadata,
            class_name,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metadata(&self) -> Address {
        self.metadata
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

/// Any live value.
#[derive(Debug)]
pub enum RuntimeInstance {
    Struct(StructValue),
    Enum(EnumValue),
    Object(ObjectInstance),
}

impl RuntimeInstance {
    /// `Module.Name` of the value's type.
    pub fn type_name(&self) -> String {
        match self {
            Self::Struct(v) => v.type_name(),
            Self::Enum(v) => v.type_name(),
            Self::Object(o) => o.class_name.clone(),
        }
    }

    pub fn address(&self) -> Result<Address> {
        match self {
            Self::Struct(v) => Ok(v.address()),
            Self::Enum(v) => v.address(),
            Self::Object(o) => Ok(o.address),
        }
    }

    /// Copy this value into `dest`.
    ///
    /// Value types copy through their witnesses; objects store their
    /// pointer without retaining it.
    pub(crate) fn copy_into(&self, memory: &dyn Memory, dest: Address) -> Result<()> {
        match self {
            Self::Struct(v) => v.core.copy_raw(dest, v.address()),
            Self::Enum(v) => v.core.copy_raw(dest, v.address()?),
            Self::Object(o) => Ok(memory.write_pointer(dest, o.address)?),
        }
    }
}

impl From<StructValue> for RuntimeInstance {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}

impl From<EnumValue> for RuntimeInstance {
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

impl From<ObjectInstance> for RuntimeInstance {
    fn from(value: ObjectInstance) -> Self {
        Self::Object(value)
    }
}

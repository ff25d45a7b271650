use std::rc::Rc;

use swiftscope_abi::{Metadata, StructDescriptor, TypeLayout};
use swiftscope_core::Address;

use crate::Result;
use crate::target::Target;
use crate::types::{TypeInfo, ValueTypeCore};
use crate::value::StructValue;

#[derive(Debug)]
pub struct Struct {
    core: Rc<ValueTypeCore>,
    descriptor: StructDescriptor,
}

impl Struct {
    pub(crate) fn read(target: &Target, descriptor: StructDescriptor) -> Result<Self> {
        let core = ValueTypeCore::read(target, *descriptor)?;
        tracing::trace!(name = core.info.name(), layout = ?core.layout(), "read struct");
        Ok(Self {
            core: Rc::new(core),
            descriptor,
        })
    }

    pub fn info(&self) -> &TypeInfo {
        &self.core.info
    }

    pub fn descriptor(&self) -> &StructDescriptor {
        &self.descriptor
    }

    /// `None` for generic structs.
    pub fn type_layout(&self) -> Option<TypeLayout> {
        self.core.layout()
    }

    pub fn num_fields(&self) -> Result<u32> {
        Ok(self.descriptor.num_fields(self.core.target().memory())?)
    }

    /// Byte offset of each stored property, in declaration order.
    pub fn field_offsets(&self) -> Result<Vec<u32>> {
        let memory = self.core.target().memory();
        let metadata = Metadata::read(memory, self.core.require_metadata()?)?;
        let vector = self.descriptor.field_offset_vector_offset(memory)?;
        let count = self.descriptor.num_fields(memory)?;
        if vector == 0 {
            return Ok(Vec::new());
        }
        Ok(metadata.field_offsets(memory, vector, count)?)
    }

    /// A zero-filled value of `stride` bytes, owned by the returned value.
    pub fn make_empty_value(&self) -> Result<StructValue> {
        Ok(StructValue::new(Rc::clone(&self.core), self.core.allocate()?))
    }

    /// View the value at `address` without copying or taking ownership.
    pub fn make_value_from_raw(&self, address: Address) -> Result<StructValue> {
        Ok(StructValue::new(Rc::clone(&self.core), self.core.view(address)?))
    }

    /// Copy-initialize `dest` from `src` through the value witness table.
    pub fn copy_raw(&self, dest: Address, src: Address) -> Result<()> {
        self.core.copy_raw(dest, src)
    }

    /// A new owned value initialized as a copy of the one at `src`.
    pub fn initialize_with_copy_raw(&self, src: Address) -> Result<StructValue> {
        let value = self.make_empty_value()?;
        self.core.copy_raw(value.address(), src)?;
        Ok(value)
    }
}

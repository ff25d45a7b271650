//! State shared by struct and enum facades and their values.

use swiftscope_abi::{EnumValueWitnesses, Metadata, Precondition, TypeContextDescriptor, TypeLayout, ValueWitnessTable};
use swiftscope_core::{Address, NativeCall};

use crate::Result;
use crate::target::Target;
use crate::types::TypeInfo;
use crate::value::ValueInstance;

/// Type information plus the value witness table.
///
/// Values hold this behind an `Rc`, so they outlive neither their type's
/// witnesses nor the target handles.
#[derive(Debug)]
pub(crate) struct ValueTypeCore {
    pub(crate) info: TypeInfo,
    /// `None` for generic types.
    witnesses: Option<ValueWitnessTable>,
}

impl ValueTypeCore {
    pub(crate) fn read(target: &Target, descriptor: TypeContextDescriptor) -> Result<Self> {
        let info = TypeInfo::read(target, descriptor)?;
        let witnesses = match info.metadata() {
            Some(metadata) => {
                let memory = target.memory();
                Some(Metadata::read(memory, metadata)?.value_witnesses(memory)?)
            }
            None => None,
        };
        Ok(Self { info, witnesses })
    }

    pub(crate) fn target(&self) -> &Target {
        self.info.target()
    }

    pub(crate) fn layout(&self) -> Option<TypeLayout> {
        self.witnesses.as_ref().map(ValueWitnessTable::layout)
    }

    fn require_witnesses(&self) -> Result<&ValueWitnessTable> {
        self.witnesses.as_ref().ok_or_else(|| {
            Precondition::GenericLayout {
                type_name: self.info.qualified_name(),
            }
            .into()
        })
    }

    pub(crate) fn require_layout(&self) -> Result<TypeLayout> {
        self.require_witnesses().map(ValueWitnessTable::layout)
    }

    pub(crate) fn require_metadata(&self) -> Result<Address> {
        self.info.metadata().ok_or_else(|| {
            Precondition::NoMetadata {
                type_name: self.info.qualified_name(),
            }
            .into()
        })
    }

    pub(crate) fn enum_witnesses(&self) -> Result<EnumValueWitnesses> {
        self.require_witnesses()?.enum_witnesses.ok_or_else(|| {
            Precondition::NoEnumWitnesses {
                type_name: self.info.qualified_name(),
            }
            .into()
        })
    }

    /// Allocate a zeroed, owned buffer of `stride` bytes.
    pub(crate) fn allocate(&self) -> Result<ValueInstance> {
        let layout = self.require_layout()?;
        ValueInstance::allocate(self.target().memory_handle(), layout.stride)
    }

    /// Wrap caller memory without taking ownership.
    pub(crate) fn view(&self, address: Address) -> Result<ValueInstance> {
        let layout = self.require_layout()?;
        Ok(ValueInstance::view(self.target().memory_handle(), address, layout.stride))
    }

    /// `initializeWithCopy(dest, src, metadata)`.
    pub(crate) fn copy_raw(&self, dest: Address, src: Address) -> Result<()> {
        let witnesses = self.require_witnesses()?;
        let metadata = self.require_metadata()?;
        let args = [dest.get(), src.get(), metadata.get()];
        self.target()
            .call(NativeCall::with_args(witnesses.initialize_with_copy, &args))?;
        Ok(())
    }
}

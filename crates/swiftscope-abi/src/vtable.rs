//! Class vtable enumeration.

use swiftscope_core::{Address, Memory};

use crate::error::{DecodeError, DecodeLimits, Result};
use crate::flags::MethodDescriptorFlags;
use crate::kind::MethodKind;
use crate::layout;
use crate::relative::RelativePointer;

/// `{vtable_offset, vtable_size}` header preceding the method descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VTableDescriptorHeader {
    pub address: Address,
    /// Offset of the vtable in class metadata, in words.
    pub vtable_offset: u32,
    /// Number of method descriptor slots.
    pub vtable_size: u32,
}

impl VTableDescriptorHeader {
    pub fn read(memory: &dyn Memory, address: Address) -> Result<Self> {
        Ok(Self {
            address,
            vtable_offset: memory.read_u32(address.add(layout::vtable_header::VTABLE_OFFSET))?,
            vtable_size: memory.read_u32(address.add(layout::vtable_header::VTABLE_SIZE))?,
        })
    }

    /// First method descriptor.
    pub fn methods_start(&self) -> Address {
        self.address.add(layout::vtable_header::SIZE)
    }
}

/// One vtable slot with a resolved implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub address: Address,
    pub flags: MethodDescriptorFlags,
    pub implementation: Address,
}

impl MethodDescriptor {
    pub fn kind(&self) -> Result<MethodKind> {
        self.flags.kind().ok_or_else(|| {
            DecodeError::UnknownMethodKind {
                address: self.address,
                raw: self.flags.kind_raw(),
            }
            .into()
        })
    }
}

/// Walk the method descriptors following `header`.
///
/// The walk ends when the cursor reaches the computed end address. Slots
/// whose implementation is null are left out of the result.
pub fn read_methods(
    memory: &dyn Memory,
    header: &VTableDescriptorHeader,
    limits: &DecodeLimits,
) -> Result<Vec<MethodDescriptor>> {
    let start = header.methods_start();
    let size = header.vtable_size;
    if size > limits.max_vtable_size {
        return Err(DecodeError::VTableTooLarge {
            start,
            size,
            limit: limits.max_vtable_size,
        }
        .into());
    }
    let end = start
        .checked_add(size as u64 * layout::method::SIZE)
        .ok_or(DecodeError::VTableOverflow { start, size })?;

    let mut methods = Vec::with_capacity(size as usize);
    let mut cursor = start;
    while cursor != end {
        let flags = MethodDescriptorFlags::new(memory.read_u32(cursor.add(layout::method::FLAGS))?);
        let impl_at = cursor.add(layout::method::IMPL);
        match RelativePointer::direct(impl_at).resolve(memory)? {
            Some(implementation) => {
                let method = MethodDescriptor {
                    address: cursor,
                    flags,
                    implementation,
                };
                // Reject undefined kinds up front.
                let kind = method.kind()?;
                tracing::trace!(slot = %cursor, %implementation, ?kind, "vtable slot");
                methods.push(method);
            }
            None => {
                tracing::debug!(slot = %cursor, "skipping vtable slot with null implementation");
            }
        }
        cursor = cursor.add(layout::method::SIZE);
    }
    Ok(methods)
}

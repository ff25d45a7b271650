//! Relative pointer resolution.
//!
//! Swift metadata stores references as 32-bit signed offsets from the
//! address of the offset itself, keeping the records position-independent.
//! A raw offset of zero means "absent".

use swiftscope_core::{Address, Memory, MemoryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelativeKind {
    /// `target = at + offset`.
    Direct,
    /// Direct unless the low bit is set; then `at + (offset & !1)` is a
    /// pointer slot holding the target.
    Indirectable,
}

/// A relative pointer stored at `at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelativePointer {
    pub at: Address,
    pub kind: RelativeKind,
}

impl RelativePointer {
    pub fn direct(at: Address) -> Self {
        Self {
            at,
            kind: RelativeKind::Direct,
        }
    }

    pub fn indirectable(at: Address) -> Self {
        Self {
            at,
            kind: RelativeKind::Indirectable,
        }
    }

    /// Resolve to an absolute address, `None` when absent.
    pub fn resolve(self, memory: &dyn Memory) -> Result<Option<Address>, MemoryError> {
        let raw = memory.read_i32(self.at)?;
        match self.kind {
            RelativeKind::Direct => Ok(apply(self.at, raw)),
            RelativeKind::Indirectable if raw & 1 == 0 => Ok(apply(self.at, raw)),
            RelativeKind::Indirectable => {
                let slot = self.at.offset((raw & !1) as i64);
                Ok(memory.read_pointer(slot)?.non_null())
            }
        }
    }
}

/// Pure direct resolution of a raw offset read from `at`.
pub fn apply(at: Address, raw: i32) -> Option<Address> {
    if raw == 0 {
        None
    } else {
        Some(at.offset(raw as i64))
    }
}

/// Resolve a relative pointer whose low `mask` bits carry an integer.
///
/// Returns the target (`None` when the offset part is zero) and the integer.
pub fn resolve_int_pair(
    memory: &dyn Memory,
    at: Address,
    mask: u32,
) -> Result<(Option<Address>, u32), MemoryError> {
    let raw = memory.read_u32(at)?;
    let int = raw & mask;
    let offset = (raw & !mask) as i32;
    Ok((apply(at, offset), int))
}

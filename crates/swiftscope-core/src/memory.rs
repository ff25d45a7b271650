//! Memory access provider.

use crate::address::{Address, POINTER_SIZE};

/// Failure to access target memory.
///
/// Never recovered locally by the decoders; always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("unmapped memory: {len} bytes at {address}")]
    Unmapped { address: Address, len: usize },
    #[error("misaligned access: {address} is not {align}-byte aligned")]
    Misaligned { address: Address, align: u64 },
    #[error("cannot allocate {0} bytes")]
    OutOfMemory(usize),
    #[error("{0} was not allocated by this provider")]
    InvalidFree(Address),
}

/// Raw access to a target address space.
///
/// Implementors provide byte-level reads and writes plus allocation; the
/// typed readers have default implementations that enforce natural
/// alignment and decode little-endian words.
pub trait Memory {
    /// Fill `buf` with the bytes at `address`.
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Copy `bytes` to `address`.
    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), MemoryError>;

    /// Allocate `size` zero-initialised bytes, pointer-aligned.
    fn allocate(&self, size: usize) -> Result<Address, MemoryError>;

    /// Release a block returned by [`allocate`](Self::allocate).
    fn free(&self, address: Address) -> Result<(), MemoryError>;

    fn read_u8(&self, address: Address) -> Result<u8, MemoryError> {
        let mut buf = [0u8; 1];
        self.read_bytes(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, address: Address) -> Result<u16, MemoryError> {
        check_alignment(address, 2)?;
        let mut buf = [0u8; 2];
        self.read_bytes(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, address: Address) -> Result<u32, MemoryError> {
        check_alignment(address, 4)?;
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32(&self, address: Address) -> Result<i32, MemoryError> {
        self.read_u32(address).map(|v| v as i32)
    }

    fn read_u64(&self, address: Address) -> Result<u64, MemoryError> {
        check_alignment(address, 8)?;
        let mut buf = [0u8; 8];
        self.read_bytes(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_pointer(&self, address: Address) -> Result<Address, MemoryError> {
        check_alignment(address, POINTER_SIZE)?;
        self.read_u64(address).map(Address::new)
    }

    fn write_u32(&self, address: Address, value: u32) -> Result<(), MemoryError> {
        check_alignment(address, 4)?;
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u64(&self, address: Address, value: u64) -> Result<(), MemoryError> {
        check_alignment(address, 8)?;
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_pointer(&self, address: Address, value: Address) -> Result<(), MemoryError> {
        self.write_u64(address, value.get())
    }

    /// Read bytes up to (not including) a NUL terminator.
    ///
    /// Returns `Ok(None)` when no terminator appears within `limit` bytes.
    fn read_cstring(&self, address: Address, limit: usize) -> Result<Option<Vec<u8>>, MemoryError> {
        let mut out = Vec::new();
        let mut cursor = address;
        while out.len() < limit {
            let byte = self.read_u8(cursor)?;
            if byte == 0 {
                return Ok(Some(out));
            }
            out.push(byte);
            cursor = cursor.add(1);
        }
        Ok(None)
    }
}

fn check_alignment(address: Address, align: u64) -> Result<(), MemoryError> {
    if address.is_aligned(align) {
        Ok(())
    } else {
        Err(MemoryError::Misaligned { address, align })
    }
}

//! NUL-terminated names referenced from metadata.

use swiftscope_core::{Address, Memory};

use crate::error::{DecodeError, DecodeLimits, Result};
use crate::relative::RelativePointer;

/// Read a UTF-8 C string at `address`.
pub fn read_c_string(memory: &dyn Memory, address: Address, limits: &DecodeLimits) -> Result<String> {
    let bytes = memory
        .read_cstring(address, limits.max_name_len)?
        .ok_or(DecodeError::UnterminatedString {
            address,
            limit: limits.max_name_len,
        })?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { address }.into())
}

/// Follow the non-null direct relative pointer at `at` and read the name there.
pub fn read_relative_name(memory: &dyn Memory, at: Address, limits: &DecodeLimits) -> Result<String> {
    let target = RelativePointer::direct(at)
        .resolve(memory)?
        .ok_or(DecodeError::NullPointer { address: at })?;
    read_c_string(memory, target, limits)
}

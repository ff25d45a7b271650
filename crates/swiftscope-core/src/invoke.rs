//! Native call invoker.

use crate::address::Address;
use crate::memory::MemoryError;

/// A call into target code.
///
/// Arguments are pointer-sized words in declaration order. `context` is the
/// Swift context register (self / metadata), passed out of band because its
/// placement is a calling-convention concern owned by the invoker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeCall<'a> {
    pub function: Address,
    pub args: &'a [u64],
    pub context: Option<Address>,
}

impl<'a> NativeCall<'a> {
    /// Zero-argument call, e.g. a metadata access function.
    pub fn new(function: Address) -> Self {
        Self {
            function,
            args: &[],
            context: None,
        }
    }

    pub fn with_args(function: Address, args: &'a [u64]) -> Self {
        Self {
            function,
            args,
            context: None,
        }
    }

    pub fn context(mut self, context: Address) -> Self {
        self.context = Some(context);
        self
    }
}

/// Failure to call into the target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("no callable function at {0}")]
    NotCallable(Address),
    #[error("call to {function} failed: {reason}")]
    Failed { function: Address, reason: String },
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Invokes functions under the target's calling convention.
pub trait NativeInvoker {
    /// Call `call.function` and return its pointer-sized result.
    fn invoke(&self, call: NativeCall<'_>) -> Result<u64, CallError>;
}

//! In-memory target image.
//!
//! [`MemoryImage`] is a sparse little-endian address space made of mapped
//! regions plus a bump heap for [`Memory::allocate`]. [`ImageBuilder`] lays
//! out bytes at fixed addresses and patches relative pointers between them,
//! which is all that is needed to reproduce compiler-emitted metadata.
//! [`FunctionTable`] stands in for target code: Rust closures registered at
//! synthetic addresses.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::address::{Address, POINTER_SIZE};
use crate::invoke::{CallError, NativeCall, NativeInvoker};
use crate::memory::{Memory, MemoryError};

/// Default base of the allocation heap, far from typical image bases.
const DEFAULT_HEAP_BASE: u64 = 0x6000_0000;

/// Allocation granularity of the heap.
const HEAP_ALIGN: u64 = 16;

/// Sparse address space backed by `Vec<u8>` regions.
///
/// Regions must not overlap; later mappings at an existing base replace
/// the earlier region.
#[derive(Debug)]
pub struct MemoryImage {
    regions: RefCell<BTreeMap<u64, Vec<u8>>>,
    heap: RefCell<Heap>,
}

#[derive(Debug)]
struct Heap {
    next: u64,
    live: HashMap<u64, usize>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::with_heap_base(Address::new(DEFAULT_HEAP_BASE))
    }

    pub fn with_heap_base(base: Address) -> Self {
        Self {
            regions: RefCell::new(BTreeMap::new()),
            heap: RefCell::new(Heap {
                next: base.get(),
                live: HashMap::new(),
            }),
        }
    }

    /// Map `bytes` at `base`.
    pub fn map(&self, base: Address, bytes: Vec<u8>) {
        self.regions.borrow_mut().insert(base.get(), bytes);
    }

    /// Map the output of a builder.
    pub fn load(&self, builder: ImageBuilder) {
        let (base, bytes) = builder.finish();
        self.map(base, bytes);
    }

    /// Number of heap blocks not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.heap.borrow().live.len()
    }

    fn with_region<R>(
        &self,
        address: Address,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, MemoryError> {
        let unmapped = MemoryError::Unmapped { address, len };
        let mut regions = self.regions.borrow_mut();
        let (base, bytes) = regions
            .range_mut(..=address.get())
            .next_back()
            .ok_or(unmapped.clone())?;
        let start = (address.get() - *base) as usize;
        let end = start.checked_add(len).ok_or(unmapped.clone())?;
        if end > bytes.len() {
            return Err(unmapped);
        }
        Ok(f(&mut bytes[start..end]))
    }
}

impl Memory for MemoryImage {
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        self.with_region(address, buf.len(), |src| buf.copy_from_slice(src))
    }

    fn write_bytes(&self, address: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        self.with_region(address, bytes.len(), |dst| dst.copy_from_slice(bytes))
    }

    fn allocate(&self, size: usize) -> Result<Address, MemoryError> {
        let mut heap = self.heap.borrow_mut();
        let base = heap.next;
        let span = (size.max(1) as u64).div_ceil(HEAP_ALIGN) * HEAP_ALIGN;
        heap.next = base
            .checked_add(span)
            .ok_or(MemoryError::OutOfMemory(size))?;
        heap.live.insert(base, size);
        drop(heap);

        self.map(Address::new(base), vec![0; size.max(1)]);
        Ok(Address::new(base))
    }

    fn free(&self, address: Address) -> Result<(), MemoryError> {
        if self.heap.borrow_mut().live.remove(&address.get()).is_none() {
            return Err(MemoryError::InvalidFree(address));
        }
        self.regions.borrow_mut().remove(&address.get());
        Ok(())
    }
}

/// Lays out bytes at a fixed base address.
///
/// Every `push_*` returns the address the value landed at, so callers can
/// patch forward references once their targets exist.
///
/// # Panics
///
/// The `patch_*` helpers panic when the write falls outside the bytes
/// pushed so far. The relative-pointer helpers also panic when the
/// displacement does not fit in 32 bits.
#[derive(Clone, Debug)]
pub struct ImageBuilder {
    base: Address,
    bytes: Vec<u8>,
}

impl ImageBuilder {
    pub fn new(base: Address) -> Self {
        Self {
            base,
            bytes: Vec::new(),
        }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    /// Address of the next byte to be pushed.
    pub fn cursor(&self) -> Address {
        self.base.add(self.bytes.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pad with zeros until the cursor is a multiple of `align`.
    pub fn align(&mut self, align: u64) -> &mut Self {
        while !self.cursor().is_aligned(align) {
            self.bytes.push(0);
        }
        self
    }

    /// Append `len` zero bytes.
    pub fn reserve(&mut self, len: usize) -> Address {
        let at = self.cursor();
        self.bytes.resize(self.bytes.len() + len, 0);
        at
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Address {
        let at = self.cursor();
        self.bytes.extend_from_slice(bytes);
        at
    }

    pub fn push_u16(&mut self, value: u16) -> Address {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u32(&mut self, value: u32) -> Address {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_i32(&mut self, value: i32) -> Address {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u64(&mut self, value: u64) -> Address {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Pointer-aligned pointer slot.
    pub fn push_pointer(&mut self, value: Address) -> Address {
        self.align(POINTER_SIZE);
        self.push_u64(value.get())
    }

    /// NUL-terminated string.
    pub fn push_cstr(&mut self, text: &str) -> Address {
        let at = self.push_bytes(text.as_bytes());
        self.bytes.push(0);
        at
    }

    /// # Panics
    ///
    /// If `at..at + bytes.len()` is not within the bytes pushed so far.
    pub fn patch_bytes(&mut self, at: Address, bytes: &[u8]) {
        let start = self.index_of(at, bytes.len());
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn patch_u32(&mut self, at: Address, value: u32) {
        self.patch_bytes(at, &value.to_le_bytes());
    }

    pub fn patch_u64(&mut self, at: Address, value: u64) {
        self.patch_bytes(at, &value.to_le_bytes());
    }

    pub fn patch_pointer(&mut self, at: Address, value: Address) {
        self.patch_u64(at, value.get());
    }

    /// Write a direct relative pointer at `at`; `None` writes the null offset.
    ///
    /// # Panics
    ///
    /// If `target` is more than 2 GiB away from `at`, or `at` is outside
    /// the builder.
    pub fn patch_relative(&mut self, at: Address, target: Option<Address>) {
        let raw = target.map_or(0, |target| displacement(at, target));
        self.patch_u32(at, raw as u32);
    }

    /// Write an indirect relative pointer at `at` going through `slot`.
    ///
    /// # Panics
    ///
    /// If `slot` is odd or out of 32-bit reach, or `at` is outside the
    /// builder.
    pub fn patch_relative_indirect(&mut self, at: Address, slot: Address) {
        let raw = displacement(at, slot);
        assert!(raw & 1 == 0, "indirect slot {slot} must be 2-byte aligned");
        self.patch_u32(at, (raw | 1) as u32);
    }

    /// Write a relative pointer whose low bits carry `int`.
    pub fn patch_relative_pair(&mut self, at: Address, target: Address, int: u32) {
        let raw = displacement(at, target);
        self.patch_u32(at, raw as u32 | int);
    }

    pub fn finish(self) -> (Address, Vec<u8>) {
        (self.base, self.bytes)
    }

    fn index_of(&self, at: Address, len: usize) -> usize {
        let start = at.offset_from(self.base);
        assert!(
            start >= 0 && start as usize + len <= self.bytes.len(),
            "patch at {at} outside builder ({} bytes at {})",
            self.bytes.len(),
            self.base
        );
        start as usize
    }
}

fn displacement(from: Address, to: Address) -> i32 {
    let delta = to.offset_from(from);
    i32::try_from(delta)
        .unwrap_or_else(|_| panic!("relative pointer {from} -> {to} exceeds 32 bits"))
}

/// A registered stand-in for a target function.
pub type NativeFn = Rc<dyn Fn(NativeCall<'_>) -> Result<u64, CallError>>;

/// Stride between synthetic function addresses.
const FUNCTION_STRIDE: u64 = 16;

/// Closures registered at synthetic code addresses.
///
/// Pick a base within ±2 GiB of the metadata image so descriptors can reach
/// the functions through 32-bit relative pointers.
pub struct FunctionTable {
    base: Address,
    functions: RefCell<Vec<NativeFn>>,
}

impl FunctionTable {
    pub fn new(base: Address) -> Self {
        Self {
            base,
            functions: RefCell::new(Vec::new()),
        }
    }

    /// Register `function` and return its address.
    pub fn register(
        &self,
        function: impl Fn(NativeCall<'_>) -> Result<u64, CallError> + 'static,
    ) -> Address {
        let mut functions = self.functions.borrow_mut();
        let at = self.base.add(functions.len() as u64 * FUNCTION_STRIDE);
        functions.push(Rc::new(function));
        at
    }

    /// Register a function that always returns `value`.
    pub fn register_constant(&self, value: u64) -> Address {
        self.register(move |_| Ok(value))
    }

    pub fn len(&self) -> usize {
        self.functions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.borrow().is_empty()
    }

    fn lookup(&self, address: Address) -> Option<NativeFn> {
        let delta = address.offset_from(self.base);
        if delta < 0 || delta as u64 % FUNCTION_STRIDE != 0 {
            return None;
        }
        let index = (delta as u64 / FUNCTION_STRIDE) as usize;
        self.functions.borrow().get(index).cloned()
    }
}

impl NativeInvoker for FunctionTable {
    fn invoke(&self, call: NativeCall<'_>) -> Result<u64, CallError> {
        let function = self
            .lookup(call.function)
            .ok_or(CallError::NotCallable(call.function))?;
        function(call)
    }
}

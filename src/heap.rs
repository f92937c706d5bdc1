//! The allocation indirection every strix buffer goes through.
//!
//! Nothing in the crate calls `malloc` or the global allocator for string
//! storage directly; it asks a [`RawAllocator`] selected by [`Backend`].

use std::{alloc::Layout, fmt, ptr::NonNull, str::FromStr};

use thiserror::Error;

/// Two-function allocator contract shared by every backend.
pub trait RawAllocator {
  /// Returns a pointer to at least `layout.size()` bytes, or null on failure.
  ///
  /// # Safety
  ///
  /// `layout.size()` must be non-zero.
  unsafe fn allocate(
    &mut self,
    layout: Layout,
  ) -> *mut u8;

  /// Releases memory previously returned by `allocate` on the same allocator.
  /// A null `address` is a no-op.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer from this allocator.
  unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  );

  fn name(&self) -> &'static str;
}

/// Selects which backend serves new allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
  /// Plain `malloc`/`free`.
  #[default]
  System,
  /// Segmented pool with internal garbage collection.
  Segmented,
}

impl Backend {
  pub fn as_str(self) -> &'static str {
    match self {
      Backend::System => "system",
      Backend::Segmented => "segmented",
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown allocator backend `{0}`")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
  type Err = UnknownBackend;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "system" | "default" | "malloc" => Ok(Backend::System),
      "segmented" | "custom" | "pool" => Ok(Backend::Segmented),
      other => Err(UnknownBackend(other.to_string())),
    }
  }
}

/// An owned allocation, tagged with the backend that produced it so it is
/// always handed back to the same one.
#[derive(Debug)]
pub(crate) struct RawBuf {
  ptr: NonNull<u8>,
  capacity: usize,
  backend: Backend,
}

impl RawBuf {
  pub(crate) fn new(
    ptr: NonNull<u8>,
    capacity: usize,
    backend: Backend,
  ) -> Self {
    Self { ptr, capacity, backend }
  }

  pub(crate) fn as_ptr(&self) -> *mut u8 {
    self.ptr.as_ptr()
  }

  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  pub(crate) fn backend(&self) -> Backend {
    self.backend
  }

  /// # Safety
  ///
  /// The first `len` bytes must have been written and `len <= capacity`.
  pub(crate) unsafe fn bytes(
    &self,
    len: usize,
  ) -> &[u8] {
    debug_assert!(len <= self.capacity);
    unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), len) }
  }
}

/// Counters kept by a context across both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
  pub allocations: usize,
  pub deallocations: usize,
  pub live_bytes: usize,
  pub peak_bytes: usize,
}

impl HeapStats {
  pub fn live_allocations(&self) -> usize {
    self.allocations - self.deallocations
  }

  pub(crate) fn record_allocation(
    &mut self,
    size: usize,
  ) {
    self.allocations += 1;
    self.live_bytes += size;
    self.peak_bytes = self.peak_bytes.max(self.live_bytes);
  }

  pub(crate) fn record_deallocation(
    &mut self,
    size: usize,
  ) {
    self.deallocations += 1;
    self.live_bytes -= size;
  }
}

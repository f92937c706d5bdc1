//! The handle every strix operation runs against.
//!
//! A [`Context`] bundles the backend selector, both backends, allocation
//! counters and the diagnostic status latch. Clones share the same state.
//! It is deliberately `!Send`: one context and the strings created from it
//! belong to one thread, and other threads build their own.

use std::{
  alloc::Layout,
  cell::{Cell, RefCell},
  fmt,
  ptr::NonNull,
  rc::Rc,
};

use crate::{
  config::Config,
  error::{ErrorCode, Result, StrixError},
  heap::{Backend, HeapStats, RawAllocator, RawBuf},
  segmented::SegmentedAllocator,
  strix::Strix,
  system::SystemAllocator,
};

struct Inner {
  config: Config,
  backend: Cell<Backend>,
  system: RefCell<SystemAllocator>,
  segmented: RefCell<SegmentedAllocator>,
  stats: Cell<HeapStats>,
  status: Cell<ErrorCode>,
}

#[derive(Clone)]
pub struct Context {
  inner: Rc<Inner>,
}

impl Context {
  pub fn new() -> Self {
    Self::with_config(Config::default())
  }

  /// Context configured from the `STRIX_*` environment variables.
  pub fn from_env() -> Self {
    Self::with_config(Config::from_env())
  }

  pub fn with_config(config: Config) -> Self {
    let segmented = SegmentedAllocator::from_config(&config);
    Self {
      inner: Rc::new(Inner {
        backend: Cell::new(config.backend),
        system: RefCell::new(SystemAllocator::new()),
        segmented: RefCell::new(segmented),
        stats: Cell::new(HeapStats::default()),
        status: Cell::new(ErrorCode::Success),
        config,
      }),
    }
  }

  pub fn config(&self) -> &Config {
    &self.inner.config
  }

  /// Whether both handles share the same state.
  pub fn same(
    &self,
    other: &Context,
  ) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  /// Builds a new strix holding a copy of `bytes`.
  pub fn create(
    &self,
    bytes: &[u8],
  ) -> Result<Strix> {
    Strix::new(self, bytes)
  }

  pub fn backend(&self) -> Backend {
    self.inner.backend.get()
  }

  /// Routes every later allocation of this context to `backend`.
  ///
  /// Buffers already allocated keep their original backend and are released
  /// through it.
  pub fn use_backend(
    &self,
    backend: Backend,
  ) {
    let previous = self.inner.backend.replace(backend);
    if previous != backend {
      log::debug!("switching allocator backend from {} to {}", previous, backend);
    }
  }

  pub fn use_default_allocator(&self) {
    self.use_backend(Backend::System);
  }

  pub fn use_custom_allocator(&self) {
    self.use_backend(Backend::Segmented);
  }

  pub fn stats(&self) -> HeapStats {
    self.inner.stats.get()
  }

  /// Runs the segmented backend's garbage collection now. Returns bytes released.
  pub fn collect(&self) -> usize {
    self.inner.segmented.borrow_mut().collect()
  }

  pub fn segment_count(&self) -> usize {
    self.inner.segmented.borrow().segment_count()
  }

  /// Outcome of the most recent operation run against this context.
  pub fn last_error(&self) -> ErrorCode {
    self.inner.status.get()
  }

  pub fn clear_error(&self) {
    self.inner.status.set(ErrorCode::Success);
  }

  /// Prints `prefix: message` for the latched code to stderr.
  pub fn perror(
    &self,
    prefix: &str,
  ) {
    eprintln!("{}", self.describe(prefix));
  }

  fn describe(
    &self,
    prefix: &str,
  ) -> String {
    let message = self.last_error().message();
    if prefix.is_empty() {
      message.to_string()
    } else {
      format!("{}: {}", prefix, message)
    }
  }

  pub(crate) fn record<T>(
    &self,
    result: Result<T>,
  ) -> Result<T> {
    match &result {
      Ok(_) => self.inner.status.set(ErrorCode::Success),
      Err(err) => {
        log::debug!("strix operation failed: {}", err);
        self.inner.status.set(err.code());
      },
    }
    result
  }

  fn with_allocator<R>(
    &self,
    backend: Backend,
    f: impl FnOnce(&mut dyn RawAllocator) -> R,
  ) -> R {
    match backend {
      Backend::System => f(&mut *self.inner.system.borrow_mut()),
      Backend::Segmented => f(&mut *self.inner.segmented.borrow_mut()),
    }
  }

  pub(crate) fn allocate(
    &self,
    size: usize,
  ) -> Result<RawBuf> {
    debug_assert!(size > 0);
    let layout =
      Layout::array::<u8>(size).map_err(|_| StrixError::AllocationFailure { size })?;

    let backend = self.backend();
    let address = self.with_allocator(backend, |allocator| unsafe { allocator.allocate(layout) });

    let Some(ptr) = NonNull::new(address) else {
      log::warn!("{} backend failed to allocate {} bytes", backend, size);
      return Err(StrixError::AllocationFailure { size });
    };

    let mut stats = self.inner.stats.get();
    stats.record_allocation(size);
    self.inner.stats.set(stats);

    Ok(RawBuf::new(ptr, size, backend))
  }

  pub(crate) fn release(
    &self,
    buf: RawBuf,
  ) {
    self.with_allocator(buf.backend(), |allocator| unsafe {
      allocator.deallocate(buf.as_ptr())
    });

    let mut stats = self.inner.stats.get();
    stats.record_deallocation(buf.capacity());
    self.inner.stats.set(stats);
  }
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
      .field("backend", &self.backend())
      .field("stats", &self.stats())
      .field("status", &self.last_error())
      .finish()
  }
}

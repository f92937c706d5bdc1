use std::alloc::Layout;

use libc::c_void;

use crate::heap::RawAllocator;

/// `malloc`/`free` backend.
///
/// `malloc` guarantees alignment suitable for any fundamental type, which
/// covers every layout strix asks for.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
  pub fn new() -> Self {
    Self
  }
}

impl RawAllocator for SystemAllocator {
  unsafe fn allocate(
    &mut self,
    layout: Layout,
  ) -> *mut u8 {
    let address = unsafe { libc::malloc(layout.size()) } as *mut u8;

    log::trace!(
      "system: allocated {} bytes, address = {:?}",
      layout.size(),
      address
    );

    address
  }

  unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    log::trace!("system: released address = {:?}", address);
    unsafe { libc::free(address as *mut c_void) };
  }

  fn name(&self) -> &'static str {
    "system"
  }
}

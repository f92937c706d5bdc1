use std::ptr;

/// Header placed in front of every block carved out of a segment.
pub struct Block {
  pub size: usize,
  pub is_free: bool,
  pub next: *mut Block,
  pub segment: *mut Segment,
}

impl Block {
  pub fn new(
    size: usize,
    segment: *mut Segment,
  ) -> Self {
    Self {
      size,
      is_free: false,
      next: ptr::null_mut(),
      segment,
    }
  }
}

/// Header at the start of every region obtained from the system.
pub struct Segment {
  /// Total bytes of the region, header included.
  pub size: usize,
  /// Bump offset from the segment base to the first unused byte.
  pub used: usize,
  /// Blocks in this segment not yet released.
  pub live: usize,
  pub next: *mut Segment,
}

impl Segment {
  pub fn new(size: usize) -> Self {
    Self {
      size,
      used: std::mem::size_of::<Segment>(),
      live: 0,
      next: ptr::null_mut(),
    }
  }

  pub fn is_idle(&self) -> bool {
    self.live == 0
  }
}

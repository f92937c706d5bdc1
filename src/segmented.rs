use std::{alloc, mem, ptr};

use libc::c_void;

use crate::{
  align, align_to,
  block::{Block, Segment},
  config::Config,
  heap::RawAllocator,
};

/// How a released block is picked for reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
  /// First free block large enough.
  #[default]
  FirstFit,
  /// Smallest free block large enough.
  BestFit,
}

/// Pool allocator that carves blocks out of large `malloc`ed segments.
///
/// New blocks are bumped out of the newest segment. Released blocks stay in
/// the block list and are handed out again to requests they can hold. A
/// segment whose blocks have all been released is idle; idle segments are
/// returned to the system by [`SegmentedAllocator::collect`], which also runs
/// on its own once more than `gc_threshold` segments sit idle.
pub struct SegmentedAllocator {
  first: *mut Block,
  last: *mut Block,
  segments: *mut Segment,
  segment_count: usize,
  idle_segments: usize,
  segment_size: usize,
  max_segments: Option<usize>,
  alignment: usize,
  gc_threshold: usize,
  mode: SearchMode,
}

impl SegmentedAllocator {
  pub fn new() -> Self {
    Self::from_config(&Config::default())
  }

  pub fn from_config(config: &Config) -> Self {
    Self {
      first: ptr::null_mut(),
      last: ptr::null_mut(),
      segments: ptr::null_mut(),
      segment_count: 0,
      idle_segments: 0,
      segment_size: config.segment_size,
      max_segments: config.max_segments,
      alignment: config.alignment.max(mem::align_of::<Block>()),
      gc_threshold: config.gc_threshold,
      mode: config.search_mode,
    }
  }

  pub fn segment_count(&self) -> usize {
    self.segment_count
  }

  pub fn idle_segments(&self) -> usize {
    self.idle_segments
  }

  /// Bytes currently held from the system, headers included.
  pub fn reserved_bytes(&self) -> usize {
    let mut total = 0;
    let mut current = self.segments;
    unsafe {
      while !current.is_null() {
        total += (*current).size;
        current = (*current).next;
      }
    }
    total
  }

  pub fn live_blocks(&self) -> usize {
    self.count_blocks(false)
  }

  pub fn free_blocks(&self) -> usize {
    self.count_blocks(true)
  }

  fn count_blocks(
    &self,
    free: bool,
  ) -> usize {
    let mut count = 0;
    let mut current = self.first;
    unsafe {
      while !current.is_null() {
        if (*current).is_free == free {
          count += 1;
        }
        current = (*current).next;
      }
    }
    count
  }

  unsafe fn data_of(block: *mut Block) -> *mut u8 {
    unsafe { (block as *mut u8).add(mem::size_of::<Block>()) }
  }

  unsafe fn find_block(address: *mut u8) -> *mut Block {
    unsafe { address.sub(mem::size_of::<Block>()) as *mut Block }
  }

  unsafe fn find_free_block(
    &self,
    size: usize,
    alignment: usize,
  ) -> *mut Block {
    unsafe {
      let mut best: *mut Block = ptr::null_mut();
      let mut current: *mut Block = self.first;

      while !current.is_null() {
        let fits = (*current).is_free
          && (*current).size >= size
          && (Self::data_of(current) as usize) % alignment == 0;

        if fits {
          match self.mode {
            SearchMode::FirstFit => return current,
            SearchMode::BestFit => {
              if best.is_null() || (*current).size < (*best).size {
                best = current;
              }
            },
          }
        }
        current = (*current).next;
      }

      best
    }
  }

  unsafe fn mark_live(
    &mut self,
    segment: *mut Segment,
  ) {
    unsafe {
      if (*segment).is_idle() {
        self.idle_segments -= 1;
      }
      (*segment).live += 1;
    }
  }

  /// Bumps a new block out of `segment`, or returns null if it has no room.
  unsafe fn carve(
    &mut self,
    segment: *mut Segment,
    size: usize,
    alignment: usize,
  ) -> *mut Block {
    unsafe {
      let base = segment as usize;
      let data = align_to!(base + (*segment).used + mem::size_of::<Block>(), alignment);
      let end = data + size;

      if end > base + (*segment).size {
        return ptr::null_mut();
      }

      let block = (data - mem::size_of::<Block>()) as *mut Block;
      ptr::write(block, Block::new(size, segment));
      (*segment).used = align!(end - base).min((*segment).size);
      self.mark_live(segment);

      if self.first.is_null() {
        self.first = block;
        self.last = block;
      } else {
        (*self.last).next = block;
        self.last = block;
      }

      block
    }
  }

  unsafe fn acquire_segment(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> *mut Segment {
    if let Some(max) = self.max_segments {
      if self.segment_count >= max && self.idle_segments > 0 {
        self.collect();
      }
      if self.segment_count >= max {
        log::warn!(
          "segmented: segment limit {} reached, cannot serve {} bytes",
          max,
          size
        );
        return ptr::null_mut();
      }
    }

    let needed = mem::size_of::<Segment>() + mem::size_of::<Block>() + size + alignment;
    let segment_size = self.segment_size.max(align!(needed));

    let address = unsafe { libc::malloc(segment_size) } as *mut Segment;
    if address.is_null() {
      log::warn!("segmented: system refused a {} byte segment", segment_size);
      return ptr::null_mut();
    }

    unsafe {
      ptr::write(address, Segment::new(segment_size));
      (*address).next = self.segments;
    }
    self.segments = address;
    self.segment_count += 1;
    // A fresh segment starts idle until its first block is carved.
    self.idle_segments += 1;

    log::debug!(
      "segmented: acquired segment {:?} of {} bytes ({} live segments)",
      address,
      segment_size,
      self.segment_count
    );

    address
  }

  /// Returns every idle segment to the system. Yields the number of bytes released.
  pub fn collect(&mut self) -> usize {
    unsafe {
      let mut prev: *mut Block = ptr::null_mut();
      let mut current = self.first;
      while !current.is_null() {
        let next = (*current).next;
        if (*(*current).segment).is_idle() {
          if prev.is_null() {
            self.first = next;
          } else {
            (*prev).next = next;
          }
        } else {
          prev = current;
        }
        current = next;
      }
      self.last = prev;

      let mut released = 0;
      let mut prev_segment: *mut Segment = ptr::null_mut();
      let mut segment = self.segments;
      while !segment.is_null() {
        let next = (*segment).next;
        if (*segment).is_idle() {
          if prev_segment.is_null() {
            self.segments = next;
          } else {
            (*prev_segment).next = next;
          }
          released += (*segment).size;
          self.segment_count -= 1;
          libc::free(segment as *mut c_void);
        } else {
          prev_segment = segment;
        }
        segment = next;
      }
      self.idle_segments = 0;

      if released > 0 {
        log::debug!(
          "segmented: collected {} bytes, {} segments remain",
          released,
          self.segment_count
        );
      }
      released
    }
  }
}

impl Default for SegmentedAllocator {
  fn default() -> Self {
    Self::new()
  }
}

impl RawAllocator for SegmentedAllocator {
  unsafe fn allocate(
    &mut self,
    layout: alloc::Layout,
  ) -> *mut u8 {
    let size = layout.size();
    let alignment = self.alignment.max(layout.align());

    unsafe {
      let free_block = self.find_free_block(size, alignment);

      if !free_block.is_null() {
        (*free_block).is_free = false;
        self.mark_live((*free_block).segment);

        let address = Self::data_of(free_block);
        log::trace!(
          "segmented: reused block of {} bytes for {} bytes, address = {:?}",
          (*free_block).size,
          size,
          address
        );
        return address;
      }

      let mut block = ptr::null_mut();
      if !self.segments.is_null() {
        block = self.carve(self.segments, size, alignment);
      }
      if block.is_null() {
        let segment = self.acquire_segment(size, alignment);
        if segment.is_null() {
          return ptr::null_mut();
        }
        block = self.carve(segment, size, alignment);
      }

      let address = Self::data_of(block);
      log::trace!("segmented: allocated {} bytes, address = {:?}", size, address);
      address
    }
  }

  unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    unsafe {
      if address.is_null() {
        return;
      }

      let block = Self::find_block(address);
      if (*block).is_free {
        log::warn!("segmented: ignoring double release of {:?}", address);
        return;
      }
      (*block).is_free = true;

      let segment = (*block).segment;
      (*segment).live -= 1;
      if (*segment).is_idle() {
        self.idle_segments += 1;
      }
      log::trace!("segmented: released address = {:?}", address);

      if self.idle_segments > self.gc_threshold {
        self.collect();
      }
    }
  }

  fn name(&self) -> &'static str {
    "segmented"
  }
}

impl Drop for SegmentedAllocator {
  fn drop(&mut self) {
    unsafe {
      let mut segment = self.segments;
      while !segment.is_null() {
        let next = (*segment).next;
        libc::free(segment as *mut c_void);
        segment = next;
      }
    }
  }
}

//! The [`Strix`] byte string.
//!
//! A strix owns exactly one buffer obtained from its [`Context`], never
//! shares it, and never keeps a terminator: `len` is the only authority on
//! where the content ends. Every mutation builds a complete replacement
//! buffer first and only then releases the old one, so a failed call leaves
//! the strix exactly as it was.
//!
//! ```text
//!   insert_bytes(2, b"XY") on "abcd"
//!
//!   old   a b | c d
//!   new   a b X Y c d      (fresh allocation, old released afterwards)
//! ```
//!
//! Offsets are 0-based everywhere. `slice` takes an inclusive end, `erase`
//! takes a count and a start offset.

use std::{fmt, mem, ptr};

use crate::{
  array::StrixArray,
  context::Context,
  error::{Result, StrixError},
  heap::{Backend, RawBuf},
  search::{Kmp, MatchPositions},
};

pub struct Strix {
  buf: Option<RawBuf>,
  len: usize,
  ctx: Context,
}

/// Allocates one buffer holding `parts` back to back. Zero total length
/// yields no buffer at all.
fn assemble(
  ctx: &Context,
  parts: &[&[u8]],
) -> Result<Option<RawBuf>> {
  let total = parts
    .iter()
    .try_fold(0usize, |acc, part| acc.checked_add(part.len()))
    .ok_or(StrixError::AllocationFailure { size: usize::MAX })?;
  if total == 0 {
    return Ok(None);
  }

  let buf = ctx.allocate(total)?;
  let mut offset = 0;
  for part in parts {
    if let Err(err) = copy_into(&buf, offset, part) {
      ctx.release(buf);
      return Err(err);
    }
    offset += part.len();
  }
  Ok(Some(buf))
}

fn copy_into(
  buf: &RawBuf,
  offset: usize,
  bytes: &[u8],
) -> Result<()> {
  match offset.checked_add(bytes.len()) {
    Some(end) if end <= buf.capacity() => {},
    _ => {
      return Err(StrixError::CopyFailure {
        offset,
        len: bytes.len(),
        capacity: buf.capacity(),
      });
    },
  }
  // The destination is a fresh allocation, so it cannot overlap `bytes`.
  unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_ptr().add(offset), bytes.len()) };
  Ok(())
}

impl Strix {
  /// Copies `bytes` into a new strix. Empty input is rejected.
  pub fn new(
    ctx: &Context,
    bytes: &[u8],
  ) -> Result<Self> {
    ctx.record(Self::build(ctx, bytes))
  }

  /// A strix in the cleared state: no buffer, length zero.
  pub fn empty(ctx: &Context) -> Self {
    Self {
      buf: None,
      len: 0,
      ctx: ctx.clone(),
    }
  }

  fn build(
    ctx: &Context,
    bytes: &[u8],
  ) -> Result<Self> {
    if bytes.is_empty() {
      return Err(StrixError::EmptyString);
    }
    let buf = assemble(ctx, &[bytes])?;
    Ok(Self {
      buf,
      len: bytes.len(),
      ctx: ctx.clone(),
    })
  }

  pub fn as_bytes(&self) -> &[u8] {
    match &self.buf {
      Some(buf) => unsafe { buf.bytes(self.len) },
      None => &[],
    }
  }

  pub fn to_vec(&self) -> Vec<u8> {
    self.as_bytes().to_vec()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Bytes reserved by the current buffer.
  pub fn capacity(&self) -> usize {
    self.buf.as_ref().map_or(0, RawBuf::capacity)
  }

  /// Backend holding the current buffer, if there is one.
  pub fn backend(&self) -> Option<Backend> {
    self.buf.as_ref().map(RawBuf::backend)
  }

  pub fn context(&self) -> &Context {
    &self.ctx
  }

  fn require_buffer(&self) -> Result<()> {
    if self.buf.is_none() {
      return Err(StrixError::AbsentBuffer);
    }
    Ok(())
  }

  fn commit(
    &mut self,
    buf: Option<RawBuf>,
  ) {
    let old = mem::replace(&mut self.buf, buf);
    self.len = self.buf.as_ref().map_or(0, RawBuf::capacity);
    if let Some(old) = old {
      self.ctx.release(old);
    }
  }

  /// Replaces `remove` bytes at `at` with `insert`.
  fn splice(
    &mut self,
    at: usize,
    remove: usize,
    insert: &[u8],
  ) -> Result<()> {
    if remove == 0 && insert.is_empty() {
      return Ok(());
    }
    let old = self.as_bytes();
    let new = assemble(&self.ctx, &[&old[..at], insert, &old[at + remove..]])?;
    self.commit(new);
    Ok(())
  }

  /// Deep copy in a fresh allocation. A strix with no content cannot be
  /// duplicated.
  pub fn duplicate(&self) -> Result<Strix> {
    let result = if self.is_empty() {
      Err(StrixError::EmptyString)
    } else {
      Self::build(&self.ctx, self.as_bytes())
    };
    self.ctx.record(result)
  }

  /// Replaces the whole content with a copy of `bytes`.
  pub fn modify(
    &mut self,
    bytes: &[u8],
  ) -> Result<()> {
    let result = if bytes.is_empty() {
      Err(StrixError::EmptyString)
    } else {
      assemble(&self.ctx, &[bytes]).map(|buf| self.commit(buf))
    };
    self.ctx.record(result)
  }

  /// Releases the buffer. The strix stays usable.
  pub fn clear(&mut self) -> Result<()> {
    self.commit(None);
    self.ctx.record(Ok(()))
  }

  /// Appends the content of `src`. `None` or an empty source is a no-op.
  pub fn concat(
    &mut self,
    src: Option<&Strix>,
  ) -> Result<()> {
    let result = match src {
      Some(src) => self.splice(self.len, 0, src.as_bytes()),
      None => Ok(()),
    };
    self.ctx.record(result)
  }

  pub fn append(
    &mut self,
    bytes: &[u8],
  ) -> Result<()> {
    let result = self.splice(self.len, 0, bytes);
    self.ctx.record(result)
  }

  /// Inserts the content of `src` before the byte at `pos`.
  pub fn insert(
    &mut self,
    src: &Strix,
    pos: usize,
  ) -> Result<()> {
    let result = self.insert_at(pos, src.as_bytes());
    self.ctx.record(result)
  }

  /// Inserts `bytes` before the byte at `pos`.
  pub fn insert_bytes(
    &mut self,
    pos: usize,
    bytes: &[u8],
  ) -> Result<()> {
    let result = self.insert_at(pos, bytes);
    self.ctx.record(result)
  }

  fn insert_at(
    &mut self,
    pos: usize,
    bytes: &[u8],
  ) -> Result<()> {
    self.require_buffer()?;
    if pos >= self.len {
      return Err(StrixError::InvalidPosition { pos, len: self.len });
    }
    self.splice(pos, 0, bytes)
  }

  /// Removes `len` bytes starting at `pos`. A span running past the end is
  /// cut short at the end; `pos` itself must be inside the buffer.
  pub fn erase(
    &mut self,
    len: usize,
    pos: usize,
  ) -> Result<()> {
    let result = self.erase_span(len, pos);
    self.ctx.record(result)
  }

  fn erase_span(
    &mut self,
    len: usize,
    pos: usize,
  ) -> Result<()> {
    self.require_buffer()?;
    if pos >= self.len {
      return Err(StrixError::InvalidPosition { pos, len: self.len });
    }
    if len == 0 {
      return Err(StrixError::InvalidLength { len });
    }
    let len = len.min(self.len - pos);
    self.splice(pos, len, &[])
  }

  pub fn at(
    &self,
    index: usize,
  ) -> Result<u8> {
    let result = self.require_buffer().and_then(|()| {
      self
        .as_bytes()
        .get(index)
        .copied()
        .ok_or(StrixError::OutOfBounds { index, len: self.len })
    });
    self.ctx.record(result)
  }

  /// Byte-wise comparison. Strings of different length compare unequal
  /// without looking at their content.
  pub fn equal(
    &self,
    other: &Strix,
  ) -> Result<bool> {
    let result = self
      .require_buffer()
      .and_then(|()| other.require_buffer())
      .map(|()| self.len == other.len && self.as_bytes() == other.as_bytes());
    self.ctx.record(result)
  }

  /// Offset of the first occurrence of `pattern`.
  pub fn find(
    &self,
    pattern: &[u8],
  ) -> Result<Option<usize>> {
    let result = self.prepare(pattern).map(|kmp| kmp.find_in(self.as_bytes()));
    self.ctx.record(result)
  }

  /// Number of occurrences of `pattern`, overlapping ones included.
  pub fn count(
    &self,
    pattern: &[u8],
  ) -> Result<usize> {
    let result = self.prepare(pattern).map(|kmp| kmp.count_in(self.as_bytes()));
    self.ctx.record(result)
  }

  pub fn find_all(
    &self,
    pattern: &[u8],
  ) -> Result<MatchPositions> {
    let result = self.find_all_of(pattern);
    self.ctx.record(result)
  }

  pub fn find_subtrix(
    &self,
    pattern: &Strix,
  ) -> Result<Option<usize>> {
    let result = pattern
      .require_buffer()
      .and_then(|()| self.prepare(pattern.as_bytes()))
      .map(|kmp| kmp.find_in(self.as_bytes()));
    self.ctx.record(result)
  }

  pub fn find_subtrix_all(
    &self,
    pattern: &Strix,
  ) -> Result<MatchPositions> {
    let result = pattern
      .require_buffer()
      .and_then(|()| self.find_all_of(pattern.as_bytes()));
    self.ctx.record(result)
  }

  fn prepare<'p>(
    &self,
    pattern: &'p [u8],
  ) -> Result<Kmp<'p>> {
    self.require_buffer()?;
    Kmp::new(pattern)
  }

  fn find_all_of(
    &self,
    pattern: &[u8],
  ) -> Result<MatchPositions> {
    let config = self.ctx.config();
    self.prepare(pattern)?.find_all_in(
      self.as_bytes(),
      config.initial_positions,
      config.shrink_positions,
    )
  }

  /// New strix holding bytes `start..=end`.
  pub fn slice(
    &self,
    start: usize,
    end: usize,
  ) -> Result<Strix> {
    let result = self.slice_inclusive(start, end);
    self.ctx.record(result)
  }

  fn slice_inclusive(
    &self,
    start: usize,
    end: usize,
  ) -> Result<Strix> {
    self.require_buffer()?;
    if end >= self.len {
      return Err(StrixError::OutOfBounds { index: end, len: self.len });
    }
    if start > end {
      return Err(StrixError::InvalidPosition { pos: start, len: self.len });
    }
    Self::build(&self.ctx, &self.as_bytes()[start..=end])
  }

  /// Splits on every `delim` byte. Empty pieces, from leading, trailing or
  /// repeated delimiters, are dropped.
  pub fn split_by_delim(
    &self,
    delim: u8,
  ) -> Result<StrixArray> {
    let result = self.split_pieces(delim);
    self.ctx.record(result)
  }

  fn split_pieces(
    &self,
    delim: u8,
  ) -> Result<StrixArray> {
    self.require_buffer()?;
    let bytes = self.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;

    for hit in memchr::memchr_iter(delim, bytes) {
      if hit > start {
        pieces.push(Self::build(&self.ctx, &bytes[start..hit])?);
      }
      start = hit + 1;
    }
    if start < bytes.len() {
      pieces.push(Self::build(&self.ctx, &bytes[start..])?);
    }

    Ok(StrixArray::from(pieces))
  }

  /// Releases the buffer and the strix.
  pub fn free(self) {
    drop(self);
  }
}

impl Drop for Strix {
  fn drop(&mut self) {
    if let Some(buf) = self.buf.take() {
      self.ctx.release(buf);
    }
  }
}

impl AsRef<[u8]> for Strix {
  fn as_ref(&self) -> &[u8] {
    self.as_bytes()
  }
}

impl PartialEq for Strix {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.as_bytes() == other.as_bytes()
  }
}

impl Eq for Strix {}

impl PartialEq<[u8]> for Strix {
  fn eq(
    &self,
    other: &[u8],
  ) -> bool {
    self.as_bytes() == other
  }
}

impl PartialEq<&[u8]> for Strix {
  fn eq(
    &self,
    other: &&[u8],
  ) -> bool {
    self.as_bytes() == *other
  }
}

impl<const N: usize> PartialEq<&[u8; N]> for Strix {
  fn eq(
    &self,
    other: &&[u8; N],
  ) -> bool {
    self.as_bytes() == other.as_slice()
  }
}

/// Writes exactly `len` bytes: valid UTF-8 as text, anything else as `\xNN`.
impl fmt::Display for Strix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for chunk in self.as_bytes().utf8_chunks() {
      f.write_str(chunk.valid())?;
      for byte in chunk.invalid() {
        write!(f, "\\x{:02X}", byte)?;
      }
    }
    Ok(())
  }
}

impl fmt::Debug for Strix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Strix(b\"{}\")", self.as_bytes().escape_ascii())
  }
}

#[cfg(test)]
mod tests {
  use quickcheck::TestResult;

  use super::*;
  use crate::{config::Config, error::ErrorCode};

  fn strix(
    ctx: &Context,
    bytes: &[u8],
  ) -> Strix {
    ctx.create(bytes).unwrap()
  }

  fn assert_no_leaks(ctx: &Context) {
    let stats = ctx.stats();
    assert_eq!(stats.live_allocations(), 0, "{:?}", stats);
    assert_eq!(stats.live_bytes, 0, "{:?}", stats);
  }

  fn pool() -> Context {
    Context::with_config(
      Config::default()
        .with_backend(Backend::Segmented)
        .with_segment_size(1024),
    )
  }

  #[test]
  fn create_copies_bytes() {
    let ctx = Context::new();
    let s = strix(&ctx, b"hello\0world");
    assert_eq!(s, b"hello\0world");
    assert_eq!(s.len(), 11);
    assert_eq!(s.capacity(), 11);
    assert_eq!(s.backend(), Some(Backend::System));
    assert_eq!(ctx.last_error(), ErrorCode::Success);
    drop(s);
    assert_no_leaks(&ctx);
  }

  #[test]
  fn create_rejects_empty() {
    let ctx = Context::new();
    assert_eq!(ctx.create(b"").unwrap_err(), StrixError::EmptyString);
    assert_eq!(ctx.last_error(), ErrorCode::EmptyString);
    assert_no_leaks(&ctx);
  }

  #[test]
  fn duplicate_is_independent() {
    let ctx = Context::new();
    let original = strix(&ctx, b"binary\x00\xff");
    let mut copy = original.duplicate().unwrap();

    assert_eq!(original.equal(&copy), Ok(true));
    assert_ne!(original.as_bytes().as_ptr(), copy.as_bytes().as_ptr());

    copy.append(b"!").unwrap();
    assert_eq!(original, b"binary\x00\xff");
    assert_eq!(copy, b"binary\x00\xff!");
  }

  #[test]
  fn duplicate_of_cleared_fails() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abc");
    s.clear().unwrap();
    assert_eq!(s.duplicate().unwrap_err(), StrixError::EmptyString);
    assert_eq!(ctx.last_error(), ErrorCode::EmptyString);
  }

  #[test]
  fn modify_replaces_content() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"first");
    s.modify(b"second value").unwrap();
    assert_eq!(s, b"second value");
    assert_eq!(ctx.stats().live_allocations(), 1);

    assert_eq!(s.modify(b"").unwrap_err(), StrixError::EmptyString);
    assert_eq!(s, b"second value");

    drop(s);
    assert_no_leaks(&ctx);
  }

  #[test]
  fn clear_leaves_reusable_strix() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abc");
    s.clear().unwrap();
    assert!(s.is_empty());
    assert_eq!(s.backend(), None);
    assert_no_leaks(&ctx);

    s.append(b"again").unwrap();
    assert_eq!(s, b"again");
  }

  #[test]
  fn concat_appends_other() {
    let ctx = Context::new();
    let mut a = strix(&ctx, b"hello");
    let b = strix(&ctx, b", world!");

    a.concat(Some(&b)).unwrap();
    assert_eq!(a, b"hello, world!");
    assert_eq!(b, b", world!");

    a.concat(None).unwrap();
    assert_eq!(a, b"hello, world!");

    let empty = Strix::empty(&ctx);
    a.concat(Some(&empty)).unwrap();
    assert_eq!(a.len(), 13);

    let mut cleared = Strix::empty(&ctx);
    cleared.concat(Some(&b)).unwrap();
    assert_eq!(cleared, b", world!");
  }

  #[test]
  fn concat_then_slice_reproduces_parts() {
    let ctx = Context::new();
    let mut a = strix(&ctx, b"left");
    let b = strix(&ctx, b"right");
    let a_len = a.len();

    a.concat(Some(&b)).unwrap();
    assert_eq!(a.slice(0, a_len - 1).unwrap(), b"left");
    assert_eq!(a.slice(a_len, a.len() - 1).unwrap(), b"right");
  }

  #[test]
  fn append_empty_is_noop() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abc");
    let before = ctx.stats().allocations;
    s.append(b"").unwrap();
    assert_eq!(s, b"abc");
    assert_eq!(ctx.stats().allocations, before);
  }

  #[test]
  fn append_then_erase_restores() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"base");
    s.append(b"-suffix").unwrap();
    assert_eq!(s, b"base-suffix");

    s.erase(7, 4).unwrap();
    assert_eq!(s, b"base");
    assert_eq!(s.len(), 4);
  }

  #[test]
  fn insert_splices_before_position() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abcd");
    let src = strix(&ctx, b"XY");

    s.insert(&src, 2).unwrap();
    assert_eq!(s, b"abXYcd");

    s.insert(&src, 0).unwrap();
    assert_eq!(s, b"XYabXYcd");

    s.erase(2, 0).unwrap();
    s.erase(2, 2).unwrap();
    assert_eq!(s, b"abcd");
  }

  #[test]
  fn insert_bytes_validates_position() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abc");

    assert_eq!(
      s.insert_bytes(3, b"x").unwrap_err(),
      StrixError::InvalidPosition { pos: 3, len: 3 }
    );
    assert_eq!(ctx.last_error(), ErrorCode::InvalidPosition);
    assert_eq!(s, b"abc");

    s.insert_bytes(2, b"\0").unwrap();
    assert_eq!(s, b"ab\0c");
    assert_eq!(ctx.last_error(), ErrorCode::Success);

    let mut cleared = Strix::empty(&ctx);
    assert_eq!(
      cleared.insert_bytes(0, b"x").unwrap_err(),
      StrixError::AbsentBuffer
    );
    assert_eq!(ctx.last_error(), ErrorCode::NullArgument);
  }

  #[test]
  fn erase_clamps_length() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"hello world");
    s.erase(100, 5).unwrap();
    assert_eq!(s, b"hello");

    s.erase(usize::MAX, 0).unwrap();
    assert!(s.is_empty());
    assert_eq!(s.backend(), None);
    assert_no_leaks(&ctx);
  }

  #[test]
  fn erase_rejects_bad_arguments() {
    let ctx = Context::new();
    let mut s = strix(&ctx, b"abc");

    assert_eq!(
      s.erase(1, 3).unwrap_err(),
      StrixError::InvalidPosition { pos: 3, len: 3 }
    );
    assert_eq!(s.erase(0, 1).unwrap_err(), StrixError::InvalidLength { len: 0 });
    assert_eq!(ctx.last_error(), ErrorCode::InvalidLength);
    assert_eq!(s, b"abc");

    s.clear().unwrap();
    assert_eq!(s.erase(1, 0).unwrap_err(), StrixError::AbsentBuffer);
  }

  #[test]
  fn at_checks_bounds() {
    let ctx = Context::new();
    let s = strix(&ctx, b"xyz");
    assert_eq!(s.at(0), Ok(b'x'));
    assert_eq!(s.at(2), Ok(b'z'));
    assert_eq!(s.at(3), Err(StrixError::OutOfBounds { index: 3, len: 3 }));
    assert_eq!(ctx.last_error(), ErrorCode::OutOfBounds);

    assert_eq!(Strix::empty(&ctx).at(0), Err(StrixError::AbsentBuffer));
  }

  #[test]
  fn equality() {
    let ctx = Context::new();
    let a = strix(&ctx, b"same");
    let b = strix(&ctx, b"same");
    let c = strix(&ctx, b"diff");
    let d = strix(&ctx, b"longer");

    assert_eq!(a.equal(&b), Ok(true));
    assert_eq!(a.equal(&c), Ok(false));
    assert_eq!(a.equal(&d), Ok(false));
    assert_eq!(a.equal(&Strix::empty(&ctx)), Err(StrixError::AbsentBuffer));
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn search_operations() {
    let ctx = Context::new();
    let text = strix(&ctx, b"ababa");
    let pattern = strix(&ctx, b"aba");

    assert_eq!(text.find(b"aba"), Ok(Some(0)));
    assert_eq!(text.count(b"aba"), Ok(2));
    assert_eq!(text.find_all(b"aba").unwrap().as_slice(), &[0, 2]);
    assert_eq!(text.find_subtrix(&pattern), Ok(Some(0)));
    assert_eq!(text.find_subtrix_all(&pattern).unwrap().as_slice(), &[0, 2]);
    assert_eq!(text.find(b"zz"), Ok(None));
    assert!(text.find_all(b"zz").unwrap().is_empty());
    assert_eq!(ctx.last_error(), ErrorCode::Success);

    assert_eq!(text.find(b""), Err(StrixError::EmptyString));
    assert_eq!(ctx.last_error(), ErrorCode::EmptyString);

    let cleared = Strix::empty(&ctx);
    assert_eq!(text.find_subtrix(&cleared), Err(StrixError::AbsentBuffer));
    assert_eq!(cleared.find(b"a"), Err(StrixError::AbsentBuffer));

    let many = strix(&ctx, b"ababab");
    assert_eq!(many.find_all(b"ab").unwrap().as_slice(), &[0, 2, 4]);
  }

  #[test]
  fn slice_is_inclusive() {
    let ctx = Context::new();
    let s = strix(&ctx, b"0123456789");

    assert_eq!(s.slice(2, 4).unwrap(), b"234");
    assert_eq!(s.slice(9, 9).unwrap(), b"9");
    assert_eq!(
      s.slice(0, 10).unwrap_err(),
      StrixError::OutOfBounds { index: 10, len: 10 }
    );
    assert_eq!(
      s.slice(5, 4).unwrap_err(),
      StrixError::InvalidPosition { pos: 5, len: 10 }
    );

    let whole = s.slice(0, s.len() - 1).unwrap();
    assert_eq!(whole.equal(&s), Ok(true));
  }

  #[test]
  fn split_skips_empty_pieces() {
    let ctx = Context::new();
    let s = strix(&ctx, b"\n\nfoo\nbar\n\n");
    let pieces = s.split_by_delim(b'\n').unwrap();

    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0], b"foo");
    assert_eq!(pieces[1], b"bar");

    let only_delims = strix(&ctx, b",,,");
    assert!(only_delims.split_by_delim(b',').unwrap().is_empty());

    let no_delims = strix(&ctx, b"solid");
    let pieces = no_delims.split_by_delim(b',').unwrap();
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0], b"solid");

    assert_eq!(
      Strix::empty(&ctx).split_by_delim(b',').unwrap_err(),
      StrixError::AbsentBuffer
    );
  }

  #[test]
  fn free_releases_buffer() {
    let ctx = Context::new();
    let s = strix(&ctx, b"bytes");
    assert_eq!(ctx.stats().live_bytes, 5);
    s.free();
    assert_no_leaks(&ctx);
  }

  #[test]
  fn formatting_uses_length() {
    let ctx = Context::new();
    let s = strix(&ctx, b"ok\xffend");
    assert_eq!(s.to_string(), "ok\\xFFend");
    assert_eq!(format!("{:?}", s), "Strix(b\"ok\\xffend\")");

    let with_nul = strix(&ctx, b"a\0b");
    assert_eq!(with_nul.to_string().len(), 3);
  }

  #[test]
  fn pool_backend_round_trip() {
    let ctx = pool();
    let mut s = strix(&ctx, b"pooled");
    assert_eq!(s.backend(), Some(Backend::Segmented));

    for _ in 0..50 {
      s.append(b" and more").unwrap();
    }
    assert_eq!(s.count(b"more"), Ok(50));
    drop(s);

    assert_no_leaks(&ctx);
    ctx.collect();
    assert_eq!(ctx.segment_count(), 0);
  }

  #[test]
  fn backend_switch_keeps_old_buffers_valid() {
    let ctx = Context::new();
    let system = strix(&ctx, b"from system");

    ctx.use_custom_allocator();
    let mut pooled = strix(&ctx, b"from pool");
    assert_eq!(pooled.backend(), Some(Backend::Segmented));

    pooled.concat(Some(&system)).unwrap();
    assert_eq!(pooled, b"from poolfrom system");

    ctx.use_default_allocator();
    drop(system);
    drop(pooled);
    assert_no_leaks(&ctx);
  }

  #[test]
  fn failed_growth_leaves_strix_untouched() {
    let ctx = Context::with_config(
      Config::default()
        .with_backend(Backend::Segmented)
        .with_segment_size(512)
        .with_max_segments(Some(1)),
    );
    let mut s = strix(&ctx, b"small");

    let big = vec![b'x'; 4096];
    assert_eq!(
      s.append(&big).unwrap_err(),
      StrixError::AllocationFailure { size: 4101 }
    );
    assert_eq!(ctx.last_error(), ErrorCode::AllocationFailure);
    assert_eq!(s, b"small");
    assert_eq!(ctx.stats().live_allocations(), 1);

    assert!(s.insert_bytes(1, &big).is_err());
    assert!(s.slice(0, 4).is_ok());
    assert_eq!(s, b"small");
  }

  #[test]
  fn failed_split_releases_pieces() {
    let ctx = Context::with_config(
      Config::default()
        .with_backend(Backend::Segmented)
        .with_segment_size(512)
        .with_max_segments(Some(1)),
    );
    let s = strix(&ctx, &b"chunk,".repeat(40));
    let before = ctx.stats().live_allocations();

    assert_eq!(
      s.split_by_delim(b',').unwrap_err().code(),
      ErrorCode::AllocationFailure
    );
    assert_eq!(ctx.stats().live_allocations(), before);
  }

  quickcheck::quickcheck! {
    fn create_reads_back(bytes: Vec<u8>) -> TestResult {
      if bytes.is_empty() {
        return TestResult::discard();
      }
      let ctx = Context::new();
      let s = ctx.create(&bytes).unwrap();
      TestResult::from_bool(s.as_bytes() == bytes.as_slice() && s.len() == bytes.len())
    }

    fn insert_then_erase_restores(base: Vec<u8>, inserted: Vec<u8>, pos: usize) -> TestResult {
      if base.is_empty() || inserted.is_empty() {
        return TestResult::discard();
      }
      let ctx = Context::new();
      let mut s = ctx.create(&base).unwrap();
      let pos = pos % base.len();

      s.insert_bytes(pos, &inserted).unwrap();
      s.erase(inserted.len(), pos).unwrap();
      TestResult::from_bool(s.as_bytes() == base.as_slice())
    }

    fn full_slice_is_equal(bytes: Vec<u8>) -> TestResult {
      if bytes.is_empty() {
        return TestResult::discard();
      }
      let ctx = pool();
      let s = ctx.create(&bytes).unwrap();
      let whole = s.slice(0, s.len() - 1).unwrap();
      TestResult::from_bool(whole.equal(&s) == Ok(true))
    }

    fn split_pieces_are_nonempty(bytes: Vec<u8>) -> TestResult {
      if bytes.is_empty() {
        return TestResult::discard();
      }
      let bytes: Vec<u8> = bytes.into_iter().map(|b| b % 4).collect();
      let ctx = Context::new();
      let s = ctx.create(&bytes).unwrap();
      let pieces = s.split_by_delim(0).unwrap();

      let expected: Vec<&[u8]> = bytes.split(|b| *b == 0).filter(|p| !p.is_empty()).collect();
      let got: Vec<&[u8]> = pieces.iter().map(Strix::as_bytes).collect();
      TestResult::from_bool(got == expected)
    }
  }
}

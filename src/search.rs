//! Knuth-Morris-Pratt substring search over byte slices.
//!
//! ```text
//!   pattern  a b a b a c a
//!   table    0 0 1 2 3 0 1
//!
//!   On a mismatch after matching `j` bytes the scan keeps `table[j - 1]`
//!   of them and retries; the text cursor never moves backwards, so a full
//!   scan is O(|pattern| + |text|).
//! ```
//!
//! After a complete match the scan resumes from the failure table as well,
//! which means overlapping occurrences are all reported: `"aba"` occurs twice
//! in `"ababa"`.

use std::{mem, ops::ControlFlow, ops::Deref};

use crate::{
  config::DEFAULT_INITIAL_POSITIONS,
  error::{Result, StrixError},
};

/// Offsets of every match found by a single left-to-right scan, ascending.
///
/// No matches is an empty value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchPositions {
  positions: Vec<usize>,
}

impl MatchPositions {
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  /// Slots currently reserved for positions.
  pub fn capacity(&self) -> usize {
    self.positions.capacity()
  }

  pub fn as_slice(&self) -> &[usize] {
    &self.positions
  }

  pub fn into_vec(self) -> Vec<usize> {
    self.positions
  }
}

impl Deref for MatchPositions {
  type Target = [usize];

  fn deref(&self) -> &[usize] {
    &self.positions
  }
}

impl<'a> IntoIterator for &'a MatchPositions {
  type Item = &'a usize;
  type IntoIter = std::slice::Iter<'a, usize>;

  fn into_iter(self) -> Self::IntoIter {
    self.positions.iter()
  }
}

impl IntoIterator for MatchPositions {
  type Item = usize;
  type IntoIter = std::vec::IntoIter<usize>;

  fn into_iter(self) -> Self::IntoIter {
    self.positions.into_iter()
  }
}

/// A pattern prepared for repeated searches.
#[derive(Debug, Clone)]
pub struct Kmp<'p> {
  pattern: &'p [u8],
  table: Vec<usize>,
}

impl<'p> Kmp<'p> {
  /// Builds the failure table. An empty pattern has no defined matches and
  /// is rejected.
  pub fn new(pattern: &'p [u8]) -> Result<Self> {
    if pattern.is_empty() {
      return Err(StrixError::EmptyString);
    }
    Ok(Self {
      pattern,
      table: failure_table(pattern),
    })
  }

  pub fn pattern(&self) -> &[u8] {
    self.pattern
  }

  /// `table[i]` is the length of the longest proper prefix of
  /// `pattern[..=i]` that is also a suffix of it.
  pub fn table(&self) -> &[usize] {
    &self.table
  }

  pub fn find_in(
    &self,
    text: &[u8],
  ) -> Option<usize> {
    match self.scan(text, ControlFlow::Break) {
      ControlFlow::Break(pos) => Some(pos),
      ControlFlow::Continue(()) => None,
    }
  }

  pub fn count_in(
    &self,
    text: &[u8],
  ) -> usize {
    let mut count = 0;
    let _ = self.scan::<()>(text, |_| {
      count += 1;
      ControlFlow::Continue(())
    });
    count
  }

  /// Collects every match offset. Storage starts at `initial_capacity` slots
  /// and doubles whenever it fills; with `shrink` it is trimmed to the exact
  /// count afterwards. A failed growth drops everything collected so far.
  pub fn find_all_in(
    &self,
    text: &[u8],
    initial_capacity: usize,
    shrink: bool,
  ) -> Result<MatchPositions> {
    let initial_capacity = initial_capacity.max(1);
    let mut positions: Vec<usize> = Vec::new();
    positions
      .try_reserve_exact(initial_capacity)
      .map_err(|_| StrixError::AllocationFailure {
        size: initial_capacity * mem::size_of::<usize>(),
      })?;

    let flow = self.scan(text, |pos| {
      if positions.len() == positions.capacity() {
        let additional = positions.capacity();
        if positions.try_reserve_exact(additional).is_err() {
          return ControlFlow::Break(StrixError::AllocationFailure {
            size: (positions.capacity() + additional) * mem::size_of::<usize>(),
          });
        }
      }
      positions.push(pos);
      ControlFlow::Continue(())
    });

    if let ControlFlow::Break(err) = flow {
      return Err(err);
    }

    if shrink {
      positions.shrink_to_fit();
    }
    Ok(MatchPositions { positions })
  }

  fn scan<B>(
    &self,
    text: &[u8],
    mut on_match: impl FnMut(usize) -> ControlFlow<B>,
  ) -> ControlFlow<B> {
    let pattern = self.pattern;
    if pattern.len() > text.len() {
      return ControlFlow::Continue(());
    }

    let mut j = 0;
    for (i, &byte) in text.iter().enumerate() {
      while j > 0 && pattern[j] != byte {
        j = self.table[j - 1];
      }
      if pattern[j] == byte {
        j += 1;
      }
      if j == pattern.len() {
        if let ControlFlow::Break(value) = on_match(i + 1 - j) {
          return ControlFlow::Break(value);
        }
        j = self.table[j - 1];
      }
    }

    ControlFlow::Continue(())
  }
}

fn failure_table(pattern: &[u8]) -> Vec<usize> {
  let mut table = vec![0; pattern.len()];
  let mut len = 0;
  let mut i = 1;

  while i < pattern.len() {
    if pattern[i] == pattern[len] {
      len += 1;
      table[i] = len;
      i += 1;
    } else if len != 0 {
      len = table[len - 1];
    } else {
      table[i] = 0;
      i += 1;
    }
  }

  table
}

/// Offset of the first occurrence of `pattern` in `text`.
pub fn find_first(
  pattern: &[u8],
  text: &[u8],
) -> Result<Option<usize>> {
  Ok(Kmp::new(pattern)?.find_in(text))
}

/// Number of (possibly overlapping) occurrences of `pattern` in `text`.
pub fn count_all(
  pattern: &[u8],
  text: &[u8],
) -> Result<usize> {
  Ok(Kmp::new(pattern)?.count_in(text))
}

/// Every occurrence of `pattern` in `text`, with default storage growth.
pub fn find_all(
  pattern: &[u8],
  text: &[u8],
) -> Result<MatchPositions> {
  Kmp::new(pattern)?.find_all_in(text, DEFAULT_INITIAL_POSITIONS, true)
}

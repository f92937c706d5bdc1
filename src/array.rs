use std::{fmt, ops::Deref};

use crate::strix::Strix;

/// Owned pieces produced by [`Strix::split_by_delim`], in order of
/// appearance. Every element is non-empty.
#[derive(Default, PartialEq, Eq)]
pub struct StrixArray {
  items: Vec<Strix>,
}

impl StrixArray {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn into_vec(self) -> Vec<Strix> {
    self.items
  }

  /// Copies every piece out into plain vectors.
  pub fn to_byte_vecs(&self) -> Vec<Vec<u8>> {
    self.items.iter().map(Strix::to_vec).collect()
  }
}

impl From<Vec<Strix>> for StrixArray {
  fn from(items: Vec<Strix>) -> Self {
    debug_assert!(items.iter().all(|item| !item.is_empty()));
    Self { items }
  }
}

impl Deref for StrixArray {
  type Target = [Strix];

  fn deref(&self) -> &[Strix] {
    &self.items
  }
}

impl IntoIterator for StrixArray {
  type Item = Strix;
  type IntoIter = std::vec::IntoIter<Strix>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.into_iter()
  }
}

impl<'a> IntoIterator for &'a StrixArray {
  type Item = &'a Strix;
  type IntoIter = std::slice::Iter<'a, Strix>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

impl fmt::Debug for StrixArray {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(&self.items).finish()
  }
}

//! Context configuration.
//!
//! Defaults cover every field; [`Config::from_env`] overlays the
//! `STRIX_*` environment variables on top of them.

use std::{env, mem, str::FromStr};

use crate::{align, heap::Backend, segmented::SearchMode};

/// Default size of a pool segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 64 * 1024;
/// Smallest segment the pool will request from the system.
pub const MIN_SEGMENT_SIZE: usize = 256;
/// Idle segments tolerated before the pool collects on its own.
pub const DEFAULT_GC_THRESHOLD: usize = 2;
/// Initial slot count for match position storage.
pub const DEFAULT_INITIAL_POSITIONS: usize = 16;

pub const ENV_ALLOCATOR: &str = "STRIX_ALLOCATOR";
pub const ENV_SEGMENT_SIZE: &str = "STRIX_SEGMENT_SIZE";
pub const ENV_MAX_SEGMENTS: &str = "STRIX_MAX_SEGMENTS";
pub const ENV_ALIGNMENT: &str = "STRIX_ALIGNMENT";
pub const ENV_GC_THRESHOLD: &str = "STRIX_GC_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Backend selected when the context is created.
  pub backend: Backend,
  pub segment_size: usize,
  /// Upper bound on live pool segments; `None` is unbounded.
  pub max_segments: Option<usize>,
  /// Minimum alignment of pool blocks. Always a power of two.
  pub alignment: usize,
  pub gc_threshold: usize,
  pub search_mode: SearchMode,
  pub initial_positions: usize,
  /// Shrink match position storage to the exact count after a scan.
  pub shrink_positions: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      backend: Backend::System,
      segment_size: DEFAULT_SEGMENT_SIZE,
      max_segments: None,
      alignment: mem::size_of::<usize>(),
      gc_threshold: DEFAULT_GC_THRESHOLD,
      search_mode: SearchMode::FirstFit,
      initial_positions: DEFAULT_INITIAL_POSITIONS,
      shrink_positions: true,
    }
  }
}

impl Config {
  pub fn new() -> Self {
    Self::default()
  }

  /// Defaults overlaid with whatever `STRIX_*` variables are set.
  pub fn from_env() -> Self {
    Self::default().overlay(|key| env::var(key).ok())
  }

  /// Applies overrides from `lookup`, keyed by the `STRIX_*` variable names.
  /// Values that fail to parse are logged and skipped.
  pub fn overlay<F>(
    mut self,
    lookup: F,
  ) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(backend) = parse_var::<Backend, _>(&lookup, ENV_ALLOCATOR) {
      self.backend = backend;
    }
    if let Some(size) = parse_var::<usize, _>(&lookup, ENV_SEGMENT_SIZE) {
      self = self.with_segment_size(size);
    }
    if let Some(max) = parse_var::<usize, _>(&lookup, ENV_MAX_SEGMENTS) {
      self.max_segments = Some(max);
    }
    if let Some(alignment) = parse_var::<usize, _>(&lookup, ENV_ALIGNMENT) {
      self = self.with_alignment(alignment);
    }
    if let Some(threshold) = parse_var::<usize, _>(&lookup, ENV_GC_THRESHOLD) {
      self.gc_threshold = threshold;
    }
    self
  }

  pub fn with_backend(
    mut self,
    backend: Backend,
  ) -> Self {
    self.backend = backend;
    self
  }

  pub fn with_segment_size(
    mut self,
    segment_size: usize,
  ) -> Self {
    self.segment_size = align!(segment_size.max(MIN_SEGMENT_SIZE));
    self
  }

  pub fn with_max_segments(
    mut self,
    max_segments: Option<usize>,
  ) -> Self {
    self.max_segments = max_segments;
    self
  }

  pub fn with_alignment(
    mut self,
    alignment: usize,
  ) -> Self {
    self.alignment = crate::align::normalize(alignment);
    self
  }

  pub fn with_gc_threshold(
    mut self,
    gc_threshold: usize,
  ) -> Self {
    self.gc_threshold = gc_threshold;
    self
  }

  pub fn with_search_mode(
    mut self,
    search_mode: SearchMode,
  ) -> Self {
    self.search_mode = search_mode;
    self
  }

  pub fn with_initial_positions(
    mut self,
    initial_positions: usize,
  ) -> Self {
    self.initial_positions = initial_positions.max(1);
    self
  }

  pub fn with_shrink_positions(
    mut self,
    shrink_positions: bool,
  ) -> Self {
    self.shrink_positions = shrink_positions;
    self
  }
}

fn parse_var<T, F>(
  lookup: &F,
  key: &str,
) -> Option<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
  F: Fn(&str) -> Option<String>,
{
  let raw = lookup(key)?;
  match raw.trim().parse::<T>() {
    Ok(value) => Some(value),
    Err(err) => {
      log::warn!("ignoring {}={:?}: {}", key, raw, err);
      None
    },
  }
}

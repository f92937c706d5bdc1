use std::fmt;

use thiserror::Error;

/// Result type used by every fallible strix operation.
pub type Result<T> = std::result::Result<T, StrixError>;

/// Outcome codes recorded in a context's status latch.
///
/// `Success` is never carried by a [`StrixError`]; it is what the latch holds
/// after an operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
  #[default]
  Success,
  NullArgument,
  EmptyString,
  AllocationFailure,
  CopyFailure,
  InvalidPosition,
  InvalidLength,
  OutOfBounds,
}

impl ErrorCode {
  /// Human-readable description, suitable for a `perror`-style report.
  pub fn message(self) -> &'static str {
    match self {
      ErrorCode::Success => "success",
      ErrorCode::NullArgument => "null argument or absent buffer",
      ErrorCode::EmptyString => "empty string",
      ErrorCode::AllocationFailure => "memory allocation failed",
      ErrorCode::CopyFailure => "copying data into the buffer failed",
      ErrorCode::InvalidPosition => "invalid position",
      ErrorCode::InvalidLength => "invalid length",
      ErrorCode::OutOfBounds => "index out of bounds",
    }
  }

  pub fn is_success(self) -> bool {
    self == ErrorCode::Success
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.message())
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StrixError {
  #[error("operation requires a buffer, but the strix holds none")]
  AbsentBuffer,
  #[error("empty string where a non-empty one is required")]
  EmptyString,
  #[error("allocation of {size} bytes failed")]
  AllocationFailure { size: usize },
  #[error("copy of {len} bytes at offset {offset} overruns a {capacity}-byte buffer")]
  CopyFailure {
    offset:   usize,
    len:      usize,
    capacity: usize,
  },
  #[error("position {pos} is invalid for length {len}")]
  InvalidPosition { pos: usize, len: usize },
  #[error("invalid length {len}")]
  InvalidLength { len: usize },
  #[error("index {index} is out of bounds for length {len}")]
  OutOfBounds { index: usize, len: usize },
}

impl StrixError {
  /// The taxonomy code this error is reported under.
  pub fn code(&self) -> ErrorCode {
    match self {
      StrixError::AbsentBuffer => ErrorCode::NullArgument,
      StrixError::EmptyString => ErrorCode::EmptyString,
      StrixError::AllocationFailure { .. } => ErrorCode::AllocationFailure,
      StrixError::CopyFailure { .. } => ErrorCode::CopyFailure,
      StrixError::InvalidPosition { .. } => ErrorCode::InvalidPosition,
      StrixError::InvalidLength { .. } => ErrorCode::InvalidLength,
      StrixError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
    }
  }
}

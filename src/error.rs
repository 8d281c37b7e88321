//! Error types returned by the allocator's fallible operations.

use thiserror::Error;

/// Everything that can go wrong inside [`crate::allocator::Allocator`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
  /// The heap source could not provide more memory (`sbrk`/mock capacity
  /// exhausted).
  #[error("out of memory: heap source could not be extended")]
  Oom,
}

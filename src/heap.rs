//! The heap-growth primitive the allocator is built against.
//!
//! [`HeapSource`] is the narrow interface the rest of the crate needs from
//! "the memory underneath": where it starts, where it currently ends, and
//! how to push that end forward. [`SbrkHeap`] is the real implementation,
//! backed by `sbrk(2)`. [`mock::MockHeap`] is a fixed-capacity in-process
//! stand-in used by tests (both the unit tests in this crate and the
//! integration tests under `tests/`), so it's a plain public module rather
//! than `#[cfg(test)]`-gated.

use std::ptr;

use libc::{c_void, intptr_t, sbrk};

/// Where an allocator gets its backing memory from.
///
/// An implementor owns a single contiguous region that only ever grows
/// (never shrinks, never moves) for the lifetime of the allocator built on
/// top of it.
pub trait HeapSource {
  /// Extends the heap by `increment` bytes, returning the address of the
  /// start of the new region (the old end of the heap). Returns `None` on
  /// failure (out of memory, or the underlying OS call failed).
  ///
  /// # Safety
  /// Must not be called concurrently with any other access to this heap.
  unsafe fn extend(&mut self, increment: usize) -> Option<*mut u8>;

  /// The lowest valid address in the heap, or `None` if nothing has been
  /// allocated from this source yet.
  fn lo(&self) -> Option<*mut u8>;

  /// One past the highest valid address in the heap (the current break),
  /// or `None` if nothing has been allocated yet.
  fn hi(&self) -> Option<*mut u8>;
}

/// A [`HeapSource`] backed by the process's real `sbrk(2)` program break.
///
/// Only one `SbrkHeap` should exist per process: `sbrk` itself is global
/// state, so two independent `SbrkHeap`s would silently corrupt each
/// other's notion of where the heap starts.
pub struct SbrkHeap {
  lo: Option<*mut u8>,
  hi: Option<*mut u8>,
}

impl SbrkHeap {
  /// A heap source with no region claimed yet; the first `extend` call
  /// fixes `lo`.
  pub fn new() -> Self {
    SbrkHeap { lo: None, hi: None }
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapSource for SbrkHeap {
  unsafe fn extend(&mut self, increment: usize) -> Option<*mut u8> {
    unsafe {
      let raw = sbrk(increment as intptr_t);
      if raw == usize::MAX as *mut c_void {
        return None;
      }
      let start = raw as *mut u8;
      if self.lo.is_none() {
        self.lo = Some(start);
      }
      self.hi = Some(start.add(increment));
      Some(start)
    }
  }

  fn lo(&self) -> Option<*mut u8> {
    self.lo
  }

  fn hi(&self) -> Option<*mut u8> {
    self.hi
  }
}

/// A deterministic, OS-free [`HeapSource`] for tests: a single
/// heap-allocated buffer that `extend` bumps a cursor through. Capacity is
/// fixed at construction — `extend` fails (returns `None`) once exhausted,
/// mirroring `sbrk` hitting a resource limit.
pub mod mock {
  use super::HeapSource;

  pub struct MockHeap {
    buf: Box<[u8]>,
    used: usize,
  }

  impl MockHeap {
    /// A heap source backed by `capacity` bytes of owned memory, 16-byte
    /// aligned (matching `DWORD` alignment requirements even at `lo()`).
    pub fn new(capacity: usize) -> Self {
      let layout = std::alloc::Layout::from_size_align(capacity, 16).expect("valid mock heap layout");
      let buf = unsafe {
        let ptr = std::alloc::alloc_zeroed(layout);
        assert!(!ptr.is_null(), "mock heap allocation failed");
        Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, capacity))
      };
      MockHeap { buf, used: 0 }
    }
  }

  impl HeapSource for MockHeap {
    unsafe fn extend(&mut self, increment: usize) -> Option<*mut u8> {
      if self.used + increment > self.buf.len() {
        return None;
      }
      let start = unsafe { self.buf.as_mut_ptr().add(self.used) };
      self.used += increment;
      Some(start)
    }

    fn lo(&self) -> Option<*mut u8> {
      if self.used == 0 { None } else { Some(self.buf.as_ptr() as *mut u8) }
    }

    fn hi(&self) -> Option<*mut u8> {
      if self.used == 0 {
        None
      } else {
        Some(unsafe { self.buf.as_ptr().add(self.used) as *mut u8 })
      }
    }
  }
}

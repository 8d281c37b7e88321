//! [`GlobalAlloc`] integration: wires [`Allocator`] up as the process's
//! `#[global_allocator]`.
//!
//! The allocator itself assumes single-threaded access (the segregated
//! free lists have no internal synchronization); this module supplies
//! the one lock needed to make that safe to use from `GlobalAlloc`'s
//! shared-reference methods, following the same "lock around a plain
//! allocator struct" shape as `linked_list_allocator::LockedHeap`. The
//! lock is real (`std::sync::Mutex`), not just a marker: unlike a
//! kernel's single-core boot allocator, a userspace process can and does
//! have other threads running, even if this allocator was designed
//! assuming they never call `alloc`/`dealloc` concurrently with it.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;
use std::sync::{Mutex, OnceLock};

use crate::allocator::Allocator;
use crate::heap::SbrkHeap;

/// A [`GlobalAlloc`] backed by [`Allocator<SbrkHeap>`], suitable for use
/// as `#[global_allocator]`.
///
/// Initialization is lazy: the first allocation request triggers
/// [`Allocator::init`], which reserves the initial heap via `sbrk`. Every
/// call after that takes the same lock, so calls from different threads
/// are serialized rather than racing on the free lists directly.
pub struct GlobalAllocator {
  inner: OnceLock<Mutex<Allocator<SbrkHeap>>>,
}

impl GlobalAllocator {
  /// A global allocator with no heap reserved yet.
  pub const fn new() -> Self {
    GlobalAllocator { inner: OnceLock::new() }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Allocator<SbrkHeap>> {
    self
      .inner
      .get_or_init(|| {
        let mut a = Allocator::new(SbrkHeap::new());
        a.init().expect("sbrk heap initialization failed");
        Mutex::new(a)
      })
      .lock()
      .unwrap_or_else(|poison| poison.into_inner())
  }
}

impl Default for GlobalAllocator {
  fn default() -> Self {
    Self::new()
  }
}

// Safety: every method takes the internal mutex before touching the
// allocator's state, so concurrent calls from multiple threads are
// serialized rather than racing. The allocator's own internals remain
// single-threaded in the sense that only one thread is ever inside them
// at a time.
unsafe impl Sync for GlobalAllocator {}

unsafe impl GlobalAlloc for GlobalAllocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    unsafe {
      let mut a = self.lock();
      payload_size(&layout)
        .and_then(|n| a.alloc(n).ok())
        .unwrap_or(ptr::null_mut())
    }
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    unsafe {
      self.lock().free(ptr);
    }
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    unsafe {
      let mut a = self.lock();
      match payload_size_of(new_size, layout.align()) {
        Some(n) => a.realloc(ptr, n).unwrap_or(ptr::null_mut()),
        None => ptr::null_mut(),
      }
    }
  }
}

/// The allocator has no notion of alignment above `D` — every payload it
/// hands out is doubleword-aligned. `Layout::align()` above that is
/// rejected rather than silently under-aligned.
fn payload_size(layout: &Layout) -> Option<usize> {
  payload_size_of(layout.size(), layout.align())
}

fn payload_size_of(size: usize, align: usize) -> Option<usize> {
  if align > crate::align::DWORD { None } else { Some(size) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alloc_dealloc_round_trips_through_the_lock() {
    let g = GlobalAllocator::new();
    let layout = Layout::from_size_align(64, 8).unwrap();
    unsafe {
      let p = GlobalAlloc::alloc(&g, layout);
      assert!(!p.is_null());
      ptr::write_bytes(p, 0xCD, 64);
      GlobalAlloc::dealloc(&g, p, layout);
    }
  }

  #[test]
  fn rejects_alignment_above_doubleword() {
    let g = GlobalAllocator::new();
    let layout = Layout::from_size_align(64, 64).unwrap();
    unsafe {
      let p = GlobalAlloc::alloc(&g, layout);
      assert!(p.is_null());
    }
  }

  #[test]
  fn realloc_through_global_preserves_contents() {
    let g = GlobalAllocator::new();
    let layout = Layout::from_size_align(32, 8).unwrap();
    unsafe {
      let p = GlobalAlloc::alloc(&g, layout);
      assert!(!p.is_null());
      ptr::write_bytes(p, 0x42, 32);

      let grown = GlobalAlloc::realloc(&g, p, layout, 512);
      assert!(!grown.is_null());
      for i in 0..32 {
        assert_eq!(*grown.add(i), 0x42);
      }
      GlobalAlloc::dealloc(&g, grown, Layout::from_size_align(512, 8).unwrap());
    }
  }
}

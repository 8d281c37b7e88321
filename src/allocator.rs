//! The allocator itself: ties the classifier, segregated lists, placement
//! engine, and coalescing policy together over a [`HeapSource`].

use std::ptr;

use crate::align::{DWORD, WORD};
use crate::classifier::{CHUNKSIZE, bucket_index, canonical_size};
use crate::coalesce::{coalesce, should_coalesce};
use crate::error::AllocError;
use crate::freelist::SegTable;
use crate::header::Header;
use crate::heap::HeapSource;
use crate::placement::{find_fit, place};

/// Words reserved before the first real block: one padding word (to phase
/// the prologue onto the right doubleword boundary relative to the
/// heap-source's guaranteed `D`-aligned base), the prologue header, the
/// prologue footer, and the initial epilogue header.
const INIT_WORDS: usize = 4;

/// A segregated-fit allocator over some [`HeapSource`] `H`.
///
/// Not thread-safe: all operations take `&mut self` and assume the caller
/// provides any needed external synchronization (see the crate's
/// concurrency notes).
pub struct Allocator<H: HeapSource> {
  heap: H,
  seg: SegTable,
  prologue: Option<Header>,
}

impl<H: HeapSource> Allocator<H> {
  /// An allocator over `heap`, not yet initialized — call [`Allocator::init`]
  /// before using it.
  pub fn new(heap: H) -> Self {
    Allocator { heap, seg: SegTable::new(), prologue: None }
  }

  /// Brings the heap to its initial state: padding, prologue, epilogue,
  /// then one `CHUNKSIZE` free block.
  pub fn init(&mut self) -> Result<(), AllocError> {
    unsafe {
      let base = self.heap.extend(INIT_WORDS * WORD).ok_or(AllocError::Oom)?;
      let prologue = Header::at(base.add(WORD));
      prologue.set(DWORD, false, true);
      prologue.set_footer(DWORD, false, true);
      let epilogue = Header::at(base.add(3 * WORD));
      epilogue.set(0, false, true);
      self.prologue = Some(prologue);
    }
    self.extend(CHUNKSIZE)?;
    Ok(())
  }

  /// Grows the heap by (at least) `bytes`, writing a free block spanning
  /// the new region and a fresh epilogue. Does not coalesce or insert the
  /// result into any bucket; callers decide that.
  unsafe fn grow(&mut self, bytes: usize) -> Result<Header, AllocError> {
    let size = crate::align::align_dword(bytes);
    unsafe {
      let old_epilogue = Header::at(self.heap.hi().expect("heap initialized before grow").sub(WORD));
      let prev_alloc = old_epilogue.prev_alloc();

      let base = self.heap.extend(size).ok_or(AllocError::Oom)?;
      debug_assert_eq!(base, old_epilogue.addr(), "heap source must grow contiguously");

      let block = Header::at(base);
      block.set(size, prev_alloc, false);
      block.set_footer(size, prev_alloc, false);

      let new_epilogue = Header::at(self.heap.hi().expect("just extended").sub(WORD));
      new_epilogue.set(0, false, true);

      Ok(block)
    }
  }

  /// Initial-style heap extension: grow, then insert directly (no
  /// coalescing — used only at `init`, where the predecessor is always
  /// the allocated prologue).
  fn extend(&mut self, bytes: usize) -> Result<Header, AllocError> {
    unsafe {
      let block = self.grow(bytes)?;
      self.seg.insert(block);
      Ok(block)
    }
  }

  /// Malloc-miss heap extension: grow, unconditionally coalesce with
  /// whatever precedes it (which may be free), then insert the result.
  fn re_extend(&mut self, bytes: usize) -> Result<Header, AllocError> {
    unsafe {
      let block = self.grow(bytes)?;
      let merged = coalesce(&mut self.seg, block);
      self.seg.insert(merged);
      Ok(merged)
    }
  }

  /// Allocates at least `n` bytes of payload. Returns a `D`-aligned
  /// pointer, or NULL if `n == 0` or the heap could not be grown.
  pub fn alloc(&mut self, n: usize) -> Result<*mut u8, AllocError> {
    if n == 0 {
      return Ok(ptr::null_mut());
    }
    let asize = canonical_size(n);

    unsafe {
      if let Some(block) = find_fit(&mut self.seg, asize) {
        return Ok(block.payload());
      }

      let extend_size = asize.max(CHUNKSIZE);
      let grown = self.re_extend(extend_size)?;
      let placed = place(&mut self.seg, grown, asize);
      Ok(placed.payload())
    }
  }

  /// Frees a block previously returned by [`Allocator::alloc`] or
  /// [`Allocator::realloc`]. A no-op on NULL.
  pub fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    unsafe {
      let block = Header::from_payload(p);
      let size = block.size();
      let prev_alloc = block.prev_alloc();
      block.set(size, prev_alloc, false);
      block.set_footer(size, prev_alloc, false);

      let result = if should_coalesce(size) { coalesce(&mut self.seg, block) } else { block };
      self.seg.insert(result);
    }
  }

  /// Resizes the block at `p` to hold at least `n` bytes, preserving
  /// contents up to the smaller of the old and new sizes. `n == 0` frees
  /// `p` and returns NULL; `p == NULL` behaves as `alloc(n)`.
  pub fn realloc(&mut self, p: *mut u8, n: usize) -> Result<*mut u8, AllocError> {
    if n == 0 {
      self.free(p);
      return Ok(ptr::null_mut());
    }
    if p.is_null() {
      return self.alloc(n);
    }

    unsafe {
      let header = Header::from_payload(p);
      let csize = header.size();
      let asize = canonical_size(n);

      if asize <= csize {
        return Ok(p);
      }

      let next = header.next_header();
      let next_free = !next.alloc();
      let next_size = next.size();
      let prev_free = !header.prev_alloc();

      if next_free && csize + next_size >= asize {
        self.seg.remove(next, bucket_index(next_size));
        let new_size = csize + next_size;
        header.set(new_size, header.prev_alloc(), true);
        header.next_header().set_prev_alloc(true);
        return Ok(p);
      }

      if prev_free {
        let prev = header.prev_header();
        let prev_size = prev.size();
        if prev_size + csize >= asize {
          self.seg.remove(prev, bucket_index(prev_size));
          prev.set(prev_size + csize, prev.prev_alloc(), true);
          let new_payload = prev.payload();
          ptr::copy(p, new_payload, n.min(csize - WORD));
          return Ok(new_payload);
        }

        if next_free && prev_size + csize + next_size >= asize {
          self.seg.remove(prev, bucket_index(prev_size));
          self.seg.remove(next, bucket_index(next_size));
          prev.set(prev_size + csize + next_size, prev.prev_alloc(), true);
          prev.next_header().set_prev_alloc(true);
          let new_payload = prev.payload();
          ptr::copy(p, new_payload, n.min(csize - WORD));
          return Ok(new_payload);
        }
      }

      let new_ptr = self.alloc(n)?;
      ptr::copy_nonoverlapping(p, new_ptr, n.min(csize - WORD));
      self.free(p);
      Ok(new_ptr)
    }
  }

  /// The current top of the heap (one past the last byte the heap source
  /// has handed out), mirroring `sbrk(0)`. `None` before [`Allocator::init`]
  /// has run. Useful for callers (and tests) that want to confirm an
  /// operation was satisfied from a freed block rather than growing the
  /// heap.
  pub fn heap_high(&self) -> Option<*mut u8> {
    self.heap.hi()
  }

  /// Runs the debug consistency checker over the whole heap, logging any
  /// violations found. Returns `true` iff nothing was found wrong.
  pub fn checkheap(&self) -> bool {
    match self.prologue {
      Some(p) => unsafe { crate::check::checkheap(p) },
      None => {
        log::warn!("checkheap called before init");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::mock::MockHeap;

  fn allocator(capacity: usize) -> Allocator<MockHeap> {
    let mut a = Allocator::new(MockHeap::new(capacity));
    a.init().expect("init should succeed with ample mock capacity");
    a
  }

  #[test]
  fn alloc_zero_returns_null_without_growing_heap() {
    let mut a = allocator(1 << 20);
    assert!(a.checkheap());
    let p = a.alloc(0).unwrap();
    assert!(p.is_null());
  }

  #[test]
  fn free_null_is_a_noop() {
    let mut a = allocator(1 << 20);
    a.free(ptr::null_mut());
    assert!(a.checkheap());
  }

  #[test]
  fn basic_alloc_free_round_trips_through_the_same_bucket() {
    let mut a = allocator(1 << 20);
    let p1 = a.alloc(24).unwrap();
    assert!(!p1.is_null());
    assert_eq!(p1 as usize % DWORD, 0);
    a.free(p1);
    assert!(a.checkheap());

    let p2 = a.alloc(24).unwrap();
    assert_eq!(p1, p2, "freed block of the same class should be reused");
    assert!(a.checkheap());
  }

  #[test]
  fn alloc_returns_distinct_writable_regions() {
    let mut a = allocator(1 << 20);
    let p1 = a.alloc(64).unwrap() as *mut u64;
    let p2 = a.alloc(64).unwrap() as *mut u64;
    assert_ne!(p1, p2);
    unsafe {
      *p1 = 0xAAAA_AAAA_AAAA_AAAA;
      *p2 = 0x5555_5555_5555_5555;
      assert_eq!(*p1, 0xAAAA_AAAA_AAAA_AAAA);
      assert_eq!(*p2, 0x5555_5555_5555_5555);
    }
    assert!(a.checkheap());
  }

  #[test]
  fn fill_and_drain_does_not_grow_heap_once_freed_blocks_exist() {
    let mut a = allocator(1 << 20);
    let mut ptrs = Vec::new();
    for _ in 0..1024 {
      ptrs.push(a.alloc(24).unwrap());
    }
    assert!(a.checkheap());

    for (i, p) in ptrs.iter().enumerate() {
      if i % 2 == 0 {
        a.free(*p);
      }
    }
    assert!(a.checkheap());

    let hi_before = a.heap.hi();
    for _ in 0..512 {
      assert!(!a.alloc(24).unwrap().is_null());
    }
    assert_eq!(a.heap.hi(), hi_before, "512 reused slots should not extend the heap");
    assert!(a.checkheap());
  }

  #[test]
  fn realloc_grow_absorbs_free_successor() {
    let mut a = allocator(1 << 20);
    // Payload 600 canonicalizes above `LARGE_REQUEST`, so placement
    // back-splits: each allocation lands at the front of its free extent
    // and the next one is carved from what remains right after it,
    // giving consecutive allocations in ascending address order.
    let p1 = a.alloc(600).unwrap() as *mut u8;
    let p2 = a.alloc(600).unwrap();
    a.free(p2);

    let grown = a.realloc(p1, 1200).unwrap();
    assert_eq!(grown, p1, "next-merge keeps the same payload pointer");
    assert!(a.checkheap());
  }

  #[test]
  fn realloc_shrink_or_equal_returns_same_pointer() {
    let mut a = allocator(1 << 20);
    let p = a.alloc(200).unwrap();
    assert_eq!(a.realloc(p, 32).unwrap(), p);
    assert!(a.checkheap());
  }

  #[test]
  fn realloc_zero_frees_and_returns_null() {
    let mut a = allocator(1 << 20);
    let p = a.alloc(64).unwrap();
    assert!(a.realloc(p, 0).unwrap().is_null());
    assert!(a.checkheap());
  }

  #[test]
  fn realloc_null_behaves_as_alloc() {
    let mut a = allocator(1 << 20);
    let p = a.realloc(ptr::null_mut(), 64).unwrap();
    assert!(!p.is_null());
    assert!(a.checkheap());
  }

  #[test]
  fn realloc_falls_back_to_alloc_copy_free_when_neighbors_cannot_help() {
    let mut a = allocator(1 << 20);
    let p1 = a.alloc(64).unwrap() as *mut u8;
    unsafe {
      for i in 0..64u8 {
        *p1.add(i as usize) = i;
      }
    }
    let _p2 = a.alloc(64).unwrap(); // allocated successor: blocks next-merge
    let new_ptr = a.realloc(p1, 4000).unwrap() as *mut u8;
    assert_ne!(new_ptr, p1);
    unsafe {
      for i in 0..64u8 {
        assert_eq!(*new_ptr.add(i as usize), i);
      }
    }
    assert!(a.checkheap());
  }

  #[test]
  fn oom_propagates_from_init_on_undersized_heap() {
    let mut a = Allocator::new(MockHeap::new(8));
    assert!(a.init().is_err());
  }

  #[test]
  fn oom_propagates_from_alloc_when_heap_is_exhausted() {
    let mut a = allocator(INIT_WORDS * WORD + CHUNKSIZE);
    loop {
      match a.alloc(4000) {
        Ok(p) if !p.is_null() => continue,
        Ok(_) => unreachable!("n was non-zero"),
        Err(AllocError::Oom) => break,
      }
    }
  }
}

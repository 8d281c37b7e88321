//! Placement engine: splitting/consuming a chosen free block, and find-fit
//! search over the segregated lists.

use crate::align::DWORD;
use crate::freelist::SegTable;
use crate::header::Header;

/// Requests at or above this size are placed at the *front* of the chosen
/// block (tail stays free); below it, placement goes at the *back*.
const LARGE_REQUEST: usize = 33 * DWORD;

/// A remainder below this is not worth splitting off — it's folded into
/// the placed block instead. Equals the literal threshold used by the
/// reference allocator's `place`/free-path coalescing gate (see
/// `coalesce.rs`); not the same constant as the structural minimum block
/// size in `classifier::MIN_BLOCK`.
const SPLIT_MIN_REMAINDER: usize = 9 * DWORD;

/// Splits or consumes `block` (currently free, size `>= asize`, already
/// known to be present in its bucket) to satisfy an `asize`-byte request.
/// Returns the header of the now-allocated user block.
///
/// # Safety
/// `block` must be a live free-block header belonging to `seg`, with
/// `block.size() >= asize` and `asize` a canonical block size.
pub unsafe fn place(seg: &mut SegTable, block: Header, asize: usize) -> Header {
  unsafe {
    let i = crate::classifier::bucket_index(block.size());
    seg.remove(block, i);

    let csize = block.size();
    let remainder = csize - asize;
    let prev_alloc = block.prev_alloc();

    if asize < LARGE_REQUEST && remainder >= SPLIT_MIN_REMAINDER {
      // Small request: leave the free remainder at the front, place the
      // user block at the back.
      block.set(remainder, prev_alloc, false);
      block.set_footer(remainder, prev_alloc, false);
      seg.insert(block);

      let user = block.next_header();
      user.set(asize, false, true);
      let succ = user.next_header();
      succ.set_prev_alloc(true);
      user
    } else if remainder >= SPLIT_MIN_REMAINDER {
      // Large request: place the user block at the front, free the tail.
      block.set(asize, prev_alloc, true);
      let tail = block.next_header();
      tail.set(remainder, true, false);
      tail.set_footer(remainder, true, false);
      seg.insert(tail);
      block
    } else {
      // No split: consume the whole block.
      block.set(csize, prev_alloc, true);
      let succ = block.next_header();
      succ.set_prev_alloc(true);
      block
    }
  }
}

/// Searches the segregated lists, starting at `asize`'s own bucket and
/// moving to larger buckets, for the first block able to hold `asize`
/// bytes. On success, places it and returns the user header.
///
/// # Safety
/// `seg` must describe a consistent set of free-list rings.
pub unsafe fn find_fit(seg: &mut SegTable, asize: usize) -> Option<Header> {
  unsafe {
    let start = crate::classifier::bucket_index(asize);
    for i in start..crate::classifier::SEGLISTCOUNT {
      let head = match seg.head(i) {
        Some(h) => h,
        None => continue,
      };

      if head.size() >= asize {
        return Some(place(seg, head, asize));
      }

      let mut p = head.link_next();
      while p != head {
        if !p.alloc() && p.size() >= asize {
          return Some(place(seg, p, asize));
        }
        p = p.link_next();
      }
    }
    None
  }
}

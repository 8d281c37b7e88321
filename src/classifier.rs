//! Size classifier: payload → canonical block size, block size → bucket.
//!
//! The thresholds below are workload-tuned magic numbers inherited from the
//! reference allocator, not derived from first principles. They are kept
//! exactly as specified, including the bucket-9/bucket-10 split that
//! carves out a bucket containing exactly one size class (`257 * DWORD`) —
//! see `DESIGN.md` for why this is left as-is rather than "fixed".

use crate::align::DWORD;

/// Number of segregated free lists.
pub const SEGLISTCOUNT: usize = 19;

/// Bytes to grow the heap by on an initial extension or a malloc miss.
/// Deliberately not a power of two, to produce distinctive block sizes
/// under the classifier above.
pub const CHUNKSIZE: usize = 4112;

/// Minimum block size: header + prev_link + next_link + footer.
pub const MIN_BLOCK: usize = 2 * DWORD;

/// Rounds a requested payload size up to a canonical allocated block size.
///
/// Small requests land on a fixed ladder so that many differently-sized
/// tiny allocations share identical block sizes (and therefore buckets).
pub fn canonical_size(payload_bytes: usize) -> usize {
  let w = crate::align::WORD;
  if payload_bytes <= 3 * w {
    2 * DWORD
  } else if payload_bytes <= 5 * w {
    3 * DWORD
  } else if payload_bytes <= 9 * w {
    5 * DWORD
  } else if payload_bytes <= 17 * w {
    9 * DWORD
  } else if payload_bytes <= 33 * w {
    17 * DWORD
  } else if payload_bytes <= 65 * w {
    33 * DWORD
  } else if payload_bytes < 129 * w {
    65 * DWORD
  } else {
    DWORD * ((payload_bytes + w + (DWORD - 1)) / DWORD)
  }
}

/// Maps a block size to its segregated free-list bucket (`0..SEGLISTCOUNT`).
pub fn bucket_index(block_size: usize) -> usize {
  if block_size < 65 * DWORD {
    return match block_size {
      s if s == 2 * DWORD => 0,
      s if s == 3 * DWORD => 1,
      s if s == 5 * DWORD => 2,
      s if s == 9 * DWORD => 3,
      s if s == 17 * DWORD => 4,
      s if s == 33 * DWORD => 5,
      _ => 6,
    };
  }
  if block_size <= 129 * DWORD {
    7
  } else if block_size <= 252 * DWORD {
    8
  } else if block_size <= 256 * DWORD {
    9
  } else if block_size <= 257 * DWORD {
    10
  } else if block_size <= 513 * DWORD {
    11
  } else if block_size <= 769 * DWORD {
    12
  } else if block_size <= 1015 * DWORD {
    13
  } else if block_size <= 1271 * DWORD {
    14
  } else if block_size <= 1527 * DWORD {
    15
  } else if block_size <= 1783 * DWORD {
    16
  } else if block_size <= 2039 * DWORD {
    17
  } else {
    18
  }
}

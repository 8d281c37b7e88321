//! # rallocator - A Segregated-Fit Memory Allocator
//!
//! This crate provides a **segregated free-list allocator** managing a
//! single contiguous heap grown on demand via `sbrk(2)`. Unlike a bump
//! allocator, freed memory is tracked and reused: each free block lives
//! on one of several size-class buckets, and `alloc` searches the
//! bucket matching its request (and the ones above it) for a block that
//! fits.
//!
//! ## Overview
//!
//! ```text
//!   Segregated Free Lists:
//!
//!   bucket[0]  (<= 1D)     -> []
//!   bucket[1]  (<= 2D)     -> [free] <-> [free]
//!   bucket[2]  (<= 4D)     -> [free]
//!     ...
//!   bucket[18] (> ~1500D)  -> [free] <-> [free] <-> [free]
//!
//!   Each live block, free or allocated, carries a boundary-tag header
//!   (and, while free, a matching footer) encoding its size and the
//!   alloc bit of itself and its predecessor by address:
//!
//!   ┌────────┬──────────────────────────────┬────────┐
//!   │ header │           payload            │ footer │   (free block)
//!   └────────┴──────────────────────────────┴────────┘
//!   ┌────────┬──────────────────────────────┐
//!   │ header │           payload            │            (allocated block)
//!   └────────┴──────────────────────────────┘
//! ```
//!
//! Adjacent free blocks are coalesced opportunistically (not always — see
//! [`coalesce`] for the exact policy) to keep fragmentation down without
//! paying the cost of merging on every single free.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Alignment macros and constants (align!, align_to!, DWORD)
//!   ├── header     - Boundary-tag header/footer encoding for one block
//!   ├── classifier - Size-class ladder and bucket index lookup
//!   ├── freelist   - Segregated free-list table (SegTable)
//!   ├── placement  - First-fit search and block splitting
//!   ├── coalesce   - Selective boundary-tag coalescing on free
//!   ├── heap       - HeapSource trait; SbrkHeap and a mock for tests
//!   ├── error      - AllocError
//!   ├── check      - Heap consistency walker (debug aid)
//!   ├── allocator  - Allocator<H>: ties the above into alloc/free/realloc
//!   └── global     - GlobalAlloc wrapper for #[global_allocator] use
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::{Allocator, SbrkHeap};
//!
//! fn main() {
//!     let mut allocator = Allocator::new(SbrkHeap::new());
//!     allocator.init().expect("failed to reserve initial heap");
//!
//!     unsafe {
//!         let p = allocator.alloc(64).expect("allocation failed") as *mut u64;
//!         *p = 42;
//!         allocator.free(p as *mut u8);
//!     }
//! }
//! ```
//!
//! Or, as the process-wide allocator:
//!
//! ```rust,ignore
//! use rallocator::GlobalAllocator;
//!
//! #[global_allocator]
//! static ALLOCATOR: GlobalAllocator = GlobalAllocator::new();
//! ```
//!
//! ## How It Works
//!
//! The allocator uses `sbrk(2)` to extend the program's data segment,
//! exactly as a bump allocator would, but the bytes handed back by a
//! prior `free` are not abandoned: they're threaded onto a segregated
//! free list and considered by every subsequent `alloc` before the heap
//! is grown again.
//!
//! ```text
//!   Program Memory Layout:
//!
//!   High Address ┌─────────────────────┐
//!                │       Stack         │ ↓ grows down
//!                │         │           │
//!                │         ▼           │
//!                │                     │
//!                │         ▲           │
//!                │         │           │
//!                │       Heap          │ ↑ grows up (sbrk)
//!                ├─────────────────────┤ ← Program Break
//!                │   Uninitialized     │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │   Initialized       │
//!                │       Data          │
//!                ├─────────────────────┤
//!                │       Text          │
//!   Low Address  └─────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Reuses freed memory**: freed blocks are tracked in 19 segregated
//!   size-class buckets and considered before the heap is grown again.
//! - **Boundary-tag coalescing**: adjacent free neighbors merge back
//!   into a single block under a workload-tuned policy (see [`coalesce`]).
//! - **In-place `realloc`**: growing into a free neighbor avoids a
//!   copy when the neighbor is large enough.
//! - **Pluggable heap source**: [`HeapSource`] decouples the allocator
//!   from `sbrk` for testing ([`heap::mock::MockHeap`]).
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`Allocator`] itself assumes one caller
//!   at a time; [`GlobalAllocator`] adds the lock needed for
//!   `#[global_allocator]` use from multiple threads.
//! - **Unix-only**: [`SbrkHeap`] requires `libc` and `sbrk` (POSIX
//!   systems).
//! - **No shrink-to-OS**: freed memory is reused but never returned to
//!   the operating system.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory
//! management. Every function that dereferences a raw block header is
//! `unsafe` and documents the preconditions it relies on.

pub mod align;
pub mod allocator;
pub mod check;
pub mod classifier;
pub mod coalesce;
pub mod error;
pub mod freelist;
pub mod global;
pub mod header;
pub mod heap;
pub mod placement;

pub use allocator::Allocator;
pub use error::AllocError;
pub use global::GlobalAllocator;
pub use heap::{HeapSource, SbrkHeap};

//! # rallocator -- a segregated-fits heap allocator
//!
//! A single-threaded, general-purpose heap allocator built from the classic
//! boundary-tag toolkit: a fixed set of size-class buckets, each holding an
//! address-ordered doubly-linked free list; immediate coalescing of freed
//! blocks with their physical neighbors; and a split/placement policy that
//! chooses which end of a free block to carve an allocation from.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Alignment macro (align!)
//!   ├── tag        - The packed 32-bit header/footer word
//!   ├── block      - BlockRef: header/footer/link accessors over a payload address
//!   ├── list       - FreeLists: the segregated, address-ordered free-list directory
//!   ├── coalesce   - Merging a freed block with its physical neighbors
//!   ├── place      - Splitting (or not) a free block to satisfy a request
//!   ├── heap       - HeapExtend, SbrkHeap, FixedHeap: where raw memory comes from
//!   ├── error      - AllocError
//!   └── allocator  - Allocator<H>: init / allocate / free / resize
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rallocator::{Allocator, SbrkHeap};
//!
//! let mut alloc = Allocator::init(SbrkHeap::new()).expect("heap init");
//!
//! unsafe {
//!     let p = alloc.allocate(64) as *mut u64;
//!     *p = 42;
//!     assert_eq!(*p, 42);
//!
//!     let p = alloc.resize(p as *mut u8, 256);
//!     alloc.free(p);
//! }
//! ```
//!
//! ## In-place resize and the reallocation buffer
//!
//! `resize` tries hard to grow a block without moving it: it reserves extra
//! headroom (the reallocation buffer) by tagging a neighboring block with
//! the RA bit, which also vetoes that neighbor from being folded into a
//! coalesce. This trades a little memory for avoiding a copy on the very
//! common pattern of a buffer that grows by small increments in a loop.
//!
//! ## Thread Safety
//!
//! `Allocator<H>` is **not** `Sync`. It performs no internal locking;
//! sharing an instance across threads requires the caller's own external
//! synchronization. The crate exposes no `GlobalAlloc` implementation --
//! wiring this allocator into `#[global_allocator]` is outside its scope.
//!
//! ## Safety
//!
//! This crate is inherently unsafe: it manages raw memory obtained from the
//! operating system (or, in tests, a deterministic in-memory stand-in) and
//! hands out raw pointers. Callers must ensure pointers passed to `free` and
//! `resize` were returned by this same allocator and have not already been
//! freed.

pub mod align;
mod allocator;
mod block;
mod coalesce;
mod error;
mod heap;
#[cfg(test)]
mod invariants;
mod list;
mod place;
mod tag;

pub use allocator::Allocator;
pub use error::AllocError;
pub use heap::{FixedHeap, HeapExtend, SbrkHeap};

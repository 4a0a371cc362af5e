//! Test-only consistency walk over an allocator's heap. Not part of the
//! public API -- a production build never pays for it and a caller has no
//! way to invoke it; it exists purely so the test suite can assert the
//! structural invariants hold after a sequence of operations instead of
//! only checking surface-level behavior.

#![cfg(test)]

use std::collections::HashSet;

use crate::allocator::Allocator;
use crate::block::BlockRef;
use crate::heap::HeapExtend;
use crate::list::{FreeLists, LIST_COUNT};

/// Walks the physical block chain and every free list, panicking with a
/// descriptive message at the first invariant violation found.
pub(crate) fn check_invariants<H: HeapExtend>(alloc: &Allocator<H>) {
  check_physical_chain(alloc);
  check_free_lists(alloc);
}

fn check_physical_chain<H: HeapExtend>(alloc: &Allocator<H>) {
  let lo = alloc.heap_lo();
  let hi = alloc.heap_hi();
  unsafe {
    let prologue = BlockRef::new(lo.add(2 * crate::block::WSIZE));
    let mut block = prologue.next_physical();
    loop {
      let size = block.size();
      assert!(size % 8 == 0, "block size must be a multiple of 8, got {size}");
      if size == 0 {
        // Epilogue reached.
        assert_eq!(block.as_ptr(), hi.sub(crate::block::WSIZE));
        break;
      }
      assert!(size >= crate::block::MIN_BLOCK_SIZE, "block smaller than the minimum");
      let next = block.next_physical();
      assert!(
        (next.as_ptr() as usize) <= (hi as usize),
        "block chain walked past the end of the heap"
      );
      if !block.is_allocated() && !next.is_allocated() {
        assert!(
          block.has_ra() || next.has_ra(),
          "two adjacent free blocks at {:p} / {:p} were not coalesced",
          block.as_ptr(),
          next.as_ptr()
        );
      }
      block = next;
    }
  }
}

fn check_free_lists<H: HeapExtend>(alloc: &Allocator<H>) {
  let base = alloc.heap_lo();
  let lists: &FreeLists = alloc.lists();
  let mut seen = HashSet::new();

  for k in 0..LIST_COUNT {
    let mut prev_addr: Option<usize> = None;
    let mut cur = lists.head(k);
    while let Some(node) = cur {
      assert!(!node.is_allocated(), "allocated block found in a free list");
      assert_eq!(FreeLists::size_class(node.size()), k, "block stored in the wrong size class bucket");
      assert!(seen.insert(node.as_ptr() as usize), "block linked into more than one free list");

      if let Some(p) = prev_addr {
        assert!(p > node.as_ptr() as usize, "free list is not address-descending from the head");
      }
      prev_addr = Some(node.as_ptr() as usize);

      cur = unsafe { node.pred(base) };
    }
  }
}

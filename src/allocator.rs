//! The segregated-fits allocator itself: orchestrates the free-list
//! directory, boundary-tag blocks, and a [`HeapExtend`] heap provider into
//! `init` / `allocate` / `free` / `resize`.

use std::cmp;
use std::ptr;

use tracing::{debug, instrument, warn};

use crate::align;
use crate::block::{BlockRef, DSIZE, WSIZE};
use crate::coalesce::coalesce;
use crate::error::AllocError;
use crate::heap::HeapExtend;
use crate::list::{FreeLists, LIST_COUNT};
use crate::place::place;

/// First heap growth, and the floor for every growth after it once no
/// existing free block can satisfy a request.
const INIT_CHUNK: usize = 1 << 6; // 64 bytes
const MIN_CHUNK: usize = 1 << 12; // 4096 bytes
/// Extra headroom requested on every in-place resize, reserved via the RA
/// tag so a subsequent small growth can often be satisfied without moving.
const REALLOC_BUFFER: u32 = 1 << 7; // 128 bytes

/// A segregated-fits allocator over a heap grown through `H`.
///
/// Not `Sync`: the type carries raw pointers into heap memory and performs
/// no internal locking, so sharing an instance across threads requires the
/// caller's own external synchronization.
pub struct Allocator<H: HeapExtend> {
  lists: FreeLists,
  heap: H,
  heap_lo: *mut u8,
  heap_hi: *mut u8,
}

impl<H: HeapExtend> Allocator<H> {
  /// Bootstraps the prologue/epilogue sentinels and the first heap chunk,
  /// returning a ready-to-use allocator.
  #[instrument(level = "debug", skip(heap))]
  pub fn init(heap: H) -> Result<Self, AllocError> {
    let mut alloc = Self { lists: FreeLists::new(), heap, heap_lo: ptr::null_mut(), heap_hi: ptr::null_mut() };
    alloc.bootstrap()?;
    Ok(alloc)
  }

  fn bootstrap(&mut self) -> Result<(), AllocError> {
    let base = unsafe { self.heap.extend(4 * WSIZE) }
      .map_err(|e| AllocError::HeapExhausted { requested: 4 * WSIZE, source: Box::new(e) })?;

    self.heap_lo = base;
    unsafe {
      // Alignment padding, never read back.
      ptr::write(base as *mut u32, 0);
      // Prologue: a permanently allocated zero-payload block.
      let prologue = BlockRef::new(base.add(2 * WSIZE));
      prologue.write_clearing_ra(DSIZE as u32, true);
      // Epilogue: a permanently allocated zero-size sentinel.
      crate::tag::write_tag_clearing_ra(base.add(3 * WSIZE), crate::tag::Tag::pack(0, true));
    }
    self.heap_hi = unsafe { base.add(4 * WSIZE) };

    self.extend_heap(INIT_CHUNK)?;
    Ok(())
  }

  /// Grows the heap by at least `n` bytes (rounded up to an 8-byte
  /// multiple), folds the new space into the block immediately below it if
  /// free, and returns a handle to the resulting free block.
  #[instrument(level = "debug", skip(self))]
  fn extend_heap(&mut self, n: usize) -> Result<BlockRef, AllocError> {
    let n = align!(n);
    let raw = unsafe { self.heap.extend(n) }
      .map_err(|e| AllocError::HeapExhausted { requested: n, source: Box::new(e) })?;

    let block = unsafe { BlockRef::new(raw) };
    unsafe {
      block.write_clearing_ra(n as u32, false);
      crate::tag::write_tag_clearing_ra(raw.add(n), crate::tag::Tag::pack(0, true));
    }
    self.heap_hi = unsafe { raw.add(n).add(WSIZE) };

    unsafe { self.lists.insert(self.heap_lo, block) };
    let merged = unsafe { coalesce(&mut self.lists, self.heap_lo, block) };
    debug!(bytes = n, addr = ?raw, "extended heap");
    Ok(merged)
  }

  fn adjusted_size(size: usize) -> u32 {
    if size <= DSIZE {
      (2 * DSIZE) as u32
    } else {
      align!(size + DSIZE) as u32
    }
  }

  /// Segregated-fits search: starting from the smallest bucket that could
  /// possibly hold `a`, scan each bucket's address-ordered list for the
  /// first block that both fits and is not reserved by a live RA tag.
  fn find_fit(&self, a: u32) -> Option<BlockRef> {
    let mut k = FreeLists::size_class(a);
    while k < LIST_COUNT {
      let mut candidate = self.lists.head(k);
      while let Some(b) = candidate {
        if a > b.size() || b.has_ra() {
          candidate = unsafe { b.pred(self.heap_lo) };
        } else {
          return Some(b);
        }
      }
      k += 1;
    }
    None
  }

  /// Returns a pointer to a newly allocated, uninitialized region of at
  /// least `size` bytes, or null if the heap could not be grown to satisfy
  /// the request. `size == 0` always returns null.
  #[instrument(level = "debug", skip(self))]
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }
    let a = Self::adjusted_size(size);

    let block = match self.find_fit(a) {
      Some(b) => b,
      None => {
        let extend_size = cmp::max(a as usize, MIN_CHUNK);
        match self.extend_heap(extend_size) {
          Ok(b) => b,
          Err(err) => {
            warn!(%err, "allocate: heap exhausted");
            return ptr::null_mut();
          }
        }
      }
    };

    unsafe { place(&mut self.lists, self.heap_lo, block, a) }.as_ptr()
  }

  /// Releases the block at `p`, coalescing it with any free physical
  /// neighbor. `p` must have been returned by [`Allocator::allocate`] or
  /// [`Allocator::resize`] on this allocator and not already freed; a null
  /// pointer is a no-op.
  #[instrument(level = "debug", skip(self))]
  pub fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    let block = unsafe { BlockRef::new(p) };
    let size = block.size();
    unsafe {
      block.next_physical().clear_ra();
      block.write_preserving_ra(size, false);
      self.lists.insert(self.heap_lo, block);
      coalesce(&mut self.lists, self.heap_lo, block);
    }
  }

  /// Resizes the block at `p` to hold at least `size` bytes, preserving the
  /// first `min(size, old payload size)` bytes of its contents. Returns the
  /// new payload pointer, which may differ from `p`, or null if growth was
  /// needed and the heap could not be extended (in which case `p` is left
  /// untouched). `size == 0` returns null without freeing `p`.
  #[instrument(level = "debug", skip(self))]
  pub fn resize(&mut self, p: *mut u8, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let a = Self::adjusted_size(size) + REALLOC_BUFFER;
    let mut block = unsafe { BlockRef::new(p) };

    if block.size() < a {
      let next = unsafe { block.next_physical() };
      let next_free_or_epilogue = next.size() == 0 || !next.is_allocated();

      if next_free_or_epilogue {
        let available = block.size() + next.size();
        if available < a {
          let deficit = (a - available) as usize;
          let extend_amount = cmp::max(deficit, MIN_CHUNK);
          if let Err(err) = self.extend_heap(extend_amount) {
            warn!(%err, "resize: heap exhausted while growing in place");
            return ptr::null_mut();
          }
        }

        let next = unsafe { block.next_physical() };
        unsafe { self.lists.delete(self.heap_lo, next) };
        let new_size = block.size() + next.size();
        unsafe { block.write_clearing_ra(new_size, true) };
      } else {
        let old_payload_size = block.size() - DSIZE as u32;
        let new_payload = self.allocate((a - DSIZE as u32) as usize);
        if new_payload.is_null() {
          return ptr::null_mut();
        }
        let copy_len = cmp::min(size, old_payload_size as usize);
        unsafe { ptr::copy_nonoverlapping(p, new_payload, copy_len) };
        self.free(p);
        block = unsafe { BlockRef::new(new_payload) };
      }
    }

    let slack = block.size() - a;
    if slack < 2 * REALLOC_BUFFER {
      unsafe { block.next_physical().set_ra() };
    }

    block.as_ptr()
  }

  /// Lower bound (inclusive) of the managed heap's address range.
  pub(crate) fn heap_lo(&self) -> *mut u8 {
    self.heap_lo
  }

  /// Upper bound (exclusive) of the managed heap's address range.
  pub(crate) fn heap_hi(&self) -> *mut u8 {
    self.heap_hi
  }

  #[cfg(test)]
  pub(crate) fn lists(&self) -> &FreeLists {
    &self.lists
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::FixedHeap;

  fn fixed(capacity: usize) -> Allocator<FixedHeap> {
    Allocator::init(FixedHeap::with_capacity(capacity)).unwrap()
  }

  #[test]
  fn allocate_zero_returns_null() {
    let mut a = fixed(1 << 16);
    assert!(a.allocate(0).is_null());
  }

  #[test]
  fn basic_allocate_write_read() {
    let mut a = fixed(1 << 16);
    unsafe {
      let p = a.allocate(64) as *mut u64;
      assert!(!p.is_null());
      *p = 0xDEAD_BEEF;
      assert_eq!(*p, 0xDEAD_BEEF);
    }
  }

  #[test]
  fn allocations_do_not_overlap() {
    let mut a = fixed(1 << 16);
    let p1 = a.allocate(32) as usize;
    let p2 = a.allocate(32) as usize;
    assert_ne!(p1, p2);
    assert!(p1 + 32 <= p2 || p2 + 32 <= p1);
  }

  #[test]
  fn free_then_allocate_reuses_space() {
    let mut a = fixed(1 << 16);
    let p1 = a.allocate(64);
    a.free(p1);
    let p2 = a.allocate(64);
    assert_eq!(p1, p2, "freed block of identical size should be reused");
  }

  #[test]
  fn resize_grow_preserves_contents() {
    let mut a = fixed(1 << 16);
    unsafe {
      let p = a.allocate(16) as *mut u8;
      for i in 0..16u8 {
        *p.add(i as usize) = i;
      }
      let grown = a.resize(p as *mut u8, 256) as *mut u8;
      assert!(!grown.is_null());
      for i in 0..16u8 {
        assert_eq!(*grown.add(i as usize), i);
      }
    }
  }

  #[test]
  fn resize_shrink_keeps_same_pointer() {
    let mut a = fixed(1 << 16);
    let p = a.allocate(256);
    let shrunk = a.resize(p, 16);
    assert_eq!(p, shrunk, "shrinking should never need to relocate");
  }

  #[test]
  fn resize_zero_returns_null_without_freeing() {
    let mut a = fixed(1 << 16);
    unsafe {
      let p = a.allocate(64) as *mut u8;
      *p = 7;
      let r = a.resize(p, 0);
      assert!(r.is_null());
      assert_eq!(*p, 7, "resize(_, 0) must not free the original block");
    }
  }

  #[test]
  fn heap_exhaustion_returns_null_without_panicking() {
    let mut a = fixed(4096);
    let mut last = ptr::null_mut();
    for _ in 0..10_000 {
      let p = a.allocate(4096);
      if p.is_null() {
        last = p;
        break;
      }
    }
    assert!(last.is_null());
  }

  #[test]
  fn many_alloc_free_cycles_stay_consistent() {
    let mut a = fixed(1 << 20);
    let mut ptrs = Vec::new();
    for i in 0..64 {
      let size = 8 + (i % 37) * 8;
      ptrs.push(a.allocate(size));
    }
    for (i, p) in ptrs.iter().enumerate() {
      if i % 2 == 0 {
        a.free(*p);
      }
    }
    for i in 0..32 {
      let size = 8 + (i % 13) * 8;
      let p = a.allocate(size);
      assert!(!p.is_null());
    }
  }
}

//! `BlockRef`: a handle to a block's payload address, plus the header/footer
//! and free-list link accessors built on top of [`crate::tag`].
//!
//! A block looks like (payload size `N = size - 2*WSIZE`):
//!
//! ```text
//!   addr-4        addr            addr+N          addr+N+4 (== addr+size-4)
//!     │             │                │                   │
//!     ▼             ▼                ▼                   ▼
//!     ┌─────────────┬────────────────┬───────────────────┐
//!     │   header    │    payload     │       footer       │
//!     │  (4 bytes)  │   (N bytes)    │      (4 bytes)     │
//!     └─────────────┴────────────────┴───────────────────┘
//! ```
//!
//! When the block is free, the first 8 bytes of the payload hold the
//! predecessor/successor links of its segregated free list instead of user
//! data; [`FreeLists`](crate::list::FreeLists) is the only code that reads or
//! writes them.

use std::ptr::{self, NonNull};

use crate::tag::{self, Tag};

pub(crate) const WSIZE: usize = 4;
pub(crate) const DSIZE: usize = 8;
/// Smallest possible block: a header, a footer, and nothing else.
pub(crate) const MIN_BLOCK_SIZE: u32 = (2 * DSIZE) as u32;

/// A handle to a block's payload address (`bp` in classic boundary-tag
/// nomenclature). Cheap to copy; carries no cached state, every accessor
/// re-reads the header/footer on demand so a `BlockRef` is never stale.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BlockRef(NonNull<u8>);

impl BlockRef {
  /// # Safety
  /// `bp` must point at the payload of a live, correctly tagged block.
  pub(crate) unsafe fn new(bp: *mut u8) -> Self {
    unsafe { Self(NonNull::new_unchecked(bp)) }
  }

  pub(crate) fn as_ptr(self) -> *mut u8 {
    self.0.as_ptr()
  }

  fn header_addr(self) -> *mut u8 {
    unsafe { self.as_ptr().sub(WSIZE) }
  }

  fn footer_addr_for(self, size: u32) -> *mut u8 {
    unsafe { self.as_ptr().add(size as usize - DSIZE) }
  }

  fn footer_addr(self) -> *mut u8 {
    self.footer_addr_for(self.size())
  }

  pub(crate) fn size(self) -> u32 {
    unsafe { tag::read_tag(self.header_addr()).size() }
  }

  pub(crate) fn is_allocated(self) -> bool {
    unsafe { tag::read_tag(self.header_addr()).is_alloc() }
  }

  pub(crate) fn has_ra(self) -> bool {
    unsafe { tag::read_tag(self.header_addr()).has_ra() }
  }

  /// Writes a new header/footer pair, preserving whatever RA bit each word
  /// already held (mirrors a tag-preserving boundary-tag write).
  pub(crate) unsafe fn write_preserving_ra(self, size: u32, alloc: bool) {
    unsafe {
      let t = Tag::pack(size, alloc);
      tag::write_tag_preserving_ra(self.header_addr(), t);
      tag::write_tag_preserving_ra(self.footer_addr_for(size), t);
    }
  }

  /// Writes a new header/footer pair, unconditionally clearing RA on both
  /// words.
  pub(crate) unsafe fn write_clearing_ra(self, size: u32, alloc: bool) {
    unsafe {
      let t = Tag::pack(size, alloc);
      tag::write_tag_clearing_ra(self.header_addr(), t);
      tag::write_tag_clearing_ra(self.footer_addr_for(size), t);
    }
  }

  pub(crate) unsafe fn set_ra(self) {
    unsafe { tag::set_ra(self.header_addr()) }
  }

  pub(crate) unsafe fn clear_ra(self) {
    unsafe { tag::clear_ra(self.header_addr()) }
  }

  /// The block immediately above this one in address order.
  pub(crate) unsafe fn next_physical(self) -> BlockRef {
    unsafe { BlockRef::new(self.as_ptr().add(self.size() as usize)) }
  }

  /// The block immediately below this one in address order, found by
  /// reading the size stamped in its footer.
  pub(crate) unsafe fn prev_physical(self) -> BlockRef {
    unsafe {
      let prev_footer = self.as_ptr().sub(DSIZE);
      let prev_size = tag::read_tag(prev_footer).size();
      BlockRef::new(self.as_ptr().sub(prev_size as usize))
    }
  }

  fn pred_slot(self) -> *mut u32 {
    self.as_ptr() as *mut u32
  }

  fn succ_slot(self) -> *mut u32 {
    unsafe { self.as_ptr().add(WSIZE) as *mut u32 }
  }

  /// Reads the predecessor link, decoding it relative to `base` (the heap's
  /// fixed low address). A stored offset of 0 is the null sentinel -- valid
  /// because offset 0 falls inside the prologue block, which is never free.
  pub(crate) unsafe fn pred(self, base: *mut u8) -> Option<BlockRef> {
    unsafe { decode_link(self.pred_slot(), base) }
  }

  pub(crate) unsafe fn succ(self, base: *mut u8) -> Option<BlockRef> {
    unsafe { decode_link(self.succ_slot(), base) }
  }

  pub(crate) unsafe fn set_pred(self, base: *mut u8, link: Option<BlockRef>) {
    unsafe { encode_link(self.pred_slot(), base, link) }
  }

  pub(crate) unsafe fn set_succ(self, base: *mut u8, link: Option<BlockRef>) {
    unsafe { encode_link(self.succ_slot(), base, link) }
  }

  #[cfg(test)]
  pub(crate) fn header_addr_for_test(self) -> *mut u8 {
    self.header_addr()
  }

  #[cfg(test)]
  pub(crate) fn footer_addr_for_test(self) -> *mut u8 {
    self.footer_addr()
  }
}

unsafe fn decode_link(slot: *mut u32, base: *mut u8) -> Option<BlockRef> {
  let off = unsafe { ptr::read(slot) };
  if off == 0 {
    None
  } else {
    Some(unsafe { BlockRef::new(base.add(off as usize)) })
  }
}

unsafe fn encode_link(slot: *mut u32, base: *mut u8, link: Option<BlockRef>) {
  let off = match link {
    None => 0,
    Some(b) => (b.as_ptr() as usize - base as usize) as u32,
  };
  unsafe { ptr::write(slot, off) }
}

static_assertions::const_assert_eq!(WSIZE, std::mem::size_of::<u32>());
static_assertions::const_assert!(MIN_BLOCK_SIZE as usize >= 2 * WSIZE + 2 * WSIZE);

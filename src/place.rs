//! Split/placement policy applied to a free block chosen by `find_fit`.

use tracing::instrument;

use crate::block::{BlockRef, MIN_BLOCK_SIZE};
use crate::list::FreeLists;

/// A split that would leave a remainder worth keeping only if it clears this
/// many bytes; below it, the whole block is handed out instead of splitting
/// off a sliver too small to be useful.
pub(crate) const SPLIT_HIGH_THRESHOLD: u32 = 100;

/// Removes `block` from the free lists and carves an `a`-byte allocated
/// block out of it, returning a handle to the allocated payload.
///
/// If the leftover remainder is too small to be a standalone block it is
/// absorbed into the allocation instead of being split off. Otherwise the
/// split favors placing the allocated piece at the high address end of the
/// block once `a` passes [`SPLIT_HIGH_THRESHOLD`], keeping the low end --
/// which is where further low-address coalescing tends to happen -- free.
///
/// # Safety
/// `block` must be free, linked into `lists`, and at least `a` bytes.
#[instrument(level = "debug", skip(lists))]
pub(crate) unsafe fn place(lists: &mut FreeLists, base: *mut u8, block: BlockRef, a: u32) -> BlockRef {
  unsafe {
    let block_size = block.size();
    let remainder = block_size - a;

    lists.delete(base, block);

    if remainder <= MIN_BLOCK_SIZE {
      block.write_preserving_ra(block_size, true);
      block
    } else if a >= SPLIT_HIGH_THRESHOLD {
      block.write_preserving_ra(remainder, false);
      let upper = block.next_physical();
      upper.write_clearing_ra(a, true);
      lists.insert(base, block);
      upper
    } else {
      block.write_preserving_ra(a, true);
      let upper = block.next_physical();
      upper.write_clearing_ra(remainder, false);
      lists.insert(base, upper);
      block
    }
  }
}

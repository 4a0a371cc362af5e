//! The heap-provider boundary: how the allocator asks the outside world for
//! more raw memory, kept behind a trait so the segregated-fits policy above
//! it can be exercised against a deterministic, in-memory heap in tests
//! instead of the real process break.

use libc::{c_void, intptr_t, sbrk};

/// Grows the managed heap by `n` bytes, returning the start address of the
/// new region. Mirrors `sbrk`'s contract: the region returned is contiguous
/// with whatever this provider has handed out before.
pub trait HeapExtend {
  type Error: std::error::Error + Send + Sync + 'static;

  /// # Safety
  /// `n` must be a multiple of the provider's natural alignment (8 bytes);
  /// the caller owns everything returned until the provider is dropped.
  unsafe fn extend(&mut self, n: usize) -> Result<*mut u8, Self::Error>;
}

/// Grows the heap via the real process break (`sbrk(2)`). The production
/// heap provider; single-process, single-threaded, Unix-only.
#[derive(Debug, Default)]
pub struct SbrkHeap {
  _private: (),
}

impl SbrkHeap {
  pub fn new() -> Self {
    Self { _private: () }
  }
}

#[derive(Debug, thiserror::Error)]
#[error("sbrk refused to grow the heap by {requested} bytes")]
pub struct SbrkError {
  requested: usize,
}

impl HeapExtend for SbrkHeap {
  type Error = SbrkError;

  unsafe fn extend(&mut self, n: usize) -> Result<*mut u8, SbrkError> {
    unsafe {
      let raw = sbrk(n as intptr_t);
      if raw == usize::MAX as *mut c_void {
        Err(SbrkError { requested: n })
      } else {
        Ok(raw as *mut u8)
      }
    }
  }
}

/// A fixed-capacity, heap-allocated buffer standing in for the process
/// break. Deterministic and flake-free under parallel test execution, since
/// it never touches the real `sbrk` cursor shared by the whole process.
pub struct FixedHeap {
  buf: Box<[u8]>,
  cursor: usize,
}

impl FixedHeap {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { buf: vec![0u8; capacity].into_boxed_slice(), cursor: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.buf.len()
  }

  pub fn used(&self) -> usize {
    self.cursor
  }
}

#[derive(Debug, thiserror::Error)]
#[error("fixed heap exhausted: requested {requested} bytes, {available} available")]
pub struct FixedHeapError {
  requested: usize,
  available: usize,
}

impl HeapExtend for FixedHeap {
  type Error = FixedHeapError;

  unsafe fn extend(&mut self, n: usize) -> Result<*mut u8, FixedHeapError> {
    let available = self.buf.len() - self.cursor;
    if n > available {
      return Err(FixedHeapError { requested: n, available });
    }
    let p = unsafe { self.buf.as_mut_ptr().add(self.cursor) };
    self.cursor += n;
    Ok(p)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixed_heap_extends_contiguously_until_exhausted() {
    let mut heap = FixedHeap::with_capacity(64);
    unsafe {
      let a = heap.extend(16).unwrap();
      let b = heap.extend(16).unwrap();
      assert_eq!(b, a.add(16));
      assert_eq!(heap.used(), 32);

      let err = heap.extend(64).unwrap_err();
      assert_eq!(format!("{err}"), "fixed heap exhausted: requested 64 bytes, 32 available");
    }
  }
}

//! Error types surfaced by the allocator's public operations.

use std::error::Error as StdError;

/// Failures that can occur while initializing or growing the allocator's
/// managed heap. Allocation and resize failures that stem from heap
/// exhaustion are reported to callers as a null pointer (matching `malloc`'s
/// ABI contract); `AllocError` is what gets logged internally when that
/// happens, and is the only error `init` itself can return.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
  #[error("heap exhausted while extending by {requested} bytes")]
  HeapExhausted {
    requested: usize,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
  },
}

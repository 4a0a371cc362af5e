/// Rounds `$value` up to the nearest multiple of `mem::size_of::<usize>()`
/// (8 bytes on the 64-bit targets this allocator is built for).
///
/// Every adjusted request size and every extended heap chunk passes through
/// this macro, which keeps the "size is always a multiple of 8" invariant
/// from being re-derived by hand at each call site.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use rallocator::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::std::mem::size_of::<usize>() - 1) & !(::std::mem::size_of::<usize>() - 1)
  };
}

use core::mem;

/// Rounds a size up to the next multiple of the machine word.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use blockalloc::align;
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
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

/// Same rounding as [`align!`], but `None` when the result does not fit in a `usize`.
pub fn checked_align(value: usize) -> Option<usize> {
  let word = mem::size_of::<usize>();
  value.checked_add(word - 1).map(|v| v & !(word - 1))
}

use std::{
  alloc::{self, Layout},
  mem,
  ptr::NonNull,
};

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::error::AllocError;

/// Source of fresh address space for a [`BlockAllocator`](crate::BlockAllocator).
///
/// A grower only ever moves forward: every successful call returns a region
/// disjoint from all earlier ones, and nothing is ever handed back.
pub trait MemoryGrower {
  /// Claims exactly `byte_count` more bytes and returns the start of them.
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>, AllocError>;
}

/// Grows the process heap by moving the program break with `sbrk(2)`.
///
/// The break is process-wide and `sbrk` is not synchronized, so two
/// allocators (or anything else calling `brk`) growing it at once race.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sbrk;

impl MemoryGrower for Sbrk {
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let exhausted = AllocError::Exhausted { requested: byte_count };

    let increment = intptr_t::try_from(byte_count).map_err(|_| exhausted)?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      debug!("sbrk refused {} bytes", byte_count);
      return Err(exhausted);
    }

    NonNull::new(address.cast::<u8>()).ok_or(exhausted)
  }
}

/// Hands out slices of one fixed buffer taken from the system allocator.
///
/// Gives an allocator a private, bounded address space: growth past the
/// capacity fails with [`AllocError::Exhausted`]. The buffer is zeroed up
/// front and released when the grower is dropped.
#[derive(Debug)]
pub struct RegionGrower {
  base: NonNull<u8>,
  layout: Layout,
  capacity: usize,
  cursor: usize,
}

// The buffer is owned exclusively by the grower.
unsafe impl Send for RegionGrower {}

impl RegionGrower {
  pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
    let exhausted = AllocError::Exhausted { requested: capacity };

    let layout = Layout::from_size_align(capacity.max(1), mem::align_of::<usize>()).map_err(|_| exhausted)?;
    let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or(exhausted)?;

    Ok(Self {
      base,
      layout,
      capacity,
      cursor: 0,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes not yet claimed.
  pub fn remaining(&self) -> usize {
    self.capacity - self.cursor
  }
}

impl MemoryGrower for RegionGrower {
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if byte_count > self.remaining() {
      debug!(
        "region of {} bytes cannot grow by {} ({} left)",
        self.capacity,
        byte_count,
        self.remaining()
      );
      return Err(AllocError::Exhausted { requested: byte_count });
    }

    let address = unsafe { self.base.add(self.cursor) };
    self.cursor += byte_count;

    Ok(address)
  }
}

impl Drop for RegionGrower {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}

/// Serializes tests that move the real program break.
#[cfg(test)]
pub(crate) fn program_break_lock() -> std::sync::MutexGuard<'static, ()> {
  static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
  LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use std::{mem, ptr::NonNull};

use crate::align;

/// Prefix written at the start of every region claimed from the grower.
///
/// Only used to map a raw data pointer back to its record; the allocator
/// never trusts it without checking the record table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct BlockHeader {
  pub owner: u64,
  pub index: usize,
}

/// Bytes reserved in front of each data region, rounded to the machine word.
pub const HEADER_SIZE: usize = align!(mem::size_of::<BlockHeader>());

/// Bookkeeping for one region, kept out of band in the allocator's table.
#[derive(Debug)]
pub struct BlockRecord {
  pub header: NonNull<u8>,
  pub size: usize,
  pub in_use: bool,
  pub generation: u32,
}

impl BlockRecord {
  /// Stamps `header` in place and returns the in-use record describing it.
  ///
  /// # Safety
  ///
  /// `header` must point to at least `HEADER_SIZE + size` writable bytes that
  /// nothing else refers to.
  pub unsafe fn new(
    header: NonNull<u8>,
    size: usize,
    owner: u64,
    index: usize,
  ) -> Self {
    unsafe {
      header
        .as_ptr()
        .cast::<BlockHeader>()
        .write_unaligned(BlockHeader { owner, index });
    }

    Self {
      header,
      size,
      in_use: true,
      generation: 0,
    }
  }

  pub fn data(&self) -> NonNull<u8> {
    // The region always spans HEADER_SIZE + size bytes.
    unsafe { self.header.add(HEADER_SIZE) }
  }
}

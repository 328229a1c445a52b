use std::{
  ptr::{self, NonNull},
  slice,
  sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, trace, warn};

use crate::{
  align::checked_align,
  block::{BlockHeader, BlockRecord, HEADER_SIZE},
  error::AllocError,
  grower::{MemoryGrower, Sbrk},
};

static NEXT_ALLOCATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Order in which free blocks are examined. Both orders are first-fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
  /// Most recently created block first.
  #[default]
  NewestFirst,
  /// Blocks in creation order.
  OldestFirst,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocatorOptions {
  pub search_mode: SearchMode,
}

/// Opaque handle to a live allocation.
///
/// Only the allocator that produced it can resolve it. A handle goes stale
/// once its block is freed, and every call made with a stale handle fails
/// with a contract-violation error instead of touching memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
  owner: u64,
  index: usize,
  generation: u32,
  ptr: NonNull<u8>,
  len: usize,
}

// A handle grants no access on its own; every dereference goes through the
// owning allocator.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

impl Allocation {
  /// Start of the usable bytes.
  pub fn as_ptr(&self) -> *mut u8 {
    self.ptr.as_ptr()
  }

  /// Bytes requested for this handle. The block may hold more.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub in_use: usize,
  pub free: usize,
  /// Usable bytes across every block.
  pub capacity_bytes: usize,
  /// Usable bytes across blocks currently in use.
  pub in_use_bytes: usize,
}

/// First-fit allocator over a list of blocks that is never shrunk or merged.
///
/// ```text
///   Heap (grows →)
///   ┌────────┬──────────┬────────┬──────────┬────────┬────────────┐
///   │ header │  data 0  │ header │  data 1  │ header │   data 2   │
///   └────────┴──────────┴────────┴──────────┴────────┴────────────┘
///
///   Records (out of band):  [0: used] [1: free] [2: used]
/// ```
///
/// Every request first looks for a free block at least as large as the
/// request, in [`SearchMode`] order, and takes the first one found. Only when
/// none fits is the grower asked for `HEADER_SIZE + size` more bytes.
#[derive(Debug)]
pub struct BlockAllocator<G: MemoryGrower = Sbrk> {
  id: u64,
  grower: G,
  options: AllocatorOptions,
  records: Vec<BlockRecord>,
}

// Records only point into regions claimed by this allocator's grower.
unsafe impl<G: MemoryGrower + Send> Send for BlockAllocator<G> {}

impl BlockAllocator<Sbrk> {
  pub fn new() -> Self {
    Self::with_grower(Sbrk)
  }
}

impl Default for BlockAllocator<Sbrk> {
  fn default() -> Self {
    Self::new()
  }
}

impl<G: MemoryGrower> BlockAllocator<G> {
  pub fn with_grower(grower: G) -> Self {
    Self::with_options(grower, AllocatorOptions::default())
  }

  pub fn with_options(
    grower: G,
    options: AllocatorOptions,
  ) -> Self {
    Self {
      id: NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed),
      grower,
      options,
      records: Vec::new(),
    }
  }

  pub fn options(&self) -> AllocatorOptions {
    self.options
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  fn find_free_block(
    &self,
    size: usize,
  ) -> Option<usize> {
    let fits = |(_, record): &(usize, &BlockRecord)| !record.in_use && record.size >= size;

    let found = match self.options.search_mode {
      SearchMode::NewestFirst => self.records.iter().enumerate().rev().find(fits),
      SearchMode::OldestFirst => self.records.iter().enumerate().find(fits),
    };

    found.map(|(index, _)| index)
  }

  fn handle(
    &self,
    index: usize,
    len: usize,
  ) -> Allocation {
    let record = &self.records[index];

    Allocation {
      owner: self.id,
      index,
      generation: record.generation,
      ptr: record.data(),
      len,
    }
  }

  /// Resolves a handle to its record index if it is still live here.
  fn live_index(
    &self,
    allocation: &Allocation,
  ) -> Result<usize, AllocError> {
    if allocation.owner != self.id {
      return Err(AllocError::ForeignHandle);
    }

    let record = self.records.get(allocation.index).ok_or(AllocError::ForeignHandle)?;

    if !record.in_use || record.generation != allocation.generation {
      return Err(AllocError::UseAfterFree { index: allocation.index });
    }

    Ok(allocation.index)
  }

  fn report(
    &self,
    err: &AllocError,
  ) {
    warn!("allocator {}: {}", self.id, err);
  }

  /// Hands out at least `size` bytes, reusing a free block when one fits.
  ///
  /// Reused blocks keep whatever their previous owner wrote.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Allocation, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    if let Some(index) = self.find_free_block(size) {
      let record = &mut self.records[index];
      record.in_use = true;
      record.generation = record.generation.wrapping_add(1);

      trace!("reusing block {} ({} bytes) for {} bytes", index, record.size, size);

      return Ok(self.handle(index, size));
    }

    let total = HEADER_SIZE
      .checked_add(size)
      .and_then(checked_align)
      .ok_or(AllocError::Exhausted { requested: size })?;

    let header = self.grower.grow(total)?;

    let index = self.records.len();
    let record = unsafe { BlockRecord::new(header, size, self.id, index) };
    self.records.push(record);

    debug!(
      "grew heap by {} bytes for block {} at {:?}",
      total,
      index,
      header.as_ptr()
    );

    Ok(self.handle(index, size))
  }

  /// Marks the block free. `None` is accepted and ignored.
  ///
  /// The bytes are left as they are. Freeing a handle twice, a handle whose
  /// block was already freed, or a handle from another allocator is reported
  /// and changes nothing.
  pub fn free(
    &mut self,
    allocation: Option<Allocation>,
  ) -> Result<(), AllocError> {
    let Some(allocation) = allocation else {
      return Ok(());
    };

    let index = self
      .live_index(&allocation)
      .map_err(|err| match err {
        AllocError::UseAfterFree { index } => AllocError::DoubleFree { index },
        other => other,
      })
      .inspect_err(|err| self.report(err))?;

    self.records[index].in_use = false;

    trace!("freed block {}", index);

    Ok(())
  }

  /// Changes the usable size of an allocation.
  ///
  /// `None` behaves like [`allocate`](Self::allocate). If the block already
  /// holds `new_size` bytes the same block comes back and its recorded
  /// capacity is untouched. Otherwise the contents move to a new block and
  /// the old one is freed; if that allocation fails the old handle stays valid.
  pub fn resize(
    &mut self,
    allocation: Option<Allocation>,
    new_size: usize,
  ) -> Result<Allocation, AllocError> {
    let Some(allocation) = allocation else {
      return self.allocate(new_size);
    };

    let index = self.live_index(&allocation).inspect_err(|err| self.report(err))?;
    let capacity = self.records[index].size;

    if capacity >= new_size {
      return Ok(Allocation {
        len: new_size,
        ..allocation
      });
    }

    let moved = self.allocate(new_size)?;

    unsafe {
      ptr::copy_nonoverlapping(self.records[index].data().as_ptr(), moved.as_ptr(), capacity);
    }
    self.records[index].in_use = false;

    trace!("moved block {} to block {} ({} bytes)", index, moved.index, capacity);

    Ok(moved)
  }

  /// Allocates `count * size` bytes, all zero.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<Allocation, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let total = count
      .checked_mul(size)
      .ok_or(AllocError::Overflow { count, size })?;

    let allocation = self.allocate(total)?;

    unsafe { ptr::write_bytes(allocation.as_ptr(), 0, total) };

    Ok(allocation)
  }

  /// Usable bytes of the block behind `allocation`.
  pub fn capacity(
    &self,
    allocation: &Allocation,
  ) -> Result<usize, AllocError> {
    let index = self.live_index(allocation)?;

    Ok(self.records[index].size)
  }

  pub fn bytes(
    &self,
    allocation: &Allocation,
  ) -> Result<&[u8], AllocError> {
    self.live_index(allocation).inspect_err(|err| self.report(err))?;

    Ok(unsafe { slice::from_raw_parts(allocation.as_ptr(), allocation.len) })
  }

  pub fn bytes_mut(
    &mut self,
    allocation: &Allocation,
  ) -> Result<&mut [u8], AllocError> {
    self.live_index(allocation).inspect_err(|err| self.report(err))?;

    Ok(unsafe { slice::from_raw_parts_mut(allocation.as_ptr(), allocation.len) })
  }

  /// Recovers the live handle for a raw data pointer.
  ///
  /// The returned handle spans the whole block capacity.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`Allocation::as_ptr`] of an allocator whose
  /// grower's memory is still mapped, so that the `HEADER_SIZE` bytes before
  /// it are readable.
  pub unsafe fn allocation_from_ptr(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<Allocation, AllocError> {
    let header = unsafe { ptr.sub(HEADER_SIZE).cast::<BlockHeader>().read_unaligned() };

    if header.owner != self.id {
      return Err(AllocError::ForeignHandle);
    }

    let record = self.records.get(header.index).ok_or(AllocError::ForeignHandle)?;

    if record.data() != ptr {
      return Err(AllocError::ForeignHandle);
    }

    if !record.in_use {
      return Err(AllocError::UseAfterFree { index: header.index });
    }

    Ok(self.handle(header.index, record.size))
  }

  pub fn stats(&self) -> HeapStats {
    self.records.iter().fold(HeapStats::default(), |mut stats, record| {
      stats.blocks += 1;
      stats.capacity_bytes += record.size;

      if record.in_use {
        stats.in_use += 1;
        stats.in_use_bytes += record.size;
      } else {
        stats.free += 1;
      }

      stats
    })
  }
}

//! # blockalloc - A First-Fit Block Allocator
//!
//! This crate provides a small **first-fit block allocator** that claims
//! memory straight from the program break with `sbrk`, or from any other
//! [`MemoryGrower`], and recycles freed blocks instead of returning them.
//!
//! ## Overview
//!
//! Every region the allocator ever claimed stays on its block list. A request
//! walks that list and takes the first free block big enough; only a miss
//! grows the heap.
//!
//! ```text
//!   First-Fit Reuse:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌───────┬─────────┬───────┬─────────┬───────────────────────────┐  │
//!   │   │ B0    │ B1      │ B2    │ B3      │      Unclaimed            │  │
//!   │   │ used  │ FREE    │ used  │ FREE    │                           │  │
//!   │   │ 100   │ 200     │ 100   │ 200     │                           │  │
//!   │   └───────┴─────────┴───────┴─────────┴───────────────────────────┘  │
//!   │                                       ▲                         ▲    │
//!   │                                       │                         │    │
//!   │                                  Last claim                 Program  │
//!   │                                                              Break   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   allocate(150): scan finds B3 (newest first) → reused, heap unchanged.
//!   allocate(300): nothing fits → sbrk(header + 300) → new block B4.
//! ```
//!
//! Free blocks are never split, merged, or handed back to the OS.
//!
//! ## Crate Structure
//!
//! ```text
//!   blockalloc
//!   ├── align      - Word alignment (align!, checked_align)
//!   ├── block      - Block header and record (internal)
//!   ├── grower     - MemoryGrower trait, Sbrk and RegionGrower
//!   ├── error      - AllocError
//!   └── allocator  - BlockAllocator and Allocation handles
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blockalloc::BlockAllocator;
//!
//! let mut allocator = BlockAllocator::new();
//!
//! let buffer = allocator.allocate(64)?;
//! allocator.bytes_mut(&buffer)?.fill(0x2A);
//!
//! let buffer = allocator.resize(Some(buffer), 128)?;
//! assert!(allocator.bytes(&buffer)?[..64].iter().all(|&b| b == 0x2A));
//!
//! allocator.free(Some(buffer))?;
//! # Ok::<(), blockalloc::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! Each claimed region starts with a small header naming its owner and its
//! slot in the record table:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ owner: id       │  │  ┌──────────────────────────┐  │
//!   │  │ index: slot     │  │  │     size bytes usable    │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │      HEADER_SIZE      │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Allocation::as_ptr()
//! ```
//!
//! Size and in-use state live in the allocator's own table, and callers hold
//! an [`Allocation`] handle rather than a bare pointer. A handle remembers the
//! generation of its block, so double frees, use after free and handles from
//! another allocator come back as [`AllocError`]s instead of corrupting the
//! table.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: wrap it in a lock to share it
//! - **No coalescing or splitting**: fragmentation is unbounded
//! - **Never shrinks**: claimed memory is only reused, never released
//! - **Word alignment only**: no `Layout` alignment beyond `usize`
//! - **Unix-only** for [`Sbrk`]: requires `libc`

pub mod align;
mod allocator;
mod block;
mod error;
mod grower;

#[cfg(test)]
mod tests_prop;

pub use allocator::{Allocation, AllocatorOptions, BlockAllocator, HeapStats, SearchMode};
pub use block::HEADER_SIZE;
pub use error::AllocError;
pub use grower::{MemoryGrower, RegionGrower, Sbrk};

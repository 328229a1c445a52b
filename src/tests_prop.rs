#![cfg(test)]
//! Property tests: live allocations never overlap or clobber each other, and
//! freed capacity is reused before the heap grows.

use proptest::{prelude::*, sample::Index};

use crate::{
  Allocation, SearchMode,
  allocator::tests::{assert_disjoint, region_allocator},
};

fn arb_search_mode() -> impl Strategy<Value = SearchMode> {
  prop_oneof![Just(SearchMode::NewestFirst), Just(SearchMode::OldestFirst)]
}

proptest! {
  #[test]
  fn live_allocations_keep_their_bytes(
    mode in arb_search_mode(),
    ops in prop::collection::vec((any::<bool>(), 1usize..256, any::<Index>()), 1..64),
  ) {
    let mut allocator = region_allocator(64 * 1024, mode);
    let mut live: Vec<(Allocation, u8)> = Vec::new();

    for (step, (allocate, size, victim)) in ops.into_iter().enumerate() {
      if allocate || live.is_empty() {
        let tag = step as u8;
        let allocation = allocator.allocate(size).unwrap();
        allocator.bytes_mut(&allocation).unwrap().fill(tag);
        live.push((allocation, tag));
      } else {
        let (allocation, _) = live.swap_remove(victim.index(live.len()));
        prop_assert_eq!(allocator.free(Some(allocation)), Ok(()));
      }
    }

    let handles: Vec<Allocation> = live.iter().map(|(allocation, _)| *allocation).collect();
    assert_disjoint(&handles);

    for (allocation, tag) in &live {
      prop_assert!(allocator.bytes(allocation).unwrap().iter().all(|b| b == tag));
    }
    prop_assert_eq!(allocator.stats().in_use, live.len());
  }

  #[test]
  fn fitting_request_reuses_freed_block(
    mode in arb_search_mode(),
    sizes in prop::collection::vec(1usize..512, 1..16),
    pick in any::<Index>(),
    shrink in 0usize..512,
  ) {
    let mut allocator = region_allocator(64 * 1024, mode);

    let allocations: Vec<Allocation> = sizes.iter().map(|&size| allocator.allocate(size).unwrap()).collect();
    let freed = allocations[pick.index(allocations.len())];
    allocator.free(Some(freed)).unwrap();

    let blocks = allocator.stats().blocks;
    let request = freed.len() - shrink % freed.len();
    let reused = allocator.allocate(request).unwrap();

    prop_assert_eq!(reused.as_ptr(), freed.as_ptr());
    prop_assert_eq!(allocator.stats().blocks, blocks);
    prop_assert_eq!(allocator.stats().free, 0);
  }
}

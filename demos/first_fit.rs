use std::io::Read;

use blockalloc::{AllocError, Allocation, BlockAllocator, HEADER_SIZE};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_alloc(
  allocator: &BlockAllocator,
  allocation: &Allocation,
) -> Result<(), AllocError> {
  println!(
    "Allocated {} bytes (block capacity {}, header {}), address = {:?}, program break = {:?}",
    allocation.len(),
    allocator.capacity(allocation)?,
    HEADER_SIZE,
    allocation.as_ptr(),
    unsafe { sbrk(0) }
  );
  Ok(())
}

fn main() -> Result<(), AllocError> {
  let mut allocator = BlockAllocator::new();

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Four blocks in an alternating 100/200 pattern. Each one is a miss
  //    and moves the break.
  // --------------------------------------------------------------------
  println!("\n[1] Allocate 100, 200, 100, 200 bytes");
  let mut blocks = Vec::new();
  for (i, size) in [100, 200, 100, 200].into_iter().enumerate() {
    let allocation = allocator.allocate(size)?;
    allocator.bytes_mut(&allocation)?.fill(i as u8 + 1);
    print_alloc(&allocator, &allocation)?;
    blocks.push(allocation);
  }

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Free the 1st and 3rd blocks. The break does not move.
  // --------------------------------------------------------------------
  allocator.free(Some(blocks[0]))?;
  allocator.free(Some(blocks[2]))?;
  println!("\n[2] Freed blocks at {:?} and {:?}", blocks[0].as_ptr(), blocks[2].as_ptr());
  print_program_break("after free");
  println!("[2] {:?}", allocator.stats());

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) 50 and 80 bytes both fit in the freed 100-byte blocks.
  // --------------------------------------------------------------------
  println!("\n[3] Allocate 50 and 80 bytes (check reuse of freed blocks)");
  for size in [50, 80] {
    let allocation = allocator.allocate(size)?;
    print_alloc(&allocator, &allocation)?;

    let reused = [blocks[0], blocks[2]].iter().any(|freed| freed.as_ptr() == allocation.as_ptr());
    println!(
      "[3] {}; first byte left by previous owner = {}",
      if reused { "Reused a freed block" } else { "Allocated somewhere else" },
      allocator.bytes(&allocation)?[0]
    );
  }

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Grow the 2nd block past its capacity: data moves to a new block.
  // --------------------------------------------------------------------
  let grown = allocator.resize(Some(blocks[1]), 400)?;
  println!("\n[4] Resize 200 -> 400 bytes");
  print_alloc(&allocator, &grown)?;
  println!(
    "[4] Moved from {:?}; first 200 bytes preserved = {}",
    blocks[1].as_ptr(),
    allocator.bytes(&grown)?[..200].iter().all(|&b| b == 2)
  );

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Misuse is reported, not silently absorbed.
  // --------------------------------------------------------------------
  match allocator.free(Some(blocks[1])) {
    Err(err) => println!("\n[5] Second free of the moved block rejected: {}", err),
    Ok(()) => println!("\n[5] Second free unexpectedly accepted"),
  }
  match allocator.zero_allocate(usize::MAX, 2) {
    Err(err) => println!("[5] zero_allocate(usize::MAX, 2) rejected: {}", err),
    Ok(_) => println!("[5] zero_allocate(usize::MAX, 2) unexpectedly succeeded"),
  }

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) A large block to observe heap growth.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");

  let big = allocator.zero_allocate(64, 1024)?;
  println!("\n[6] Allocate zeroed 64 KiB block");
  print_alloc(&allocator, &big)?;

  print_program_break("after large alloc");
  println!("[6] {:?}", allocator.stats());

  println!("\n[7] End of example. Process will exit and the OS will reclaim all memory.");
  Ok(())
}

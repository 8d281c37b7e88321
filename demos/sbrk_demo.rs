use std::io::Read;

use libc::sbrk;
use rallocator::{Allocator, SbrkHeap};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_alloc(what: &str, bytes: usize, addr: *mut u8) {
  println!(
    "{}: requested {} bytes, address = {:?}, program break = {:?}",
    what,
    bytes,
    addr,
    unsafe { sbrk(0) },
  );
}

fn main() {
  // Our segregated-fit allocator over the real sbrk-backed heap.
  let mut allocator = Allocator::new(SbrkHeap::new());

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 0) Bring the heap to its initial state: prologue, epilogue, and one
    //    CHUNKSIZE-sized free block.
    // --------------------------------------------------------------------
    allocator.init().expect("failed to reserve the initial heap");
    println!("\n[0] Heap initialized");
    print_program_break("after init");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate space for a u32 (4 bytes).
    // --------------------------------------------------------------------
    let first_block = allocator.alloc(4).expect("allocation failed");
    println!("\n[1] Allocate u32");
    print_alloc("alloc(4)", 4, first_block);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes.
    //    Shows how the classifier rounds an "odd-sized" request onto its
    //    canonical ladder step.
    // --------------------------------------------------------------------
    let second_block = allocator.alloc(12).expect("allocation failed");
    println!("\n[2] Allocate [u8; 12]");
    print_alloc("alloc(12)", 12, second_block);

    std::ptr::write_bytes(second_block, 0xAB, 12);
    println!("[2] Initialized second block with 0xAB");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Allocate a u64 to confirm doubleword alignment.
    // --------------------------------------------------------------------
    let third_block = allocator.alloc(8).expect("allocation failed");
    println!("\n[3] Allocate u64 (observe alignment)");
    print_alloc("alloc(8)", 8, third_block);

    let third_ptr = third_block as *mut u64;
    third_ptr.write(0x1122334455667788);
    println!("[3] Value written = 0x{:X}", third_ptr.read());

    let addr_third = third_block as usize;
    println!(
      "[3] Address = {:#X}, addr % D = {}",
      addr_third,
      addr_third % rallocator::align::DWORD
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate an array of 16 u16s (32 bytes) to force more movement.
    // --------------------------------------------------------------------
    let fourth_block = allocator.alloc(32).expect("allocation failed");
    println!("\n[4] Allocate [u16; 16]");
    print_alloc("alloc(32)", 32, fourth_block);

    let fourth_ptr = fourth_block as *mut u16;
    for i in 0..16 {
      fourth_ptr.add(i).write(i as u16);
    }
    println!("[4] Wrote 0..15 into the u16 array");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Free the first block.
    //
    //    Unlike a bump allocator, this one tracks freed blocks on a
    //    segregated free list and will reuse this one if a later request
    //    fits its bucket.
    // --------------------------------------------------------------------
    allocator.free(first_block);
    println!("\n[5] Freed first_block at {:?}", first_block);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Allocate a small block (2 bytes) to see the freed block reused.
    // --------------------------------------------------------------------
    let fifth_block = allocator.alloc(2).expect("allocation failed");
    println!("\n[6] Allocate [u8; 2] (check reuse of freed block)");
    print_alloc("alloc(2)", 2, fifth_block);

    println!(
      "[6] fifth_block == first_block? {}",
      if fifth_block == first_block {
        "Yes, the freed block was reused"
      } else {
        "No, it allocated somewhere else"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) Allocate a large block to observe heap growth, then grow it
    //    further in place with realloc.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = allocator.alloc(64 * 1024).expect("allocation failed");
    println!("\n[7] Allocate large 64 KiB block");
    print_alloc("alloc(64 * 1024)", 64 * 1024, big_block);

    print_program_break("after large alloc");
    block_until_enter_pressed();

    let grown = allocator.realloc(big_block, 128 * 1024).expect("realloc failed");
    println!("\n[7b] realloc to 128 KiB -> {:?}", grown);
    print_program_break("after realloc");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 8) Run the consistency checker and end the demo.
    // --------------------------------------------------------------------
    println!("\n[8] checkheap() -> {}", allocator.checkheap());
    println!("End of example. Process will exit and the OS will reclaim all memory.");
  }
}

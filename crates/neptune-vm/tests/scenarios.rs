//! End-to-end scenarios exercising the assembler, CPU, and I/O devices
//! together through the `Vm` facade (spec.md §8).

use neptune_core::{ExecError, MemoryMap};
use neptune_vm::{Vm, VmError};

#[test]
fn countdown_loop_drives_r1_to_zero_and_stores_it() {
    let mut vm = Vm::new();
    let src = "
        MOVI r1, 5
        MOVI r2, 1
        MOVI r3, 0
        loop: SUB r1, r2
        CMP r1, r3
        JNZ loop
        STORI r1, 0x00004100
        HLT
    ";
    vm.assemble_and_load(src, 0x2000).unwrap();
    vm.run().unwrap();

    assert!(vm.is_halted());
    assert_eq!(vm.register_read(1).unwrap(), 0);
    assert_eq!(vm.bus_read_word(0x0000_4100).unwrap(), 0);
    assert!(vm.flags().z);
}

#[test]
fn stack_round_trip_restores_sp_after_push_pop() {
    let mut vm = Vm::new();
    let sp0 = vm.sp();
    let src = "
        MOVI r0, 0xDEADBEEF
        PUSH r0
        MOVI r0, 0
        POP r1
        HLT
    ";
    vm.assemble_and_load(src, 0x2000).unwrap();
    vm.run().unwrap();

    assert_eq!(vm.register_read(1).unwrap(), 0xDEAD_BEEF);
    assert_eq!(vm.sp(), sp0);
}

#[test]
fn heap_allocation_is_monotonic_then_collides_with_the_stack() {
    let mut vm = Vm::new();
    const CHUNK: u32 = 64;
    let mut addresses = Vec::new();
    loop {
        match vm.allocate_heap(CHUNK) {
            Ok(addr) => addresses.push(addr),
            Err(ExecError::HeapStackCollision { .. }) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(!addresses.is_empty());
    for addr in &addresses {
        assert_eq!(addr % 4, 0);
    }
    assert!(addresses.windows(2).all(|w| w[1] > w[0]));
    assert!(matches!(vm.allocate_heap(CHUNK), Err(ExecError::HeapStackCollision { .. })));
}

#[test]
fn syscall_dispatch_runs_the_rom_handler_and_restores_sp() {
    let mut vm = Vm::new();
    let rom_src = "syscall 1 info:\nMOVI r1, 0x1234\nRET\n";
    vm.assemble_and_load(rom_src, 0x0000_0020).unwrap();

    let sp0 = vm.sp();
    let ram_src = "MOVI r0, 1\nSYSCALL\nHLT\n";
    vm.assemble_and_load(ram_src, 0x2000).unwrap();
    vm.run().unwrap();

    assert_eq!(vm.register_read(1).unwrap(), 0x1234);
    assert_eq!(vm.sp(), sp0);
}

#[test]
fn division_by_zero_is_fatal_and_leaves_the_register_unchanged() {
    let mut vm = Vm::new();
    let src = "MOVI r1, 10\nMOVI r2, 0\nDIV r1, r2\nHLT\n";
    vm.assemble_and_load(src, 0x2000).unwrap();

    let err = loop {
        match vm.step() {
            Ok(()) if vm.is_halted() => panic!("expected DivByZero before HLT"),
            Ok(()) => continue,
            Err(e) => break e,
        }
    };

    assert_eq!(err, VmError::Exec(ExecError::DivByZero));
    assert_eq!(vm.register_read(1).unwrap(), 10);
}

#[test]
fn keyboard_buffer_drains_in_fifo_order_with_oldest_dropped_overflow() {
    let mut vm = Vm::new();
    let kbd = vm.keyboard();
    kbd.enqueue(b'A');
    kbd.enqueue(b'B');
    kbd.enqueue(b'C');

    let base = MemoryMap::canonical().io_base(); // keyboard is the first device registered there
    assert_eq!(vm.bus_read_word(base).unwrap(), u32::from(b'A')); // FIRST_CHAR
    assert_eq!(vm.bus_read_word(base + 4).unwrap(), 1); // BUFFER_READY
    assert_eq!(vm.bus_read_word(base + 8).unwrap(), u32::from(b'C')); // CURRENT_CHAR

    vm.bus_write_word(base + 12, 1).unwrap(); // CONTROL: consume oldest
    assert_eq!(vm.bus_read_word(base).unwrap(), u32::from(b'B'));
    assert_eq!(vm.bus_read_word(base + 4).unwrap(), 1);

    vm.bus_write_word(base + 12, 1).unwrap();
    vm.bus_write_word(base + 12, 1).unwrap();
    assert_eq!(vm.bus_read_word(base).unwrap(), 0);
    assert_eq!(vm.bus_read_word(base + 4).unwrap(), 0);
    assert_eq!(vm.bus_read_word(base + 8).unwrap(), 0);
}

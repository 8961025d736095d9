//! Exercises the facade's supplemented accessors (snapshot, disassembly,
//! VRAM dump) that sit alongside the core public API of spec.md §6.

use neptune_vm::Vm;

#[test]
fn snapshot_matches_live_accessors_after_a_few_steps() {
    let mut vm = Vm::new();
    vm.assemble_and_load("MOVI r4, 7\nMOVI r5, 9\nADD r4, r5\nHLT\n", 0x2000).unwrap();
    vm.run().unwrap();

    let snap = vm.snapshot();
    assert!(snap.halted);
    assert_eq!(snap.general[4], 16);
    assert_eq!(snap.pc, vm.pc());
    assert_eq!(snap.sp, vm.sp());
    assert_eq!(snap.hp, vm.hp());
    assert_eq!(snap.flags, vm.flags());
}

#[test]
fn disassemble_at_decodes_without_advancing_pc() {
    let mut vm = Vm::new();
    let entry = vm.assemble_and_load("MOVI r2, 0x99\nHLT\n", 0x2000).unwrap();
    let pc0 = vm.pc();
    assert_eq!(pc0, entry);

    let (text, next) = vm.disassemble_at(pc0).unwrap();
    assert_eq!(text, "movi r2, 0x99");
    assert_eq!(next, pc0 + 8); // RegImm form spans two words
    assert_eq!(vm.pc(), pc0, "disassembly must not mutate PC");
}

#[test]
fn vram_snapshot_reflects_pixels_written_through_the_bus() {
    let mut vm = Vm::new();
    let vram_base = vm.memory_map().vram_base();
    vm.bus_write_word(vram_base, 0x11223344).unwrap(); // pixel (0, 0)
    vm.bus_write_word(vram_base + 4, 0xAABBCCDD).unwrap(); // pixel (1, 0)

    let snap = vm.vram_snapshot();
    assert_eq!(&snap[0..4], &0x11223344u32.to_le_bytes());
    assert_eq!(&snap[4..8], &0xAABBCCDDu32.to_le_bytes());
}

//! The public Neptune VM facade (spec.md §6): CPU, I/O bus, and assembler
//! wired together behind one handle.

use neptune_asm::Assembler;
use neptune_core::{ExecError, Flags, MemoryMap, VRAM_HEIGHT, VRAM_WIDTH};
use neptune_cpu::{Cpu, CpuSnapshot, DEFAULT_REGISTER_COUNT};
use neptune_io::{ConsoleOut, IoBus, Keyboard, KeyboardHandle, Timer};
use neptune_isa::{disassemble_one, InstructionSet};

use crate::error::VmError;

/// A running Neptune machine: CPU + bus + the standard keyboard/console/timer
/// devices, plus an assembler sharing the same instruction set and memory
/// map so assembled programs and executed opcodes never drift apart.
pub struct Vm {
    cpu: Cpu<IoBus>,
    assembler: Assembler,
    keyboard: KeyboardHandle,
    map: MemoryMap,
    /// Kept separately from the CPU's own copy so `disassemble_at` can read
    /// memory through `&mut self` without borrowing the CPU's instruction set.
    instruction_set: InstructionSet,
}

impl Vm {
    /// Builds a VM with the canonical memory map, instruction set, and
    /// register count, and the standard keyboard/console-out/timer devices
    /// registered in the I/O window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(MemoryMap::canonical(), InstructionSet::canonical(), DEFAULT_REGISTER_COUNT)
    }

    /// Builds a VM from an explicit memory map, instruction set, and register
    /// count — the `new_cpu(memory_map, instruction_set, reg_count)` entry
    /// point of spec.md §6, generalized to also hand the same instruction
    /// set to the assembler.
    #[must_use]
    pub fn with_parts(map: MemoryMap, instruction_set: InstructionSet, register_count: usize) -> Self {
        let mut io = IoBus::new(map.io_base());
        let keyboard = Keyboard::new();
        let keyboard_handle = keyboard.handle();
        io.register(keyboard);
        io.register(ConsoleOut::new());
        io.register(Timer::new());

        let assembler = Assembler::new(map, instruction_set.clone());
        let cpu = Cpu::new(map, io, instruction_set.clone(), register_count);
        Self { cpu, assembler, keyboard: keyboard_handle, map, instruction_set }
    }

    /// The memory-region layout this VM was built with.
    #[must_use]
    pub const fn memory_map(&self) -> MemoryMap {
        self.map
    }

    /// A copy of every register, flag, and the halt state.
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    pub fn step(&mut self) -> Result<(), VmError> {
        self.cpu.step().map_err(VmError::from)
    }

    /// Runs `step()` until halted or a step fails.
    pub fn run(&mut self) -> Result<(), VmError> {
        while !self.cpu.is_halted() {
            self.step()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.cpu.flags()
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }

    #[must_use]
    pub fn sp(&self) -> u32 {
        self.cpu.sp()
    }

    #[must_use]
    pub fn hp(&self) -> u32 {
        self.cpu.hp()
    }

    pub fn register_read(&self, index: u32) -> Result<u32, ExecError> {
        self.cpu.register_read(index)
    }

    pub fn register_write(&mut self, index: u32, value: u32) -> Result<(), ExecError> {
        self.cpu.register_write(index, value)
    }

    pub fn bus_read_byte(&mut self, address: u32) -> Result<u8, ExecError> {
        self.cpu.bus_mut().read_byte(address)
    }

    pub fn bus_write_byte(&mut self, address: u32, value: u8) -> Result<(), ExecError> {
        self.cpu.bus_mut().write_byte(address, value)
    }

    pub fn bus_read_word(&mut self, address: u32) -> Result<u32, ExecError> {
        self.cpu.bus_mut().read_word(address)
    }

    pub fn bus_write_word(&mut self, address: u32, value: u32) -> Result<(), ExecError> {
        self.cpu.bus_mut().write_word(address, value)
    }

    /// Assembles `source` and loads it at `base_address`, then points PC at
    /// the resolved entry point.
    pub fn assemble_and_load(&mut self, source: &str, base_address: u32) -> Result<u32, VmError> {
        let entry = self.assembler.assemble_and_load(source, base_address, self.cpu.bus_mut())?;
        self.cpu.jump(entry);
        Ok(entry)
    }

    /// A handle the host input thread can clone and use to enqueue key
    /// events independently of this `Vm` (spec.md §5).
    #[must_use]
    pub fn keyboard(&self) -> KeyboardHandle {
        self.keyboard.clone()
    }

    /// Advances the timer device one tick; the host calls this on its own
    /// cadence (spec.md §5, "any rate ≥ 1 kHz target").
    pub fn tick_timer(&mut self) {
        self.cpu.bus_mut().io_mut().tick();
    }

    /// Bump-allocates `n` bytes from the heap, 4-byte aligned (spec.md §4.7).
    pub fn allocate_heap(&mut self, n: u32) -> Result<u32, ExecError> {
        self.cpu.allocate_heap(n)
    }

    /// Decodes the instruction at `address` to assembly-like text, returning
    /// it along with the address of the instruction that follows. Used by
    /// `neptune-cli --trace`.
    pub fn disassemble_at(&mut self, address: u32) -> Result<(String, u32), ExecError> {
        let word0 = self.cpu.bus_mut().read_word(address)?;
        let bus = self.cpu.bus_mut();
        let decoded = self.instruction_set.decode(word0, || bus.read_word(address + 4))?;
        let next = address + u32::from(decoded.word_count) * 4;
        Ok((disassemble_one(&self.instruction_set, decoded), next))
    }

    /// Snapshots the whole 128x128 RGBA framebuffer, row-major, for offline
    /// inspection without a renderer.
    pub fn vram_snapshot(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity((VRAM_WIDTH * VRAM_HEIGHT * 4) as usize);
        for y in 0..VRAM_HEIGHT {
            for x in 0..VRAM_WIDTH {
                let rgba = self.cpu.bus_mut().get_pixel(x, y).unwrap_or(0);
                out.extend_from_slice(&rgba.to_le_bytes());
            }
        }
        out
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

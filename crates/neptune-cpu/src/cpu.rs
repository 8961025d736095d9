//! Fetch-decode-execute loop and CPU-owned state (spec.md §4.7).

use neptune_core::{ExecError, Flags, IoPort, MemoryBus, MemoryMap};
use neptune_isa::{ExecContext, InstructionSet};

use crate::registers::RegisterFile;
use crate::snapshot::CpuSnapshot;

/// A Neptune CPU: register file, flags, halt state, its memory bus, and the
/// instruction set it executes against.
///
/// Owns the bus outright rather than borrowing it, matching the
/// single-threaded ownership model of spec.md §5: one thread drives `step()`
/// and nothing else touches CPU state concurrently.
pub struct Cpu<IO: IoPort> {
    registers: RegisterFile,
    flags: Flags,
    halt: bool,
    bus: MemoryBus<IO>,
    instruction_set: InstructionSet,
}

impl<IO: IoPort> Cpu<IO> {
    #[must_use]
    pub fn new(map: MemoryMap, io: IO, instruction_set: InstructionSet, register_count: usize) -> Self {
        let mut registers = RegisterFile::new(register_count);
        registers.pc = map.program_start();
        registers.sp = map.stack_start();
        registers.hp = map.heap_start();
        Self { registers, flags: Flags::new(), halt: false, bus: MemoryBus::new(map, io), instruction_set }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halt
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.registers.pc
    }

    #[must_use]
    pub fn sp(&self) -> u32 {
        self.registers.sp
    }

    #[must_use]
    pub fn hp(&self) -> u32 {
        self.registers.hp
    }

    pub fn register_read(&self, index: u32) -> Result<u32, ExecError> {
        self.registers.read(index)
    }

    pub fn register_write(&mut self, index: u32, value: u32) -> Result<(), ExecError> {
        self.registers.write(index, value)
    }

    #[must_use]
    pub fn bus(&self) -> &MemoryBus<IO> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MemoryBus<IO> {
        &mut self.bus
    }

    /// A copy of every register, flag, and the halt state, for inspection
    /// without holding a borrow of the CPU (spec.md §6).
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            general: self.registers.general().to_vec(),
            pc: self.registers.pc,
            sp: self.registers.sp,
            hp: self.registers.hp,
            flags: self.flags,
            halted: self.halt,
        }
    }

    /// Unconditional jump; used by the host to set an initial PC and by
    /// `assemble_and_load`'s entry-point policy.
    pub fn jump(&mut self, addr: u32) {
        self.registers.pc = addr;
    }

    /// `SP -= 4; collision check; bus.write_word(SP, v)` (spec.md §4.7).
    ///
    /// SP is decremented before the collision check and is left decremented
    /// on failure — the step has failed and the host is expected to stop.
    pub fn push(&mut self, value: u32) -> Result<(), ExecError> {
        let new_sp = self.registers.sp.wrapping_sub(4);
        if self.registers.hp >= new_sp {
            self.registers.sp = new_sp;
            return Err(ExecError::HeapStackCollision { hp: self.registers.hp, sp: new_sp });
        }
        self.registers.sp = new_sp;
        self.bus.write_word(new_sp, value)
    }

    /// `v = bus.read_word(SP); SP += 4; return v` (spec.md §4.7).
    pub fn pop(&mut self) -> Result<u32, ExecError> {
        let v = self.bus.read_word(self.registers.sp)?;
        self.registers.sp = self.registers.sp.wrapping_add(4);
        Ok(v)
    }

    /// 4-byte-aligned bump allocation; fails if the new HP would meet or
    /// pass SP (spec.md §4.7, §8 scenario 3).
    pub fn allocate_heap(&mut self, n: u32) -> Result<u32, ExecError> {
        let aligned = n.wrapping_add(3) & !3;
        let new_hp = self.registers.hp.wrapping_add(aligned);
        if new_hp >= self.registers.sp {
            return Err(ExecError::HeapStackCollision { hp: new_hp, sp: self.registers.sp });
        }
        let addr = self.registers.hp;
        self.registers.hp = new_hp;
        Ok(addr)
    }

    /// Fetch, decode, and execute one instruction at PC.
    ///
    /// Per spec.md §9's resolved open question, execution errors propagate
    /// to the caller rather than silently halting the CPU; the host decides
    /// whether to keep stepping.
    pub fn step(&mut self) -> Result<(), ExecError> {
        if self.halt {
            return Ok(());
        }
        let pc = self.registers.pc;
        let word0 = self.bus.read_word(pc)?;
        self.registers.pc = pc.wrapping_add(4);

        let decoded = {
            let bus = &mut self.bus;
            let regs = &mut self.registers;
            self.instruction_set.decode(word0, || {
                let addr = regs.pc;
                let w = bus.read_word(addr)?;
                regs.pc = addr.wrapping_add(4);
                Ok(w)
            })?
        };

        let exec_fn = self
            .instruction_set
            .lookup_opcode(decoded.opcode)
            .map(|def| def.exec)
            .ok_or(ExecError::UnknownOpcode { opcode: decoded.opcode })?;
        exec_fn(self, decoded.r_dest, decoded.r_src_or_shift, decoded.imm)
    }
}

impl<IO: IoPort> ExecContext for Cpu<IO> {
    fn register_read(&self, index: u32) -> Result<u32, ExecError> {
        self.registers.read(index)
    }

    fn register_write(&mut self, index: u32, value: u32) -> Result<(), ExecError> {
        self.registers.write(index, value)
    }

    fn flags(&self) -> Flags {
        self.flags
    }

    fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    fn bus_read_byte(&mut self, address: u32) -> Result<u8, ExecError> {
        self.bus.read_byte(address)
    }

    fn bus_write_byte(&mut self, address: u32, value: u8) -> Result<(), ExecError> {
        self.bus.write_byte(address, value)
    }

    fn bus_read_word(&mut self, address: u32) -> Result<u32, ExecError> {
        self.bus.read_word(address)
    }

    fn bus_write_word(&mut self, address: u32, value: u32) -> Result<(), ExecError> {
        self.bus.write_word(address, value)
    }

    fn bus_is_mapped(&self, address: u32) -> bool {
        self.bus.is_mapped(address)
    }

    fn memory_map(&self) -> &MemoryMap {
        self.bus.map()
    }

    fn pc(&self) -> u32 {
        self.registers.pc
    }

    fn set_pc(&mut self, pc: u32) {
        self.registers.pc = pc;
    }

    fn push(&mut self, value: u32) -> Result<(), ExecError> {
        Cpu::push(self, value)
    }

    fn pop(&mut self) -> Result<u32, ExecError> {
        Cpu::pop(self)
    }

    fn halt(&mut self) {
        self.halt = true;
    }
}

#[cfg(test)]
mod tests {
    use neptune_core::IoPort;

    use super::*;

    struct NullIo;
    impl IoPort for NullIo {
        fn read_byte(&mut self, _address: u32) -> u8 {
            0
        }
        fn write_byte(&mut self, _address: u32, _value: u8) {}
    }

    fn cpu() -> Cpu<NullIo> {
        Cpu::new(MemoryMap::canonical(), NullIo, InstructionSet::canonical(), 32)
    }

    #[test]
    fn initial_state_matches_memory_map() {
        let c = cpu();
        let map = MemoryMap::canonical();
        assert_eq!(c.pc(), map.program_start());
        assert_eq!(c.sp(), map.stack_start());
        assert_eq!(c.hp(), map.heap_start());
        assert!(!c.is_halted());
    }

    #[test]
    fn push_pop_round_trips_and_restores_sp() {
        let mut c = cpu();
        let sp0 = c.sp();
        c.push(0xDEAD_BEEF).unwrap();
        assert_eq!(c.sp(), sp0 - 4);
        let v = c.pop().unwrap();
        assert_eq!(v, 0xDEAD_BEEF);
        assert_eq!(c.sp(), sp0);
    }

    #[test]
    fn heap_allocation_is_word_aligned_and_monotonic() {
        let mut c = cpu();
        let a = c.allocate_heap(5).unwrap(); // rounds up to 8
        let b = c.allocate_heap(4).unwrap();
        assert_eq!(a % 4, 0);
        assert_eq!(b, a + 8);
    }

    #[test]
    fn heap_allocation_fails_once_it_meets_the_stack() {
        let mut c = cpu();
        let remaining = c.sp() - c.hp();
        assert!(c.allocate_heap(remaining).is_err());
    }

    #[test]
    fn step_executes_movi_then_advances_pc_by_eight() {
        let mut c = cpu();
        let pc0 = c.pc();
        let (word0, word1) = InstructionSet::canonical().encode("MOVI", 1, 0, 42).unwrap();
        c.bus_mut().write_word(pc0, word0).unwrap();
        c.bus_mut().write_word(pc0 + 4, word1.unwrap()).unwrap();
        c.step().unwrap();
        assert_eq!(c.register_read(1).unwrap(), 42);
        assert_eq!(c.pc(), pc0 + 8);
    }

    #[test]
    fn hlt_sets_halted_and_further_steps_are_no_ops() {
        let mut c = cpu();
        let pc0 = c.pc();
        let (word0, _) = InstructionSet::canonical().encode("HLT", 0, 0, 0).unwrap();
        c.bus_mut().write_word(pc0, word0).unwrap();
        c.step().unwrap();
        assert!(c.is_halted());
        c.step().unwrap();
        assert_eq!(c.pc(), pc0 + 4, "halted CPU must not advance PC on further steps");
    }

    #[test]
    fn snapshot_reflects_writes_and_does_not_alias_live_state() {
        let mut c = cpu();
        c.register_write(3, 0xABCD).unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.general[3], 0xABCD);
        assert_eq!(snap.pc, c.pc());
        assert_eq!(snap.sp, c.sp());
        assert_eq!(snap.hp, c.hp());
        assert!(!snap.halted);

        c.register_write(3, 0).unwrap();
        assert_eq!(snap.general[3], 0xABCD, "snapshot must be a copy, not a view");
    }

    #[test]
    fn div_by_zero_leaves_register_unchanged() {
        let mut c = cpu();
        c.register_write(1, 10).unwrap();
        c.register_write(2, 0).unwrap();
        let pc0 = c.pc();
        let (word0, _) = InstructionSet::canonical().encode("DIV", 1, 2, 0).unwrap();
        c.bus_mut().write_word(pc0, word0).unwrap();
        let err = c.step().unwrap_err();
        assert!(matches!(err, ExecError::DivByZero));
        assert_eq!(c.register_read(1).unwrap(), 10);
    }
}

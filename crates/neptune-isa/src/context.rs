//! Execution-time access to CPU and bus state, as seen from an instruction's
//! semantic action (spec.md §4.7).

use neptune_core::{ExecError, Flags, MemoryMap};

/// Everything an instruction's semantic action needs from the CPU it runs on.
///
/// `neptune-cpu` implements this for its own `Cpu` type; `neptune-isa` never
/// depends on `neptune-cpu` directly, which keeps the instruction set usable
/// on its own (e.g. by an assembler running a standalone encode/decode check).
pub trait ExecContext {
    fn register_read(&self, index: u32) -> Result<u32, ExecError>;
    fn register_write(&mut self, index: u32, value: u32) -> Result<(), ExecError>;

    fn flags(&self) -> Flags;
    fn set_flags(&mut self, flags: Flags);

    fn bus_read_byte(&mut self, address: u32) -> Result<u8, ExecError>;
    fn bus_write_byte(&mut self, address: u32, value: u8) -> Result<(), ExecError>;
    fn bus_read_word(&mut self, address: u32) -> Result<u32, ExecError>;
    fn bus_write_word(&mut self, address: u32, value: u32) -> Result<(), ExecError>;
    fn bus_is_mapped(&self, address: u32) -> bool;

    fn memory_map(&self) -> &MemoryMap;

    fn pc(&self) -> u32;
    fn set_pc(&mut self, pc: u32);

    fn push(&mut self, value: u32) -> Result<(), ExecError>;
    fn pop(&mut self) -> Result<u32, ExecError>;

    fn halt(&mut self);
}

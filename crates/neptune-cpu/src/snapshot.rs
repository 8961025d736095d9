//! A point-in-time copy of CPU-visible state, for inspection without
//! borrowing the CPU (spec.md §6 snapshot accessors). A concrete struct
//! rather than a dynamic query path, since only register/flag/PC/SP/HP
//! snapshots are needed here, not a generic dotted-path query protocol.

use neptune_core::Flags;

/// Registers, flags, and halt state as of the moment `Cpu::snapshot` was called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub general: Vec<u32>,
    pub pc: u32,
    pub sp: u32,
    pub hp: u32,
    pub flags: Flags,
    pub halted: bool,
}

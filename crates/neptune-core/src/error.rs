//! Execution-time error taxonomy (spec.md §7, "Execution-time" row).
//!
//! Every variant is fatal to the step that raised it; the VM does not catch
//! and resume these internally. Addresses are carried and formatted
//! hexadecimally so a caller can print them directly.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// A region access fell outside that region's `[base, base + size)`.
    AddressOutOfRange { address: u32 },
    /// An address fell outside ROM, RAM, VRAM, and the I/O window.
    InvalidAddress { address: u32 },
    /// A write was attempted against ROM through the normal bus path.
    RomWrite { address: u32 },
    /// A register index was not a general-purpose register or a PC/SP/HP alias.
    InvalidRegister { index: u32 },
    /// `push` would advance SP at or past HP.
    HeapStackCollision { hp: u32, sp: u32 },
    /// DIV/DIVI/MOD/MODI with a zero divisor.
    DivByZero,
    /// The fetched opcode byte has no registered instruction.
    UnknownOpcode { opcode: u8 },
    /// `SYSCALL`'s table-slot address fell outside ROM.
    SyscallOutOfRange { entry_addr: u32 },
    /// The syscall table slot for the requested number was 0.
    SyscallNotImplemented { number: u32 },
    /// The handler address in the syscall table is not inside any region.
    SyscallInvalidTarget { target: u32 },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange { address } => {
                write!(f, "address out of range: {address:#010X}")
            }
            Self::InvalidAddress { address } => {
                write!(f, "address not mapped to any region: {address:#010X}")
            }
            Self::RomWrite { address } => {
                write!(f, "write to read-only ROM at {address:#010X}")
            }
            Self::InvalidRegister { index } => {
                write!(f, "invalid register index: {index}")
            }
            Self::HeapStackCollision { hp, sp } => {
                write!(f, "heap/stack collision: HP={hp:#010X} SP={sp:#010X}")
            }
            Self::DivByZero => write!(f, "division by zero"),
            Self::UnknownOpcode { opcode } => {
                write!(f, "unknown opcode: {opcode:#04X}")
            }
            Self::SyscallOutOfRange { entry_addr } => {
                write!(f, "syscall table entry address out of ROM: {entry_addr:#010X}")
            }
            Self::SyscallNotImplemented { number } => {
                write!(f, "syscall {number} is not implemented")
            }
            Self::SyscallInvalidTarget { target } => {
                write!(f, "syscall handler address is not mapped: {target:#010X}")
            }
        }
    }
}

impl std::error::Error for ExecError {}

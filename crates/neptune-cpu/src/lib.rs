mod cpu;
mod registers;
mod snapshot;

pub use cpu::Cpu;
pub use registers::{RegisterFile, DEFAULT_REGISTER_COUNT, HP_INDEX, PC_INDEX, SP_INDEX};
pub use snapshot::CpuSnapshot;

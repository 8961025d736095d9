mod context;
mod disasm;
mod exec;
mod form;
mod set;

pub use context::ExecContext;
pub use disasm::disassemble_one;
pub use exec::ExecFn;
pub use form::OperandForm;
pub use set::{Decoded, InstructionDef, InstructionSet};

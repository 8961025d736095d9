//! Combined assembly-time/execution-time error type for the VM facade.

use std::fmt;

use neptune_asm::AsmError;
use neptune_core::ExecError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    Asm(AsmError),
    Exec(ExecError),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asm(e) => write!(f, "assembly error: {e}"),
            Self::Exec(e) => write!(f, "execution error: {e}"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<AsmError> for VmError {
    fn from(e: AsmError) -> Self {
        Self::Asm(e)
    }
}

impl From<ExecError> for VmError {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}

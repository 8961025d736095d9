//! Assembly-time error taxonomy (spec.md §4.8, §7).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    DuplicateLabel { label: String, line: usize },
    UnknownInstruction { mnemonic: String, line: usize },
    BadArgument { detail: String, line: usize },
    BadNumericLiteral { token: String, line: usize },
    DuplicateSyscall { number: u32, line: usize },
    ArrayOverflow { name: String, line: usize },
    ByteOutOfRange { value: i64, line: usize },
    MissingMain,
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLabel { label, line } => write!(f, "line {line}: duplicate label `{label}`"),
            Self::UnknownInstruction { mnemonic, line } => {
                write!(f, "line {line}: unknown instruction `{mnemonic}`")
            }
            Self::BadArgument { detail, line } => write!(f, "line {line}: bad argument: {detail}"),
            Self::BadNumericLiteral { token, line } => {
                write!(f, "line {line}: bad numeric literal `{token}`")
            }
            Self::DuplicateSyscall { number, line } => {
                write!(f, "line {line}: duplicate syscall number {number}")
            }
            Self::ArrayOverflow { name, line } => {
                write!(f, "line {line}: too many initializers for array `{name}`")
            }
            Self::ByteOutOfRange { value, line } => {
                write!(f, "line {line}: byte value {value} out of range -128..255")
            }
            Self::MissingMain => write!(f, "no `main` label and no explicit entry point"),
        }
    }
}

impl std::error::Error for AsmError {}

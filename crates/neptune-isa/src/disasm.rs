//! Textual disassembly, grounded on the same decode path `neptune-cpu` uses
//! (spec.md §4.6) so trace output always matches executed semantics.

use crate::form::OperandForm;
use crate::set::{Decoded, InstructionSet};

fn reg_name(index: u8) -> String {
    match index {
        252 => "pc".to_string(),
        253 => "sp".to_string(),
        254 => "hp".to_string(),
        n => format!("r{n}"),
    }
}

/// Render one decoded instruction as assembly-like text, e.g. `addi r3, 0x1234`.
#[must_use]
pub fn disassemble_one(set: &InstructionSet, decoded: Decoded) -> String {
    let Some(def) = set.lookup_opcode(decoded.opcode) else {
        return format!("<unknown opcode {:#04X}>", decoded.opcode);
    };
    let mnemonic = def.mnemonic.to_ascii_lowercase();
    match def.form {
        OperandForm::RegReg => format!("{mnemonic} {}, {}", reg_name(decoded.r_dest), reg_name(decoded.r_src_or_shift)),
        OperandForm::RegImm => format!("{mnemonic} {}, {:#X}", reg_name(decoded.r_dest), decoded.imm),
        OperandForm::RegShift => format!("{mnemonic} {}, {}", reg_name(decoded.r_dest), decoded.r_src_or_shift),
        OperandForm::Reg => format!("{mnemonic} {}", reg_name(decoded.r_dest)),
        OperandForm::Imm => format!("{mnemonic} {:#X}", decoded.imm),
        OperandForm::None => mnemonic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_reg_imm_form() {
        let set = InstructionSet::canonical();
        let (word0, word1) = set.encode("MOVI", 2, 0, 5).unwrap();
        let decoded = set.decode(word0, || Ok(word1.unwrap())).unwrap();
        assert_eq!(disassemble_one(&set, decoded), "movi r2, 0x5");
    }

    #[test]
    fn formats_no_operand_form() {
        let set = InstructionSet::canonical();
        let (word0, _) = set.encode("HLT", 0, 0, 0).unwrap();
        let decoded = set.decode(word0, || Ok(0)).unwrap();
        assert_eq!(disassemble_one(&set, decoded), "hlt");
    }

    #[test]
    fn formats_register_aliases() {
        let set = InstructionSet::canonical();
        let (word0, _) = set.encode("PUSH", 253, 0, 0).unwrap();
        let decoded = set.decode(word0, || Ok(0)).unwrap();
        assert_eq!(disassemble_one(&set, decoded), "push sp");
    }
}

//! The instruction set: name/opcode tables and semantic dispatch (spec.md §4.6, §9).

use neptune_core::ExecError;

use crate::exec::{self, ExecFn};
use crate::form::OperandForm;

/// One registered instruction: its name, operand shape, and semantic action.
///
/// Opcode values are assigned by *registration order*, starting at 1, never
/// by a fixed enum discriminant — this is what lets `register` add new
/// mnemonics at runtime while keeping the canonical set's opcodes stable.
#[derive(Clone, Copy)]
pub struct InstructionDef {
    pub mnemonic: &'static str,
    pub form: OperandForm,
    pub exec: ExecFn,
}

/// A decoded instruction, ready to execute or print.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    pub opcode: u8,
    pub r_dest: u8,
    pub r_src_or_shift: u8,
    pub imm: u32,
    pub word_count: u8,
}

/// The set of instructions a CPU understands, keyed by opcode.
///
/// Built once via `canonical()` (or `new()` + `register` for a custom set)
/// and then treated as immutable: opcode assignment must be stable across a
/// VM's lifetime (spec.md §9).
#[derive(Clone)]
pub struct InstructionSet {
    defs: Vec<InstructionDef>,
}

impl InstructionSet {
    #[must_use]
    pub fn new() -> Self {
        Self { defs: Vec::new() }
    }

    /// Register a mnemonic, assigning it the next opcode in sequence.
    pub fn register(&mut self, mnemonic: &'static str, form: OperandForm, exec: ExecFn) {
        self.defs.push(InstructionDef { mnemonic, form, exec });
    }

    #[must_use]
    pub fn lookup_opcode(&self, opcode: u8) -> Option<&InstructionDef> {
        self.defs.get(usize::from(opcode).wrapping_sub(1))
    }

    #[must_use]
    pub fn lookup_mnemonic(&self, mnemonic: &str) -> Option<(u8, &InstructionDef)> {
        self.defs
            .iter()
            .position(|d| d.mnemonic.eq_ignore_ascii_case(mnemonic))
            .map(|i| (u8::try_from(i + 1).expect("instruction set fits in a u8 opcode"), &self.defs[i]))
    }

    pub fn decode(&self, word0: u32, fetch_word1: impl FnOnce() -> Result<u32, ExecError>) -> Result<Decoded, ExecError> {
        let opcode = (word0 & 0xFF) as u8;
        let def = self.lookup_opcode(opcode).ok_or(ExecError::UnknownOpcode { opcode })?;
        let r_dest = ((word0 >> 24) & 0xFF) as u8;
        let r_src_or_shift = ((word0 >> 16) & 0xFF) as u8;
        let word_count = def.form.word_count();
        let imm = if word_count == 2 { fetch_word1()? } else { 0 };
        Ok(Decoded { opcode, r_dest, r_src_or_shift, imm, word_count })
    }

    #[must_use]
    pub fn encode(&self, mnemonic: &str, r_dest: u8, r_src_or_shift: u8, imm: u32) -> Option<(u32, Option<u32>)> {
        let (opcode, def) = self.lookup_mnemonic(mnemonic)?;
        let word0 = (u32::from(r_dest) << 24) | (u32::from(r_src_or_shift) << 16) | u32::from(opcode);
        let word1 = (def.form.word_count() == 2).then_some(imm);
        Some((word0, word1))
    }

    /// The canonical Neptune mnemonic catalog, registered in the exact order
    /// spec.md's catalog table lists each group — this order *is* the opcode
    /// assignment, so it must never be reordered once released.
    #[must_use]
    pub fn canonical() -> Self {
        let mut set = Self::new();
        use OperandForm::{Imm, None as NoOperands, Reg, RegImm, RegReg, RegShift};

        set.register("ADD", RegReg, exec::add);
        set.register("SUB", RegReg, exec::sub);
        set.register("MUL", RegReg, exec::mul);
        set.register("DIV", RegReg, exec::div);
        set.register("MOD", RegReg, exec::rem);

        set.register("ADDI", RegImm, exec::addi);
        set.register("SUBI", RegImm, exec::subi);
        set.register("MULI", RegImm, exec::muli);
        set.register("DIVI", RegImm, exec::divi);
        set.register("MODI", RegImm, exec::modi);

        set.register("INC", Reg, exec::inc);
        set.register("DEC", Reg, exec::dec);
        set.register("NEG", Reg, exec::neg);
        set.register("NOT", Reg, exec::not);
        set.register("CLR", Reg, exec::clr);

        set.register("AND", RegReg, exec::and);
        set.register("OR", RegReg, exec::or);
        set.register("XOR", RegReg, exec::xor);

        set.register("ANDI", RegImm, exec::andi);
        set.register("ORI", RegImm, exec::ori);
        set.register("XORI", RegImm, exec::xori);

        set.register("SHL", RegShift, exec::shl);
        set.register("SHR", RegShift, exec::shr);

        set.register("LOAD", RegReg, exec::load);
        set.register("STORE", RegReg, exec::store);

        set.register("LOADI", RegImm, exec::loadi);
        set.register("STORI", RegImm, exec::stori);

        set.register("MSET", RegReg, exec::mset);
        set.register("MCPY", RegReg, exec::mcpy);

        set.register("MOV", RegReg, exec::mov);
        set.register("MOVI", RegImm, exec::movi);

        set.register("CMP", RegReg, exec::cmp);
        set.register("CMPI", RegImm, exec::cmpi);
        set.register("TEST", RegReg, exec::test);
        set.register("TESTI", RegImm, exec::testi);

        set.register("JMP", Imm, exec::jmp);
        set.register("JZ", Imm, exec::jz);
        set.register("JE", Imm, exec::je);
        set.register("JNZ", Imm, exec::jnz);
        set.register("JNE", Imm, exec::jne);
        set.register("JN", Imm, exec::jn);
        set.register("JP", Imm, exec::jp);
        set.register("JG", Imm, exec::jg);
        set.register("JGE", Imm, exec::jge);
        set.register("JL", Imm, exec::jl);
        set.register("JLE", Imm, exec::jle);
        set.register("JC", Imm, exec::jc);
        set.register("JNC", Imm, exec::jnc);
        set.register("JA", Imm, exec::ja);
        set.register("JAE", Imm, exec::jae);
        set.register("JB", Imm, exec::jb);
        set.register("JBE", Imm, exec::jbe);

        set.register("CALL", Imm, exec::call);
        set.register("RET", NoOperands, exec::ret);

        set.register("PUSH", Reg, exec::push);
        set.register("POP", Reg, exec::pop);

        set.register("SYSCALL", NoOperands, exec::syscall);
        set.register("NOP", NoOperands, exec::nop);
        set.register("HLT", NoOperands, exec::hlt);

        set
    }
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_set_has_59_mnemonics_with_stable_opcodes() {
        let set = InstructionSet::canonical();
        assert_eq!(set.defs.len(), 59);
        assert_eq!(set.lookup_mnemonic("ADD").unwrap().0, 1);
        assert_eq!(set.lookup_mnemonic("hlt").unwrap().0, 59);
    }

    #[test]
    fn encode_then_decode_round_trips_opcode() {
        let set = InstructionSet::canonical();
        let (word0, word1) = set.encode("ADDI", 3, 0, 0x1234).unwrap();
        assert_eq!(word1, Some(0x1234));
        let decoded = set.decode(word0, || Ok(word1.unwrap())).unwrap();
        let def = set.lookup_opcode(decoded.opcode).unwrap();
        assert_eq!(def.mnemonic, "ADDI");
        assert_eq!(decoded.r_dest, 3);
        assert_eq!(decoded.imm, 0x1234);
    }

    #[test]
    fn one_word_form_never_fetches_a_second_word() {
        let set = InstructionSet::canonical();
        let (word0, word1) = set.encode("NOP", 0, 0, 0).unwrap();
        assert_eq!(word1, None);
        let decoded = set.decode(word0, || panic!("NOP must not fetch a second word")).unwrap();
        assert_eq!(decoded.word_count, 1);
    }

    #[test]
    fn unknown_opcode_fails() {
        let set = InstructionSet::canonical();
        let word0 = 0xFFu32; // opcode 0xFF is unregistered
        assert!(matches!(
            set.decode(word0, || Ok(0)),
            Err(ExecError::UnknownOpcode { opcode: 0xFF })
        ));
    }
}

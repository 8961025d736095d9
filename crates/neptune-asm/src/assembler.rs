//! Two-pass assembler driver (spec.md §4.8).

use std::collections::HashMap;

use neptune_core::{IoPort, MemoryBus, MemoryMap};
use neptune_isa::{InstructionSet, OperandForm};

use crate::data::{align4, byte_in_range, unescape};
use crate::error::AsmError;
use crate::macros;
use crate::numeric::{parse_numeric, parse_register};
use crate::token::split_mnemonic_args;

enum Section {
    Code,
    Data,
}

struct PendingInstruction {
    line: usize,
    mnemonic: String,
    args: Vec<String>,
    address: u32,
}

/// Assembles Neptune source into a memory bus and reports the resolved
/// entry point.
///
/// One `Assembler` is reusable across multiple `assemble_and_load` calls
/// (e.g. the boot ROM image, then a user program); it carries no per-run
/// state of its own.
pub struct Assembler {
    map: MemoryMap,
    instruction_set: InstructionSet,
}

impl Assembler {
    #[must_use]
    pub fn new(map: MemoryMap, instruction_set: InstructionSet) -> Self {
        Self { map, instruction_set }
    }

    fn is_rom_address(&self, address: u32) -> bool {
        address >= self.map.rom_base && address < self.map.rom_end()
    }

    fn write_word<IO: IoPort>(&self, bus: &mut MemoryBus<IO>, line: usize, addr: u32, value: u32) -> Result<(), AsmError> {
        let result = if self.is_rom_address(addr) { bus.rom_write_bypass_word(addr, value) } else { bus.write_word(addr, value) };
        result.map_err(|e| AsmError::BadArgument { detail: format!("write at {addr:#010X} failed: {e}"), line })
    }

    fn write_byte<IO: IoPort>(&self, bus: &mut MemoryBus<IO>, line: usize, addr: u32, value: u8) -> Result<(), AsmError> {
        let result = if self.is_rom_address(addr) { bus.rom_write_bypass_byte(addr, value) } else { bus.write_byte(addr, value) };
        result.map_err(|e| AsmError::BadArgument { detail: format!("write at {addr:#010X} failed: {e}"), line })
    }

    /// Assembles `source`, writes it into `bus`, and returns the resolved
    /// entry PC (spec.md §4.8, "Entry-point policy").
    pub fn assemble_and_load<IO: IoPort>(&self, source: &str, base_address: u32, bus: &mut MemoryBus<IO>) -> Result<u32, AsmError> {
        let raw: Vec<&str> = source.lines().collect();
        let lines = macros::expand(&raw)?;

        let mut section = Section::Code;
        let mut has_data_section = false;
        let mut data_lines: Vec<(usize, String)> = Vec::new();
        let mut code_lines: Vec<(usize, String)> = Vec::new();
        let mut constants: HashMap<String, u32> = HashMap::new();

        for (line_no, line) in &lines {
            if line.eq_ignore_ascii_case(".data") {
                section = Section::Data;
                has_data_section = true;
                continue;
            }
            if line.eq_ignore_ascii_case(".code") {
                section = Section::Code;
                continue;
            }
            if let Some(rest) = line.strip_prefix(".const ") {
                let mut tokens = rest.split_whitespace();
                let name = tokens.next().ok_or_else(|| AsmError::BadArgument {
                    detail: "`.const` needs a name".to_string(),
                    line: *line_no,
                })?;
                let value_tok = tokens.next().ok_or_else(|| AsmError::BadArgument {
                    detail: format!("`.const {name}` needs a value"),
                    line: *line_no,
                })?;
                let value = parse_numeric(value_tok)
                    .ok_or_else(|| AsmError::BadNumericLiteral { token: value_tok.to_string(), line: *line_no })?;
                constants.insert(name.to_string(), value);
                continue;
            }
            match section {
                Section::Data => data_lines.push((*line_no, line.clone())),
                Section::Code => code_lines.push((*line_no, line.clone())),
            }
        }

        let mut labels: HashMap<String, u32> = HashMap::new();
        let data_end = self.layout_data(&data_lines, &mut labels, bus)?;

        let code_start = if self.is_rom_address(base_address) {
            base_address
        } else if has_data_section {
            align4(data_end) + 16
        } else {
            base_address
        };

        let (pending, syscalls) = self.layout_code(&code_lines, code_start, &mut labels)?;

        for instr in &pending {
            let (r_dest, r_src_or_shift, imm) = self.resolve_operands(&instr.mnemonic, &instr.args, &labels, &constants, instr.line)?;
            let (word0, word1) = self
                .instruction_set
                .encode(&instr.mnemonic, r_dest, r_src_or_shift, imm)
                .expect("mnemonic was validated during layout");
            self.write_word(bus, instr.line, instr.address, word0)?;
            if let Some(w1) = word1 {
                self.write_word(bus, instr.line, instr.address + 4, w1)?;
            }
        }

        for (number, label, line) in &syscalls {
            let target = labels.get(label).copied().expect("syscall label was bound during layout");
            let slot = self
                .map
                .syscall_slot_addr(*number)
                .ok_or_else(|| AsmError::BadArgument { detail: format!("syscall number {number} out of range"), line: *line })?;
            self.write_word(bus, *line, slot, target)?;
        }

        if self.is_rom_address(base_address) {
            Ok(code_start)
        } else if let Some(&main) = labels.get("main") {
            Ok(main)
        } else {
            Ok(code_start)
        }
    }

    /// Lays out `.data` declarations starting at RAM base and writes their
    /// initial values immediately (no forward references are possible in
    /// data initializers, so there is nothing to defer to pass 2).
    fn layout_data<IO: IoPort>(&self, data_lines: &[(usize, String)], labels: &mut HashMap<String, u32>, bus: &mut MemoryBus<IO>) -> Result<u32, AsmError> {
        let mut addr = self.map.ram_base;
        for (line_no, line) in data_lines {
            let line_no = *line_no;
            if let Some(label) = line.strip_suffix(':') {
                bind_label(labels, label, addr, line_no)?;
                continue;
            }
            if let Some(rest) = line.strip_prefix("string ") {
                let (name, literal) = parse_name_eq_string(rest, line_no)?;
                bind_label(labels, name, addr, line_no)?;
                let bytes = unescape(&literal, line_no)?;
                for (i, b) in bytes.iter().enumerate() {
                    self.write_byte(bus, line_no, addr + i as u32, *b)?;
                }
                addr = align4(addr + bytes.len() as u32);
            } else if let Some(rest) = line.strip_prefix("int ").or_else(|| line.strip_prefix("word ")) {
                let (name, value_tok) = parse_name_eq_value(rest, line_no)?;
                bind_label(labels, name, addr, line_no)?;
                let value = parse_numeric(&value_tok).ok_or_else(|| AsmError::BadNumericLiteral { token: value_tok, line: line_no })?;
                self.write_word(bus, line_no, addr, value)?;
                addr += 4;
            } else if let Some(rest) = line.strip_prefix("byte ") {
                let (name, value_tok) = parse_name_eq_value(rest, line_no)?;
                bind_label(labels, name, addr, line_no)?;
                let raw: i64 = value_tok
                    .parse()
                    .map_err(|_| AsmError::BadNumericLiteral { token: value_tok.clone(), line: line_no })?;
                let b = byte_in_range(raw, line_no)?;
                self.write_byte(bus, line_no, addr, b)?;
                addr = align4(addr + 1);
            } else if let Some(rest) = line.strip_prefix("array ") {
                addr = self.layout_array(rest, line_no, addr, labels, bus)?;
            } else if let Some(rest) = line.strip_prefix("buffer ") {
                let (name, size) = parse_name_bracket_size(rest, line_no)?;
                bind_label(labels, name, addr, line_no)?;
                for i in 0..size {
                    self.write_byte(bus, line_no, addr + i, 0)?;
                }
                addr = align4(addr + size);
            } else {
                return Err(AsmError::BadArgument { detail: format!("unrecognized data declaration `{line}`"), line: line_no });
            }
        }
        Ok(addr)
    }

    fn layout_array<IO: IoPort>(&self, rest: &str, line_no: usize, addr: u32, labels: &mut HashMap<String, u32>, bus: &mut MemoryBus<IO>) -> Result<u32, AsmError> {
        let (name, size) = parse_name_bracket_size(rest, line_no)?;
        bind_label(labels, name, addr, line_no)?;
        let values: Vec<u32> = if let Some(eq_pos) = rest.find('=') {
            rest[eq_pos + 1..]
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| parse_numeric(t).ok_or_else(|| AsmError::BadNumericLiteral { token: t.to_string(), line: line_no }))
                .collect::<Result<_, _>>()?
        } else {
            Vec::new()
        };
        if values.len() as u32 > size {
            return Err(AsmError::ArrayOverflow { name: name.to_string(), line: line_no });
        }
        for i in 0..size {
            let v = values.get(i as usize).copied().unwrap_or(0);
            self.write_word(bus, line_no, addr + i * 4, v)?;
        }
        Ok(addr + size * 4)
    }

    /// Pass-1 code layout: binds labels and `syscall N LABEL:` declarations
    /// to addresses, without yet resolving operand tokens.
    fn layout_code(&self, code_lines: &[(usize, String)], code_start: u32, labels: &mut HashMap<String, u32>) -> Result<(Vec<PendingInstruction>, Vec<(u32, String, usize)>), AsmError> {
        let mut addr = code_start;
        let mut pending = Vec::new();
        let mut syscalls = Vec::new();

        for (line_no, line) in code_lines {
            let line_no = *line_no;
            if let Some(rest) = line.strip_prefix("syscall ") {
                let mut tokens = rest.split_whitespace();
                let n_tok = tokens
                    .next()
                    .ok_or_else(|| AsmError::BadArgument { detail: "`syscall` needs a number".to_string(), line: line_no })?;
                let label_tok = tokens
                    .next()
                    .ok_or_else(|| AsmError::BadArgument { detail: "`syscall` needs a label".to_string(), line: line_no })?;
                let number = parse_numeric(n_tok).ok_or_else(|| AsmError::BadNumericLiteral { token: n_tok.to_string(), line: line_no })?;
                let label = label_tok
                    .strip_suffix(':')
                    .ok_or_else(|| AsmError::BadArgument { detail: format!("`syscall {number} {label_tok}` label must end with `:`"), line: line_no })?;
                if syscalls.iter().any(|(n, _, _)| *n == number) {
                    return Err(AsmError::DuplicateSyscall { number, line: line_no });
                }
                bind_label(labels, label, addr, line_no)?;
                syscalls.push((number, label.to_string(), line_no));
                continue;
            }
            if let Some(label) = line.strip_suffix(':') {
                if !label.contains(char::is_whitespace) {
                    bind_label(labels, label, addr, line_no)?;
                    continue;
                }
            }
            let (mnemonic, args) = split_mnemonic_args(line);
            let (_, def) = self
                .instruction_set
                .lookup_mnemonic(mnemonic)
                .ok_or_else(|| AsmError::UnknownInstruction { mnemonic: mnemonic.to_string(), line: line_no })?;
            pending.push(PendingInstruction { line: line_no, mnemonic: mnemonic.to_string(), args, address: addr });
            addr += u32::from(def.form.word_count()) * 4;
        }
        Ok((pending, syscalls))
    }

    fn resolve_operands(&self, mnemonic: &str, args: &[String], labels: &HashMap<String, u32>, constants: &HashMap<String, u32>, line: usize) -> Result<(u8, u8, u32), AsmError> {
        let (_, def) = self.instruction_set.lookup_mnemonic(mnemonic).expect("mnemonic validated during layout");
        let resolve_value = |tok: &str| -> Result<u32, AsmError> {
            if let Some(v) = labels.get(tok) {
                return Ok(*v);
            }
            if let Some(v) = constants.get(tok) {
                return Ok(*v);
            }
            parse_numeric(tok).ok_or_else(|| AsmError::BadNumericLiteral { token: tok.to_string(), line })
        };
        let arg = |i: usize| -> Result<&str, AsmError> {
            args.get(i)
                .map(String::as_str)
                .ok_or_else(|| AsmError::BadArgument { detail: format!("`{mnemonic}` missing argument {}", i + 1), line })
        };
        let reg_arg = |tok: &str| -> Result<u8, AsmError> {
            parse_register(tok)
                .ok_or_else(|| AsmError::BadArgument { detail: format!("`{tok}` is not a register"), line })
                .map(|r| r as u8)
        };

        match def.form {
            OperandForm::RegReg => Ok((reg_arg(arg(0)?)?, reg_arg(arg(1)?)?, 0)),
            OperandForm::RegImm => Ok((reg_arg(arg(0)?)?, 0, resolve_value(arg(1)?)?)),
            OperandForm::RegShift => {
                let shift = resolve_value(arg(1)?)?;
                if shift > 255 {
                    return Err(AsmError::BadArgument { detail: format!("shift amount {shift} out of range 0..255"), line });
                }
                Ok((reg_arg(arg(0)?)?, shift as u8, 0))
            }
            OperandForm::Reg => Ok((reg_arg(arg(0)?)?, 0, 0)),
            OperandForm::Imm => Ok((0, 0, resolve_value(arg(0)?)?)),
            OperandForm::None => Ok((0, 0, 0)),
        }
    }
}

fn bind_label(labels: &mut HashMap<String, u32>, name: &str, addr: u32, line: usize) -> Result<(), AsmError> {
    if labels.contains_key(name) {
        return Err(AsmError::DuplicateLabel { label: name.to_string(), line });
    }
    labels.insert(name.to_string(), addr);
    Ok(())
}

fn parse_name_eq_string(rest: &str, line: usize) -> Result<(&str, String), AsmError> {
    let eq = rest.find('=').ok_or_else(|| AsmError::BadArgument { detail: "expected `=`".to_string(), line })?;
    let name = rest[..eq].trim();
    let value = rest[eq + 1..].trim();
    let value = value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| AsmError::BadArgument { detail: "string value must be quoted".to_string(), line })?;
    Ok((name, value.to_string()))
}

fn parse_name_eq_value(rest: &str, line: usize) -> Result<(&str, String), AsmError> {
    let eq = rest.find('=').ok_or_else(|| AsmError::BadArgument { detail: "expected `=`".to_string(), line })?;
    let name = rest[..eq].trim();
    let value = rest[eq + 1..].trim().to_string();
    Ok((name, value))
}

fn parse_name_bracket_size(rest: &str, line: usize) -> Result<(&str, u32), AsmError> {
    let open = rest.find('[').ok_or_else(|| AsmError::BadArgument { detail: "expected `[SIZE]`".to_string(), line })?;
    let close = rest.find(']').ok_or_else(|| AsmError::BadArgument { detail: "expected `]`".to_string(), line })?;
    let name = rest[..open].trim();
    let size_tok = rest[open + 1..close].trim();
    let size = parse_numeric(size_tok).ok_or_else(|| AsmError::BadNumericLiteral { token: size_tok.to_string(), line })?;
    Ok((name, size))
}

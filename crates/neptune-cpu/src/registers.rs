//! General-purpose register file with PC/SP/HP aliasing (spec.md §3, §9).

use neptune_core::ExecError;

/// Index of the alias mapped to the program counter.
pub const PC_INDEX: u32 = 252;
/// Index of the alias mapped to the stack pointer.
pub const SP_INDEX: u32 = 253;
/// Index of the alias mapped to the heap pointer.
pub const HP_INDEX: u32 = 254;

/// Default general-purpose register count (spec.md §3).
pub const DEFAULT_REGISTER_COUNT: usize = 32;

/// `N` general-purpose registers plus the PC/SP/HP aliases.
///
/// Indices 0..N-1 index `general` directly; 252/253/254 read through to
/// `pc`/`sp`/`hp` instead of occupying a slot in `general`. Any other index
/// is `InvalidRegister` on both read and write (spec.md §9: "Validate at
/// both read and write").
pub struct RegisterFile {
    general: Vec<u32>,
    pub pc: u32,
    pub sp: u32,
    pub hp: u32,
}

impl RegisterFile {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self { general: vec![0; count], pc: 0, sp: 0, hp: 0 }
    }

    pub fn read(&self, index: u32) -> Result<u32, ExecError> {
        match index {
            PC_INDEX => Ok(self.pc),
            SP_INDEX => Ok(self.sp),
            HP_INDEX => Ok(self.hp),
            i => self
                .general
                .get(i as usize)
                .copied()
                .ok_or(ExecError::InvalidRegister { index }),
        }
    }

    /// The general-purpose slots, excluding the PC/SP/HP aliases.
    #[must_use]
    pub fn general(&self) -> &[u32] {
        &self.general
    }

    pub fn write(&mut self, index: u32, value: u32) -> Result<(), ExecError> {
        match index {
            PC_INDEX => self.pc = value,
            SP_INDEX => self.sp = value,
            HP_INDEX => self.hp = value,
            i => {
                let slot = self.general.get_mut(i as usize).ok_or(ExecError::InvalidRegister { index })?;
                *slot = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_registers_round_trip() {
        let mut regs = RegisterFile::new(32);
        regs.write(5, 0xABCD).unwrap();
        assert_eq!(regs.read(5).unwrap(), 0xABCD);
    }

    #[test]
    fn pc_sp_hp_aliases_read_through() {
        let mut regs = RegisterFile::new(32);
        regs.pc = 0x1000;
        regs.sp = 0x2000;
        regs.hp = 0x3000;
        assert_eq!(regs.read(PC_INDEX).unwrap(), 0x1000);
        assert_eq!(regs.read(SP_INDEX).unwrap(), 0x2000);
        assert_eq!(regs.read(HP_INDEX).unwrap(), 0x3000);

        regs.write(SP_INDEX, 0x2004).unwrap();
        assert_eq!(regs.sp, 0x2004);
    }

    #[test]
    fn out_of_range_index_fails_on_read_and_write() {
        let mut regs = RegisterFile::new(32);
        assert!(matches!(regs.read(32), Err(ExecError::InvalidRegister { index: 32 })));
        assert!(matches!(regs.write(200, 1), Err(ExecError::InvalidRegister { index: 200 })));
    }
}

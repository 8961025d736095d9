//! Per-opcode semantic actions (spec.md §4.6).
//!
//! Every action has the same signature regardless of its `OperandForm`: one-
//! word forms simply ignore `imm`, and `RegShift` reads its literal out of
//! `r_src_or_shift` instead of treating it as a register index.

use neptune_core::ExecError;

use crate::context::ExecContext;

pub type ExecFn = fn(&mut dyn ExecContext, r_dest: u8, r_src_or_shift: u8, imm: u32) -> Result<(), ExecError>;

fn reg(ctx: &dyn ExecContext, index: u8) -> Result<u32, ExecError> {
    ctx.register_read(u32::from(index))
}

fn set_reg(ctx: &mut dyn ExecContext, index: u8, value: u32) -> Result<(), ExecError> {
    ctx.register_write(u32::from(index), value)
}

macro_rules! arith_reg_reg {
    ($name:ident, $update:ident, $op:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
            let a = reg(ctx, r_dest)?;
            let b = reg(ctx, r_src)?;
            let r = $op(a, b);
            let mut flags = ctx.flags();
            flags.$update(a, b, r);
            ctx.set_flags(flags);
            set_reg(ctx, r_dest, r)
        }
    };
}

macro_rules! arith_reg_imm {
    ($name:ident, $update:ident, $op:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
            let a = reg(ctx, r_dest)?;
            let r = $op(a, imm);
            let mut flags = ctx.flags();
            flags.$update(a, imm, r);
            ctx.set_flags(flags);
            set_reg(ctx, r_dest, r)
        }
    };
}

arith_reg_reg!(add, update_add, |a: u32, b: u32| a.wrapping_add(b));
arith_reg_reg!(sub, update_sub, |a: u32, b: u32| a.wrapping_sub(b));

macro_rules! plain_reg_reg {
    ($name:ident, $op:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
            let a = reg(ctx, r_dest)?;
            let b = reg(ctx, r_src)?;
            let r = $op(a, b)?;
            let mut flags = ctx.flags();
            flags.update(r);
            ctx.set_flags(flags);
            set_reg(ctx, r_dest, r)
        }
    };
}

macro_rules! plain_reg_imm {
    ($name:ident, $op:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
            let a = reg(ctx, r_dest)?;
            let r = $op(a, imm)?;
            let mut flags = ctx.flags();
            flags.update(r);
            ctx.set_flags(flags);
            set_reg(ctx, r_dest, r)
        }
    };
}

plain_reg_reg!(mul, |a: u32, b: u32| Ok::<u32, ExecError>(a.wrapping_mul(b)));
plain_reg_reg!(div, |a: u32, b: u32| signed_div(a, b));
plain_reg_reg!(rem, |a: u32, b: u32| signed_rem(a, b));

arith_reg_imm!(addi, update_add, |a: u32, b: u32| a.wrapping_add(b));
arith_reg_imm!(subi, update_sub, |a: u32, b: u32| a.wrapping_sub(b));
plain_reg_imm!(muli, |a: u32, b: u32| Ok::<u32, ExecError>(a.wrapping_mul(b)));
plain_reg_imm!(divi, |a: u32, b: u32| signed_div(a, b));
plain_reg_imm!(modi, |a: u32, b: u32| signed_rem(a, b));

fn signed_div(a: u32, b: u32) -> Result<u32, ExecError> {
    if b == 0 {
        return Err(ExecError::DivByZero);
    }
    Ok((a as i32).wrapping_div(b as i32) as u32)
}

fn signed_rem(a: u32, b: u32) -> Result<u32, ExecError> {
    if b == 0 {
        return Err(ExecError::DivByZero);
    }
    Ok((a as i32).wrapping_rem(b as i32) as u32)
}

macro_rules! unary {
    ($name:ident, $op:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
            let a = reg(ctx, r_dest)?;
            let r = $op(a);
            let mut flags = ctx.flags();
            flags.update(r);
            ctx.set_flags(flags);
            set_reg(ctx, r_dest, r)
        }
    };
}

unary!(inc, |a: u32| a.wrapping_add(1));
unary!(dec, |a: u32| a.wrapping_sub(1));
unary!(neg, u32::wrapping_neg);
unary!(not, |a: u32| !a);
unary!(clr, |_a: u32| 0);

plain_reg_reg!(and, |a: u32, b: u32| Ok::<u32, ExecError>(a & b));
plain_reg_reg!(or, |a: u32, b: u32| Ok::<u32, ExecError>(a | b));
plain_reg_reg!(xor, |a: u32, b: u32| Ok::<u32, ExecError>(a ^ b));
plain_reg_imm!(andi, |a: u32, b: u32| Ok::<u32, ExecError>(a & b));
plain_reg_imm!(ori, |a: u32, b: u32| Ok::<u32, ExecError>(a | b));
plain_reg_imm!(xori, |a: u32, b: u32| Ok::<u32, ExecError>(a ^ b));

pub fn shl(ctx: &mut dyn ExecContext, r_dest: u8, amount: u8, _imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let shift = u32::from(amount) & 0x1F;
    let r = if shift == 0 { a } else { a << shift };
    let mut flags = ctx.flags();
    flags.update(r);
    if shift != 0 {
        let carry = ((a >> (32 - shift)) & 1) != 0;
        flags.update_shift(r, carry);
    }
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, r)
}

pub fn shr(ctx: &mut dyn ExecContext, r_dest: u8, amount: u8, _imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let shift = u32::from(amount) & 0x1F;
    let r = if shift == 0 { a } else { a >> shift };
    let mut flags = ctx.flags();
    flags.update(r);
    if shift != 0 {
        let carry = ((a >> (shift - 1)) & 1) != 0;
        flags.update_shift(r, carry);
    }
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, r)
}

pub fn load(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let addr = reg(ctx, r_src)?;
    let r = ctx.bus_read_word(addr)?;
    let mut flags = ctx.flags();
    flags.update(r);
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, r)
}

pub fn store(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let addr = reg(ctx, r_src)?;
    let v = reg(ctx, r_dest)?;
    ctx.bus_write_word(addr, v)
}

/// Immediate-to-register load (spec.md §9 open question: resolved as
/// immediate-to-register, matching the canonical assembler rather than the
/// older "load from immediate address" documentation).
pub fn loadi(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let mut flags = ctx.flags();
    flags.update(imm);
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, imm)
}

pub fn stori(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let v = reg(ctx, r_dest)?;
    ctx.bus_write_word(imm, v)
}

/// Write `reg[rSrc]` into `reg[1]` consecutive words starting at `reg[rDest]`.
pub fn mset(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let dest = reg(ctx, r_dest)?;
    let value = reg(ctx, r_src)?;
    let count = reg(ctx, 1)?;
    for i in 0..count {
        ctx.bus_write_word(dest.wrapping_add(i * 4), value)?;
    }
    Ok(())
}

/// Copy `reg[1]` words from `reg[rSrc]` to `reg[rDest]`, handling forward
/// overlap by copying backward (spec.md §9, "MCPY overlap").
pub fn mcpy(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let dst = reg(ctx, r_dest)?;
    let src = reg(ctx, r_src)?;
    let count = reg(ctx, 1)?;
    let overlap_forward = dst > src && dst < src.wrapping_add(count.wrapping_mul(4));
    if overlap_forward {
        for i in (0..count).rev() {
            let v = ctx.bus_read_word(src.wrapping_add(i * 4))?;
            ctx.bus_write_word(dst.wrapping_add(i * 4), v)?;
        }
    } else {
        for i in 0..count {
            let v = ctx.bus_read_word(src.wrapping_add(i * 4))?;
            ctx.bus_write_word(dst.wrapping_add(i * 4), v)?;
        }
    }
    Ok(())
}

pub fn mov(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let v = reg(ctx, r_src)?;
    let mut flags = ctx.flags();
    flags.update(v);
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, v)
}

pub fn movi(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let mut flags = ctx.flags();
    flags.update(imm);
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, imm)
}

pub fn cmp(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let b = reg(ctx, r_src)?;
    let mut flags = ctx.flags();
    flags.update_sub(a, b, a.wrapping_sub(b));
    ctx.set_flags(flags);
    Ok(())
}

pub fn cmpi(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let mut flags = ctx.flags();
    flags.update_sub(a, imm, a.wrapping_sub(imm));
    ctx.set_flags(flags);
    Ok(())
}

pub fn test(ctx: &mut dyn ExecContext, r_dest: u8, r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let b = reg(ctx, r_src)?;
    let mut flags = ctx.flags();
    flags.update(a & b);
    ctx.set_flags(flags);
    Ok(())
}

pub fn testi(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let a = reg(ctx, r_dest)?;
    let mut flags = ctx.flags();
    flags.update(a & imm);
    ctx.set_flags(flags);
    Ok(())
}

macro_rules! jump {
    ($name:ident, $predicate:expr) => {
        pub fn $name(ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
            let f = ctx.flags();
            if $predicate(f) {
                ctx.set_pc(imm);
            }
            Ok(())
        }
    };
}

jump!(jmp, |_f: neptune_core::Flags| true);
jump!(jz, |f: neptune_core::Flags| f.z);
jump!(je, |f: neptune_core::Flags| f.z);
jump!(jnz, |f: neptune_core::Flags| !f.z);
jump!(jne, |f: neptune_core::Flags| !f.z);
jump!(jn, |f: neptune_core::Flags| f.n);
jump!(jp, |f: neptune_core::Flags| !f.n);
jump!(jg, |f: neptune_core::Flags| !f.z && !f.n);
jump!(jge, |f: neptune_core::Flags| !f.n);
jump!(jl, |f: neptune_core::Flags| f.n);
jump!(jle, |f: neptune_core::Flags| f.n || f.z);
jump!(jc, |f: neptune_core::Flags| f.c);
jump!(jnc, |f: neptune_core::Flags| !f.c);
jump!(ja, |f: neptune_core::Flags| !f.c && !f.z);
jump!(jae, |f: neptune_core::Flags| !f.c);
jump!(jb, |f: neptune_core::Flags| f.c);
jump!(jbe, |f: neptune_core::Flags| f.c || f.z);

pub fn call(ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, imm: u32) -> Result<(), ExecError> {
    let return_pc = ctx.pc();
    ctx.push(return_pc)?;
    ctx.set_pc(imm);
    Ok(())
}

pub fn ret(ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let target = ctx.pop()?;
    ctx.set_pc(target);
    Ok(())
}

pub fn push(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let v = reg(ctx, r_dest)?;
    ctx.push(v)
}

pub fn pop(ctx: &mut dyn ExecContext, r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let v = ctx.pop()?;
    let mut flags = ctx.flags();
    flags.update(v);
    ctx.set_flags(flags);
    set_reg(ctx, r_dest, v)
}

pub fn syscall(ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    let number = reg(ctx, 0)?;
    let map = *ctx.memory_map();
    let entry_addr = map.syscall_table_base().wrapping_add(number.wrapping_mul(4));
    if entry_addr < map.rom_base || entry_addr.wrapping_add(3) >= map.rom_end() {
        return Err(ExecError::SyscallOutOfRange { entry_addr });
    }
    let target = ctx.bus_read_word(entry_addr)?;
    if target == 0 {
        return Err(ExecError::SyscallNotImplemented { number });
    }
    if !ctx.bus_is_mapped(target) {
        return Err(ExecError::SyscallInvalidTarget { target });
    }
    let return_pc = ctx.pc();
    ctx.push(return_pc)?;
    ctx.set_pc(target);
    Ok(())
}

pub fn nop(_ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    Ok(())
}

pub fn hlt(ctx: &mut dyn ExecContext, _r_dest: u8, _r_src: u8, _imm: u32) -> Result<(), ExecError> {
    ctx.halt();
    Ok(())
}

//! Per-instruction operand-legality rewrites (§4.5). These are not
//! optimizations — emitting the instruction as the IR gave it would assemble
//! to something the CPU rejects or that means something else. Every rewrite
//! here happens at text-emission time, after register allocation, so the
//! scratch register it borrows must give back whatever the allocator put
//! there: each fixup below brackets its scratch use in a `push`/`pop` rather
//! than claiming a register out of the allocator's palette.

use crate::ir::operand::{Operand, PhysReg};

/// The scratch register fixups reach for. Chosen arbitrarily among the
/// caller-saved GPRs; the push/pop bracketing makes the choice safe even
/// though R10 is itself allocatable.
pub const SCRATCH: PhysReg = PhysReg::R10;

/// Scratch for instructions whose destination must be an XMM register
/// (`cvtsi2ss`/`cvtsi2sd`) when the allocator spilled that temp to memory.
/// Saved/restored around the stack the same way `SCRATCH` is, via a 16-byte
/// stack slot since there is no `push`/`pop` for XMM registers.
pub const SCRATCH_XMM: PhysReg = PhysReg::Xmm(15);

/// True when `op` is an 8-byte-sign-extended immediate too wide for a single
/// `movq $imm, ...` encoding (x86-64 has no 64-bit immediate-to-memory form,
/// and `movq` immediate-to-register is itself limited to sign-extended
/// 32-bit except via `movabs`).
pub fn is_wide_imm(op: &Operand) -> bool {
    matches!(op, Operand::Imm { value, size: 8 } if *value > i32::MAX as i64 || *value < i32::MIN as i64)
}

/// x86-64 has no memory-to-memory form for any of the instructions this
/// emitter issues.
pub fn is_mem_to_mem(dst: &Operand, src: &Operand) -> bool {
    dst.is_memory() && src.is_memory()
}

/// `idiv`/`div` read an explicit register or memory divisor; an immediate
/// divisor (e.g. dividing by a literal power of two, §8) must be loaded into
/// a register first.
pub fn needs_divisor_reg(divisor: &Operand) -> bool {
    divisor.is_immediate()
}

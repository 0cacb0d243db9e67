//! System V AMD64 argument and return classification (§4.3, §8). Grounded on
//! the ABI classification reference in
//! `examples/other_examples/e5fb132d_m4b-cranelift__cranelift-codegen-src-isa-x86-abi.rs.rs`,
//! adapted from Cranelift's general ABI-lowering pass down to exactly the
//! subset this compiler's type system can produce (no vectors, no `__m128`).

use super::operand::PhysReg;
use crate::ast::Type;

pub const INT_ARG_REGS: [PhysReg; 6] = [
    PhysReg::Rdi,
    PhysReg::Rsi,
    PhysReg::Rdx,
    PhysReg::Rcx,
    PhysReg::R8,
    PhysReg::R9,
];

pub const SSE_ARG_REGS: [PhysReg; 8] = [
    PhysReg::Xmm(0),
    PhysReg::Xmm(1),
    PhysReg::Xmm(2),
    PhysReg::Xmm(3),
    PhysReg::Xmm(4),
    PhysReg::Xmm(5),
    PhysReg::Xmm(6),
    PhysReg::Xmm(7),
];

pub const RET_INT_REGS: [PhysReg; 2] = [PhysReg::Rax, PhysReg::Rdx];
pub const RET_SSE_REGS: [PhysReg; 2] = [PhysReg::Xmm(0), PhysReg::Xmm(1)];

/// How a single argument slot is passed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgClass {
    /// A scalar int/pointer argument, in one integer register.
    Int,
    /// A scalar float argument, in one SSE register.
    Sse,
    /// A ≤16-byte aggregate split across one or two integer registers.
    IntPair { regs: u8 },
    /// A >16-byte aggregate passed by invisible reference: the caller
    /// materializes a copy and passes its address in one integer register.
    Reference,
    /// Spilled to the stack because no registers of the right class remain.
    Stack,
}

/// How the function's return value comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetClass {
    Void,
    Int,
    Sse,
    IntPair,
    /// >16 bytes: hidden pointer argument in RDI, nothing in a return
    /// register; visible arguments shift right by one integer register.
    Memory,
}

pub fn classify_return(ty: &Type) -> RetClass {
    match ty {
        Type::Void => RetClass::Void,
        Type::Float { .. } => RetClass::Sse,
        Type::Struct(_) if ty.size() <= 8 => RetClass::Int,
        Type::Struct(_) if ty.size() <= 16 => RetClass::IntPair,
        Type::Struct(_) => RetClass::Memory,
        _ => RetClass::Int,
    }
}

/// Classifies one argument's type, given how many integer/SSE registers are
/// already committed to earlier arguments in the same call (left-to-right,
/// per §4.3). Does not mutate the counters; the caller advances them based on
/// the returned class.
pub fn classify_arg(ty: &Type, ints_used: u8, sses_used: u8) -> ArgClass {
    match ty {
        Type::Float { .. } => {
            if sses_used < SSE_ARG_REGS.len() as u8 {
                ArgClass::Sse
            } else {
                ArgClass::Stack
            }
        }
        Type::Struct(_) if ty.size() <= 16 => {
            let regs_needed = if ty.size() <= 8 { 1 } else { 2 };
            if ints_used + regs_needed <= INT_ARG_REGS.len() as u8 {
                ArgClass::IntPair { regs: regs_needed }
            } else {
                ArgClass::Stack
            }
        }
        Type::Struct(_) => {
            if ints_used < INT_ARG_REGS.len() as u8 {
                ArgClass::Reference
            } else {
                ArgClass::Stack
            }
        }
        _ => {
            if ints_used < INT_ARG_REGS.len() as u8 {
                ArgClass::Int
            } else {
                ArgClass::Stack
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ty::StructLayout;
    use rstest::rstest;
    use std::rc::Rc;

    fn struct_of_size(size: u64) -> Type {
        Type::Struct(Rc::new(StructLayout {
            tag: None,
            fields: Vec::new(),
            size,
            align: 8,
        }))
    }

    /// Struct return classification changes at the 8-byte and 16-byte
    /// boundaries (§4.3): one register, two registers, then invisible
    /// reference. Off-by-one here would silently corrupt every struct-valued
    /// function whose size sits right at a boundary.
    #[rstest]
    #[case(1, RetClass::Int)]
    #[case(8, RetClass::Int)]
    #[case(9, RetClass::IntPair)]
    #[case(16, RetClass::IntPair)]
    #[case(17, RetClass::Memory)]
    #[case(64, RetClass::Memory)]
    fn struct_return_boundaries(#[case] size: u64, #[case] expected: RetClass) {
        assert_eq!(classify_return(&struct_of_size(size)), expected);
    }

    /// A ≤16-byte struct argument needs one register for each 8 bytes (or
    /// fraction thereof); it only spills to the stack once the integer
    /// registers remaining can't cover the regs it needs, not merely because
    /// one register remains free.
    #[rstest]
    #[case(8, 5, ArgClass::IntPair { regs: 1 })]
    #[case(9, 5, ArgClass::IntPair { regs: 2 })]
    #[case(16, 5, ArgClass::IntPair { regs: 2 })]
    #[case(9, 6, ArgClass::Stack)]
    fn small_struct_arg_boundaries(#[case] size: u64, #[case] ints_used: u8, #[case] expected: ArgClass) {
        assert_eq!(classify_arg(&struct_of_size(size), ints_used, 0), expected);
    }

    #[rstest]
    #[case(17)]
    #[case(5)]
    fn large_struct_arg_is_always_a_reference_while_registers_remain(#[case] size: u64) {
        assert_eq!(classify_arg(&struct_of_size(size), 0, 0), ArgClass::Reference);
    }
}

//! Three-address IR instructions. One opcode family per §3's partition:
//! move/load/store, arithmetic, bitwise/shift, compare-and-set, branch, label,
//! call, return, frame markers, lea.

use super::operand::Operand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    IMul,
    IDiv,
    UDiv,
    IMod,
    UMod,
    And,
    Or,
    Xor,
    Shl,
    Sar,
    Shr,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl ArithOp {
    pub fn is_float(self) -> bool {
        matches!(self, ArithOp::FAdd | ArithOp::FSub | ArithOp::FMul | ArithOp::FDiv)
    }

    pub fn is_div_like(self) -> bool {
        matches!(
            self,
            ArithOp::IDiv | ArithOp::UDiv | ArithOp::IMod | ArithOp::UMod
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, ArithOp::Shl | ArithOp::Sar | ArithOp::Shr)
    }
}

/// Condition codes for `setcc`/`jcc`, split signed vs. unsigned per operand
/// type the way the comparison's operand types determine the flag test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Below,
    BelowEq,
    Above,
    AboveEq,
}

impl Cond {
    /// The two-letter AT&T suffix (`e`, `ne`, `l`, `le`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "e",
            Cond::Ne => "ne",
            Cond::Lt => "l",
            Cond::Le => "le",
            Cond::Gt => "g",
            Cond::Ge => "ge",
            Cond::Below => "b",
            Cond::BelowEq => "be",
            Cond::Above => "a",
            Cond::AboveEq => "ae",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Direct(String),
    Indirect(Operand),
}

/// How a call's return value comes back, decided by System V struct
/// classification (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetClass {
    Void,
    /// Scalar integer/pointer in RAX.
    Int,
    /// Scalar float in XMM0.
    Sse,
    /// 9-16 byte aggregate split across RAX:RDX.
    IntPair,
    /// >16 byte aggregate returned through a hidden pointer the caller
    /// supplied in RDI; nothing comes back in a register.
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Mov { dst: Operand, src: Operand },
    Lea { dst: Operand, src: Operand },
    Arith {
        op: ArithOp,
        dst: Operand,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp { lhs: Operand, rhs: Operand },
    SetCc { cond: Cond, dst: Operand },
    Label(String),
    Jmp(String),
    Jcc { cond: Cond, label: String },
    /// Branch on whether a register/memory operand is zero, used to lower
    /// short-circuit `&&`/`||` and `if`/`while` conditions that are arbitrary
    /// expressions rather than a freshly-computed flag.
    JmpIfZero { cond: Operand, label: String },
    JmpIfNotZero { cond: Operand, label: String },
    Call {
        callee: Callee,
        int_args: Vec<Operand>,
        sse_args: Vec<Operand>,
        ret_class: RetClass,
        dst: Option<Operand>,
    },
    Ret(Option<Operand>),
    /// Markers consumed by the code emitter's function-emission state
    /// machine; `frame_size` is filled in by the register allocator once the
    /// final spill-slot count is known.
    Prologue { frame_size: u32 },
    Epilogue,
    Extend { dst: Operand, src: Operand, signed: bool },
    Truncate { dst: Operand, src: Operand },
    IntToFloat { dst: Operand, src: Operand },
    FloatToInt { dst: Operand, src: Operand },
}

impl Instruction {
    /// Operands this instruction reads, for liveness's `uses` set. Does not
    /// include the base/index registers of a `dst` memory operand: those are
    /// computed uses too, but contribute through `dst_mem_uses`.
    pub fn uses(&self) -> Vec<&Operand> {
        match self {
            Instruction::Mov { src, .. } | Instruction::Lea { src, .. } => vec![src],
            Instruction::Arith { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::Cmp { lhs, rhs } => vec![lhs, rhs],
            Instruction::SetCc { .. } => vec![],
            Instruction::JmpIfZero { cond, .. } | Instruction::JmpIfNotZero { cond, .. } => {
                vec![cond]
            }
            Instruction::Call {
                int_args, sse_args, ..
            } => int_args.iter().chain(sse_args.iter()).collect(),
            Instruction::Ret(Some(v)) => vec![v],
            Instruction::Extend { src, .. }
            | Instruction::Truncate { src, .. }
            | Instruction::IntToFloat { src, .. }
            | Instruction::FloatToInt { src, .. } => vec![src],
            _ => vec![],
        }
    }

    pub fn dst_operand(&self) -> Option<&Operand> {
        match self {
            Instruction::Mov { dst, .. }
            | Instruction::Lea { dst, .. }
            | Instruction::Arith { dst, .. }
            | Instruction::SetCc { dst, .. }
            | Instruction::Extend { dst, .. }
            | Instruction::Truncate { dst, .. }
            | Instruction::IntToFloat { dst, .. }
            | Instruction::FloatToInt { dst, .. } => Some(dst),
            Instruction::Call { dst, .. } => dst.as_ref(),
            _ => None,
        }
    }
}

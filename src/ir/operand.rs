//! IR operands: the same value before and after register allocation, mirroring
//! the grounding repo's `*Raw` → cooked two-layer pattern
//! (`examples/Vector35-idb-rs/src/til/pointer.rs`). Here the "raw" layer is a
//! virtual register and the "cooked" layer is a physical one; both live in the
//! same `Reg` enum so the emitter never has to know which allocator produced it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysReg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    Xmm(u8),
}

impl PhysReg {
    /// The 14 general-purpose registers available to the allocator (every GPR
    /// except RSP/RBP, which the frame owns).
    pub const ALLOCATABLE_GPR: [PhysReg; 14] = [
        PhysReg::Rax,
        PhysReg::Rbx,
        PhysReg::Rcx,
        PhysReg::Rdx,
        PhysReg::Rsi,
        PhysReg::Rdi,
        PhysReg::R8,
        PhysReg::R9,
        PhysReg::R10,
        PhysReg::R11,
        PhysReg::R12,
        PhysReg::R13,
        PhysReg::R14,
        PhysReg::R15,
    ];

    pub const ALLOCATABLE_XMM: [PhysReg; 16] = [
        PhysReg::Xmm(0),
        PhysReg::Xmm(1),
        PhysReg::Xmm(2),
        PhysReg::Xmm(3),
        PhysReg::Xmm(4),
        PhysReg::Xmm(5),
        PhysReg::Xmm(6),
        PhysReg::Xmm(7),
        PhysReg::Xmm(8),
        PhysReg::Xmm(9),
        PhysReg::Xmm(10),
        PhysReg::Xmm(11),
        PhysReg::Xmm(12),
        PhysReg::Xmm(13),
        PhysReg::Xmm(14),
        PhysReg::Xmm(15),
    ];

    /// Registers clobbered across a `call` per the System V ABI; anything live
    /// across a call site must interfere with all of these.
    pub const CALLER_SAVED: [PhysReg; 9] = [
        PhysReg::Rax,
        PhysReg::Rcx,
        PhysReg::Rdx,
        PhysReg::Rsi,
        PhysReg::Rdi,
        PhysReg::R8,
        PhysReg::R9,
        PhysReg::R10,
        PhysReg::R11,
    ];

    pub fn is_xmm(self) -> bool {
        matches!(self, PhysReg::Xmm(_))
    }

    /// Lowercase AT&T mnemonic at the given operand width (1/2/4/8 bytes);
    /// meaningless (and unused) for `Xmm`, which is always referenced at full
    /// width by the emitter.
    pub fn name(self, size: u8) -> String {
        if let PhysReg::Xmm(n) = self {
            return format!("%xmm{n}");
        }
        let (q, d, w, b) = match self {
            PhysReg::Rax => ("rax", "eax", "ax", "al"),
            PhysReg::Rbx => ("rbx", "ebx", "bx", "bl"),
            PhysReg::Rcx => ("rcx", "ecx", "cx", "cl"),
            PhysReg::Rdx => ("rdx", "edx", "dx", "dl"),
            PhysReg::Rsi => ("rsi", "esi", "si", "sil"),
            PhysReg::Rdi => ("rdi", "edi", "di", "dil"),
            PhysReg::Rbp => ("rbp", "ebp", "bp", "bpl"),
            PhysReg::Rsp => ("rsp", "esp", "sp", "spl"),
            PhysReg::R8 => ("r8", "r8d", "r8w", "r8b"),
            PhysReg::R9 => ("r9", "r9d", "r9w", "r9b"),
            PhysReg::R10 => ("r10", "r10d", "r10w", "r10b"),
            PhysReg::R11 => ("r11", "r11d", "r11w", "r11b"),
            PhysReg::R12 => ("r12", "r12d", "r12w", "r12b"),
            PhysReg::R13 => ("r13", "r13d", "r13w", "r13b"),
            PhysReg::R14 => ("r14", "r14d", "r14w", "r14b"),
            PhysReg::R15 => ("r15", "r15d", "r15w", "r15b"),
            PhysReg::Xmm(_) => unreachable!(),
        };
        let reg = match size {
            8 => q,
            4 => d,
            2 => w,
            1 => b,
            other => panic!("invalid operand size {other}"),
        };
        format!("%{reg}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// A temp not yet assigned a physical location; unique per function.
    Virtual(u32),
    Physical(PhysReg),
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Virtual(id) => write!(f, "%t{id}"),
            Reg::Physical(p) => write!(f, "{p:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg { reg: Reg, size: u8 },
    Imm { value: i64, size: u8 },
    /// A reference to a `.rodata`/`.text` label, used for float constants and
    /// function addresses taken as values.
    ImmLabel(String),
    /// Signed offset from RBP: negative for locals/spills, positive for
    /// stack-passed incoming arguments.
    FrameSlot { offset: i32, size: u8 },
    Global { symbol: String, disp: i64, size: u8 },
    Indexed {
        base: Box<Operand>,
        index: Box<Operand>,
        scale: u8,
        disp: i64,
        size: u8,
    },
    /// `disp(base)`: a plain memory dereference through a register holding an
    /// address, optionally offset (struct-member access through a pointer).
    Indirect { base: Box<Operand>, disp: i64, size: u8 },
}

impl Operand {
    pub fn reg(reg: Reg, size: u8) -> Self {
        Operand::Reg { reg, size }
    }

    pub fn physical(p: PhysReg, size: u8) -> Self {
        Operand::Reg {
            reg: Reg::Physical(p),
            size,
        }
    }

    pub fn imm(value: i64, size: u8) -> Self {
        Operand::Imm { value, size }
    }

    pub fn size(&self) -> u8 {
        match self {
            Operand::Reg { size, .. }
            | Operand::Imm { size, .. }
            | Operand::FrameSlot { size, .. }
            | Operand::Global { size, .. }
            | Operand::Indexed { size, .. }
            | Operand::Indirect { size, .. } => *size,
            Operand::ImmLabel(_) => 8,
        }
    }

    pub fn with_size(&self, size: u8) -> Operand {
        let mut new = self.clone();
        match &mut new {
            Operand::Reg { size: s, .. }
            | Operand::Imm { size: s, .. }
            | Operand::FrameSlot { size: s, .. }
            | Operand::Global { size: s, .. }
            | Operand::Indexed { size: s, .. }
            | Operand::Indirect { size: s, .. } => *s = size,
            Operand::ImmLabel(_) => {}
        }
        new
    }

    pub fn is_memory(&self) -> bool {
        matches!(
            self,
            Operand::FrameSlot { .. }
                | Operand::Global { .. }
                | Operand::Indexed { .. }
                | Operand::Indirect { .. }
        )
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, Operand::Imm { .. } | Operand::ImmLabel(_))
    }

    /// Every virtual register this operand mentions (bases/indices of compound
    /// addressing modes count), used by liveness and the emitter's final
    /// physical-register rewrite.
    pub fn virtual_regs(&self) -> Vec<u32> {
        match self {
            Operand::Reg {
                reg: Reg::Virtual(id),
                ..
            } => vec![*id],
            Operand::Indexed { base, index, .. } => {
                let mut v = base.virtual_regs();
                v.extend(index.virtual_regs());
                v
            }
            Operand::Indirect { base, .. } => base.virtual_regs(),
            _ => vec![],
        }
    }
}

//! Register allocation over the IR's virtual temps (§4.4). Two interchangeable
//! strategies share the same liveness analysis and the same final
//! operand-rewrite step; `-linear-scan` picks between them (§6).

mod graph_coloring;
mod linear_scan;
pub mod liveness;

use crate::ir::func::IrFunction;
use crate::ir::operand::{Operand, PhysReg, Reg};
use std::collections::HashMap;

/// Where a virtual temp ended up after allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Reg(PhysReg),
    /// A spill slot, offset from RBP.
    Spill(i32),
}

#[derive(Debug, Default)]
pub struct Assignment {
    pub locations: HashMap<u32, Location>,
}

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    GraphColoring,
    LinearScan,
}

/// Runs the selected allocator, then rewrites every virtual-register operand
/// in `func` into its assigned physical register or spill-slot memory
/// operand, and fixes up the `Prologue` frame size. This is the only place
/// that mutates `func` after IR generation and before the code emitter runs.
pub fn allocate(func: &mut IrFunction, strategy: Strategy) {
    let live = liveness::analyze(func);
    let assignment = match strategy {
        Strategy::GraphColoring => graph_coloring::allocate(func, &live),
        Strategy::LinearScan => linear_scan::allocate(func, &live),
    };
    rewrite(func, &assignment);
}

fn rewrite(func: &mut IrFunction, assignment: &Assignment) {
    for inst in &mut func.insts {
        rewrite_inst(inst, assignment);
    }
    let lowest = assignment
        .locations
        .values()
        .filter_map(|loc| match loc {
            Location::Spill(off) => Some(*off),
            _ => None,
        })
        .min()
        .unwrap_or(func.spill_base);
    let frame_bytes = (-lowest.min(func.spill_base)) as u32;
    func.frame_size = crate::ast::ty::round_up(frame_bytes as u64, 16) as u32;
    if let Some(crate::ir::inst::Instruction::Prologue { frame_size }) = func.insts.first_mut() {
        *frame_size = func.frame_size;
    }
}

fn rewrite_inst(inst: &mut crate::ir::inst::Instruction, assignment: &Assignment) {
    use crate::ir::inst::Instruction as I;
    match inst {
        I::Mov { dst, src } | I::Lea { dst, src } => {
            rewrite_operand(dst, assignment);
            rewrite_operand(src, assignment);
        }
        I::Arith { dst, lhs, rhs, .. } => {
            rewrite_operand(dst, assignment);
            rewrite_operand(lhs, assignment);
            rewrite_operand(rhs, assignment);
        }
        I::Cmp { lhs, rhs } => {
            rewrite_operand(lhs, assignment);
            rewrite_operand(rhs, assignment);
        }
        I::SetCc { dst, .. } => rewrite_operand(dst, assignment),
        I::JmpIfZero { cond, .. } | I::JmpIfNotZero { cond, .. } => rewrite_operand(cond, assignment),
        I::Call { int_args, sse_args, dst, .. } => {
            for a in int_args.iter_mut().chain(sse_args.iter_mut()) {
                rewrite_operand(a, assignment);
            }
            if let Some(d) = dst {
                rewrite_operand(d, assignment);
            }
        }
        I::Ret(Some(v)) => rewrite_operand(v, assignment),
        I::Extend { dst, src, .. } | I::IntToFloat { dst, src } | I::FloatToInt { dst, src } | I::Truncate { dst, src } => {
            rewrite_operand(dst, assignment);
            rewrite_operand(src, assignment);
        }
        _ => {}
    }
}

fn rewrite_operand(op: &mut Operand, assignment: &Assignment) {
    let virt = match &*op {
        Operand::Reg { reg: Reg::Virtual(id), size } => Some((*id, *size)),
        _ => None,
    };
    if let Some((id, size)) = virt {
        match assignment.locations.get(&id) {
            Some(Location::Reg(p)) => {
                *op = Operand::Reg {
                    reg: Reg::Physical(*p),
                    size,
                };
            }
            Some(Location::Spill(offset)) => {
                *op = Operand::FrameSlot { offset: *offset, size };
            }
            None => {}
        }
        return;
    }
    match op {
        Operand::Indexed { base, index, .. } => {
            rewrite_operand(base, assignment);
            rewrite_operand(index, assignment);
        }
        Operand::Indirect { base, .. } => rewrite_operand(base, assignment),
        _ => {}
    }
}

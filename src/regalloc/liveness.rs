//! Backward liveness dataflow: `live_in = (live_out - defs) ∪ uses` (§4.4),
//! iterated to a fixed point over the function's instruction list treated as
//! a single basic "soup" — control flow is recovered from `Label`/`Jmp`/`Jcc`
//! targets rather than a precomputed CFG, since the IR has no separate basic
//! block structure.

use crate::ir::func::IrFunction;
use crate::ir::inst::Instruction;
use crate::ir::operand::{Operand, Reg};
use std::collections::{HashMap, HashSet};

pub struct Liveness {
    pub live_in: Vec<HashSet<u32>>,
    pub live_out: Vec<HashSet<u32>>,
    /// Instruction indices that are a `Call`, for the allocator's
    /// caller-saved interference rule.
    pub call_sites: HashSet<usize>,
}

fn label_indices(func: &IrFunction) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (i, inst) in func.insts.iter().enumerate() {
        if let Instruction::Label(name) = inst {
            map.insert(name.clone(), i);
        }
    }
    map
}

/// Successor instruction indices of instruction `i`, given the label map.
fn successors(func: &IrFunction, i: usize, labels: &HashMap<String, usize>) -> Vec<usize> {
    let n = func.insts.len();
    match &func.insts[i] {
        Instruction::Jmp(label) => vec![*labels.get(label).unwrap_or(&i)],
        Instruction::Jcc { label, .. }
        | Instruction::JmpIfZero { label, .. }
        | Instruction::JmpIfNotZero { label, .. } => {
            let mut s = vec![*labels.get(label).unwrap_or(&i)];
            if i + 1 < n {
                s.push(i + 1);
            }
            s
        }
        Instruction::Ret(_) => vec![],
        _ => {
            if i + 1 < n {
                vec![i + 1]
            } else {
                vec![]
            }
        }
    }
}

pub fn analyze(func: &IrFunction) -> Liveness {
    let n = func.insts.len();
    let labels = label_indices(func);
    let mut live_in: Vec<HashSet<u32>> = vec![HashSet::new(); n];
    let mut live_out: Vec<HashSet<u32>> = vec![HashSet::new(); n];
    let mut call_sites = HashSet::new();

    // A memory `dst` (store through a pointer/array/member address) only
    // *reads* its base/index registers to compute the effective address; the
    // register it truly defines is the one named by a bare `Reg` dst. Lump
    // the former into `uses` rather than `defs`, or a store's address
    // registers would look dead right after the instruction that needs them.
    let defs: Vec<HashSet<u32>> = func
        .insts
        .iter()
        .map(|inst| match inst.dst_operand() {
            Some(Operand::Reg { reg: Reg::Virtual(id), .. }) => std::iter::once(*id).collect(),
            _ => HashSet::new(),
        })
        .collect();
    let uses: Vec<HashSet<u32>> = func
        .insts
        .iter()
        .enumerate()
        .map(|(i, inst)| {
            if matches!(inst, Instruction::Call { .. }) {
                call_sites.insert(i);
            }
            let mut u: HashSet<u32> = inst.uses().into_iter().flat_map(|o| o.virtual_regs()).collect();
            if let Some(dst) = inst.dst_operand() {
                if !matches!(dst, Operand::Reg { .. }) {
                    u.extend(dst.virtual_regs());
                }
            }
            u
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for i in (0..n).rev() {
            let mut out = HashSet::new();
            for &s in &successors(func, i, &labels) {
                out.extend(live_in[s].iter().copied());
            }
            let mut inn = out.clone();
            for d in &defs[i] {
                inn.remove(d);
            }
            for u in &uses[i] {
                inn.insert(*u);
            }
            if inn != live_in[i] || out != live_out[i] {
                changed = true;
                live_in[i] = inn;
                live_out[i] = out;
            }
        }
    }

    Liveness {
        live_in,
        live_out,
        call_sites,
    }
}

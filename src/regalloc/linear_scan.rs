//! Linear-scan register allocator (§4.4), selected with `-linear-scan`.
//! Computes one [first-def, last-use] interval per temp, sorts by start, and
//! walks the instruction stream maintaining an active set sorted by end.

use super::liveness::Liveness;
use super::{Assignment, Location};
use crate::ir::func::IrFunction;
use crate::ir::operand::PhysReg;
use std::collections::HashMap;

struct Interval {
    id: u32,
    start: usize,
    end: usize,
}

fn compute_intervals(func: &IrFunction, live: &Liveness, want_float: bool) -> Vec<Interval> {
    let mut first_def: HashMap<u32, usize> = HashMap::new();
    let mut last_use: HashMap<u32, usize> = HashMap::new();

    for (i, inst) in func.insts.iter().enumerate() {
        // Only a bare register destination defines a temp; a memory `dst`
        // only reads its base/index registers to form the store address,
        // which is handled below alongside the instruction's other uses.
        if let Some(crate::ir::operand::Operand::Reg {
            reg: crate::ir::operand::Reg::Virtual(id),
            ..
        }) = inst.dst_operand()
        {
            if func.is_float_temp.contains(id) == want_float {
                first_def.entry(*id).or_insert(i);
            }
        }
        let mut uses = inst.uses();
        let addr_uses = match inst.dst_operand() {
            Some(dst @ crate::ir::operand::Operand::Indexed { .. })
            | Some(dst @ crate::ir::operand::Operand::Indirect { .. }) => Some(dst),
            _ => None,
        };
        if let Some(dst) = addr_uses {
            uses.push(dst);
        }
        for u in uses {
            for id in u.virtual_regs() {
                if func.is_float_temp.contains(&id) == want_float {
                    last_use.insert(id, i);
                    first_def.entry(id).or_insert(i);
                }
            }
        }
    }

    // A temp live at a label's live-out with no local use still needs an
    // interval spanning to its last appearance in the liveness result
    // (covers values carried across a loop back-edge).
    for (i, set) in live.live_out.iter().enumerate() {
        for id in set {
            if func.is_float_temp.contains(id) == want_float {
                let e = last_use.entry(*id).or_insert(i);
                if i > *e {
                    *e = i;
                }
            }
        }
    }

    let mut intervals: Vec<Interval> = first_def
        .into_iter()
        .map(|(id, start)| Interval {
            id,
            start,
            end: *last_use.get(&id).unwrap_or(&start),
        })
        .collect();
    intervals.sort_by_key(|iv| iv.start);
    intervals
}

pub fn allocate(func: &mut IrFunction, live: &Liveness) -> Assignment {
    let mut assignment = Assignment::default();
    scan_class(func, live, false, &PhysReg::ALLOCATABLE_GPR, &mut assignment);
    scan_class(func, live, true, &PhysReg::ALLOCATABLE_XMM, &mut assignment);
    assignment
}

fn scan_class(
    func: &IrFunction,
    live: &Liveness,
    want_float: bool,
    palette: &[PhysReg],
    assignment: &mut Assignment,
) {
    let intervals = compute_intervals(func, live, want_float);
    let mut active: Vec<(usize, PhysReg, u32)> = Vec::new(); // (end, reg, id)
    let mut free: Vec<PhysReg> = palette.to_vec();
    free.reverse();
    let mut next_spill = func.spill_base;

    for iv in &intervals {
        active.retain(|(end, reg, _)| {
            if *end < iv.start {
                free.push(*reg);
                false
            } else {
                true
            }
        });

        let spans_call = live
            .call_sites
            .iter()
            .any(|&c| c >= iv.start && c <= iv.end);
        let usable: Vec<PhysReg> = free
            .iter()
            .copied()
            .filter(|p| !(spans_call && PhysReg::CALLER_SAVED.contains(p)))
            .collect();

        if let Some(reg) = usable.last().copied() {
            free.retain(|r| *r != reg);
            active.push((iv.end, reg, iv.id));
            assignment.locations.insert(iv.id, Location::Reg(reg));
        } else if !active.is_empty() {
            // Spill whichever active interval ends furthest in the future;
            // if that is longer-lived than the current one, reuse its
            // register for the current interval instead (classic
            // linear-scan spill heuristic).
            let (spill_pos, _) = active
                .iter()
                .enumerate()
                .max_by_key(|(_, (end, _, _))| *end)
                .unwrap();
            let (spill_end, spill_reg, spill_id) = active[spill_pos];
            if spill_end > iv.end {
                next_spill -= 8;
                assignment.locations.insert(spill_id, Location::Spill(next_spill));
                active.remove(spill_pos);
                active.push((iv.end, spill_reg, iv.id));
                assignment.locations.insert(iv.id, Location::Reg(spill_reg));
            } else {
                next_spill -= 8;
                assignment.locations.insert(iv.id, Location::Spill(next_spill));
            }
        } else {
            next_spill -= 8;
            assignment.locations.insert(iv.id, Location::Spill(next_spill));
        }
    }
}

//! Graph-coloring register allocator (§4.4), the default strategy. Builds an
//! interference graph from the liveness result, colors with the 14
//! allocatable GPRs (or the 16 XMMs for float temps), and on failure spills
//! the highest-degree temp and retries.

use super::liveness::Liveness;
use super::{Assignment, Location};
use crate::ir::func::IrFunction;
use crate::ir::operand::PhysReg;
use std::collections::{BTreeSet, HashMap, HashSet};

struct Graph {
    nodes: HashSet<u32>,
    edges: HashMap<u32, HashSet<u32>>,
}

impl Graph {
    fn new() -> Self {
        Self {
            nodes: HashSet::new(),
            edges: HashMap::new(),
        }
    }

    fn add_node(&mut self, n: u32) {
        self.nodes.insert(n);
        self.edges.entry(n).or_default();
    }

    fn add_edge(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        self.add_node(a);
        self.add_node(b);
        self.edges.get_mut(&a).unwrap().insert(b);
        self.edges.get_mut(&b).unwrap().insert(a);
    }

    fn degree(&self, n: u32) -> usize {
        self.edges.get(&n).map(|s| s.len()).unwrap_or(0)
    }
}

fn build_graph(func: &IrFunction, live: &Liveness, want_float: bool) -> Graph {
    let mut g = Graph::new();
    for (i, inst) in func.insts.iter().enumerate() {
        let live_here: Vec<u32> = live.live_out[i]
            .iter()
            .copied()
            .filter(|id| func.is_float_temp.contains(id) == want_float)
            .collect();
        for a in &live_here {
            g.add_node(*a);
        }
        for a_idx in 0..live_here.len() {
            for b_idx in (a_idx + 1)..live_here.len() {
                g.add_edge(live_here[a_idx], live_here[b_idx]);
            }
        }
        // Only a bare register destination is a real def that interferes
        // with what's live across it; a memory `dst` (store through a
        // pointer/array/member address) merely reads its base/index
        // registers to compute the address, already accounted for in
        // `live_out` via those registers' later uses.
        if let Some(crate::ir::operand::Operand::Reg {
            reg: crate::ir::operand::Reg::Virtual(d),
            ..
        }) = inst.dst_operand()
        {
            if func.is_float_temp.contains(d) == want_float {
                g.add_node(*d);
                for a in &live_here {
                    g.add_edge(*d, *a);
                }
            }
        }
    }
    g
}

pub fn allocate(func: &mut IrFunction, live: &Liveness) -> Assignment {
    let mut assignment = Assignment::default();
    color_class(func, live, false, &PhysReg::ALLOCATABLE_GPR, &mut assignment);
    color_class(func, live, true, &PhysReg::ALLOCATABLE_XMM, &mut assignment);
    assignment
}

fn color_class(
    func: &IrFunction,
    live: &Liveness,
    want_float: bool,
    palette: &[PhysReg],
    assignment: &mut Assignment,
) {
    let full_graph = build_graph(func, live, want_float);
    let mut g = Graph {
        nodes: full_graph.nodes.clone(),
        edges: full_graph.edges.clone(),
    };

    // Calling-convention pre-coloring: a temp live across a call site must
    // not land in a caller-saved register (§4.4). Rather than materializing
    // edges to each caller-saved register, such temps simply have their
    // usable palette narrowed at coloring time below.
    let mut spanning_calls: HashSet<u32> = HashSet::new();
    for &call_idx in &live.call_sites {
        for id in live.live_in[call_idx].intersection(&live.live_out[call_idx]) {
            if func.is_float_temp.contains(id) == want_float {
                spanning_calls.insert(*id);
            }
        }
    }

    // Simplify-and-color: repeatedly remove the lowest-degree node (simplify
    // worklist), pushing onto a stack; when none remain under the palette
    // size, spill the highest-degree remaining node instead and continue.
    // `BTreeSet`, not `HashSet`: ties in "first low-degree node found" and
    // "highest-degree node to spill" are broken by temp id, so the same
    // source always allocates the same way regardless of this process's
    // `HashSet` hasher seed (§8).
    let mut remaining: BTreeSet<u32> = g.nodes.iter().copied().collect();
    let mut stack = Vec::new();
    let mut spilled: BTreeSet<u32> = BTreeSet::new();

    while !remaining.is_empty() {
        let low_degree = remaining
            .iter()
            .copied()
            .find(|n| g.degree(*n) < palette.len());
        if let Some(n) = low_degree {
            stack.push(n);
            remaining.remove(&n);
            for neighbor in g.edges.get(&n).cloned().unwrap_or_default() {
                g.edges.get_mut(&neighbor).map(|s| s.remove(&n));
            }
        } else {
            let spill = remaining
                .iter()
                .copied()
                .max_by_key(|n| g.degree(*n))
                .unwrap();
            spilled.insert(spill);
            remaining.remove(&spill);
            for neighbor in g.edges.get(&spill).cloned().unwrap_or_default() {
                g.edges.get_mut(&neighbor).map(|s| s.remove(&spill));
            }
        }
    }

    let mut colors: HashMap<u32, PhysReg> = HashMap::new();
    while let Some(n) = stack.pop() {
        let neighbor_colors: HashSet<PhysReg> = full_graph
            .edges
            .get(&n)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|nb| colors.get(&nb).copied())
            .collect();
        let available = palette.iter().copied().find(|p| {
            !neighbor_colors.contains(p) && !(spanning_calls.contains(&n) && is_caller_saved(*p))
        });
        match available.or_else(|| palette.iter().copied().find(|p| !neighbor_colors.contains(p))) {
            Some(p) => {
                colors.insert(n, p);
            }
            None => {
                spilled.insert(n);
            }
        }
    }

    for (id, reg) in colors {
        assignment.locations.insert(id, Location::Reg(reg));
    }

    let mut next_spill = func.spill_base;
    for id in spilled {
        next_spill -= 8;
        assignment.locations.insert(id, Location::Spill(next_spill));
    }
}

fn is_caller_saved(p: PhysReg) -> bool {
    PhysReg::CALLER_SAVED.contains(&p)
}

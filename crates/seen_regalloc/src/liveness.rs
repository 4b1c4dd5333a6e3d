//! Per-block live-in/live-out sets (§4.9 step 2: "across-block liveness is
//! extended conservatively using the CFG live-out sets"). Standard backward
//! dataflow over def/use sets; iterates to a fixed point since the MIR CFG
//! may contain loops.

use hashbrown::{HashMap, HashSet};

use seen_codegen::{MachineInstruction, MirBlockId, MirFunction, VRegId};

use crate::cfg::MirCfg;

/// The virtual register a machine instruction defines, and the set it
/// uses. §3.5/§4.7's two-operand legalized form (`ignore_def_flag`) makes
/// `defines_result()` false and folds operand 0 back into the use set,
/// which is exactly the def/use split liveness needs: the prior value in
/// that register must reach this instruction as a use, not a fresh def.
pub fn def_use(inst: &MachineInstruction) -> (Option<VRegId>, Vec<VRegId>) {
    let defines = inst.defines_result();
    let start = if defines { 1 } else { 0 };
    let mut uses = Vec::new();
    for i in start..inst.operands.len() {
        if let Some(v) = inst.operand(i).as_virtual() {
            uses.push(v);
        }
    }
    let def = if defines { inst.operand(0).as_virtual() } else { None };
    (def, uses)
}

#[derive(Debug, Clone, Default)]
pub struct BlockLiveness {
    pub live_in: HashSet<VRegId>,
    pub live_out: HashSet<VRegId>,
}

/// Per-function liveness: one `BlockLiveness` per block, computed by
/// iterating the backward dataflow equations
/// `live_out[b] = union(live_in[s] for s in succ(b))`,
/// `live_in[b] = use[b] | (live_out[b] - def[b])`
/// to a fixed point.
#[derive(Debug, Default)]
pub struct Liveness {
    per_block: HashMap<MirBlockId, BlockLiveness>,
}

impl Liveness {
    pub fn compute(func: &MirFunction, cfg: &MirCfg) -> Self {
        let mut gen: HashMap<MirBlockId, HashSet<VRegId>> = HashMap::new();
        let mut kill: HashMap<MirBlockId, HashSet<VRegId>> = HashMap::new();

        for b in func.block_ids() {
            let mut g = HashSet::new();
            let mut k = HashSet::new();
            for inst in &func.block(b).insts {
                let (def, uses) = def_use(inst);
                for u in uses {
                    if !k.contains(&u) {
                        g.insert(u);
                    }
                }
                if let Some(d) = def {
                    k.insert(d);
                }
            }
            gen.insert(b, g);
            kill.insert(b, k);
        }

        let mut per_block: HashMap<MirBlockId, BlockLiveness> = func.block_ids().map(|b| (b, BlockLiveness::default())).collect();

        let order: Vec<MirBlockId> = if cfg.reverse_postorder.is_empty() {
            func.block_ids().collect()
        } else {
            cfg.reverse_postorder.clone()
        };

        let mut changed = true;
        while changed {
            changed = false;
            for &b in order.iter().rev() {
                let mut live_out = HashSet::new();
                for &s in cfg.successors(b) {
                    live_out.extend(per_block[&s].live_in.iter().copied());
                }
                let mut live_in = gen[&b].clone();
                for v in live_out.difference(&kill[&b]) {
                    live_in.insert(*v);
                }
                let entry = per_block.get_mut(&b).unwrap();
                if entry.live_out != live_out || entry.live_in != live_in {
                    entry.live_out = live_out;
                    entry.live_in = live_in;
                    changed = true;
                }
            }
        }

        Self { per_block }
    }

    pub fn block(&self, block: MirBlockId) -> &BlockLiveness {
        &self.per_block[&block]
    }

    pub fn is_live_out(&self, block: MirBlockId, reg: VRegId) -> bool {
        self.per_block.get(&block).map(|l| l.live_out.contains(&reg)).unwrap_or(false)
    }
}

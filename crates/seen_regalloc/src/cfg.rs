//! Control-flow graph over [`MirFunction`] blocks, mirroring
//! `seen_ir::analysis::cfg::Cfg`'s shape but read off machine terminators
//! (`Br`/`CondBr`/`Switch`/`Ret`) instead of IR ones. The linear scanner
//! (§4.9 step 1) needs a reverse-postorder block order, and liveness
//! (§4.9 step 2) needs predecessor/successor adjacency to propagate
//! live-out sets across block boundaries.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use seen_codegen::{MachineOpcode, MirBlockId, MirFunction};

/// Successor blocks of `block`'s terminator, read directly off its `Block`
/// operands (§3.5's lowering never threads successors through a side
/// channel — see `seen_codegen::operand`'s doc comment on why `Block` is an
/// operand variant).
pub fn successors(func: &MirFunction, block: MirBlockId) -> SmallVec<[MirBlockId; 4]> {
    let Some(last) = func.block(block).insts.last() else {
        return SmallVec::new();
    };
    if !last.opcode.is_terminator() {
        return SmallVec::new();
    }
    last.operands.iter().filter_map(|op| op.as_block()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct MirCfg {
    successors: HashMap<MirBlockId, SmallVec<[MirBlockId; 4]>>,
    predecessors: HashMap<MirBlockId, Vec<MirBlockId>>,
    /// Reverse postorder from the entry block; §4.9 step 1's "linearise
    /// blocks by reverse post-order".
    pub reverse_postorder: Vec<MirBlockId>,
}

impl MirCfg {
    pub fn compute(func: &MirFunction) -> Self {
        let mut succs = HashMap::new();
        let mut preds: HashMap<MirBlockId, Vec<MirBlockId>> = HashMap::new();
        for b in func.block_ids() {
            let s = successors(func, b);
            for &t in &s {
                preds.entry(t).or_default().push(b);
            }
            succs.insert(b, s);
        }

        let mut reverse_postorder = Vec::new();
        if let Some(entry) = func.entry {
            let mut visited = HashSet::new();
            let mut postorder = Vec::new();
            let mut stack = vec![(entry, false)];
            while let Some((block, processed)) = stack.pop() {
                if processed {
                    postorder.push(block);
                    continue;
                }
                if !visited.insert(block) {
                    continue;
                }
                stack.push((block, true));
                for &succ in succs.get(&block).into_iter().flatten() {
                    if !visited.contains(&succ) {
                        stack.push((succ, false));
                    }
                }
            }
            postorder.reverse();
            reverse_postorder = postorder;
        }

        Self { successors: succs, predecessors: preds, reverse_postorder }
    }

    pub fn successors(&self, block: MirBlockId) -> &[MirBlockId] {
        self.successors.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn predecessors(&self, block: MirBlockId) -> &[MirBlockId] {
        self.predecessors.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

pub(crate) fn is_call(opcode: &MachineOpcode) -> bool {
    matches!(opcode, MachineOpcode::Call)
}

//! Control-flow graph analysis (§4.4). Computes successor/predecessor
//! adjacency and reverse-postorder once per function and caches it,
//! mirroring `CFGAnalysisPass`'s role as the single source of truth CFG
//! rewrites and the register allocator's liveness scan both read from.

use hashbrown::HashMap;

use crate::block::BlockId;
use crate::module::{FunctionId, Module};
use crate::pass::FunctionAnalysis;

#[derive(Debug, Clone, Default)]
pub struct Cfg {
    successors: HashMap<BlockId, Vec<BlockId>>,
    predecessors: HashMap<BlockId, Vec<BlockId>>,
    /// Blocks in reverse-postorder from the entry block; blocks
    /// unreachable from entry are omitted (§4.6's unreachable-block rule
    /// reads this list to find its deletion candidates).
    pub reverse_postorder: Vec<BlockId>,
}

impl Cfg {
    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        self.successors.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.predecessors.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reverse_postorder.contains(&block)
    }
}

impl FunctionAnalysis for Cfg {
    fn compute(module: &Module, function: FunctionId) -> Self {
        let f = module.function(function);
        let mut successors = HashMap::new();
        let mut predecessors: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for block in f.block_ids() {
            let succs: Vec<BlockId> = f.successors(block).into_iter().collect();
            for &s in &succs {
                predecessors.entry(s).or_default().push(block);
            }
            successors.insert(block, succs);
        }

        let mut reverse_postorder = Vec::new();
        if let Some(entry) = f.entry {
            let mut visited = hashbrown::HashSet::new();
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
                for &succ in successors.get(&block).into_iter().flatten() {
                    if !visited.contains(&succ) {
                        stack.push((succ, false));
                    }
                }
            }
            postorder.reverse();
            reverse_postorder = postorder;
        }

        Self { successors, predecessors, reverse_postorder }
    }
}

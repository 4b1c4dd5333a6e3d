//! Dominator tree (§4.4), computed with the iterative Cooper/Harvey/Kennedy
//! algorithm over the cached [`Cfg`]'s reverse-postorder. Feeds the
//! inliner's and CFG-simplifier's reachability reasoning and, later, the
//! register allocator's live-range splitting heuristics.

use hashbrown::HashMap;

use crate::block::BlockId;
use crate::module::{FunctionId, Module};
use crate::pass::FunctionAnalysis;

use super::cfg::Cfg;

#[derive(Debug, Clone, Default)]
pub struct DominatorTree {
    idom: HashMap<BlockId, BlockId>,
    entry: Option<BlockId>,
}

impl DominatorTree {
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    /// Whether `a` dominates `b`, inclusive (`a == b` dominates itself).
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        while let Some(idom) = self.idom.get(&cur) {
            if *idom == a {
                return true;
            }
            if *idom == cur {
                break;
            }
            cur = *idom;
        }
        false
    }
}

impl FunctionAnalysis for DominatorTree {
    fn compute(module: &Module, function: FunctionId) -> Self {
        let cfg = Cfg::compute(module, function);
        let f = module.function(function);
        let Some(entry) = f.entry else {
            return Self::default();
        };
        let rpo = &cfg.reverse_postorder;
        let position: HashMap<BlockId, usize> = rpo.iter().enumerate().map(|(i, b)| (*b, i)).collect();

        let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter() {
                if block == entry {
                    continue;
                }
                let mut new_idom = None;
                for &pred in cfg.predecessors(block) {
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &position, current, pred),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&block) != Some(&new_idom) {
                        idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }

        Self { idom, entry: Some(entry) }
    }
}

fn intersect(idom: &HashMap<BlockId, BlockId>, position: &HashMap<BlockId, usize>, mut a: BlockId, mut b: BlockId) -> BlockId {
    while a != b {
        while position[&a] > position[&b] {
            a = idom[&a];
        }
        while position[&b] > position[&a] {
            b = idom[&b];
        }
    }
    a
}

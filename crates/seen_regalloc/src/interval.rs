//! Live intervals (§4.9 steps 1–2): a linear instruction numbering over the
//! reverse-postorder block order, and the convex-hull `[start, end]` each
//! virtual register's live range collapses to.

use hashbrown::HashMap;

use seen_codegen::{MirBlockId, MirFunction, OperandWidth, VRegId};

use crate::cfg::MirCfg;
use crate::liveness::{def_use, Liveness};

pub type ProgramPoint = u32;

/// Linearises a function's blocks (§4.9 step 1) and records, for each
/// block, the `[first, last]` program-point range its instructions occupy
/// — liveness' cross-block extension (`last_use` pushed out to a live-out
/// block's last point) reads this back.
pub struct LinearProgram {
    pub order: Vec<MirBlockId>,
    pub block_range: HashMap<MirBlockId, (ProgramPoint, ProgramPoint)>,
    pub point_of: HashMap<(MirBlockId, usize), ProgramPoint>,
}

impl LinearProgram {
    pub fn build(func: &MirFunction, cfg: &MirCfg) -> Self {
        let order: Vec<MirBlockId> = if cfg.reverse_postorder.is_empty() {
            func.block_ids().collect()
        } else {
            cfg.reverse_postorder.clone()
        };

        let mut block_range = HashMap::new();
        let mut point_of = HashMap::new();
        let mut next: ProgramPoint = 0;
        for &b in &order {
            let first = next;
            let insts = &func.block(b).insts;
            if insts.is_empty() {
                // An empty block still occupies one program point so it
                // participates in the live-out extension below.
                point_of.insert((b, 0), next);
                next += 1;
            } else {
                for i in 0..insts.len() {
                    point_of.insert((b, i), next);
                    next += 1;
                }
            }
            block_range.insert(b, (first, next - 1));
        }

        Self { order, block_range, point_of }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LiveInterval {
    pub vreg: VRegId,
    pub start: ProgramPoint,
    pub end: ProgramPoint,
    pub width: OperandWidth,
}

impl LiveInterval {
    pub fn overlaps(&self, other: &LiveInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains_point(&self, point: ProgramPoint) -> bool {
        self.start <= point && point <= self.end
    }
}

/// Builds one interval per virtual register referenced anywhere in `func`
/// (§4.9 step 2). `start` is the earliest definition point seen (or the
/// function's first program point, for a register alive before any local
/// def — e.g. an argument-receiving copy the legalizer prepended); `end` is
/// the latest use, extended to a block's last point whenever the register
/// is live-out of that block (the "conservative" extension spec.md asks
/// for, so a loop-carried value's interval spans the whole loop rather than
/// just its last textual use before the back edge).
pub fn build_intervals(func: &MirFunction, cfg: &MirCfg, liveness: &Liveness, program: &LinearProgram) -> Vec<LiveInterval> {
    let mut starts: HashMap<VRegId, ProgramPoint> = HashMap::new();
    let mut ends: HashMap<VRegId, ProgramPoint> = HashMap::new();
    let mut widths: HashMap<VRegId, OperandWidth> = HashMap::new();

    let mut touch_start = |reg: VRegId, point: ProgramPoint, starts: &mut HashMap<VRegId, ProgramPoint>| {
        starts.entry(reg).and_modify(|s| *s = (*s).min(point)).or_insert(point);
    };
    let mut touch_end = |reg: VRegId, point: ProgramPoint, ends: &mut HashMap<VRegId, ProgramPoint>| {
        ends.entry(reg).and_modify(|e| *e = (*e).max(point)).or_insert(point);
    };

    for &b in &program.order {
        for (i, inst) in func.block(b).insts.iter().enumerate() {
            let point = program.point_of[&(b, i)];
            let (def, uses) = def_use(inst);
            for op in &inst.operands {
                if let Some(v) = op.as_virtual() {
                    widths.entry(v).or_insert(op.width());
                }
            }
            if let Some(d) = def {
                touch_start(d, point, &mut starts);
                touch_end(d, point, &mut ends);
            }
            for u in uses {
                touch_end(u, point, &mut ends);
                // A use with no recorded def yet (a cross-block live-in,
                // e.g. the phi-resolution copies in a loop header reached
                // before their own producer in program order) starts at
                // the function's first point; a real earlier def overrides
                // this via `touch_start`'s min.
                starts.entry(u).or_insert(0);
            }
        }

        // Cross-block extension: every register live-out of `b` must have
        // its interval cover at least through `b`'s last point.
        let (_, last) = program.block_range[&b];
        for &v in &liveness.block(b).live_out {
            touch_end(v, last, &mut ends);
        }
    }

    starts
        .into_iter()
        .filter_map(|(vreg, start)| {
            let end = *ends.get(&vreg)?;
            let width = widths.get(&vreg).copied().unwrap_or(OperandWidth::Int64);
            Some(LiveInterval { vreg, start, end: end.max(start), width })
        })
        .collect()
}

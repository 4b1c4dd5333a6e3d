//! Analyses computed over the IR on demand and cached by the pass
//! manager's `AnalysisManager` (§4.4, C7).

pub mod cfg;
pub mod dominance;

pub use cfg::Cfg;
pub use dominance::DominatorTree;

//! Transform passes (§4.5, §4.6, C7): the function inliner and CFG
//! simplification. Both are ordinary [`crate::pass::FunctionPass`]
//! implementations so they compose with any pipeline built from
//! [`crate::pass::PassManager`].

pub mod inliner;
pub mod simplify_cfg;

pub use inliner::FunctionInlinerPass;
pub use simplify_cfg::SimplifyCfgPass;

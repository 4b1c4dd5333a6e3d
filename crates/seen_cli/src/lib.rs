//! Library surface for the `seen` driver binary. Split out purely so
//! `tests/` can exercise [`pipeline::compile`] and friends directly;
//! the crate has no lexer/parser of its own, so there is nothing else
//! worth giving a library boundary.

pub mod pipeline;

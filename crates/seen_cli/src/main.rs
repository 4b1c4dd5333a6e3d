//! Driver binary (§6.4, C1-C11 wiring). Reads a JSON-serialized
//! [`seen_ast::Program`] — the stand-in `seen_ast` documents itself as,
//! since no lexer/parser is in scope — and drives it through IR
//! generation, the optimization pipeline, MIR lowering, register
//! allocation, and x64 assembly emission.
//!
//! Flags mirror the subset of `original_source/OlaCompiler/Compiler/
//! CompileRequest.cpp` the core must honor: optimization level, the two
//! `--emit-*` toggles, and the three analysis dump flags. Everything else
//! that request type carries (source search paths, the `-nollvm`
//! interpreter switch, test-harness flags) belongs to the external driver
//! and is out of scope here.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use seen_cli::pipeline;
use seen_common::SeenResult;

/// The Seen compiler middle/back-end driver.
#[derive(Parser)]
#[command(name = "seen")]
#[command(about = "Compiles a Seen AST module down to x64 assembly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to a JSON-serialized `seen_ast::Program`.
    input: PathBuf,

    /// Disable optimization passes (alias of --O0).
    #[arg(long = "Od")]
    od: bool,

    #[arg(long = "O0")]
    o0: bool,

    #[arg(long = "O1")]
    o1: bool,

    #[arg(long = "O2")]
    o2: bool,

    #[arg(long = "O3")]
    o3: bool,

    /// Print the lowered SSA IR (post-pipeline) to stdout.
    #[arg(long = "emit-ir")]
    emit_ir: bool,

    /// Print x64 assembly to stdout.
    #[arg(long = "emit-asm")]
    emit_asm: bool,

    /// Dump each function's CFG (predecessor/successor lists).
    #[arg(long = "cfg")]
    dump_cfg: bool,

    /// Dump each function's dominator tree (immediate dominators).
    #[arg(long = "domtree")]
    dump_domtree: bool,

    /// Dump the module's call graph (caller → callees).
    #[arg(long = "callgraph")]
    dump_callgraph: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum OptLevel {
    O0,
    O1,
    O2,
    O3,
}

impl Cli {
    /// `Od` is a bare alias of `O0` (§6.4); the highest explicit `-O`
    /// flag given wins if more than one is passed.
    fn opt_level(&self) -> OptLevel {
        if self.o3 {
            OptLevel::O3
        } else if self.o2 {
            OptLevel::O2
        } else if self.o1 {
            OptLevel::O1
        } else {
            OptLevel::O0
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seen: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> SeenResult<()> {
    let text = fs::read_to_string(&cli.input).map_err(|e| seen_common::SeenError::io(format!("reading '{}': {}", cli.input.display(), e)))?;
    let program: seen_ast::Program =
        serde_json::from_str(&text).map_err(|e| seen_common::SeenError::unsupported(format!("parsing AST JSON '{}': {}", cli.input.display(), e)))?;

    pipeline::compile(
        &program,
        pipeline::Options {
            optimize: cli.opt_level() != OptLevel::O0,
            emit_ir: cli.emit_ir,
            emit_asm: cli.emit_asm,
            dump_cfg: cli.dump_cfg,
            dump_domtree: cli.dump_domtree,
            dump_callgraph: cli.dump_callgraph,
        },
    )
}

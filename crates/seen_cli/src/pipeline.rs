//! End-to-end driver pipeline (§2's control-flow line: AST → IR generator
//! → pass pipeline → MIR lowering → register allocation → assembly
//! emission), plus the three analysis dumps §6.4 names.

use seen_codegen::{lower_module, MirGlobal, Target};
use seen_common::SeenResult;
use seen_ir::analysis::{Cfg, DominatorTree};
use seen_ir::pass::{FunctionAnalysis, PassManager};
use seen_ir::transform::{FunctionInlinerPass, SimplifyCfgPass};
use seen_ir::{generate_module, print_module, verify_module, Context, FunctionId, Module, Opcode, ValueRef};
use seen_x64::X64Target;

pub struct Options {
    pub optimize: bool,
    pub emit_ir: bool,
    pub emit_asm: bool,
    pub dump_cfg: bool,
    pub dump_domtree: bool,
    pub dump_callgraph: bool,
}

pub fn compile(program: &seen_ast::Program, opts: Options) -> SeenResult<()> {
    let mut ctx = Context::new();
    let mut module = generate_module(&mut ctx, "main", program)?;
    verify_module(&ctx, &module)?;

    if opts.optimize {
        let mut passes = PassManager::new();
        passes.add_function_pass(FunctionInlinerPass);
        passes.add_function_pass(SimplifyCfgPass);
        passes.run(&mut ctx, &mut module)?;
        verify_module(&ctx, &module)?;
    }

    if opts.dump_cfg {
        dump_cfg(&module);
    }
    if opts.dump_domtree {
        dump_domtree(&module);
    }
    if opts.dump_callgraph {
        dump_callgraph(&module);
    }

    if opts.emit_ir {
        println!("{}", print_module(&ctx, &module));
    }

    if opts.emit_asm {
        let target = X64Target::default();
        let mut mir = lower_module(&ctx, &module, &target)?;
        for id in mir.global_ids().collect::<Vec<_>>() {
            if let MirGlobal::Function(f) = mir.global_mut(id) {
                if !f.is_declaration() {
                    seen_regalloc::allocate(f, target.register_info())?;
                }
            }
        }
        let asm = seen_codegen::AsmPrinter::print_module(target.asm_printer(), &mir, target.register_info());
        println!("{}", asm);
    }

    Ok(())
}

fn dump_cfg(module: &Module) {
    for fid in module.function_ids() {
        let f = module.function(fid);
        if f.is_declaration() {
            continue;
        }
        let cfg = Cfg::compute(module, fid);
        println!("cfg {}:", f.name);
        for id in f.block_ids() {
            let succs: Vec<String> = cfg.successors(id).iter().map(|b| block_name(module, fid, *b)).collect();
            println!("  {} -> [{}]", f.block(id).name, succs.join(", "));
        }
    }
}

fn dump_domtree(module: &Module) {
    for fid in module.function_ids() {
        let f = module.function(fid);
        if f.is_declaration() {
            continue;
        }
        let dom = DominatorTree::compute(module, fid);
        println!("domtree {}:", f.name);
        for id in f.block_ids() {
            let name = &f.block(id).name;
            match dom.immediate_dominator(id) {
                Some(idom) if block_name(module, fid, idom) != *name => {
                    println!("  {} idom {}", name, block_name(module, fid, idom));
                }
                _ => println!("  {} (entry)", name),
            }
        }
    }
}

fn dump_callgraph(module: &Module) {
    println!("callgraph:");
    for fid in module.function_ids() {
        let f = module.function(fid);
        if f.is_declaration() {
            continue;
        }
        let mut callees = Vec::new();
        for inst in &f.insts {
            if let Opcode::Call = inst.opcode {
                if let ValueRef::Function(callee) = inst.operands[0] {
                    callees.push(module.function(callee).name.clone());
                }
            }
        }
        callees.sort();
        callees.dedup();
        println!("  {} -> [{}]", f.name, callees.join(", "));
    }
}

fn block_name(module: &Module, fid: FunctionId, block: seen_ir::BlockId) -> String {
    module.function(fid).block(block).name.clone()
}

//! Compiles integer arithmetic expressions into native executables whose exit
//! status is the computed value.
//!
//! - `lexer` turns source text into a lazy token stream.
//! - `parser` builds an [`ast::Expr`] honouring precedence and left-associativity.
//! - `codegen` lowers the tree into an LLVM module with a single `i32 main()`.
//! - `emit` writes the module as a host object file.
//! - `link` hands the object to the system linker.
//!
//! Every call owns its own LLVM context, so compilations of different
//! expressions can run on separate threads as long as their outputs differ.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod link;
pub mod parser;

use std::path::{Path, PathBuf};

use inkwell::context::Context as LlvmContext;
use tracing::{debug, info_span};

pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult, Phase};
pub use parser::parse;

const MODULE_NAME: &str = "arithc";

/// Files produced by a successful [`compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// `None` when the object was removed after linking.
    pub object: Option<PathBuf>,
    pub executable: PathBuf,
}

/// Lower `source` to textual LLVM IR without touching the filesystem.
pub fn emit_ir(source: &str) -> CompileResult<String> {
    let expr = parse(source)?;
    let ctx = LlvmContext::create();
    let mut cg = codegen::Codegen::new(&ctx, MODULE_NAME, &codegen::host_triple());
    cg.emit_main(&expr)?;
    cg.verify()?;
    Ok(cg.ir_string())
}

/// Compile `source` into `<output>.o` and the executable `<output>`.
///
/// Nothing is written until the front end and code generator have succeeded,
/// and any file left incomplete by a failing step is removed.
pub fn compile(source: &str, output: &Path, config: &CompilerConfig) -> CompileResult<Artifacts> {
    let span = info_span!("compile", output = %output.display());
    let _guard = span.enter();

    let expr = parse(source)?;

    let ctx = LlvmContext::create();
    let triple = codegen::host_triple();
    let mut cg = codegen::Codegen::new(&ctx, MODULE_NAME, &triple);
    cg.emit_main(&expr)?;
    cg.verify()?;
    // the tree is no longer needed once IR exists
    drop(expr);

    debug!(
        opt_level = ?config.opt_level,
        source = %config.opt_level_source,
        "creating host target machine"
    );
    let machine = emit::host_target_machine(&triple, config.opt_level)?;
    let linker = link::Linker::resolve(config.linker.as_deref())?;

    let object = emit::object_path(output);
    let executable = link::executable_path(output);
    emit::write_object(cg.module(), &machine, &object)?;

    let linked = linker.link(&object, &executable);
    if linked.is_err() || !config.keep_object {
        emit::remove_if_present(&object);
    }
    linked?;

    debug!(object = %object.display(), kept = config.keep_object, "compilation finished");
    Ok(Artifacts {
        object: config.keep_object.then_some(object),
        executable,
    })
}

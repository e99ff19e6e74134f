//! LLVM IR generation for arithmetic expressions using Inkwell.

use inkwell::{
    builder::Builder,
    context::Context as LlvmContext,
    module::Module,
    targets::{TargetMachine, TargetTriple},
    values::{FunctionValue, InstructionValue, IntValue},
};
use tracing::debug;

use crate::{
    ast::{BinOp, Expr},
    error::{CompileError, CompileResult},
};

/// Builds a module holding a single `i32 main()` that returns the expression.
pub struct Codegen<'ctx> {
    ctx: &'ctx LlvmContext,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
}

impl<'ctx> Codegen<'ctx> {
    /// Create a new code generator configured for the supplied target triple.
    pub fn new(ctx: &'ctx LlvmContext, module_name: &str, triple: &TargetTriple) -> Self {
        let module = ctx.create_module(module_name);
        module.set_triple(triple);
        let builder = ctx.create_builder();
        Self { ctx, builder, module }
    }

    /// Emit `main` with one `entry` block terminated by a single `ret`.
    pub fn emit_main(&mut self, expr: &Expr) -> CompileResult<FunctionValue<'ctx>> {
        let i32_t = self.ctx.i32_type();
        let main_fn = self.module.add_function("main", i32_t.fn_type(&[], false), None);
        let entry = self.ctx.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);

        let result = self.gen_expr(expr)?;
        self.builder.build_return(Some(&result)).map_err(builder_error)?;
        debug!(nodes = expr.node_count(), "emitted main");
        Ok(main_fn)
    }

    /// Generate an `i32` value for the given expression.
    ///
    /// The left operand is always generated before the right one. Literal
    /// operands of add/sub/mul are folded by the builder.
    fn gen_expr(&mut self, expr: &Expr) -> CompileResult<IntValue<'ctx>> {
        let i32_t = self.ctx.i32_type();

        Ok(match expr {
            // literal integers map directly to LLVM constants
            Expr::Literal(v) => i32_t.const_int(*v as i64 as u64, true),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.gen_expr(lhs)?;
                let r = self.gen_expr(rhs)?;
                let b = &self.builder;
                let value = match op {
                    BinOp::Add => b.build_int_add(l, r, "add"),
                    BinOp::Sub => b.build_int_sub(l, r, "sub"),
                    BinOp::Mul => b.build_int_mul(l, r, "mul"),
                    BinOp::Div => {
                        let r = self.opaque_divisor(r)?;
                        self.builder.build_int_signed_div(l, r, "div")
                    }
                };
                value.map_err(builder_error)?
            }
        })
    }

    /// Route a divisor through a volatile stack slot.
    ///
    /// Every operand in this language is a constant, and the builder would
    /// fold `sdiv` by zero (or `i32::MIN / -1`) into `poison`. Reading the
    /// divisor back with a volatile load keeps a real divide instruction in
    /// the object, so those cases fault when the program runs.
    fn opaque_divisor(&self, divisor: IntValue<'ctx>) -> CompileResult<IntValue<'ctx>> {
        let i32_t = self.ctx.i32_type();
        let slot = self.builder.build_alloca(i32_t, "divisor").map_err(builder_error)?;
        let store = self.builder.build_store(slot, divisor).map_err(builder_error)?;
        set_volatile(store)?;
        let loaded = self
            .builder
            .build_load(slot, "divisor.val")
            .map_err(builder_error)?
            .into_int_value();
        let load = loaded
            .as_instruction()
            .ok_or_else(|| CompileError::Codegen("divisor load is not an instruction".into()))?;
        set_volatile(load)?;
        Ok(loaded)
    }

    /// Run the LLVM verifier over the module.
    pub fn verify(&self) -> CompileResult<()> {
        self.module.verify().map_err(|e| CompileError::Codegen(e.to_string()))
    }

    /// Textual LLVM IR for the module.
    pub fn ir_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }
}

fn builder_error(err: inkwell::builder::BuilderError) -> CompileError {
    CompileError::Codegen(err.to_string())
}

fn set_volatile(inst: InstructionValue<'_>) -> CompileResult<()> {
    inst.set_volatile(true).map_err(|e| CompileError::Codegen(e.to_string()))
}

/// Grab the default target triple for the build machine.
pub fn host_triple() -> TargetTriple {
    TargetMachine::get_default_triple()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn ir_for(src: &str) -> String {
        let ctx = LlvmContext::create();
        let mut cg = Codegen::new(&ctx, "test", &host_triple());
        cg.emit_main(&parse(src).unwrap()).unwrap();
        cg.verify().unwrap();
        cg.ir_string()
    }

    #[test]
    fn literal_becomes_i32_return() {
        let ir = ir_for("42");
        assert!(ir.contains("define i32 @main()"), "{ir}");
        assert!(ir.contains("ret i32 42"), "{ir}");
    }

    #[test]
    fn main_has_a_single_entry_block_and_return() {
        let ir = ir_for("3 + 4 * (2 - 1)");
        assert_eq!(ir.matches("define ").count(), 1, "{ir}");
        assert_eq!(ir.matches("ret i32").count(), 1, "{ir}");
        assert!(ir.contains("entry:"), "{ir}");
    }

    #[test]
    fn literal_operands_are_folded() {
        assert!(ir_for("3 + 4 * 2").contains("ret i32 11"));
        assert!(ir_for("10 - 2 - 3").contains("ret i32 5"));
        assert!(ir_for("(3 + 4) * 2").contains("ret i32 14"));
    }

    #[test]
    fn division_keeps_a_runtime_divide() {
        for src in ["1 / 0", "7 / 2", "(0 - 2147483647 - 1) / (0 - 1)"] {
            let ir = ir_for(src);
            assert!(!ir.contains("poison"), "{ir}");
            assert!(ir.contains("load volatile i32"), "{ir}");
            assert!(ir.contains("sdiv i32"), "{ir}");
            assert_eq!(ir.matches("ret i32").count(), 1, "{ir}");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(ir_for("1 + 2 * 3 / 4"), ir_for("1 + 2 * 3 / 4"));
    }
}

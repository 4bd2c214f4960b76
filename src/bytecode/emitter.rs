use std::collections::HashMap;

use crate::ast::{self, BinaryOp, Decl, Expr, ForInit, Stmt, UnaryOp};
use crate::bytecode::container::{Container, ContainerFlags};
use crate::bytecode::opcode::Opcode;
use crate::diagnostics::{Diagnostics, EmitError};
use crate::options::CompileOptions;

const LOCAL_CAPACITY: u32 = 512;
/// Reserved local slot used to discard a value whose expression-statement
/// result is unused (`spec.md` §4.4 "Expression statement").
const SENTINEL_LOCAL: u32 = LOCAL_CAPACITY - 1;

/// Tracks where a loop's `break`/`continue` jump targets are, so the
/// side-stack described in `spec.md` §4.4 can patch them once the loop's
/// full structure is known.
#[derive(Default)]
struct LoopCtx {
    continue_patches: Vec<usize>,
    break_patches: Vec<usize>,
}

/// Walks an AST translation unit and lowers it into a linear instruction
/// stream plus a container header (`spec.md` §4.4).
///
/// Mirrors the teacher's cursor-based reserve-then-patch idiom for forward
/// references: a branch reserves a 4-byte slot, records its offset, then
/// once the target is known the slot is overwritten in place.
pub struct Emitter<'file> {
    diagnostics: Diagnostics,
    options: CompileOptions,
    code: Vec<u8>,
    locals: HashMap<String, u32>,
    next_local: u32,
    loop_stack: Vec<LoopCtx>,
    _marker: std::marker::PhantomData<&'file ()>,
}

impl<'file> Emitter<'file> {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(options.warnings_as_errors),
            options,
            code: Vec::new(),
            locals: HashMap::new(),
            next_local: 0,
            loop_stack: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Emits a complete translation unit and returns the resulting
    /// container plus any diagnostics recorded along the way.
    pub fn emit_program(
        mut self,
        program: &ast::Program<'file>,
    ) -> Result<(Container, Diagnostics), EmitError> {
        for decl in &program.declarations {
            self.emit_decl(decl)?;
        }

        // A translation unit with no function bodies still produces a
        // runnable container: the implicit `CONST_I32 0; HALT` fallback
        // (`spec.md` §8 "Boundary behaviors").
        if self.code.is_empty() {
            self.emit_const_i32(0);
            self.emit_opcode(Opcode::Halt);
        }

        let mut container = Container::new(self.code);
        if self.options.emit_debug_info {
            container.flags |= ContainerFlags::DEBUG_INFO;
        }
        Ok((container, self.diagnostics))
    }

    // --- low-level code buffer helpers ---------------------------------

    fn here(&self) -> usize {
        self.code.len()
    }

    fn emit_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    fn emit_opcode(&mut self, op: Opcode) {
        self.emit_u8(op as u8);
    }

    fn emit_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    fn emit_const_i32(&mut self, value: i32) {
        self.emit_opcode(Opcode::ConstI32);
        self.emit_i32(value);
    }

    /// Reserves a 4-byte branch operand slot, returning its offset for a
    /// later `patch`.
    fn reserve_branch(&mut self, op: Opcode) -> usize {
        self.emit_opcode(op);
        let at = self.here();
        self.emit_u32(0);
        at
    }

    fn patch(&mut self, at: usize, target: u32) {
        self.code[at..at + 4].copy_from_slice(&target.to_le_bytes());
    }

    fn emit_drop(&mut self) {
        self.emit_opcode(Opcode::StoreLocal);
        self.emit_u32(SENTINEL_LOCAL);
    }

    // --- local variable table -------------------------------------------

    fn alloc_local(&mut self, name: &str) -> Result<u32, EmitError> {
        if let Some(&idx) = self.locals.get(name) {
            return Ok(idx);
        }
        if self.next_local >= SENTINEL_LOCAL {
            return Err(EmitError::TooManyLocals(LOCAL_CAPACITY as usize));
        }
        let idx = self.next_local;
        self.next_local += 1;
        self.locals.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn local_index(&mut self, name: &str, pos: crate::token::SourcePos<'file>) -> u32 {
        if let Some(&idx) = self.locals.get(name) {
            return idx;
        }
        self.diagnostics.warn(
            pos,
            format!("undeclared identifier `{name}`, loading sentinel slot"),
        );
        SENTINEL_LOCAL
    }

    // --- declarations -----------------------------------------------------

    fn emit_decl(&mut self, decl: &Decl<'file>) -> Result<(), EmitError> {
        match decl {
            Decl::Function(f) => self.emit_function(f),
            Decl::Variable(v) => {
                if let Some(init) = &v.initializer {
                    self.emit_expr(init)?;
                    self.emit_drop();
                }
                Ok(())
            }
            Decl::Record(_) | Decl::Module(_) => Ok(()),
        }
    }

    fn emit_function(&mut self, f: &ast::FunctionDecl<'file>) -> Result<(), EmitError> {
        self.locals.clear();
        self.next_local = 0;

        for param in &f.params {
            if let Some(name) = &param.name {
                self.alloc_local(name)?;
            }
        }

        if let Some(body) = &f.body {
            self.emit_stmt(body)?;
        }

        // "If control falls off the end, emit CONST_I32 0; HALT." A prior
        // `return` already halted the VM at runtime, so this tail is only
        // reached when the body never returns.
        self.emit_const_i32(0);
        self.emit_opcode(Opcode::Halt);
        Ok(())
    }

    // --- statements -------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt<'file>) -> Result<(), EmitError> {
        match stmt {
            Stmt::Compound { statements, .. } => {
                for s in statements {
                    self.emit_stmt(s)?;
                }
                Ok(())
            }
            Stmt::VarDecl(decl) => {
                let idx = self.alloc_local(&decl.name)?;
                if let Some(init) = &decl.initializer {
                    self.emit_expr(init)?;
                    self.emit_opcode(Opcode::StoreLocal);
                    self.emit_u32(idx);
                }
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.emit_expr(condition)?;
                let jz_else = self.reserve_branch(Opcode::Jz);
                self.emit_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    let jmp_end = self.reserve_branch(Opcode::Jmp);
                    self.patch(jz_else, self.here() as u32);
                    self.emit_stmt(else_branch)?;
                    self.patch(jmp_end, self.here() as u32);
                } else {
                    self.patch(jz_else, self.here() as u32);
                }
                Ok(())
            }
            Stmt::While { condition, body, .. } => {
                let loop_start = self.here() as u32;
                self.emit_expr(condition)?;
                let jz_exit = self.reserve_branch(Opcode::Jz);
                self.loop_stack.push(LoopCtx::default());
                self.emit_stmt(body)?;
                let ctx = self.loop_stack.pop().unwrap();
                for at in ctx.continue_patches {
                    self.patch(at, loop_start);
                }
                let jmp_back = self.reserve_branch(Opcode::Jmp);
                self.patch(jmp_back, loop_start);
                let exit_target = self.here() as u32;
                self.patch(jz_exit, exit_target);
                for at in ctx.break_patches {
                    self.patch(at, exit_target);
                }
                Ok(())
            }
            Stmt::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                if let Some(init) = init {
                    match init.as_ref() {
                        ForInit::Decl(decl) => {
                            let idx = self.alloc_local(&decl.name)?;
                            if let Some(expr) = &decl.initializer {
                                self.emit_expr(expr)?;
                                self.emit_opcode(Opcode::StoreLocal);
                                self.emit_u32(idx);
                            }
                        }
                        ForInit::Expr(expr) => {
                            self.emit_expr(expr)?;
                            self.emit_drop();
                        }
                    }
                }

                let loop_start = self.here() as u32;
                if let Some(condition) = condition {
                    self.emit_expr(condition)?;
                } else {
                    self.emit_const_i32(1);
                }
                let jz_exit = self.reserve_branch(Opcode::Jz);

                self.loop_stack.push(LoopCtx::default());
                self.emit_stmt(body)?;
                let ctx = self.loop_stack.pop().unwrap();

                let increment_pos = self.here() as u32;
                for at in ctx.continue_patches {
                    self.patch(at, increment_pos);
                }
                if let Some(increment) = increment {
                    self.emit_expr(increment)?;
                    self.emit_drop();
                }
                let jmp_back = self.reserve_branch(Opcode::Jmp);
                self.patch(jmp_back, loop_start);

                let exit_target = self.here() as u32;
                self.patch(jz_exit, exit_target);
                for at in ctx.break_patches {
                    self.patch(at, exit_target);
                }
                Ok(())
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.emit_expr(value)?;
                } else {
                    self.emit_const_i32(0);
                }
                self.emit_opcode(Opcode::Halt);
                Ok(())
            }
            Stmt::Break { pos } => {
                if self.loop_stack.is_empty() {
                    self.diagnostics.error(*pos, "`break` outside a loop");
                    return Ok(());
                }
                // BREAK is a marker opcode; the actual control transfer is
                // the JMP reserved immediately after it.
                self.emit_opcode(Opcode::Break);
                let jmp = self.reserve_branch(Opcode::Jmp);
                self.loop_stack.last_mut().unwrap().break_patches.push(jmp);
                Ok(())
            }
            Stmt::Continue { pos } => {
                if self.loop_stack.is_empty() {
                    self.diagnostics.error(*pos, "`continue` outside a loop");
                    return Ok(());
                }
                self.emit_opcode(Opcode::Continue);
                let jmp = self.reserve_branch(Opcode::Jmp);
                self.loop_stack.last_mut().unwrap().continue_patches.push(jmp);
                Ok(())
            }
            Stmt::ExprStmt { expr, .. } => {
                let folded = if self.options.optimize_level >= 1 {
                    fold_constants(expr)
                } else {
                    expr.clone()
                };
                if self.options.optimize_level >= 1 && is_standalone_constant(&folded) {
                    return Ok(());
                }
                self.emit_expr(&folded)?;
                self.emit_drop();
                Ok(())
            }
        }
    }

    // --- expressions --------------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr<'file>) -> Result<(), EmitError> {
        let expr_owned;
        let expr = if self.options.optimize_level >= 1 {
            expr_owned = fold_constants(expr);
            &expr_owned
        } else {
            expr
        };

        match expr {
            Expr::IntConst { value, .. } => {
                self.emit_const_i32(*value as i32);
            }
            Expr::FloatConst { value, .. } => {
                self.emit_opcode(Opcode::ConstF32);
                self.emit_u32((*value as f32).to_bits());
            }
            Expr::StringLit { value, .. } => {
                self.emit_opcode(Opcode::ConstString);
                let mut bytes = value.clone();
                bytes.push(0);
                self.emit_u32(bytes.len() as u32);
                self.code.extend_from_slice(&bytes);
            }
            Expr::Identifier { name, pos } => {
                let idx = self.local_index(name, *pos);
                self.emit_opcode(Opcode::LoadLocal);
                self.emit_u32(idx);
            }
            Expr::Unary { op, operand, pos } => self.emit_unary(*op, operand, *pos)?,
            Expr::Binary { op, left, right, .. } => self.emit_binary(*op, left, right)?,
            Expr::Call {
                callee,
                args,
                is_libc,
                libc_call_id,
                ..
            } => {
                for arg in args {
                    self.emit_expr(arg)?;
                }
                self.emit_const_i32(args.len() as i32);
                if *is_libc {
                    self.emit_const_i32(i32::from(*libc_call_id));
                    self.emit_opcode(Opcode::LibcCall);
                } else {
                    let hash = callee_name_hash(callee);
                    self.emit_i32_opcode_pair(hash, Opcode::UserCall);
                }
            }
            Expr::Subscript { pos, .. } | Expr::Member { pos, .. } | Expr::ArrowMember { pos, .. } => {
                self.diagnostics
                    .warn(*pos, "unsupported expression form, emitting sentinel value");
                self.emit_const_i32(0);
            }
            Expr::CompoundLiteral { elements, pos } => {
                if elements.is_empty() {
                    self.diagnostics
                        .warn(*pos, "empty compound literal, emitting sentinel value");
                    self.emit_const_i32(0);
                } else {
                    for element in &elements[..elements.len() - 1] {
                        self.emit_expr(element)?;
                        self.emit_drop();
                    }
                    self.emit_expr(elements.last().unwrap())?;
                }
            }
        }
        Ok(())
    }

    fn emit_i32_opcode_pair(&mut self, value: u32, op: Opcode) {
        self.emit_const_i32(value as i32);
        self.emit_opcode(op);
    }

    fn emit_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr<'file>,
        pos: crate::token::SourcePos<'file>,
    ) -> Result<(), EmitError> {
        match op {
            UnaryOp::Neg => {
                self.emit_const_i32(0);
                self.emit_expr(operand)?;
                self.emit_opcode(Opcode::Sub);
            }
            UnaryOp::Plus => {
                self.emit_expr(operand)?;
            }
            UnaryOp::Not => {
                self.emit_expr(operand)?;
                self.emit_const_i32(0);
                self.emit_opcode(Opcode::Eq);
            }
            UnaryOp::Deref | UnaryOp::AddrOf => {
                self.diagnostics.warn(
                    pos,
                    "pointer dereference/address-of is unimplemented in this core",
                );
            }
            UnaryOp::BitNot
            | UnaryOp::PreInc
            | UnaryOp::PreDec
            | UnaryOp::PostInc
            | UnaryOp::PostDec => {
                self.diagnostics
                    .warn(pos, "unsupported unary operator, emitting sentinel value");
                self.emit_const_i32(0);
            }
        }
        Ok(())
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr<'file>,
        right: &Expr<'file>,
    ) -> Result<(), EmitError> {
        if op.is_assignment() {
            let Expr::Identifier { name, pos } = left else {
                self.diagnostics
                    .warn(left.pos(), "assignment target must be a local variable");
                self.emit_expr(right)?;
                self.emit_drop();
                self.emit_const_i32(0);
                return Ok(());
            };
            let idx = self.local_index(name, *pos);
            if let Some(arith) = compound_assign_op(op) {
                self.emit_opcode(Opcode::LoadLocal);
                self.emit_u32(idx);
                self.emit_expr(right)?;
                self.emit_opcode(arith);
            } else {
                self.emit_expr(right)?;
            }
            self.emit_opcode(Opcode::StoreLocal);
            self.emit_u32(idx);
            self.emit_const_i32(0);
            return Ok(());
        }

        self.emit_expr(left)?;
        self.emit_expr(right)?;
        let op = match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::Ne => Opcode::Ne,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Le => Opcode::Le,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Ge => Opcode::Ge,
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                self.diagnostics.warn(
                    left.pos(),
                    "bitwise operator has no dedicated opcode in this core, treating as OR",
                );
                Opcode::Or
            }
            _ => unreachable!("assignment family handled above"),
        };
        self.emit_opcode(op);
        Ok(())
    }
}

fn compound_assign_op(op: BinaryOp) -> Option<Opcode> {
    Some(match op {
        BinaryOp::AddAssign => Opcode::Add,
        BinaryOp::SubAssign => Opcode::Sub,
        BinaryOp::MulAssign => Opcode::Mul,
        BinaryOp::DivAssign => Opcode::Div,
        BinaryOp::ModAssign => Opcode::Mod,
        _ => return None,
    })
}

/// Shallow FNV-1a hash of a callee's identifier text, used as the operand
/// to `USER_CALL` (`spec.md` §4.4 "Call"). Non-identifier callees hash to 0.
fn callee_name_hash(callee: &Expr<'_>) -> u32 {
    let Expr::Identifier { name, .. } = callee else {
        return 0;
    };
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Constant folding over integer arithmetic (`spec.md` §4.4
/// "Optimizations"). Division by the literal zero is never folded so it
/// can surface as a runtime fault instead. Any subtree containing a call
/// is left untouched.
fn fold_constants<'file>(expr: &Expr<'file>) -> Expr<'file> {
    match expr {
        Expr::Binary { op, left, right, pos } if !op.is_assignment() => {
            let left = fold_constants(left);
            let right = fold_constants(right);
            if let (Expr::IntConst { value: a, .. }, Expr::IntConst { value: b, .. }) =
                (&left, &right)
            {
                let folded = match op {
                    BinaryOp::Add => Some((*a as i32).wrapping_add(*b as i32)),
                    BinaryOp::Sub => Some((*a as i32).wrapping_sub(*b as i32)),
                    BinaryOp::Mul => Some((*a as i32).wrapping_mul(*b as i32)),
                    BinaryOp::Div if *b != 0 => Some((*a as i32).wrapping_div(*b as i32)),
                    _ => None,
                };
                if let Some(value) = folded {
                    return Expr::IntConst {
                        value: i64::from(value),
                        pos: *pos,
                    };
                }
            }
            Expr::Binary {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
                pos: *pos,
            }
        }
        Expr::Unary { op, operand, pos } => Expr::Unary {
            op: *op,
            operand: Box::new(fold_constants(operand)),
            pos: *pos,
        },
        other => other.clone(),
    }
}

fn is_standalone_constant(expr: &Expr<'_>) -> bool {
    matches!(expr, Expr::IntConst { .. } | Expr::FloatConst { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn emit(src: &str, opt_level: u8) -> Container {
        let tokens = Lexer::new(src, "test.c").tokenize();
        let (program, diags) = Parser::new(tokens, false).parse_program();
        assert!(!diags.has_errors(), "{:?}", diags.records());
        let program = program.unwrap();
        let options = CompileOptions::new().with_optimize_level(opt_level);
        Emitter::new(options).emit_program(&program).unwrap().0
    }

    #[test]
    fn empty_main_emits_fallback_halt() {
        let container = emit("int main(void) { }", 0);
        assert_eq!(
            container.instructions,
            vec![Opcode::ConstI32 as u8, 0, 0, 0, 0, Opcode::Halt as u8]
        );
    }

    #[test]
    fn whitespace_only_program_emits_implicit_halt() {
        let container = emit("// nothing here\n", 0);
        assert_eq!(
            container.instructions,
            vec![Opcode::ConstI32 as u8, 0, 0, 0, 0, Opcode::Halt as u8]
        );
    }

    #[test]
    fn constant_arithmetic_folds_at_o1() {
        let container = emit("int main(void) { return 2 + 3 * 4; }", 1);
        assert_eq!(
            container.instructions,
            vec![
                Opcode::ConstI32 as u8,
                14,
                0,
                0,
                0,
                Opcode::Halt as u8,
            ]
        );
    }

    #[test]
    fn division_by_literal_zero_is_not_folded() {
        let container = emit("int main(void) { return 1 / 0; }", 1);
        assert!(container.instructions.contains(&(Opcode::Div as u8)));
    }

    #[test]
    fn branch_targets_point_at_valid_instruction_starts() {
        let container = emit(
            "int main(void) { int i = 0; int s = 0; while (i <= 10) { s = s + i; i = i + 1; } return s; }",
            0,
        );
        let bytes = &container.instructions;
        let mut pc = 0usize;
        let mut starts = std::collections::HashSet::new();
        while pc < bytes.len() {
            starts.insert(pc);
            let op = Opcode::try_from(bytes[pc]).expect("valid opcode");
            pc += 1 + op.operand_len();
            if op == crate::bytecode::opcode::Opcode::ConstString {
                let len = u32::from_le_bytes(bytes[pc - 4..pc].try_into().unwrap()) as usize;
                pc += len;
            }
        }
        pc = 0;
        while pc < bytes.len() {
            let op = Opcode::try_from(bytes[pc]).unwrap();
            if matches!(op, Opcode::Jmp | Opcode::Jz) {
                let target = u32::from_le_bytes(bytes[pc + 1..pc + 5].try_into().unwrap());
                assert!(starts.contains(&(target as usize)), "dangling branch target");
            }
            pc += 1 + op.operand_len();
        }
    }
}

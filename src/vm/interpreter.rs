use crate::bytecode::container::Container;
use crate::bytecode::opcode::Opcode;
use crate::diagnostics::RuntimeFault;
use crate::libc_abi::forwarder::{CallDescriptor, LibcForwarder};
use crate::vm::state::{VmState, LOCAL_CAPACITY};

/// The hard instruction-count safety bound (`spec.md` §4.5 "Instruction
/// loop", §5 "Cancellation / timeouts").
pub const RUNAWAY_LIMIT: u64 = 1_000_000;

/// A single-threaded stack interpreter over one bytecode container
/// (`spec.md` §4.5). Owns its `VmState` and a `LibcForwarder` handle, so
/// two interpreters never share statistics unless the caller explicitly
/// arranges it.
pub struct Interpreter {
    state: VmState,
    forwarder: LibcForwarder,
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        let mut forwarder = LibcForwarder::new();
        forwarder.init();
        Self {
            state: VmState::new(),
            forwarder,
        }
    }

    #[must_use]
    pub fn forwarder(&self) -> &LibcForwarder {
        &self.forwarder
    }

    /// Executes `container` to completion and returns the integer exit
    /// status (`spec.md` §4.5 "Termination").
    pub fn run(&mut self, container: &Container) -> Result<i32, RuntimeFault> {
        let code = &container.instructions;
        self.state.pc = container.entry_point;

        while self.state.running
            && (self.state.pc as usize) < code.len()
            && self.state.instructions_executed < RUNAWAY_LIMIT
        {
            self.step(code)?;
        }

        if self.state.instructions_executed >= RUNAWAY_LIMIT && self.state.running {
            log::error!("VM halted: runaway execution past {RUNAWAY_LIMIT} instructions");
            return Err(RuntimeFault::Runaway { limit: RUNAWAY_LIMIT });
        }

        Ok(self.state.peek().unwrap_or(0))
    }

    fn step(&mut self, code: &[u8]) -> Result<(), RuntimeFault> {
        let pc = self.state.pc;
        let opcode_byte = code[pc as usize];
        let Ok(opcode) = Opcode::try_from(opcode_byte) else {
            log::error!("unknown opcode 0x{opcode_byte:02x} at pc={pc}");
            self.state.running = false;
            return Err(RuntimeFault::UnknownOpcode {
                opcode: opcode_byte,
                pc,
            });
        };
        self.state.pc += 1;

        match opcode {
            Opcode::Nop | Opcode::Break | Opcode::Continue => {}
            Opcode::Halt => {
                self.state.running = false;
            }
            Opcode::ConstI32 => {
                let value = self.read_i32(code);
                self.push(value, pc)?;
            }
            Opcode::ConstF32 => {
                let bits = self.read_u32(code);
                self.push(bits as i32, pc)?;
            }
            Opcode::ConstString => {
                let len = self.read_u32(code) as usize;
                let addr = self.state.pc;
                self.state.pc += len as u32;
                self.push(addr as i32, pc)?;
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                self.binary_arith(opcode, pc)?;
            }
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                self.compare(opcode, pc)?;
            }
            Opcode::And | Opcode::Or => {
                let b = self.pop(pc)?;
                let a = self.pop(pc)?;
                let result = match opcode {
                    Opcode::And => i32::from(a != 0 && b != 0),
                    _ => i32::from(a != 0 || b != 0),
                };
                self.push(result, pc)?;
            }
            Opcode::Not => {
                let a = self.pop(pc)?;
                self.push(i32::from(a == 0), pc)?;
            }
            Opcode::Jmp => {
                let target = self.read_u32(code);
                self.state.pc = target;
            }
            Opcode::Jz => {
                let value = self.pop(pc)?;
                let target = self.read_u32(code);
                if value == 0 {
                    self.state.pc = target;
                }
            }
            Opcode::LoadLocal => {
                let index = self.read_u32(code) as usize;
                if index >= LOCAL_CAPACITY {
                    self.state.running = false;
                    return Err(RuntimeFault::LocalOutOfRange {
                        index: index as u32,
                        capacity: LOCAL_CAPACITY,
                    });
                }
                self.push(self.state.locals[index], pc)?;
            }
            Opcode::StoreLocal => {
                let index = self.read_u32(code) as usize;
                let value = self.pop(pc)?;
                if index >= LOCAL_CAPACITY {
                    self.state.running = false;
                    return Err(RuntimeFault::LocalOutOfRange {
                        index: index as u32,
                        capacity: LOCAL_CAPACITY,
                    });
                }
                self.state.locals[index] = value;
            }
            Opcode::LibcCall => self.libc_call(code, pc)?,
            Opcode::UserCall => self.user_call(pc)?,
        }

        self.state.instructions_executed += 1;
        Ok(())
    }

    fn binary_arith(&mut self, opcode: Opcode, pc: u32) -> Result<(), RuntimeFault> {
        let b = self.pop(pc)?;
        let a = self.pop(pc)?;
        let value = match opcode {
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::Mul => a.wrapping_mul(b),
            Opcode::Div => {
                if b == 0 {
                    self.state.running = false;
                    log::error!("division by zero at pc={pc}");
                    return Err(RuntimeFault::DivisionByZero { pc });
                }
                a.wrapping_div(b)
            }
            Opcode::Mod => {
                if b == 0 {
                    self.state.running = false;
                    log::error!("division by zero at pc={pc}");
                    return Err(RuntimeFault::DivisionByZero { pc });
                }
                a.wrapping_rem(b)
            }
            _ => unreachable!(),
        };
        self.push(value, pc)
    }

    fn compare(&mut self, opcode: Opcode, pc: u32) -> Result<(), RuntimeFault> {
        let b = self.pop(pc)?;
        let a = self.pop(pc)?;
        let result = match opcode {
            Opcode::Eq => a == b,
            Opcode::Ne => a != b,
            Opcode::Lt => a < b,
            Opcode::Le => a <= b,
            Opcode::Gt => a > b,
            Opcode::Ge => a >= b,
            _ => unreachable!(),
        };
        self.push(i32::from(result), pc)
    }

    fn libc_call(&mut self, code: &[u8], pc: u32) -> Result<(), RuntimeFault> {
        let call_id = self.pop(pc)? as u16;
        let arg_count = self.pop(pc)? as usize;
        let mut args = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            args.push(self.pop(pc)?);
        }
        args.reverse(); // restore left-to-right source order

        let words: Vec<u64> = args.iter().map(|&a| (a as i64) as u64).collect();
        let mut descriptor = CallDescriptor::new(call_id, &words);
        self.forwarder.dispatch(&mut descriptor, code);
        self.state.calls_made += 1;
        self.push(descriptor.return_slot as i32, pc)
    }

    fn user_call(&mut self, pc: u32) -> Result<(), RuntimeFault> {
        let name_hash = self.pop(pc)?;
        let arg_count = self.pop(pc)? as usize;
        for _ in 0..arg_count {
            self.pop(pc)?;
        }
        log::debug!("USER_CALL to hash 0x{name_hash:08x} is a stub in this core");
        self.push(0, pc)
    }

    fn push(&mut self, value: i32, pc: u32) -> Result<(), RuntimeFault> {
        self.state.push(value).ok_or_else(|| {
            self.state.running = false;
            log::error!("operand stack overflow at pc={pc}");
            RuntimeFault::StackOverflow { pc }
        })
    }

    fn pop(&mut self, pc: u32) -> Result<i32, RuntimeFault> {
        self.state.pop().ok_or_else(|| {
            self.state.running = false;
            log::error!("operand stack underflow at pc={pc}");
            RuntimeFault::StackUnderflow { pc }
        })
    }

    fn read_u32(&mut self, code: &[u8]) -> u32 {
        let at = self.state.pc as usize;
        let bytes: [u8; 4] = code[at..at + 4].try_into().unwrap();
        self.state.pc += 4;
        u32::from_le_bytes(bytes)
    }

    fn read_i32(&mut self, code: &[u8]) -> i32 {
        self.read_u32(code) as i32
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::emitter::Emitter;
    use crate::lexer::Lexer;
    use crate::options::CompileOptions;
    use crate::parser::Parser;

    fn run_source(src: &str, opt_level: u8) -> i32 {
        let tokens = Lexer::new(src, "test.c").tokenize();
        let (program, diags) = Parser::new(tokens, false).parse_program();
        assert!(!diags.has_errors());
        let options = CompileOptions::new().with_optimize_level(opt_level);
        let (container, _) = Emitter::new(options).emit_program(&program.unwrap()).unwrap();
        Interpreter::new().run(&container).unwrap()
    }

    #[test]
    fn empty_main_returns_zero() {
        assert_eq!(run_source("int main(void) { return 0; }", 0), 0);
    }

    #[test]
    fn arithmetic_scenario() {
        assert_eq!(run_source("int main(void) { return 2 + 3 * 4; }", 1), 14);
    }

    #[test]
    fn local_variable_scenario() {
        assert_eq!(
            run_source("int main(void) { int x = 7; int y = 5; return x - y; }", 0),
            2
        );
    }

    #[test]
    fn loop_sum_scenario() {
        let src = "int main(void) { int i = 0; int s = 0; while (i <= 10) { s = s + i; i = i + 1; } return s; }";
        assert_eq!(run_source(src, 0), 55);
    }

    #[test]
    fn division_by_zero_is_a_runtime_fault() {
        let tokens = Lexer::new("int main(void) { int z = 0; return 1 / z; }", "test.c").tokenize();
        let (program, _) = Parser::new(tokens, false).parse_program();
        let (container, _) = Emitter::new(CompileOptions::new())
            .emit_program(&program.unwrap())
            .unwrap();
        let result = Interpreter::new().run(&container);
        assert!(matches!(result, Err(RuntimeFault::DivisionByZero { .. })));
    }

    #[test]
    fn for_loop_without_condition_runs_until_break() {
        let src = "int main(void) { int i = 0; for (;;) { i = i + 1; if (i >= 5) { break; } } return i; }";
        assert_eq!(run_source(src, 0), 5);
    }
}

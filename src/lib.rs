//! A compiler and stack-machine VM for a subset of C99, producing and
//! executing the `ASTC` bytecode container format.
//!
//! The pipeline is strictly one-way: source text → token stream → AST →
//! bytecode container → VM state → exit status. [`compile`] runs the
//! frontend and bytecode emitter; [`execute`] runs the VM over an already
//! emitted container. Callers who need both in sequence can use
//! [`compile_and_run`].

pub mod ast;
pub mod bytecode;
pub mod diagnostics;
pub mod lexer;
pub mod libc_abi;
pub mod options;
pub mod parser;
pub mod token;
pub mod vm;

pub use bytecode::container::{Container, ContainerFlags};
pub use diagnostics::{ContainerError, Diagnostics, EmitError, ParseError, RuntimeFault};
pub use options::CompileOptions;
pub use vm::interpreter::Interpreter;

use bytecode::emitter::Emitter;
use lexer::Lexer;
use parser::Parser;

/// Lexes, parses, and lowers one translation unit into a bytecode
/// container (`spec.md` §1 "Purpose & scope").
///
/// A fatal parse failure (memory exhaustion, unexpected EOF mid-expression
/// at the top level) returns `Err` with the diagnostics collected up to
/// that point; a fatal emission failure does the same after a successful
/// parse. Otherwise returns the container alongside whatever diagnostics
/// were recorded along the way — a nonzero error count does not itself
/// fail compilation unless `warnings_as_errors` was set (`spec.md` §7
/// "Propagation policy").
pub fn compile(
    source: &str,
    file: &str,
    options: CompileOptions,
) -> Result<(Container, Diagnostics), Diagnostics> {
    log::trace!("lexing {file}");
    let tokens = Lexer::new(source, file).tokenize();

    log::trace!("parsing {file}");
    let (program, diagnostics) = Parser::new(tokens, options.warnings_as_errors).parse_program();
    let Some(program) = program else {
        return Err(diagnostics);
    };

    log::debug!(
        "{file}: parsed {} top-level declarations, {} diagnostics so far",
        program.declarations.len(),
        diagnostics.records().len()
    );

    let emitter = Emitter::new(options.clone());
    match emitter.emit_program(&program) {
        Ok((container, emit_diagnostics)) => {
            let mut diagnostics = diagnostics;
            for record in emit_diagnostics.records() {
                match record.severity {
                    diagnostics::Severity::Warning => {
                        diagnostics.warn(
                            token::SourcePos::new(&record.file, record.line, record.column),
                            record.message.clone(),
                        );
                    }
                    diagnostics::Severity::Error => {
                        diagnostics.error(
                            token::SourcePos::new(&record.file, record.line, record.column),
                            record.message.clone(),
                        );
                    }
                }
            }
            log::info!(
                "{file}: emitted {}-byte container at O{}",
                container.instructions.len(),
                options.optimize_level
            );
            Ok((container, diagnostics))
        }
        Err(err) => {
            log::error!("{file}: emission failed: {err}");
            Err(diagnostics)
        }
    }
}

/// Executes a bytecode container and returns its integer exit status
/// (`spec.md` §6 "Driver surface", execution surface).
pub fn execute(container: &Container) -> Result<i32, RuntimeFault> {
    Interpreter::new().run(container)
}

/// Convenience surface combining [`compile`] and [`execute`] for callers
/// that do not need to persist the intermediate container.
pub fn compile_and_run(
    source: &str,
    file: &str,
    options: CompileOptions,
) -> Result<i32, String> {
    let (container, diagnostics) =
        compile(source, file, options).map_err(|d| format!("compilation failed: {} error(s)", d.error_count()))?;
    if diagnostics.has_errors() {
        return Err(format!("compilation failed: {} error(s)", diagnostics.error_count()));
    }
    execute(&container).map_err(|fault| fault.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_empty_main() {
        let status = compile_and_run("int main(void) { return 0; }", "t.c", CompileOptions::new());
        assert_eq!(status, Ok(0));
    }

    #[test]
    fn end_to_end_division_by_zero_is_an_error_string() {
        let status = compile_and_run(
            "int main(void) { int z = 0; return 1 / z; }",
            "t.c",
            CompileOptions::new(),
        );
        assert!(status.is_err());
    }
}

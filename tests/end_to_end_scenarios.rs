use astc::{compile, execute, CompileOptions};
use pretty_assertions::assert_eq;

fn run(src: &str, optimize_level: u8) -> i32 {
    let options = CompileOptions::new().with_optimize_level(optimize_level);
    let (container, diagnostics) = compile(src, "scenario.c", options).expect("compilation should succeed");
    assert!(!diagnostics.has_errors(), "unexpected errors: {:?}", diagnostics.records());
    execute(&container).expect("execution should not fault")
}

#[test]
fn scenario_empty_main() {
    assert_eq!(run("int main(void) { return 0; }", 0), 0);
}

#[test]
fn scenario_arithmetic_folds_to_single_constant_at_o1() {
    let options = CompileOptions::new().with_optimize_level(1);
    let (container, _) = compile("int main(void) { return 2 + 3 * 4; }", "scenario.c", options).unwrap();
    assert_eq!(
        container.instructions,
        vec![astc::bytecode::Opcode::ConstI32 as u8, 14, 0, 0, 0, astc::bytecode::Opcode::Halt as u8]
    );
    assert_eq!(execute(&container).unwrap(), 14);
}

#[test]
fn scenario_local_variable() {
    assert_eq!(
        run("int main(void) { int x = 7; int y = 5; return x - y; }", 0),
        2
    );
}

#[test]
fn scenario_loop_sum() {
    let src = r#"
        int main(void) {
          int i = 0; int s = 0;
          while (i <= 10) { s = s + i; i = i + 1; }
          return s;
        }
    "#;
    assert_eq!(run(src, 0), 55);
}

#[test]
fn scenario_division_by_zero_is_a_nonzero_exit() {
    let options = CompileOptions::new();
    let (container, _) = compile(
        "int main(void) { int z = 0; return 1 / z; }",
        "scenario.c",
        options,
    )
    .unwrap();
    let result = execute(&container);
    assert!(result.is_err(), "division by zero must be a runtime fault");
}

#[test]
fn boundary_whitespace_only_program_emits_the_implicit_halt() {
    let options = CompileOptions::new();
    let (container, diagnostics) = compile("// nothing here\n", "scenario.c", options).unwrap();
    assert!(!diagnostics.has_errors());
    assert_eq!(
        container.instructions,
        vec![astc::bytecode::Opcode::ConstI32 as u8, 0, 0, 0, 0, astc::bytecode::Opcode::Halt as u8]
    );
    assert_eq!(execute(&container).unwrap(), 0);
}

#[test]
fn boundary_emitted_container_round_trips_through_encode_decode() {
    let options = CompileOptions::new();
    let (container, _) = compile("int main(void) { return 2 + 3 * 4; }", "scenario.c", options).unwrap();
    let bytes = container.encode();
    let decoded = astc::Container::decode(&bytes).expect("well-formed container decodes");
    assert_eq!(decoded, container);
    assert_eq!(&bytes[0..4], b"ASTC");
}

#[test]
fn idempotence_double_fold_does_not_change_length() {
    let options = CompileOptions::new().with_optimize_level(1);
    let (first, _) = compile("int main(void) { return (1 + 1) + (1 + 1); }", "a.c", options.clone()).unwrap();
    let (second, _) = compile("int main(void) { return 4; }", "b.c", options).unwrap();
    assert_eq!(first.instructions.len(), second.instructions.len());
}

#[test]
fn deterministic_emission_across_runs() {
    let options = CompileOptions::new();
    let src = "int main(void) { int x = 1; return x; }";
    let (first, _) = compile(src, "a.c", options.clone()).unwrap();
    let (second, _) = compile(src, "b.c", options).unwrap();
    assert_eq!(first.instructions, second.instructions);
    assert_eq!(execute(&first).unwrap(), execute(&second).unwrap());
}

//! Exercises the `log` call sites through a real subscriber. `env_logger`
//! reads `RUST_LOG` from the environment; running with `RUST_LOG=trace`
//! makes every stage's `log::trace!`/`debug!`/`info!`/`warn!`/`error!` call
//! visible on stderr.

use astc::{compile, execute, CompileOptions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn compiling_and_running_logs_through_a_real_subscriber() {
    init();
    let (container, diagnostics) = compile(
        "int main(void) { return 2 + 3 * 4; }",
        "logging.c",
        CompileOptions::new().with_optimize_level(1),
    )
    .expect("compilation should succeed");
    assert!(!diagnostics.has_errors());
    assert_eq!(execute(&container).unwrap(), 14);
}

#[test]
fn diagnostics_warnings_are_logged() {
    init();
    // `break` outside a loop is a recorded error, logged via `log::error!`
    // inside `Diagnostics::push`, and an undeclared identifier load is a
    // warning logged via `log::warn!`.
    let (container, diagnostics) = compile(
        "int main(void) { return missing_variable; }",
        "logging.c",
        CompileOptions::new(),
    )
    .expect("a missing identifier is a warning, not a fatal parse/emit error");
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.records().len(), 1);
    assert_eq!(execute(&container).unwrap(), 0);
}

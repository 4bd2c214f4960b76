//! The stack interpreter and its state (`spec.md` §3 "VM state", §4.5).

pub mod interpreter;
pub mod state;

pub use interpreter::Interpreter;
pub use state::VmState;

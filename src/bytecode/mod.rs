//! The lowering pass and container format (`spec.md` §4.4, §3, §6).

pub mod container;
pub mod emitter;
pub mod opcode;

pub use container::{Container, ContainerFlags};
pub use emitter::Emitter;
pub use opcode::Opcode;

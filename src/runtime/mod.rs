pub mod code;
pub mod runtime_error;
pub mod stack;
pub mod vm;

pub use code::Code;
pub use runtime_error::{RuntimeError, RuntimeErrorKind};
pub use vm::{ByteVm, InstructionVm, Vm, VmConfig, run_bytes, run_instructions};

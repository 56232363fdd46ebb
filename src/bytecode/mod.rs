pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod emit;
pub mod encode;
pub mod frame;
pub mod link;
pub mod object;
pub mod op;

pub use chunk::{Annotated, Chunk, ChunkKind};
pub use compile::{CompileOptions, Compiler};
pub use compile_error::CompileError;
pub use encode::{ByteEncoding, DecodeError, EncodeError, IndexAddressing, InstructionSize, encode};
pub use link::{LinkError, Linker, link_encoded, link_indexed};
pub use object::{ObjectError, ObjectFile};
pub use op::Op;

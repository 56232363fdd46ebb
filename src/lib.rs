//! Brook: a small function language compiled for a stack machine.
//!
//! Source is parsed into a [`lang::Program`], compiled into one [`Chunk`] per
//! function plus a bootstrap chunk, linked into a flat instruction list, and
//! either run directly on the [`InstructionVm`] or encoded to bytes and run on
//! the [`ByteVm`]. Both machines share one execution routine.

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

use thiserror::Error;

pub use bytecode::{
    ByteEncoding, Chunk, CompileError, CompileOptions, Compiler, DecodeError, EncodeError,
    IndexAddressing, LinkError, Linker, ObjectError, ObjectFile, Op, encode, link_encoded,
    link_indexed,
};
pub use frontend::{ParseError, parse};
pub use runtime::{
    ByteVm, InstructionVm, RuntimeError, RuntimeErrorKind, Vm, VmConfig, run_bytes,
    run_instructions,
};

/// Any failure along the pipeline.
///
/// `Parse`, `Compile` and `Runtime` describe a bad program; `Link` and
/// `Encode` describe a code generator defect.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Object(#[from] ObjectError),
}

/// Parse and compile with default options (bootstrap calling `main`).
pub fn compile(source: &str) -> Result<Vec<Chunk>, Error> {
    let program = parse(source)?;
    Ok(Compiler::new().compile_program(&program)?)
}

/// Compile, link with byte addressing, and encode.
pub fn build(source: &str) -> Result<Vec<u8>, Error> {
    let chunks = compile(source)?;
    Ok(encode(&link_encoded(&chunks)?)?)
}

/// Compile, link with index addressing, and run on the instruction VM.
///
/// Returns the final stack, bottom to top.
pub fn run_source(source: &str) -> Result<Vec<i32>, Error> {
    let chunks = compile(source)?;
    Ok(run_instructions(&link_indexed(&chunks)?)?)
}

use thiserror::Error;

use crate::bytecode::encode::DecodeError;

/// A fatal failure while executing a program, with the address of the
/// instruction that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("runtime error at address {address}: {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub address: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, address: usize) -> Self {
        RuntimeError { kind, address }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack slot {depth} out of range (stack holds {len} values)")]
    SlotOutOfRange { depth: i32, len: usize },

    #[error("negative pop count {0}")]
    NegativePopCount(i32),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unlinked label '{0}'")]
    UnlinkedLabel(String),

    #[error("jump target {target} outside program of size {end}")]
    AddressOutOfRange { target: i32, end: usize },

    #[error("ran past the end of the program without EXIT")]
    MissingExit,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("execution step limit exceeded ({0})")]
    StepLimitExceeded(usize),

    #[error("stack size limit exceeded ({0})")]
    StackLimitExceeded(usize),
}

use serde::{Deserialize, Serialize};

use crate::bytecode::Op;

/// An instruction plus the labels bound at its position and an optional
/// diagnostic comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotated {
    pub op: Op,
    pub labels: Vec<String>,
    pub comment: Option<String>,
}

impl Annotated {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            labels: Vec::new(),
            comment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Generated from a function declaration.
    Function,
    /// Synthetic entry sequence that calls the entry function and exits.
    Bootstrap,
}

/// One function's (or the bootstrap's) unlinked instruction stream.
///
/// The chunk name is registered as a label bound to its first instruction
/// when linking, so calls reach a function through `LoadLabel(name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub name: String,
    pub kind: ChunkKind,
    pub instructions: Vec<Annotated>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Bare instructions without annotations.
    pub fn ops(&self) -> impl Iterator<Item = &Op> {
        self.instructions.iter().map(|a| &a.op)
    }
}

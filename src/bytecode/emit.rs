use std::collections::{BTreeMap, HashMap};

use crate::bytecode::chunk::{Annotated, Chunk, ChunkKind};
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::Op;

/// Builder for one chunk's instruction stream.
///
/// Labels and comments are kept in maps keyed by instruction index and merged
/// into annotations when the chunk is finished.
pub struct Emitter {
    ops: Vec<Op>,
    labels: BTreeMap<usize, Vec<String>>,
    comments: HashMap<usize, String>,
    /// Labels waiting for the next emitted instruction.
    pending: Vec<String>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            ops: Vec::new(),
            labels: BTreeMap::new(),
            comments: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Append an instruction, binding any pending labels to it.
    pub fn emit(&mut self, op: Op) {
        let index = self.ops.len();
        self.ops.push(op);

        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.labels.entry(index).or_default().extend(pending);
        }
    }

    /// Append an instruction with a diagnostic comment.
    pub fn emit_commented(&mut self, op: Op, comment: impl Into<String>) {
        self.emit(op);
        self.comment(comment);
    }

    /// Bind `label` to the instruction just emitted.
    pub fn label(&mut self, label: impl Into<String>) -> Result<(), CompileError> {
        let index = self
            .ops
            .len()
            .checked_sub(1)
            .ok_or_else(|| CompileError::internal("label attached to empty chunk"))?;
        self.labels.entry(index).or_default().push(label.into());
        Ok(())
    }

    /// Bind `label` to whatever instruction is emitted next.
    pub fn label_next(&mut self, label: impl Into<String>) {
        self.pending.push(label.into());
    }

    /// Attach a comment to the instruction just emitted.
    pub fn comment(&mut self, comment: impl Into<String>) {
        if let Some(index) = self.ops.len().checked_sub(1) {
            self.comments.insert(index, comment.into());
        }
    }

    /// Current instruction count.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the emitter and return the finished chunk.
    ///
    /// Fails if a label is still waiting for an instruction to bind to.
    pub fn into_chunk(
        mut self,
        name: impl Into<String>,
        kind: ChunkKind,
    ) -> Result<Chunk, CompileError> {
        let name = name.into();

        if !self.pending.is_empty() {
            return Err(CompileError::internal(format!(
                "dangling label(s) {} at end of chunk '{}'",
                self.pending.join(", "),
                name
            )));
        }

        let instructions = self
            .ops
            .into_iter()
            .enumerate()
            .map(|(index, op)| Annotated {
                op,
                labels: self.labels.remove(&index).unwrap_or_default(),
                comment: self.comments.remove(&index),
            })
            .collect();

        Ok(Chunk {
            name,
            kind,
            instructions,
        })
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

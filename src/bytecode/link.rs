use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::bytecode::{
    Op,
    chunk::Chunk,
    encode::{ByteEncoding, IndexAddressing, InstructionSize},
};

/// Link failures always point at a code generation defect: labels are never
/// written by users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link error: unresolved label '{0}'")]
    UnresolvedLabel(String),

    #[error("link error: label '{label}' bound at both {first} and {second}")]
    DuplicateLabel {
        label: String,
        first: i32,
        second: i32,
    },
}

/// Label name to absolute address.
pub type SymbolTable = HashMap<String, i32>;

/// Concatenates chunks and resolves every `LoadLabel` to an address.
///
/// An address is the summed size of all preceding instructions as reported
/// by `S`, so the same pass serves index and byte addressing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linker<S> {
    sizes: S,
}

impl<S: InstructionSize> Linker<S> {
    pub fn new(sizes: S) -> Self {
        Self { sizes }
    }

    /// First pass: assign an address to every chunk name and label.
    pub fn symbols(&self, chunks: &[Chunk]) -> Result<SymbolTable, LinkError> {
        let mut symbols = SymbolTable::new();
        let mut address: i32 = 0;

        for chunk in chunks {
            define(&mut symbols, &chunk.name, address)?;

            for annotated in &chunk.instructions {
                for label in &annotated.labels {
                    define(&mut symbols, label, address)?;
                }
                address += self.sizes.size_of(&annotated.op) as i32;
            }
        }

        Ok(symbols)
    }

    /// Produce a flat, label-free instruction stream.
    pub fn link(&self, chunks: &[Chunk]) -> Result<Vec<Op>, LinkError> {
        let symbols = self.symbols(chunks)?;

        let ops = chunks
            .iter()
            .flat_map(|chunk| chunk.ops())
            .map(|op| match op {
                Op::LoadLabel(label) => symbols
                    .get(label)
                    .map(|address| Op::LoadConstant(*address))
                    .ok_or_else(|| LinkError::UnresolvedLabel(label.clone())),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            chunks = chunks.len(),
            symbols = symbols.len(),
            instructions = ops.len(),
            "linked program"
        );

        Ok(ops)
    }
}

fn define(symbols: &mut SymbolTable, label: &str, address: i32) -> Result<(), LinkError> {
    if let Some(first) = symbols.insert(label.to_string(), address) {
        return Err(LinkError::DuplicateLabel {
            label: label.to_string(),
            first,
            second: address,
        });
    }
    Ok(())
}

/// Link for the instruction VM: one address per instruction.
pub fn link_indexed(chunks: &[Chunk]) -> Result<Vec<Op>, LinkError> {
    Linker::new(IndexAddressing).link(chunks)
}

/// Link for the byte VM: addresses are byte offsets into the encoding.
pub fn link_encoded(chunks: &[Chunk]) -> Result<Vec<Op>, LinkError> {
    Linker::new(ByteEncoding).link(chunks)
}

use std::collections::BTreeSet;
use std::fmt;

use crate::bytecode::Op;
use crate::bytecode::chunk::{Chunk, ChunkKind};
use crate::bytecode::encode::{DecodeError, decode_program};

const RULE: &str = "════════════════════════════════════════";

/// Listing of unlinked chunks with their labels and comments.
pub struct ChunkListing<'a>(pub &'a [Chunk]);

impl fmt::Display for ChunkListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0 {
            let kind = match chunk.kind {
                ChunkKind::Function => "function",
                ChunkKind::Bootstrap => "bootstrap",
            };

            writeln!(f, "{}", RULE)?;
            writeln!(f, " {} ({})", chunk.name, kind)?;
            writeln!(f, " {} instructions", chunk.len())?;
            writeln!(f, "{}", RULE)?;

            for (ip, annotated) in chunk.instructions.iter().enumerate() {
                for label in &annotated.labels {
                    writeln!(f, "      {}:", label)?;
                }

                match &annotated.comment {
                    Some(comment) => {
                        writeln!(f, "{:04}   {:<24}; {}", ip, annotated.op.to_string(), comment)?
                    }
                    None => writeln!(f, "{:04}   {}", ip, annotated.op)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Listing of an encoded artifact, one instruction per line with its byte
/// address.
///
/// A `LOAD_CONST` directly followed by a jump is taken as the jump's target,
/// which is how generated code always branches; those addresses are marked.
pub struct ByteListing {
    ops: Vec<(usize, Op)>,
}

impl ByteListing {
    pub fn decode(code: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            ops: decode_program(code)?,
        })
    }

    pub fn jump_targets(&self) -> BTreeSet<usize> {
        self.ops
            .windows(2)
            .filter_map(|pair| match (&pair[0].1, &pair[1].1) {
                (Op::LoadConstant(target), Op::Jump | Op::JumpWhenZero) => {
                    usize::try_from(*target).ok()
                }
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ByteListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self.jump_targets();

        for (address, op) in &self.ops {
            if targets.contains(address) {
                writeln!(f, "      ┌──────────────────────────────────")?;
                writeln!(f, "{:04} ► {}", address, op)?;
            } else {
                writeln!(f, "{:04}   {}", address, op)?;
            }
        }
        Ok(())
    }
}

pub fn format_chunks(chunks: &[Chunk]) -> String {
    ChunkListing(chunks).to_string()
}

pub fn format_bytecode(code: &[u8]) -> Result<String, DecodeError> {
    Ok(ByteListing::decode(code)?.to_string())
}

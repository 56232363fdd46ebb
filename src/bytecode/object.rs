//! Unlinked object files.
//!
//! An object file holds the code generator's chunks verbatim, labels and
//! comments included, so compiling and linking can run as separate steps.

use postcard::{from_bytes, to_allocvec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::chunk::Chunk;

pub const OBJECT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("malformed object file: {0}")]
    Malformed(#[from] postcard::Error),

    #[error("object file version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFile {
    pub version: u32,
    pub chunks: Vec<Chunk>,
}

impl ObjectFile {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            version: OBJECT_VERSION,
            chunks,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ObjectError> {
        Ok(to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ObjectError> {
        let object: ObjectFile = from_bytes(bytes)?;

        if object.version != OBJECT_VERSION {
            return Err(ObjectError::VersionMismatch {
                found: object.version,
                expected: OBJECT_VERSION,
            });
        }

        Ok(object)
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

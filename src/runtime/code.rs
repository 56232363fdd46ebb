use crate::bytecode::{Op, encode::decode_at};

use super::runtime_error::RuntimeErrorKind;

/// Something the VM can fetch instructions from.
///
/// Addresses mean whatever the program was linked for: instruction indices
/// for `[Op]`, byte offsets for `[u8]`.
pub trait Code {
    /// One past the last valid address.
    fn end(&self) -> usize;

    /// The instruction at `address` and the address space it occupies.
    fn fetch(&self, address: usize) -> Result<(Op, usize), RuntimeErrorKind>;
}

impl Code for [Op] {
    fn end(&self) -> usize {
        self.len()
    }

    fn fetch(&self, address: usize) -> Result<(Op, usize), RuntimeErrorKind> {
        self.get(address)
            .map(|op| (op.clone(), 1))
            .ok_or(RuntimeErrorKind::MissingExit)
    }
}

impl Code for [u8] {
    fn end(&self) -> usize {
        self.len()
    }

    fn fetch(&self, address: usize) -> Result<(Op, usize), RuntimeErrorKind> {
        Ok(decode_at(self, address)?)
    }
}

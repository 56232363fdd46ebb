//! Value stack for the VM.

use super::runtime_error::RuntimeErrorKind;

type Result<T> = std::result::Result<T, RuntimeErrorKind>;

/// The machine's single value stack. Operands, locals and return linkage
/// all live here; slots are addressed by depth from the top.
#[derive(Debug, Default, Clone)]
pub struct ValueStack {
    values: Vec<i32>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(256),
        }
    }

    #[inline]
    pub fn push(&mut self, value: i32) {
        self.values.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<i32> {
        self.values.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Value `depth` slots below the top (0 = top).
    #[inline]
    pub fn peek(&self, depth: i32) -> Result<i32> {
        let index = self.index_of(depth)?;
        Ok(self.values[index])
    }

    /// Overwrite the slot `depth` below the top in place.
    #[inline]
    pub fn set(&mut self, depth: i32, value: i32) -> Result<()> {
        let index = self.index_of(depth)?;
        self.values[index] = value;
        Ok(())
    }

    /// Discard `count` values from the top.
    pub fn discard(&mut self, count: i32) -> Result<()> {
        let count = usize::try_from(count).map_err(|_| RuntimeErrorKind::NegativePopCount(count))?;
        if count > self.values.len() {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        self.values.truncate(self.values.len() - count);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn top(&self) -> Option<i32> {
        self.values.last().copied()
    }

    /// Contents from bottom to top.
    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }

    fn index_of(&self, depth: i32) -> Result<usize> {
        usize::try_from(depth)
            .ok()
            .filter(|d| *d < self.values.len())
            .map(|d| self.values.len() - 1 - d)
            .ok_or(RuntimeErrorKind::SlotOutOfRange {
                depth,
                len: self.values.len(),
            })
    }
}

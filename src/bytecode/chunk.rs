use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::op::OpCode;
use crate::lang::value::Value;

/// Largest constant pool a chunk may hold; indices are one byte wide.
pub const CONSTANTS_MAX: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
}

/// One function's bytecode.
///
/// `lines[i]` is the source line of `code[i]`, so both vectors always have
/// the same length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one byte and returns its offset.
    pub fn write(&mut self, byte: u8, line: u32) -> usize {
        self.code.push(byte);
        self.lines.push(line);
        self.code.len() - 1
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) -> usize {
        self.write(op.into(), line)
    }

    /// Appends a constant and returns its index. Equal values are not merged.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        let index = u8::try_from(self.constants.len()).map_err(|_| ChunkError::TooManyConstants)?;
        self.constants.push(value);
        Ok(index)
    }

    pub fn constant(&self, index: u8) -> Option<&Value> {
        self.constants.get(usize::from(index))
    }

    pub fn line(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Overwrites the two bytes at `offset` with `value`, big-endian.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    /// Reads a big-endian u16 operand at `offset`.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = *self.code.get(offset)?;
        let lo = *self.code.get(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }
}

//! Binary instruction format.
//!
//! Every instruction is one opcode byte, followed by a big-endian `i32`
//! operand for `LOAD_CONST`, `LOAD_REL`, `STORE` and `POP`. There is no
//! header: an artifact is the raw instruction stream starting at address 0.

use thiserror::Error;

use crate::bytecode::Op;

/// Opcode bytes.
pub mod opcode {
    pub const EXIT: u8 = 0x00;
    pub const JUMP: u8 = 0x01;
    pub const JUMP_ZERO: u8 = 0x02;

    pub const LOAD_CONST: u8 = 0x10;
    pub const LOAD_REL: u8 = 0x11;

    pub const STORE: u8 = 0x20;
    pub const POP: u8 = 0x21;

    pub const ADD: u8 = 0x30;
    pub const SUB: u8 = 0x31;
    pub const MUL: u8 = 0x32;
    pub const DIV: u8 = 0x33;
    pub const MOD: u8 = 0x34;

    pub const EQ: u8 = 0x40;
    pub const GT: u8 = 0x41;
    pub const LT: u8 = 0x42;
    pub const GE: u8 = 0x43;
    pub const LE: u8 = 0x44;
}

const OPERAND_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("encode error: unlinked label '{0}' has no encoding")]
    UnlinkedLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode 0x{byte:02x} at address {address}")]
    InvalidOpcode { byte: u8, address: usize },

    #[error("truncated operand at address {address}")]
    TruncatedOperand { address: usize },

    #[error("address {address} is past the end of the code ({end} bytes)")]
    AddressOutOfRange { address: usize, end: usize },
}

/// How much address space an instruction occupies.
///
/// The linker is generic over this so the same pass produces index addresses
/// for the instruction VM and byte offsets for the byte VM.
pub trait InstructionSize {
    fn size_of(&self, op: &Op) -> usize;
}

/// One address per instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexAddressing;

impl InstructionSize for IndexAddressing {
    fn size_of(&self, _: &Op) -> usize {
        1
    }
}

/// Byte offsets in the encoded format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteEncoding;

impl InstructionSize for ByteEncoding {
    fn size_of(&self, op: &Op) -> usize {
        match op {
            Op::LoadConstant(_)
            | Op::LoadRelative(_)
            | Op::LoadLabel(_)
            | Op::Store(_)
            | Op::Pop(_) => 1 + OPERAND_SIZE,
            _ => 1,
        }
    }
}

impl ByteEncoding {
    /// Encode a linked instruction stream.
    pub fn encode(&self, ops: &[Op]) -> Result<Vec<u8>, EncodeError> {
        let size = ops.iter().map(|op| self.size_of(op)).sum();
        let mut buffer = Vec::with_capacity(size);

        for op in ops {
            encode_op(op, &mut buffer)?;
        }

        Ok(buffer)
    }
}

/// Encode a linked instruction stream with the byte format.
pub fn encode(ops: &[Op]) -> Result<Vec<u8>, EncodeError> {
    ByteEncoding.encode(ops)
}

fn encode_op(op: &Op, buffer: &mut Vec<u8>) -> Result<(), EncodeError> {
    let (byte, operand) = match op {
        Op::Exit => (opcode::EXIT, None),
        Op::Jump => (opcode::JUMP, None),
        Op::JumpWhenZero => (opcode::JUMP_ZERO, None),

        Op::LoadConstant(v) => (opcode::LOAD_CONST, Some(*v)),
        Op::LoadRelative(v) => (opcode::LOAD_REL, Some(*v)),
        Op::LoadLabel(label) => return Err(EncodeError::UnlinkedLabel(label.clone())),

        Op::Store(v) => (opcode::STORE, Some(*v)),
        Op::Pop(v) => (opcode::POP, Some(*v)),

        Op::Add => (opcode::ADD, None),
        Op::Sub => (opcode::SUB, None),
        Op::Mul => (opcode::MUL, None),
        Op::Div => (opcode::DIV, None),
        Op::Mod => (opcode::MOD, None),

        Op::Eq => (opcode::EQ, None),
        Op::Gt => (opcode::GT, None),
        Op::Lt => (opcode::LT, None),
        Op::Ge => (opcode::GE, None),
        Op::Le => (opcode::LE, None),
    };

    buffer.push(byte);
    if let Some(v) = operand {
        buffer.extend_from_slice(&v.to_be_bytes());
    }
    Ok(())
}

/// Decode the instruction at `address`, returning it with its encoded width.
pub fn decode_at(code: &[u8], address: usize) -> Result<(Op, usize), DecodeError> {
    let byte = *code.get(address).ok_or(DecodeError::AddressOutOfRange {
        address,
        end: code.len(),
    })?;

    let op = match byte {
        opcode::EXIT => Op::Exit,
        opcode::JUMP => Op::Jump,
        opcode::JUMP_ZERO => Op::JumpWhenZero,

        opcode::LOAD_CONST => Op::LoadConstant(read_operand(code, address)?),
        opcode::LOAD_REL => Op::LoadRelative(read_operand(code, address)?),

        opcode::STORE => Op::Store(read_operand(code, address)?),
        opcode::POP => Op::Pop(read_operand(code, address)?),

        opcode::ADD => Op::Add,
        opcode::SUB => Op::Sub,
        opcode::MUL => Op::Mul,
        opcode::DIV => Op::Div,
        opcode::MOD => Op::Mod,

        opcode::EQ => Op::Eq,
        opcode::GT => Op::Gt,
        opcode::LT => Op::Lt,
        opcode::GE => Op::Ge,
        opcode::LE => Op::Le,

        byte => return Err(DecodeError::InvalidOpcode { byte, address }),
    };

    let size = ByteEncoding.size_of(&op);
    Ok((op, size))
}

fn read_operand(code: &[u8], address: usize) -> Result<i32, DecodeError> {
    let start = address + 1;
    let bytes: [u8; OPERAND_SIZE] = code
        .get(start..start + OPERAND_SIZE)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::TruncatedOperand { address })?;
    Ok(i32::from_be_bytes(bytes))
}

/// Decode a whole artifact into `(address, instruction)` pairs.
pub fn decode_program(code: &[u8]) -> Result<Vec<(usize, Op)>, DecodeError> {
    let mut ops = Vec::new();
    let mut address = 0;

    while address < code.len() {
        let (op, size) = decode_at(code, address)?;
        ops.push((address, op));
        address += size;
    }

    Ok(ops)
}

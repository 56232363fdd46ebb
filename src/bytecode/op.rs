use serde::{Deserialize, Serialize};

use crate::lang::BinaryOperator;

// =============================================================================
// OP - Stack machine instructions
// =============================================================================

/// A single stack machine instruction.
///
/// Offsets are distances from the current top of stack (0 = top).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // literals
    /// Push a constant. ( -- v )
    LoadConstant(i32),
    /// Push a copy of the value `offset` slots below the top. ( -- v )
    LoadRelative(i32),
    /// Push the address of a label. Only valid before linking.
    LoadLabel(String),

    // stack slots
    /// Pop a value and overwrite the slot `offset` below the new top. ( v -- )
    Store(i32),
    /// Discard `count` values.
    Pop(i32),

    // control flow
    /// Pop an address and continue there. ( addr -- )
    Jump,
    /// Pop an address, pop a condition, jump if the condition is zero.
    /// ( cond addr -- )
    JumpWhenZero,
    /// Halt the machine.
    Exit,

    // arithmetic ( right left -- result )
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // comparison ( right left -- 0|1 )
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Op {
    /// The instruction implementing a binary operator.
    pub fn for_operator(operator: BinaryOperator) -> Op {
        match operator {
            BinaryOperator::Plus => Op::Add,
            BinaryOperator::Minus => Op::Sub,
            BinaryOperator::Times => Op::Mul,
            BinaryOperator::Divide => Op::Div,
            BinaryOperator::Modulo => Op::Mod,
            BinaryOperator::GreaterThan => Op::Gt,
            BinaryOperator::LessThan => Op::Lt,
            BinaryOperator::GreaterThanOrEqual => Op::Ge,
            BinaryOperator::LessThanOrEqual => Op::Le,
            BinaryOperator::DoubleEqual => Op::Eq,
        }
    }

    /// Integer operand carried by the instruction, if any.
    pub fn operand(&self) -> Option<i32> {
        match self {
            Op::LoadConstant(v) | Op::LoadRelative(v) | Op::Store(v) | Op::Pop(v) => Some(*v),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::LoadConstant(_) => "LOAD_CONST",
            Op::LoadRelative(_) => "LOAD_REL",
            Op::LoadLabel(_) => "LOAD_LABEL",
            Op::Store(_) => "STORE",
            Op::Pop(_) => "POP",
            Op::Jump => "JUMP",
            Op::JumpWhenZero => "JUMP_ZERO",
            Op::Exit => "EXIT",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::Eq => "EQ",
            Op::Gt => "GT",
            Op::Lt => "LT",
            Op::Ge => "GE",
            Op::Le => "LE",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::LoadLabel(label) => write!(f, "{:<12}{}", self.mnemonic(), label),
            op => match op.operand() {
                Some(v) => write!(f, "{:<12}{}", op.mnemonic(), v),
                None => write!(f, "{}", op.mnemonic()),
            },
        }
    }
}

//! # Brook Syntax Tree
//!
//! This module defines the syntax tree for the Brook language. The tree is
//! produced by the parser (or built by hand by an embedding host) and consumed
//! read-only by the bytecode compiler.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - All values are 32-bit signed integers; `0` is false, anything else true.

pub mod ast;

pub use ast::{BinaryOperator, Call, Expression, Function, Program, Statement};

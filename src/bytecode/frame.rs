//! Static stack frame layout.
//!
//! Every value a function touches lives on the one shared value stack. At
//! function entry the stack looks like this, top first:
//!
//! ```text
//!   local N          offset 0
//!   ...
//!   local 1
//!   argument P       (last parameter)
//!   ...
//!   argument 1
//!   return address
//!   return value     offset locals_size + 1
//! ```
//!
//! While an expression is being generated, partial results sit above the
//! frame; `grow`/`shrink` track them so every offset stays relative to the
//! real top of stack.
//!
//! Locals are found by one flat scan of the body that ignores block nesting.
//! Two `let`s of the same name in sibling `when` blocks therefore occupy two
//! slots, and every lookup resolves to the one nearest the top.

use crate::bytecode::compile_error::CompileError;
use crate::lang::{Function, Statement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    ReturnValue,
    ReturnAddress,
    /// A parameter or a declared local.
    Local(String),
    /// An unnamed intermediate result of an expression in progress.
    Temporary,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::ReturnValue => write!(f, "<return value>"),
            Slot::ReturnAddress => write!(f, "<return address>"),
            Slot::Local(name) => write!(f, "{}", name),
            Slot::Temporary => write!(f, "<temporary>"),
        }
    }
}

/// Slot sequence of one function, bottom of the frame first.
#[derive(Debug, Clone)]
pub struct StackFrame {
    function: String,
    slots: Vec<Slot>,
}

impl StackFrame {
    pub fn new(function: &Function) -> Self {
        let mut slots = vec![Slot::ReturnValue, Slot::ReturnAddress];

        slots.extend(function.parameters.iter().cloned().map(Slot::Local));
        slots.extend(declared_locals(&function.body).into_iter().map(Slot::Local));

        Self {
            function: function.name.clone(),
            slots,
        }
    }

    /// Distance of `slot` from the current top of stack.
    pub fn offset(&self, slot: &Slot) -> Result<i32, CompileError> {
        self.slots
            .iter()
            .rev()
            .position(|s| s == slot)
            .map(|distance| distance as i32)
            .ok_or_else(|| match slot {
                Slot::Local(name) => CompileError::unknown_variable(name, &self.function),
                other => CompileError::internal(format!(
                    "slot {} missing from frame of '{}'",
                    other, self.function
                )),
            })
    }

    pub fn local_offset(&self, name: &str) -> Result<i32, CompileError> {
        self.offset(&Slot::Local(name.to_string()))
    }

    /// Record an intermediate value pushed above the frame.
    pub fn grow(&mut self) {
        self.slots.push(Slot::Temporary);
    }

    /// Release the most recent intermediate value.
    pub fn shrink(&mut self) -> Result<(), CompileError> {
        match self.slots.last() {
            Some(Slot::Temporary) => {
                self.slots.pop();
                Ok(())
            }
            Some(other) => Err(CompileError::NotTemporary {
                slot: other.to_string(),
            }),
            None => Err(CompileError::internal(format!(
                "empty frame for '{}'",
                self.function
            ))),
        }
    }

    /// Parameters plus declared locals; the count a return must unwind.
    pub fn locals_size(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Local(_)))
            .count()
    }
}

/// Every `let` reachable in `body`, in source order, regardless of nesting.
pub fn declared_locals(body: &[Statement]) -> Vec<String> {
    let mut locals = Vec::new();
    collect_locals(body, &mut locals);
    locals
}

fn collect_locals(body: &[Statement], locals: &mut Vec<String>) {
    for statement in body {
        match statement {
            Statement::Let { name, .. } => locals.push(name.clone()),
            Statement::When { body, .. } => collect_locals(body, locals),
            Statement::Return(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Expression;

    fn let_(name: &str, value: i32) -> Statement {
        Statement::Let {
            name: name.to_string(),
            value: Expression::Integer(value),
        }
    }

    fn function(parameters: &[&str], body: Vec<Statement>) -> Function {
        Function::new(
            "f",
            parameters.iter().map(|p| p.to_string()).collect(),
            body,
        )
    }

    #[test]
    fn test_empty_frame() {
        let frame = StackFrame::new(&function(&[], vec![]));

        assert_eq!(frame.locals_size(), 0);
        assert_eq!(frame.offset(&Slot::ReturnAddress), Ok(0));
        assert_eq!(frame.offset(&Slot::ReturnValue), Ok(1));
    }

    #[test]
    fn test_arguments_in_reverse_order() {
        let frame = StackFrame::new(&function(&["a", "b"], vec![]));

        assert_eq!(frame.local_offset("b"), Ok(0));
        assert_eq!(frame.local_offset("a"), Ok(1));
        assert_eq!(frame.offset(&Slot::ReturnAddress), Ok(2));
        assert_eq!(frame.offset(&Slot::ReturnValue), Ok(3));
        assert_eq!(frame.locals_size(), 2);
    }

    #[test]
    fn test_locals_above_arguments() {
        let frame = StackFrame::new(&function(&["n"], vec![let_("x", 1), let_("y", 2)]));

        assert_eq!(frame.local_offset("y"), Ok(0));
        assert_eq!(frame.local_offset("x"), Ok(1));
        assert_eq!(frame.local_offset("n"), Ok(2));
        assert_eq!(frame.offset(&Slot::ReturnValue), Ok(4));
        assert_eq!(frame.locals_size(), 3);
    }

    #[test]
    fn test_nested_locals_are_flattened() {
        let body = vec![
            Statement::When {
                condition: Expression::Integer(1),
                body: vec![let_("x", 1)],
            },
            Statement::When {
                condition: Expression::Integer(1),
                body: vec![let_("x", 2)],
            },
        ];

        let frame = StackFrame::new(&function(&[], body));

        assert_eq!(frame.locals_size(), 2);
        assert_eq!(frame.local_offset("x"), Ok(0));
    }

    #[test]
    fn test_grow_shifts_offsets() {
        let mut frame = StackFrame::new(&function(&["a"], vec![]));

        frame.grow();
        assert_eq!(frame.local_offset("a"), Ok(1));
        frame.grow();
        assert_eq!(frame.local_offset("a"), Ok(2));
        assert_eq!(frame.locals_size(), 1);

        frame.shrink().unwrap();
        frame.shrink().unwrap();
        assert_eq!(frame.local_offset("a"), Ok(0));
    }

    #[test]
    fn test_shrink_rejects_named_slot() {
        let mut frame = StackFrame::new(&function(&["a"], vec![]));

        let err = frame.shrink().unwrap_err();
        assert_eq!(
            err,
            CompileError::NotTemporary {
                slot: "a".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_local() {
        let frame = StackFrame::new(&function(&[], vec![]));

        assert!(matches!(
            frame.local_offset("nope"),
            Err(CompileError::UnknownVariable { .. })
        ));
    }
}

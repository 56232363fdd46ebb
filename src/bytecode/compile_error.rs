use thiserror::Error;

/// Structural errors found while lowering a syntax tree to chunks.
///
/// All of these abort code generation; they describe a malformed input tree
/// or, for `Internal`, a defect in the generator itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A call names a function that is not declared in the program
    #[error("compile error: unknown function '{name}'{}", hint_suffix(.hint))]
    UnknownFunction { name: String, hint: Option<String> },

    /// An identifier is neither a parameter nor a local of its function
    #[error("compile error: unknown variable '{name}' in function '{function}'")]
    UnknownVariable { name: String, function: String },

    /// A call passes a different number of arguments than the callee declares
    #[error(
        "compile error: function '{name}' expects {expected} argument(s), got {found}"
    )]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Two functions share a name
    #[error("compile error: function '{name}' is declared more than once")]
    DuplicateFunction { name: String },

    /// The frame layout was asked to release a slot that is not a temporary
    #[error("compile error: cannot pop non-temporary slot '{slot}'")]
    NotTemporary { slot: String },

    /// Internal compiler error (shouldn't happen in normal use)
    #[error("compile error: internal error: {0}")]
    Internal(String),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!("\n  hint: {}", h),
        None => String::new(),
    }
}

impl CompileError {
    pub fn unknown_function(name: &str) -> Self {
        CompileError::UnknownFunction {
            name: name.to_string(),
            hint: None,
        }
    }

    /// Error for a missing entry function requested by the bootstrap chunk
    pub fn missing_entry(name: &str) -> Self {
        CompileError::UnknownFunction {
            name: name.to_string(),
            hint: Some(format!(
                "the program entry point is '{}'; declare `fn {}() {{ ... }}`",
                name, name
            )),
        }
    }

    pub fn unknown_variable(name: &str, function: &str) -> Self {
        CompileError::UnknownVariable {
            name: name.to_string(),
            function: function.to_string(),
        }
    }

    pub fn arity_mismatch(name: &str, expected: usize, found: usize) -> Self {
        CompileError::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
        }
    }

    pub fn duplicate_function(name: &str) -> Self {
        CompileError::DuplicateFunction {
            name: name.to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

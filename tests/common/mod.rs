#![allow(dead_code)]

use brook::{Compiler, RuntimeError, encode, link_encoded, link_indexed, parse, run_bytes, run_instructions};

fn compile(source: &str) -> Vec<brook::Chunk> {
    let program = parse(source).unwrap_or_else(|e| panic!("parse failed for `{source}`: {e}"));
    Compiler::new()
        .compile_program(&program)
        .unwrap_or_else(|e| panic!("compile failed for `{source}`: {e}"))
}

/// Run on the instruction VM, linked with index addressing.
pub fn try_run_instructions(source: &str) -> Result<Vec<i32>, RuntimeError> {
    let ops = link_indexed(&compile(source)).unwrap();
    run_instructions(&ops)
}

/// Run on the byte VM, linked with byte addressing and encoded.
pub fn try_run_bytes(source: &str) -> Result<Vec<i32>, RuntimeError> {
    let ops = link_encoded(&compile(source)).unwrap();
    run_bytes(&encode(&ops).unwrap())
}

pub fn run_on_instructions(source: &str) -> Vec<i32> {
    try_run_instructions(source)
        .unwrap_or_else(|e| panic!("instruction VM failed for `{source}`: {e}"))
}

pub fn run_on_bytes(source: &str) -> Vec<i32> {
    try_run_bytes(source).unwrap_or_else(|e| panic!("byte VM failed for `{source}`: {e}"))
}

/// Assert both machines leave the same stack and return it.
pub fn run_both(source: &str) -> Vec<i32> {
    let instructions = run_on_instructions(source);
    let bytes = run_on_bytes(source);
    assert_eq!(instructions, bytes, "instruction vs byte VM mismatch for: {source}");
    instructions
}

/// Generate one test module per program, running it on both machines.
///
/// ```ignore
/// dual_vm_tests! {
///     answer: "fn main() { return 42 }" => [42],
/// }
/// ```
#[macro_export]
macro_rules! dual_vm_tests {
    ($($name:ident : $source:expr => [$($expected:expr),* $(,)?]),* $(,)?) => {
        $(
            mod $name {
                use super::common;

                #[test]
                fn instructions() {
                    let stack = common::run_on_instructions($source);
                    assert_eq!(stack, vec![$($expected),*], "instruction VM: {}", $source);
                }

                #[test]
                fn bytes() {
                    let stack = common::run_on_bytes($source);
                    assert_eq!(stack, vec![$($expected),*], "byte VM: {}", $source);
                }
            }
        )*
    };
}

/// Generate tests asserting both machines fail at runtime.
#[macro_export]
macro_rules! dual_vm_error_tests {
    ($($name:ident : $source:expr),* $(,)?) => {
        $(
            mod $name {
                use super::common;

                #[test]
                fn instructions() {
                    assert!(common::try_run_instructions($source).is_err(),
                        "instruction VM should fail for: {}", $source);
                }

                #[test]
                fn bytes() {
                    assert!(common::try_run_bytes($source).is_err(),
                        "byte VM should fail for: {}", $source);
                }
            }
        )*
    };
}

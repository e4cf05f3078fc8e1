#![allow(dead_code)]

use vau_core::{Value, VauError};
use vau_eval::Interpreter;

/// Evaluate in a fresh interpreter.
pub fn eval(input: &str) -> Value {
    let interp = Interpreter::new();
    interp
        .eval_str(input)
        .unwrap_or_else(|e| panic!("evaluation failed for `{input}`: {e}"))
}

/// Evaluate in a fresh interpreter and render the result as the REPL would.
pub fn eval_str(input: &str) -> String {
    eval(input).to_string()
}

/// Evaluate in a fresh interpreter, expecting an error.
pub fn eval_err(input: &str) -> VauError {
    let interp = Interpreter::new();
    match interp.eval_str(input) {
        Ok(v) => panic!("expected error for `{input}`, got {v}"),
        Err(e) => e,
    }
}

/// Generate one test per case, comparing the printed result.
///
/// Usage:
/// ```ignore
/// eval_tests! {
///     test_name: "(+ 1 2)" => "3",
/// }
/// ```
#[macro_export]
macro_rules! eval_tests {
    ($($name:ident : $input:expr => $expected:expr),* $(,)?) => {
        $(
            paste::paste! {
                #[test]
                fn [<eval_ $name>]() {
                    let result = common::eval_str($input);
                    assert_eq!(result, $expected, "for: {}", $input);
                }
            }
        )*
    };
}

/// Generate one test per case, checking that the error message contains a fragment.
#[macro_export]
macro_rules! eval_error_tests {
    ($($name:ident : $input:expr => $fragment:expr),* $(,)?) => {
        $(
            paste::paste! {
                #[test]
                fn [<error_ $name>]() {
                    let err = common::eval_err($input);
                    assert!(
                        err.message().contains($fragment),
                        "error for {} was {:?}, expected it to mention {:?}",
                        $input,
                        err.message(),
                        $fragment
                    );
                }
            }
        )*
    };
}

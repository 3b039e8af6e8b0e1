//! Errors raised by the checked output layer.
//!
//! The raw bindings have no error type: their failures are the native
//! routine's own return values or undefined behavior.

use thiserror::Error;

use crate::format::ArgSpec;

/// A format string that the checked layer refuses to forward to `printf`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A `%` that does not begin a recognizable directive.
    #[error("malformed directive at byte {offset}")]
    Malformed { offset: usize },

    /// A directive that is valid C but cannot be checked or passed from Rust.
    #[error("unsupported directive `{directive}` at byte {offset}: {reason}")]
    Unsupported {
        offset: usize,
        directive: String,
        reason: &'static str,
    },

    /// The directives consume a different number of arguments than supplied.
    #[error("format consumes {expected} argument(s) but {actual} were supplied")]
    ArgCount { expected: usize, actual: usize },

    /// An argument whose class or width does not fit its directive.
    #[error("argument {index} for `{directive}`: expected {expected}, got {actual}")]
    ArgMismatch {
        index: usize,
        directive: String,
        expected: ArgSpec,
        actual: ArgSpec,
    },
}

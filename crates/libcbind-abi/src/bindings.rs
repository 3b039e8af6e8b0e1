//! The binding table.
//!
//! Each entry binds a local Rust name onto the C runtime's exported symbol of
//! the same routine. The linker resolves these against the libc that `std`
//! already links; a missing symbol is a link error, never a runtime one.

use std::ffi::{c_char, c_int};
use std::fmt;

/// Who owns memory crossing a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Pointers are borrowed from the caller for the duration of the call only.
    /// The native routine neither frees nor retains them.
    BorrowedForCall,
}

/// Parameter and return types of a binding, as seen from Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// `(name, type)` for each fixed parameter.
    pub params: &'static [(&'static str, &'static str)],
    /// Whether a C `...` tail follows the fixed parameters.
    pub variadic: bool,
    /// Return type.
    pub ret: &'static str,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {ty}")?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("...")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A single binding declaration: local name, native symbol, signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingDecl {
    pub local_name: &'static str,
    pub native_symbol: &'static str,
    pub signature: Signature,
    pub ownership: Ownership,
}

bind_native! {
    /// C `printf`.
    ///
    /// Writes `format`, with each conversion directive replaced by the next
    /// trailing argument, to the process's standard output stream. Returns the
    /// number of bytes written, or a negative value if the write failed.
    ///
    /// # Safety
    ///
    /// - `format` must point to a valid null-terminated byte sequence.
    /// - The trailing arguments must match the directives in `format` in
    ///   count and (promoted) type. Nothing checks this; a mismatch is
    ///   undefined behavior. See [`crate::checked_printf!`] for a validated
    ///   front end.
    variadic fn printf = "printf"(format: *const c_char) -> c_int;

    /// C `strlen`.
    ///
    /// Returns the number of bytes preceding the first null byte at `s`.
    ///
    /// # Safety
    ///
    /// `s` must be non-null and point to memory that is readable up to and
    /// including a null terminator. No bounds are checked.
    fixed fn strlen = "strlen"(s: *const c_char) -> usize;
}

/// Look up a binding by its local name.
#[must_use]
pub fn lookup(local_name: &str) -> Option<&'static BindingDecl> {
    BINDINGS.iter().find(|b| b.local_name == local_name)
}

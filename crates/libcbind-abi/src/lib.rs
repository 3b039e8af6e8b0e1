// Raw foreign declarations take pointers whose validity only the caller can
// vouch for; the contract lives on each binding's doc comment.
#![allow(clippy::missing_safety_doc)]
//! # libcbind-abi
//!
//! Direct symbol bindings onto the platform C runtime.
//!
//! Each exposed routine is a foreign declaration whose local name resolves, at
//! link time, to the C runtime's own symbol. No Rust code runs between the
//! caller and the native routine:
//!
//! ```text
//! Rust caller -> extern "C" declaration -> linker -> libc printf/strlen
//! ```
//!
//! The raw bindings in [`bindings`] keep the native contract exactly,
//! including the unchecked variadic tail of `printf`. The [`checked`] layer is
//! opt-in: it validates a format string against typed arguments before making
//! the same single foreign call.

#[macro_use]
mod macros;

pub mod bindings;
pub mod checked;
pub mod config;
pub mod error;
pub mod format;
pub mod linkage;

pub use bindings::{BINDINGS, BindingDecl, Ownership, Signature, lookup, printf, strlen};
pub use checked::{PrintfArg, cstr_len};
pub use config::{CheckMode, check_mode, set_check_mode};
pub use error::FormatError;
pub use format::{ArgClass, ArgSpec};
pub use linkage::{LinkageReport, ResolvedSymbol, audit};

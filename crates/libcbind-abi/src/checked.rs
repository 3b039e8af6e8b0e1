//! Opt-in checked front end over the raw bindings.
//!
//! [`checked_printf!`](crate::checked_printf) validates its format string
//! against the static types of its arguments and, only if they agree, makes
//! exactly one call through the raw variadic
//! [`printf`](crate::bindings::printf) binding. The native return value comes
//! back untouched, negative results included.
//!
//! [`cstr_len`] is the raw [`strlen`] binding behind a `&CStr`, whose type
//! already guarantees the null terminator the native routine requires.

use std::ffi::{CStr, c_char, c_int, c_uint, c_void};

use crate::bindings::strlen;
use crate::config::{CheckMode, check_mode};
use crate::error::FormatError;
use crate::format::{self, ArgClass, ArgSpec};

mod sealed {
    pub trait Sealed {}
}

/// A Rust value that may be passed through `printf`'s variadic tail.
///
/// `Ffi` is the value after C's default argument promotions: integers
/// narrower than `int` widen to `c_int` and `f32` widens to `f64`. Raw
/// pointers are only ever `%p` arguments; `%s` takes a `&CStr`.
pub trait PrintfArg: sealed::Sealed + Copy {
    /// The promoted value handed to the foreign call.
    type Ffi;
    /// Class and width of `Ffi`.
    const SPEC: ArgSpec;

    fn into_ffi(self) -> Self::Ffi;
}

macro_rules! impl_printf_arg {
    ($($ty:ty => $ffi:ty, $class:ident;)*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl PrintfArg for $ty {
                type Ffi = $ffi;
                const SPEC: ArgSpec = ArgSpec::of::<$ffi>(ArgClass::$class);

                #[inline]
                fn into_ffi(self) -> $ffi {
                    <$ffi>::from(self)
                }
            }
        )*
    };
}

impl_printf_arg! {
    i8 => c_int, SignedInt;
    i16 => c_int, SignedInt;
    i32 => c_int, SignedInt;
    u8 => c_int, SignedInt;
    u16 => c_int, SignedInt;
    u32 => c_uint, UnsignedInt;
    i64 => i64, SignedInt;
    u64 => u64, UnsignedInt;
    isize => isize, SignedInt;
    usize => usize, UnsignedInt;
    f32 => f64, Double;
    f64 => f64, Double;
}

impl sealed::Sealed for &CStr {}

impl PrintfArg for &CStr {
    type Ffi = *const c_char;
    const SPEC: ArgSpec = ArgSpec::of::<*const c_char>(ArgClass::CStr);

    #[inline]
    fn into_ffi(self) -> *const c_char {
        self.as_ptr()
    }
}

macro_rules! impl_printf_ptr {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl PrintfArg for $ty {
                type Ffi = *const c_void;
                const SPEC: ArgSpec = ArgSpec::of::<*const c_void>(ArgClass::Pointer);

                #[inline]
                fn into_ffi(self) -> *const c_void {
                    self as *const c_void
                }
            }
        )*
    };
}

impl_printf_ptr!(*const c_void, *mut c_void, *const c_char, *mut c_char);

/// Spec of the value a closure would produce. The closure is never called.
#[doc(hidden)]
#[must_use]
pub fn spec_of<T: PrintfArg, F: FnOnce() -> T>(_: &F) -> ArgSpec {
    T::SPEC
}

/// Validate `format` against `args` under the configured [`CheckMode`].
///
/// Returns the number of variadic arguments the format consumes.
pub fn check(format: &CStr, args: &[ArgSpec]) -> Result<usize, FormatError> {
    check_with(format, args, check_mode())
}

/// Validate `format` against `args` under an explicit mode.
pub fn check_with(format: &CStr, args: &[ArgSpec], mode: CheckMode) -> Result<usize, FormatError> {
    format::validate(format.to_bytes(), args, mode)
}

/// Length of `s` in bytes, measured by the native `strlen`.
#[must_use]
pub fn cstr_len(s: &CStr) -> usize {
    // SAFETY: a `CStr` is always readable up to and including its terminator.
    unsafe { strlen(s.as_ptr()) }
}

/// Call the native `printf` after checking the format against the arguments.
///
/// Expands to an expression of type `Result<c_int, FormatError>`. On `Ok`,
/// the value is `printf`'s own return. On `Err`, nothing was written.
///
/// ```
/// let written = libcbind_abi::checked_printf!(c"%s=%d\n", c"answer", 42i32);
/// assert_eq!(written, Ok(10));
/// ```
///
/// Arguments are evaluated once, at the call.
///
/// Integer arguments need a concrete type. The promoted type passed through
/// `...` is derived from the argument's type before integer literal fallback
/// happens, so an unsuffixed literal does not compile:
///
/// ```compile_fail
/// let _ = libcbind_abi::checked_printf!(c"%d\n", 42);
/// ```
#[macro_export]
macro_rules! checked_printf {
    ($format:expr $(, $arg:expr)* $(,)?) => {{
        let format: &::core::ffi::CStr = $format;
        let specs: &[$crate::format::ArgSpec] = &[$($crate::checked::spec_of(&|| $arg)),*];
        match $crate::checked::check(format, specs) {
            ::core::result::Result::Ok(_) => ::core::result::Result::Ok(
                // SAFETY: `format` is null-terminated and every promoted
                // argument matched its directive's class and width.
                unsafe {
                    $crate::bindings::printf(
                        format.as_ptr()
                        $(, $crate::checked::PrintfArg::into_ffi($arg))*
                    )
                },
            ),
            ::core::result::Result::Err(err) => {
                ::core::result::Result::Err::<::core::ffi::c_int, $crate::error::FormatError>(err)
            }
        }
    }};
}

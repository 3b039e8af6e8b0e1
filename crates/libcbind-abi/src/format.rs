//! printf format-string analysis.
//!
//! Parses a format string into literal runs and conversion directives and
//! derives the argument each directive consumes from the variadic tail.
//! Nothing here renders output; rendering stays with the native `printf`.
//!
//! Reference: ISO C11 7.21.6.1, POSIX.1-2024 fprintf.

use std::ffi::{c_int, c_long, c_longlong};
use std::fmt;
use std::mem::size_of;

use crate::config::CheckMode;
use crate::error::FormatError;

// ---------------------------------------------------------------------------
// Directive types
// ---------------------------------------------------------------------------

/// Flags parsed from a printf format directive.
///
/// Recorded as written. Precedence between flags (`+` over ` `, `-` over
/// `0`) only affects rendering, which the native routine does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags {
    pub left_justify: bool, // '-'
    pub force_sign: bool,   // '+'
    pub space_sign: bool,   // ' '
    pub alt_form: bool,     // '#'
    pub zero_pad: bool,     // '0'
}

/// Width specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    None,
    Fixed(usize),
    FromArg, // '*'
}

/// Precision specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    None,
    Fixed(usize),
    FromArg, // '.*'
}

/// Length modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMod {
    None,
    Hh,   // 'hh'
    H,    // 'h'
    L,    // 'l'
    Ll,   // 'll'
    Z,    // 'z'
    T,    // 't'
    J,    // 'j'
    BigL, // 'L'
}

/// A parsed printf conversion directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: FormatFlags,
    pub width: Width,
    pub precision: Precision,
    pub length: LengthMod,
    pub conversion: u8,
}

/// A segment of a parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSegment<'a> {
    /// Literal bytes emitted verbatim.
    Literal(&'a [u8]),
    /// A `%%` escape.
    Percent,
    /// A conversion directive. `offset` is the byte index of its `%` and
    /// `text` spans from the `%` through the conversion character.
    Directive {
        spec: FormatSpec,
        offset: usize,
        text: &'a [u8],
    },
}

// ---------------------------------------------------------------------------
// Argument classes
// ---------------------------------------------------------------------------

/// What kind of value a variadic argument carries after default promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgClass {
    SignedInt,
    UnsignedInt,
    Double,
    /// Pointer to a null-terminated byte sequence.
    CStr,
    /// Any other data pointer.
    Pointer,
}

/// Class and byte width of one variadic argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgSpec {
    pub class: ArgClass,
    pub size: usize,
}

impl ArgSpec {
    #[must_use]
    pub const fn new(class: ArgClass, size: usize) -> Self {
        Self { class, size }
    }

    /// Spec for a value of type `T`.
    #[must_use]
    pub const fn of<T>(class: ArgClass) -> Self {
        Self::new(class, size_of::<T>())
    }

    /// Returns true if `actual` may be passed where `self` is expected.
    #[must_use]
    pub fn accepts(self, actual: ArgSpec, mode: CheckMode) -> bool {
        use ArgClass::{CStr, Double, Pointer, SignedInt, UnsignedInt};
        match (self.class, actual.class) {
            (SignedInt, SignedInt) | (UnsignedInt, UnsignedInt) => self.size == actual.size,
            (SignedInt, UnsignedInt) | (UnsignedInt, SignedInt) => {
                mode.allows_sign_swap() && self.size == actual.size
            }
            (Double, Double) | (CStr, CStr) => true,
            // A C string is still a pointer as far as `%p` is concerned.
            (Pointer, Pointer | CStr) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            ArgClass::SignedInt => write!(f, "signed {}-byte integer", self.size),
            ArgClass::UnsignedInt => write!(f, "unsigned {}-byte integer", self.size),
            ArgClass::Double => f.write_str("double"),
            ArgClass::CStr => f.write_str("C string"),
            ArgClass::Pointer => f.write_str("pointer"),
        }
    }
}

/// One argument consumed by a directive, with the directive it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot<'a> {
    pub spec: ArgSpec,
    pub offset: usize,
    pub directive: &'a [u8],
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a single format directive starting after the '%' character.
///
/// Returns `(spec, bytes_consumed)` counted from `fmt[0]`, or `None` if the
/// directive is malformed.
pub fn parse_format_spec(fmt: &[u8]) -> Option<(FormatSpec, usize)> {
    let mut pos = 0;
    let len = fmt.len();

    let mut flags = FormatFlags::default();
    while pos < len {
        match fmt[pos] {
            b'-' => flags.left_justify = true,
            b'+' => flags.force_sign = true,
            b' ' => flags.space_sign = true,
            b'#' => flags.alt_form = true,
            b'0' => flags.zero_pad = true,
            _ => break,
        }
        pos += 1;
    }

    let width = if pos < len && fmt[pos] == b'*' {
        pos += 1;
        Width::FromArg
    } else {
        let start = pos;
        while pos < len && fmt[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos > start {
            Width::Fixed(parse_decimal(&fmt[start..pos]))
        } else {
            Width::None
        }
    };

    let precision = if pos < len && fmt[pos] == b'.' {
        pos += 1;
        if pos < len && fmt[pos] == b'*' {
            pos += 1;
            Precision::FromArg
        } else {
            let start = pos;
            while pos < len && fmt[pos].is_ascii_digit() {
                pos += 1;
            }
            Precision::Fixed(parse_decimal(&fmt[start..pos]))
        }
    } else {
        Precision::None
    };

    let length = match fmt.get(pos) {
        Some(b'h') if fmt.get(pos + 1) == Some(&b'h') => {
            pos += 2;
            LengthMod::Hh
        }
        Some(b'h') => {
            pos += 1;
            LengthMod::H
        }
        Some(b'l') if fmt.get(pos + 1) == Some(&b'l') => {
            pos += 2;
            LengthMod::Ll
        }
        Some(b'l') => {
            pos += 1;
            LengthMod::L
        }
        Some(b'z') => {
            pos += 1;
            LengthMod::Z
        }
        Some(b't') => {
            pos += 1;
            LengthMod::T
        }
        Some(b'j') => {
            pos += 1;
            LengthMod::J
        }
        Some(b'L') => {
            pos += 1;
            LengthMod::BigL
        }
        _ => LengthMod::None,
    };

    let conversion = *fmt.get(pos)?;
    pos += 1;

    match conversion {
        b'd' | b'i' | b'u' | b'x' | b'X' | b'o' | b's' | b'c' | b'p' | b'n' | b'%' | b'f'
        | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A' => {}
        _ => return None,
    }

    Some((
        FormatSpec {
            flags,
            width,
            precision,
            length,
            conversion,
        },
        pos,
    ))
}

/// Split a format string into literal runs, `%%` escapes and directives.
///
/// Unlike the native routine, which leaves malformed directives undefined,
/// this reports them.
pub fn parse_format_string(fmt: &[u8]) -> Result<Vec<FormatSegment<'_>>, FormatError> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let len = fmt.len();

    while pos < len {
        let start = pos;
        while pos < len && fmt[pos] != b'%' {
            pos += 1;
        }
        if pos > start {
            segments.push(FormatSegment::Literal(&fmt[start..pos]));
        }
        if pos >= len {
            break;
        }

        let percent = pos;
        pos += 1;
        if pos >= len {
            return Err(FormatError::Malformed { offset: percent });
        }
        if fmt[pos] == b'%' {
            segments.push(FormatSegment::Percent);
            pos += 1;
            continue;
        }
        if is_positional(&fmt[pos..]) {
            return Err(FormatError::Unsupported {
                offset: percent,
                directive: String::from_utf8_lossy(&fmt[percent..]).into_owned(),
                reason: "positional arguments",
            });
        }

        let (spec, consumed) =
            parse_format_spec(&fmt[pos..]).ok_or(FormatError::Malformed { offset: percent })?;
        pos += consumed;
        segments.push(FormatSegment::Directive {
            spec,
            offset: percent,
            text: &fmt[percent..pos],
        });
    }
    Ok(segments)
}

impl FormatSpec {
    /// Arguments this directive pulls from the variadic tail, in order.
    pub fn consumed_args(&self, offset: usize, text: &[u8]) -> Result<Vec<ArgSpec>, FormatError> {
        let unsupported = |reason: &'static str| FormatError::Unsupported {
            offset,
            directive: String::from_utf8_lossy(text).into_owned(),
            reason,
        };

        let mut out = Vec::with_capacity(3);
        if matches!(self.width, Width::FromArg) {
            out.push(ArgSpec::of::<c_int>(ArgClass::SignedInt));
        }
        if matches!(self.precision, Precision::FromArg) {
            out.push(ArgSpec::of::<c_int>(ArgClass::SignedInt));
        }

        match self.conversion {
            b'%' => {}
            b'd' | b'i' => out.push(self.int_arg(ArgClass::SignedInt).ok_or_else(|| {
                unsupported("`L` does not apply to integer conversions")
            })?),
            b'u' | b'o' | b'x' | b'X' => {
                out.push(self.int_arg(ArgClass::UnsignedInt).ok_or_else(|| {
                    unsupported("`L` does not apply to integer conversions")
                })?);
            }
            b'c' => match self.length {
                LengthMod::None => out.push(ArgSpec::of::<c_int>(ArgClass::SignedInt)),
                LengthMod::L => return Err(unsupported("wide characters")),
                _ => return Err(unsupported("length modifier on %c")),
            },
            b's' => match self.length {
                LengthMod::None => out.push(ArgSpec::of::<usize>(ArgClass::CStr)),
                LengthMod::L => return Err(unsupported("wide strings")),
                _ => return Err(unsupported("length modifier on %s")),
            },
            b'p' => out.push(ArgSpec::of::<usize>(ArgClass::Pointer)),
            b'n' => return Err(unsupported("%n stores through a caller pointer")),
            _ => match self.length {
                LengthMod::BigL => return Err(unsupported("long double")),
                LengthMod::None | LengthMod::L => out.push(ArgSpec::of::<f64>(ArgClass::Double)),
                _ => return Err(unsupported("length modifier on a floating conversion")),
            },
        }
        Ok(out)
    }

    fn int_arg(&self, class: ArgClass) -> Option<ArgSpec> {
        // hh and h arguments arrive promoted to int.
        let size = match self.length {
            LengthMod::None | LengthMod::Hh | LengthMod::H => size_of::<c_int>(),
            LengthMod::L => size_of::<c_long>(),
            LengthMod::Ll => size_of::<c_longlong>(),
            LengthMod::Z => size_of::<usize>(),
            LengthMod::T => size_of::<isize>(),
            LengthMod::J => size_of::<i64>(),
            LengthMod::BigL => return None,
        };
        Some(ArgSpec::new(class, size))
    }
}

/// Every argument the format string consumes, in call order.
pub fn arg_slots(fmt: &[u8]) -> Result<Vec<ArgSlot<'_>>, FormatError> {
    let mut slots = Vec::new();
    for segment in parse_format_string(fmt)? {
        if let FormatSegment::Directive { spec, offset, text } = segment {
            for arg in spec.consumed_args(offset, text)? {
                slots.push(ArgSlot {
                    spec: arg,
                    offset,
                    directive: text,
                });
            }
        }
    }
    Ok(slots)
}

/// Check `args` against the arguments `fmt` consumes.
///
/// Returns the number of arguments consumed. Surplus arguments, which C
/// silently ignores, are rejected.
pub fn validate(fmt: &[u8], args: &[ArgSpec], mode: CheckMode) -> Result<usize, FormatError> {
    let slots = arg_slots(fmt)?;
    if slots.len() != args.len() {
        return Err(FormatError::ArgCount {
            expected: slots.len(),
            actual: args.len(),
        });
    }
    for (index, (slot, actual)) in slots.iter().zip(args).enumerate() {
        if !slot.spec.accepts(*actual, mode) {
            return Err(FormatError::ArgMismatch {
                index,
                directive: String::from_utf8_lossy(slot.directive).into_owned(),
                expected: slot.spec,
                actual: *actual,
            });
        }
    }
    Ok(slots.len())
}

fn is_positional(rest: &[u8]) -> bool {
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    digits > 0 && rest.get(digits) == Some(&b'$')
}

fn parse_decimal(digits: &[u8]) -> usize {
    digits.iter().fold(0usize, |acc, d| {
        acc.saturating_mul(10).saturating_add(usize::from(d - b'0'))
    })
}

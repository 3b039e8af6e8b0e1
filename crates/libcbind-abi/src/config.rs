//! Checked-layer configuration.
//!
//! The mode is read from the `LIBCBIND_CHECK_MODE` environment variable:
//! - `strict` (default): every integer argument must match its directive in
//!   both width and signedness (`%d` takes a signed `c_int`, `%x` an unsigned one).
//! - `lenient`: a signed argument may satisfy an unsigned directive and vice
//!   versa, provided the widths agree, as C's `va_arg` permits.
//!
//! Both modes always reject width, class and count mismatches. The raw
//! bindings never consult this setting.

use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable selecting the checked-layer mode.
pub const CHECK_MODE_ENV: &str = "LIBCBIND_CHECK_MODE";

/// Validation mode for the checked output layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// Integer directives require exact width and signedness.
    #[default]
    Strict,
    /// Integer directives accept either signedness at the right width.
    Lenient,
}

impl CheckMode {
    /// Parse from string (case-insensitive). Unknown values fall back to `Strict`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" | "relaxed" | "loose" | "c" => Self::Lenient,
            _ => Self::Strict,
        }
    }

    /// Returns true if a same-width signed/unsigned swap is accepted.
    #[must_use]
    pub const fn allows_sign_swap(self) -> bool {
        matches!(self, Self::Lenient)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

// 0 = unresolved, otherwise one of the MODE_* values.
static CACHED_MODE: AtomicU8 = AtomicU8::new(MODE_UNRESOLVED);

const MODE_UNRESOLVED: u8 = 0;
const MODE_STRICT: u8 = 1;
const MODE_LENIENT: u8 = 2;

fn mode_to_u8(mode: CheckMode) -> u8 {
    match mode {
        CheckMode::Strict => MODE_STRICT,
        CheckMode::Lenient => MODE_LENIENT,
    }
}

fn u8_to_mode(v: u8) -> CheckMode {
    match v {
        MODE_LENIENT => CheckMode::Lenient,
        _ => CheckMode::Strict,
    }
}

/// Get the configured check mode (reads the env var on first call, caches thereafter).
#[must_use]
pub fn check_mode() -> CheckMode {
    let cached = CACHED_MODE.load(Ordering::Acquire);
    if cached != MODE_UNRESOLVED {
        return u8_to_mode(cached);
    }

    let mode = std::env::var(CHECK_MODE_ENV)
        .map(|v| CheckMode::from_str_loose(&v))
        .unwrap_or_default();
    // A concurrent resolver or an explicit override may have won the race; keep theirs.
    match CACHED_MODE.compare_exchange(
        MODE_UNRESOLVED,
        mode_to_u8(mode),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => mode,
        Err(existing) => u8_to_mode(existing),
    }
}

/// Override the check mode for the rest of the process.
pub fn set_check_mode(mode: CheckMode) {
    CACHED_MODE.store(mode_to_u8(mode), Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check_modes() {
        assert_eq!(CheckMode::from_str_loose("strict"), CheckMode::Strict);
        assert_eq!(CheckMode::from_str_loose("STRICT"), CheckMode::Strict);
        assert_eq!(CheckMode::from_str_loose("lenient"), CheckMode::Lenient);
        assert_eq!(CheckMode::from_str_loose(" Relaxed "), CheckMode::Lenient);
        assert_eq!(CheckMode::from_str_loose("c"), CheckMode::Lenient);
    }

    #[test]
    fn unknown_mode_defaults_to_strict() {
        assert_eq!(CheckMode::from_str_loose("garbage"), CheckMode::Strict);
        assert_eq!(CheckMode::from_str_loose(""), CheckMode::Strict);
        assert_eq!(CheckMode::default(), CheckMode::Strict);
    }

    #[test]
    fn sign_swap_only_when_lenient() {
        assert!(!CheckMode::Strict.allows_sign_swap());
        assert!(CheckMode::Lenient.allows_sign_swap());
    }

    #[test]
    fn mode_round_trips_through_cache_encoding() {
        for mode in [CheckMode::Strict, CheckMode::Lenient] {
            assert_eq!(u8_to_mode(mode_to_u8(mode)), mode);
        }
    }
}

//! Fixture loading and management.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Fixture function: `strlen`, `printf` or `printf_concurrent`.
    pub function: String,
    /// C standard section reference.
    pub spec_section: String,
    /// Function-specific inputs.
    pub inputs: serde_json::Value,
    /// Expected bytes on stdout (`printf*`) or the returned length (`strlen`).
    pub expected_output: String,
    /// Expected native return value, when the case asserts one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<i64>,
    /// The checked layer must refuse the call: the probe exits with its
    /// refusal status and reports the `FormatError`. Otherwise the probe must
    /// exit cleanly.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expect_refused: bool,
}

impl FixtureCase {
    /// Decode `inputs` into the shape the case's function expects.
    pub fn parse_inputs<T: DeserializeOwned>(&self) -> Result<T, HarnessError> {
        serde_json::from_value(self.inputs.clone()).map_err(|e| HarnessError::InvalidInput {
            case: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// A collection of fixture cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Family name.
    pub family: String,
    /// UTC timestamp of capture.
    pub captured_at: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}

/// Inputs of a `strlen` case: either text or raw bytes, without terminator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrlenInputs {
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
}

impl StrlenInputs {
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match (self.bytes, self.s) {
            (Some(bytes), _) => bytes,
            (None, Some(s)) => s.into_bytes(),
            (None, None) => Vec::new(),
        }
    }
}

/// Inputs of a `printf` case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintfInputs {
    pub format: String,
    /// At most one trailing argument.
    #[serde(default)]
    pub arg: Option<ProbeArg>,
    /// Route through `checked_printf!` instead of the raw binding.
    #[serde(default)]
    pub checked: bool,
}

/// Inputs of a `printf_concurrent` case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrentInputs {
    /// One writer thread per line.
    pub lines: Vec<String>,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

/// A typed trailing `printf` argument, as carried by fixtures and the probe CLI.
///
/// On the command line it is written `<kind>:<value>`, e.g. `int:42`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeArg {
    Int(i32),
    Long(i64),
    Uint(u32),
    Double(f64),
    Str(String),
}

impl fmt::Display for ProbeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "int:{v}"),
            Self::Long(v) => write!(f, "long:{v}"),
            Self::Uint(v) => write!(f, "uint:{v}"),
            Self::Double(v) => write!(f, "double:{v}"),
            Self::Str(v) => write!(f, "str:{v}"),
        }
    }
}

impl FromStr for ProbeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <kind>:<value>, got `{s}`"))?;
        let bad = |e: &dyn fmt::Display| format!("invalid {kind} value `{value}`: {e}");
        match kind {
            "int" => value.parse().map(Self::Int).map_err(|e| bad(&e)),
            "long" => value.parse().map(Self::Long).map_err(|e| bad(&e)),
            "uint" => value.parse().map(Self::Uint).map_err(|e| bad(&e)),
            "double" => value.parse().map(Self::Double).map_err(|e| bad(&e)),
            "str" => Ok(Self::Str(value.to_string())),
            other => Err(format!("unknown argument kind `{other}`")),
        }
    }
}

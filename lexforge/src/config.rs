//! Generator configuration.
//!
//! A [`Config`] value is passed explicitly into [`crate::generate_scanner`];
//! nothing is read from globals. It can be loaded from JSON, with every
//! missing field falling back to its default.

use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};

/// Default upper bound on NFA and DFA state counts.
pub const DEFAULT_MAX_STATES: usize = 1 << 20;

/// Largest Unicode scalar value.
pub const DEFAULT_MAX_CHAR: u32 = 0x10FFFF;

/// How the compressed transition table is encoded for emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableEncoding {
    /// One entry per (physical row, physical column).
    Dense,
    /// Run-length `(count, value)` pairs, unpacked at scanner start-up.
    #[default]
    Packed,
    /// Per-row branches with the most frequent target as the default case.
    InlineBranches,
}

/// Options controlling one scanner compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hand the raw subset-construction DFA to the compressor.
    pub skip_minimization: bool,
    /// Encoding of the emitted transition table.
    pub encoding: TableEncoding,
    /// Keep one action label per rule instead of merging actions whose
    /// trimmed code text is identical.
    pub strict_compatibility: bool,
    /// Largest number of states any automaton may reach.
    pub max_states: usize,
    /// Largest character code of the input alphabet.
    pub max_char: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            skip_minimization: false,
            encoding: TableEncoding::default(),
            strict_compatibility: false,
            max_states: DEFAULT_MAX_STATES,
            max_char: DEFAULT_MAX_CHAR,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| GenerateError::InvalidConfig(e.to_string()))
    }

    /// Serialize this configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GenerateError::InvalidConfig(e.to_string()))
    }
}

//! Fatal errors raised while compiling a scanner specification.
//!
//! Every error aborts the compilation; the caller receives the first one
//! encountered. Advisory diagnostics (unused macros, equivalent lexical
//! states) are emitted through `log` instead and never surface here.

use thiserror::Error;

/// Errors returned by [`crate::generate_scanner`] and the individual
/// pipeline stages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// A macro refers to itself, directly or through other macros.
    #[error("macro `{name}` is defined in terms of itself")]
    MacroCycle { name: String },

    /// A macro or rule refers to a macro that was never defined.
    #[error("macro `{name}` used in `{referrer}` is not defined")]
    MacroDefMissing { name: String, referrer: String },

    /// A trailing-context rule whose lookahead cannot be matched precisely.
    #[error("lookahead expression at line {line} is not legal: the end of the matched text is ambiguous")]
    Lookahead { line: u32 },

    /// The generator reached a state that well-formed input never produces.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// A configuration document could not be read or written.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The automaton outgrew the configured state limit or could not grow.
    #[error("automaton exceeds the limit of {limit} states")]
    ResourceExhaustion { limit: usize },
}

/// Result type used throughout the generator.
pub type Result<T> = std::result::Result<T, GenerateError>;

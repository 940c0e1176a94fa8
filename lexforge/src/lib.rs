//! # lexforge: regex-to-automaton core of a scanner generator
//!
//! lexforge compiles the rules of a lexical specification (named macros,
//! regular expressions with actions, lexical states, trailing context) into
//! the compressed transition tables of a table-driven scanner.
//!
//! ## Architecture
//!
//! ```text
//!  spec parser (external)
//!        │  ScannerSpec { macros, rules, states, eof_actions }
//!        ▼
//!  ┌──────────────────────────────────────────────────────┐
//!  │                    lexforge crate                    │
//!  │                                                      │
//!  │  1. Macro expansion + semantic check                 │
//!  │  2. Character classes (alphabet partition)           │
//!  │  3. Automata: Thompson NFA → subset DFA → Hopcroft   │
//!  │  4. Table compression: fold rows/cols, encode        │
//!  │  5. Codegen: static tables as a TokenStream          │
//!  └──────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   GeneratedScanner { dfa, tables, stats }
//! ```
//!
//! Rules are prioritized by line: when several rules match the same longest
//! text, the one written first wins. Configuration is passed explicitly as a
//! [`Config`]; diagnostics go through the `log` facade.

pub mod automata;
pub mod config;
pub mod error;
pub mod macros;
pub mod pipeline;
pub mod rules;
pub mod semcheck;

#[cfg(test)]
mod tests;

pub use config::{Config, TableEncoding};
pub use error::{GenerateError, Result};
pub use pipeline::{generate_scanner, generate_scanner_with, GeneratedScanner, PipelineStats};

use macros::MacroTable;
use rules::{EofActions, LexicalStates, RuleTable};

/// Everything the specification parser hands to the generator.
#[derive(Debug, Clone, Default)]
pub struct ScannerSpec {
    pub macros: MacroTable,
    /// Rules in specification order.
    pub rules: RuleTable,
    pub states: LexicalStates,
    pub eof_actions: EofActions,
    /// Add a lowest-priority rule echoing any character no other rule matches.
    pub standalone: bool,
}

impl ScannerSpec {
    /// An empty specification with only the initial lexical state.
    pub fn new() -> Self {
        ScannerSpec::default()
    }
}

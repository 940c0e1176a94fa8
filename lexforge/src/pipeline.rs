//! Scanner generation pipeline.
//!
//! ```text
//! ScannerSpec ──→ [Macros] ──→ [SemCheck] ──→ [Classes] ──→ [NFA] ──→ [DFA]
//!                 mark uses,    trailing      partition     Thompson   subset
//!                 expand        context       refinement    + entries  construction
//!
//!             ──→ [Minimize] ──→ [Compress] ──→ GeneratedScanner ──→ TokenStream
//!                 optional       fold + encode
//! ```
//!
//! Each stage either returns its result or aborts the whole run with a
//! [`GenerateError`](crate::error::GenerateError). Advisory diagnostics go
//! to the `log` facade.

use log::{debug, info, warn};
use proc_macro2::TokenStream;

use crate::automata::charset::Interval;
use crate::automata::codegen::generate_tables;
use crate::automata::compress::{compress, CompressedTables};
use crate::automata::minimize::{equivalent_lex_states, minimize_dfa};
use crate::automata::nfa::build_nfa;
use crate::automata::partition::{CharClassMap, CharClasses};
use crate::automata::subset::subset_construction;
use crate::automata::{ClassId, Dfa};
use crate::config::Config;
use crate::error::Result;
use crate::semcheck::SemCheck;
use crate::ScannerSpec;

/// Sizes observed along the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub num_rules: usize,
    pub num_macros: usize,
    pub num_classes: usize,
    pub num_nfa_states: usize,
    pub num_dfa_states: usize,
    /// Equal to `num_dfa_states` when minimization is skipped.
    pub num_minimized_states: usize,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Words occupied by the encoded transition table.
    pub encoded_size: usize,
    pub num_actions: usize,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct GeneratedScanner {
    /// The final DFA, minimized unless configured otherwise.
    pub dfa: Dfa,
    pub tables: CompressedTables,
    /// Character-class map the tables are indexed by.
    pub char_map: Vec<(Interval, ClassId)>,
    pub stats: PipelineStats,
}

impl GeneratedScanner {
    /// Render the tables as Rust items.
    pub fn to_tokens(&self) -> TokenStream {
        generate_tables(&self.tables, &self.char_map)
    }
}

/// Mark macro uses, expand macros and check trailing contexts.
///
/// After this succeeds no macro definition contains a macro use and every
/// rule refers only to defined macros.
pub fn prepare(spec: &mut ScannerSpec, config: &Config) -> Result<()> {
    for rule in spec.rules.iter() {
        let referrer = rule.describe();
        spec.macros.mark_uses_in(&rule.regexp, &referrer)?;
        if let Some(lookahead) = &rule.lookahead {
            spec.macros.mark_uses_in(lookahead, &referrer)?;
        }
    }

    spec.macros.expand()?;
    for name in spec.macros.unused() {
        warn!("macro `{name}` is defined but never used");
    }

    SemCheck::new(&spec.macros, config.max_char).check(&spec.rules)
}

/// Run the whole pipeline with the partition computed from `spec` itself.
pub fn generate_scanner(spec: &mut ScannerSpec, config: &Config) -> Result<GeneratedScanner> {
    prepare(spec, config)?;
    let classes = CharClasses::from_spec(&spec.rules, &spec.macros, config.max_char);
    generate_scanner_with(spec, &classes, config)
}

/// Compile a prepared `spec` (see [`prepare`]) over an existing partition.
pub fn generate_scanner_with(
    spec: &ScannerSpec,
    classes: &dyn CharClassMap,
    config: &Config,
) -> Result<GeneratedScanner> {
    let num_lex_states = spec.states.len();

    // Step 1: NFA with one entry pair per lexical state
    let nfa = build_nfa(
        &spec.rules,
        &spec.macros,
        &spec.states,
        classes,
        spec.standalone,
        config.max_states,
    )?;

    // Step 2: Subset construction
    let dfa = subset_construction(&nfa, config.max_states)?;
    let num_dfa_states = dfa.num_states();

    // Step 3: Minimize
    let dfa = if config.skip_minimization {
        debug!("minimization skipped");
        dfa
    } else {
        let min = minimize_dfa(&dfa, config.strict_compatibility);
        for (a, b) in equivalent_lex_states(&min) {
            warn!(
                "lexical states `{}` and `{}` are equivalent",
                spec.states.name(a).unwrap_or("?"),
                spec.states.name(b).unwrap_or("?")
            );
        }
        min
    };

    // Step 4: Compress
    let tables = compress(
        &dfa,
        &spec.eof_actions,
        num_lex_states,
        config.encoding,
        config.strict_compatibility,
    );

    let stats = PipelineStats {
        num_rules: spec.rules.len(),
        num_macros: spec.macros.len(),
        num_classes: classes.num_classes(),
        num_nfa_states: nfa.num_states(),
        num_dfa_states,
        num_minimized_states: dfa.num_states(),
        num_rows: tables.num_rows,
        num_cols: tables.num_cols,
        encoded_size: tables.table.size(),
        num_actions: tables.actions.len(),
    };
    info!(
        "{} rules, {} classes: {} NFA states, {} DFA states, {} after minimization, {}x{} table ({} words)",
        stats.num_rules,
        stats.num_classes,
        stats.num_nfa_states,
        stats.num_dfa_states,
        stats.num_minimized_states,
        stats.num_rows,
        stats.num_cols,
        stats.encoded_size
    );

    Ok(GeneratedScanner { dfa, tables, char_map: classes.class_intervals(), stats })
}

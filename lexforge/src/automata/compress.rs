//! Transition table compression.
//!
//! The DFA's dense `states × classes` table is folded twice before it is
//! encoded: identical columns (classes) collapse into one physical column,
//! then identical rows (states) into one physical row. The folded table is
//! then encoded as one of:
//!
//! - **Dense**: one entry per physical cell
//! - **Packed**: run-length `(count, value)` pairs, expanded by [`unpack`]
//! - **InlineBranches**: per physical row, the most frequent target as the
//!   default and explicit column sets for the rest
//!
//! All three answer [`CompressedTables::lookup`] identically.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;

use super::charset::CharSet;
use super::{ClassId, Dfa, StateId, NO_TARGET};
use crate::config::TableEncoding;
use crate::rules::{Action, EofActions};

/// Attribute bit: accepting state.
pub const FINAL: u8 = 1;
/// Attribute bit: end of the primary part of a trailing-context match.
pub const PUSHBACK: u8 = 2;
/// Attribute bit: accepting state of a trailing-context rule.
pub const LOOKEND: u8 = 4;
/// Attribute bit: no outgoing transitions, the scanner can stop here.
pub const NOLOOK: u8 = 8;

/// One physical row of the inline-branch encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRow {
    /// Target for every column not listed in `cases`.
    pub default: StateId,
    /// Explicit targets, ascending by target.
    pub cases: Vec<(StateId, CharSet)>,
}

impl BranchRow {
    pub fn target(&self, col: ClassId) -> StateId {
        self.cases
            .iter()
            .find(|(_, cols)| cols.contains(col))
            .map_or(self.default, |&(target, _)| target)
    }
}

/// Encoded form of the folded transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedTable {
    /// Row-major `num_rows × num_cols` cells.
    Dense(Vec<StateId>),
    /// Run-length pairs over the row-major cells.
    Packed(Vec<(u32, StateId)>),
    InlineBranches(Vec<BranchRow>),
}

impl EncodedTable {
    pub fn encoding(&self) -> TableEncoding {
        match self {
            EncodedTable::Dense(_) => TableEncoding::Dense,
            EncodedTable::Packed(_) => TableEncoding::Packed,
            EncodedTable::InlineBranches(_) => TableEncoding::InlineBranches,
        }
    }

    /// Number of `u32` words the encoding occupies when emitted.
    pub fn size(&self) -> usize {
        match self {
            EncodedTable::Dense(cells) => cells.len(),
            EncodedTable::Packed(runs) => 2 * runs.len(),
            EncodedTable::InlineBranches(rows) => rows
                .iter()
                .map(|row| 1 + row.cases.iter().map(|(_, cols)| 1 + cols.size()).sum::<usize>())
                .sum(),
        }
    }
}

/// Everything the emitter needs about a compiled scanner.
#[derive(Debug, Clone)]
pub struct CompressedTables {
    pub num_states: usize,
    pub num_classes: usize,
    pub num_rows: usize,
    pub num_cols: usize,
    /// DFA state → physical row.
    pub row_map: Vec<u32>,
    /// Class → physical column.
    pub col_map: Vec<u32>,
    pub table: EncodedTable,
    /// Per DFA state, an OR of [`FINAL`], [`PUSHBACK`], [`LOOKEND`], [`NOLOOK`].
    pub attributes: Vec<u8>,
    /// Per DFA state, the label of its action; 0 means none.
    pub action_map: Vec<u32>,
    /// `actions[label - 1]` is the action with that label.
    pub actions: Vec<Rc<Action>>,
    /// Start state pairs, as in [`Dfa::lex_state`].
    pub lex_state: Vec<StateId>,
    /// Per lexical state, the label of its end-of-file action; 0 means none.
    pub eof_action_map: Vec<u32>,
}

impl CompressedTables {
    /// Target of `state` on `class`, or [`NO_TARGET`].
    pub fn lookup(&self, state: StateId, class: ClassId) -> StateId {
        let row = self.row_map[state as usize] as usize;
        let col = self.col_map[class as usize] as usize;
        match &self.table {
            EncodedTable::Dense(cells) => cells[row * self.num_cols + col],
            EncodedTable::Packed(runs) => {
                let mut idx = row * self.num_cols + col;
                for &(count, value) in runs {
                    if idx < count as usize {
                        return value;
                    }
                    idx -= count as usize;
                }
                NO_TARGET
            }
            EncodedTable::InlineBranches(rows) => rows[row].target(col as ClassId),
        }
    }

    pub fn action(&self, state: StateId) -> Option<&Rc<Action>> {
        match self.action_map.get(state as usize) {
            Some(&label) if label > 0 => self.actions.get(label as usize - 1),
            _ => None,
        }
    }
}

/// Compress `dfa` into the requested `encoding`.
///
/// With `distinguish_rules` every rule keeps its own action label; otherwise
/// actions with the same trimmed code share one.
pub fn compress(
    dfa: &Dfa,
    eof_actions: &EofActions,
    num_lex_states: usize,
    encoding: TableEncoding,
    distinguish_rules: bool,
) -> CompressedTables {
    let (col_map, columns) = reduce_columns(dfa);
    let (row_map, rows) = reduce_rows(dfa, &columns);
    let num_cols = columns.len();

    let table = match encoding {
        TableEncoding::Dense => EncodedTable::Dense(rows.concat()),
        TableEncoding::Packed => EncodedTable::Packed(pack(&rows.concat())),
        TableEncoding::InlineBranches => {
            EncodedTable::InlineBranches(rows.iter().map(|row| branch_row(row)).collect())
        }
    };

    let attributes = dfa
        .states
        .iter()
        .map(|s| {
            let mut bits = 0;
            if s.is_final {
                bits |= FINAL;
            }
            if s.is_pushback {
                bits |= PUSHBACK;
            }
            if s.is_look_end {
                bits |= LOOKEND;
            }
            if !s.has_transitions() {
                bits |= NOLOOK;
            }
            bits
        })
        .collect();

    let mut labels = ActionLabels::new(distinguish_rules);
    let action_map = dfa.states.iter().map(|s| labels.label(s.action.as_ref())).collect();
    let eof_action_map =
        (0..num_lex_states).map(|k| labels.label(eof_actions.action(k))).collect();

    debug!(
        "compressed {}x{} table to {}x{} ({:?}, {} words), {} distinct actions",
        dfa.num_states(),
        dfa.num_classes,
        rows.len(),
        num_cols,
        encoding,
        table.size(),
        labels.actions.len()
    );

    CompressedTables {
        num_states: dfa.num_states(),
        num_classes: dfa.num_classes,
        num_rows: rows.len(),
        num_cols,
        row_map,
        col_map,
        table,
        attributes,
        action_map,
        actions: labels.actions,
        lex_state: dfa.lex_state.clone(),
        eof_action_map,
    }
}

/// Map each class to the first class with an identical column.
/// Returns the class → physical column map and each physical column's
/// representative class.
fn reduce_columns(dfa: &Dfa) -> (Vec<u32>, Vec<ClassId>) {
    let mut seen: HashMap<Vec<StateId>, u32> = HashMap::new();
    let mut col_map = Vec::with_capacity(dfa.num_classes);
    let mut columns = Vec::new();
    for class in 0..dfa.num_classes as ClassId {
        let column: Vec<StateId> = dfa.states.iter().map(|s| s.transitions[class as usize]).collect();
        let next = columns.len() as u32;
        let physical = *seen.entry(column).or_insert(next);
        if physical == next {
            columns.push(class);
        }
        col_map.push(physical);
    }
    (col_map, columns)
}

/// Fold identical rows of the column-reduced table.
fn reduce_rows(dfa: &Dfa, columns: &[ClassId]) -> (Vec<u32>, Vec<Vec<StateId>>) {
    let mut seen: HashMap<Vec<StateId>, u32> = HashMap::new();
    let mut row_map = Vec::with_capacity(dfa.num_states());
    let mut rows: Vec<Vec<StateId>> = Vec::new();
    for state in &dfa.states {
        let row: Vec<StateId> = columns.iter().map(|&c| state.transitions[c as usize]).collect();
        let next = rows.len() as u32;
        let physical = *seen.entry(row.clone()).or_insert(next);
        if physical == next {
            rows.push(row);
        }
        row_map.push(physical);
    }
    (row_map, rows)
}

fn branch_row(row: &[StateId]) -> BranchRow {
    let mut counts: BTreeMap<StateId, usize> = BTreeMap::new();
    for &target in row {
        *counts.entry(target).or_default() += 1;
    }

    let no_target = counts.get(&NO_TARGET).copied().unwrap_or(0);
    let mut default = NO_TARGET;
    let mut best = 0;
    for (&target, &count) in &counts {
        if target != NO_TARGET && count > best {
            default = target;
            best = count;
        }
    }
    // The missing-transition target only wins outright.
    if no_target > best {
        default = NO_TARGET;
    }

    let mut cases: BTreeMap<StateId, CharSet> = BTreeMap::new();
    for (col, &target) in row.iter().enumerate() {
        if target != default {
            cases.entry(target).or_default().add(col as ClassId);
        }
    }
    BranchRow { default, cases: cases.into_iter().collect() }
}

/// Run-length encode `values` as `(count, value)` pairs.
pub fn pack(values: &[StateId]) -> Vec<(u32, StateId)> {
    let mut runs: Vec<(u32, StateId)> = Vec::new();
    for &value in values {
        match runs.last_mut() {
            Some((count, last)) if *last == value && *count < u32::MAX => *count += 1,
            _ => runs.push((1, value)),
        }
    }
    runs
}

/// Expand `(count, value)` pairs produced by [`pack`].
pub fn unpack(runs: &[(u32, StateId)]) -> Vec<StateId> {
    let mut values = Vec::with_capacity(runs.iter().map(|&(c, _)| c as usize).sum());
    for &(count, value) in runs {
        values.extend(std::iter::repeat(value).take(count as usize));
    }
    values
}

/// Assigns action labels, starting at 1.
struct ActionLabels {
    distinguish_rules: bool,
    index: HashMap<(Option<u32>, String), u32>,
    actions: Vec<Rc<Action>>,
}

impl ActionLabels {
    fn new(distinguish_rules: bool) -> Self {
        ActionLabels { distinguish_rules, index: HashMap::new(), actions: Vec::new() }
    }

    fn label(&mut self, action: Option<&Rc<Action>>) -> u32 {
        let Some(action) = action else {
            return 0;
        };
        let key = if self.distinguish_rules {
            (Some(action.priority), action.content.clone())
        } else {
            (None, action.equiv_key().to_string())
        };
        let next = self.actions.len() as u32 + 1;
        let label = *self.index.entry(key).or_insert(next);
        if label == next {
            self.actions.push(action.clone());
        }
        label
    }
}

//! Cross-module tests: whole-pipeline behavior and language properties.
//!
//! The helpers here simulate generated scanners directly on the DFA and on
//! the compressed tables, and evaluate regular expressions by brute force so
//! the automata can be compared against a reference.

mod language_tests;

use std::collections::BTreeSet;

use crate::automata::charset::{case_variants, Interval};
use crate::automata::compress::{FINAL, LOOKEND};
use crate::automata::regex::RegExp;
use crate::automata::{ClassId, StateId, NO_TARGET};
use crate::macros::MacroTable;
use crate::pipeline::GeneratedScanner;
use crate::rules::{Action, Rule};
use crate::{generate_scanner, Config, Result, ScannerSpec};

/// Max char used throughout these tests; small alphabets keep tables small.
pub(crate) const TEST_MAX_CHAR: u32 = 127;

pub(crate) fn test_config() -> Config {
    Config { max_char: TEST_MAX_CHAR, ..Config::default() }
}

/// Run the pipeline over a single rule matching `re`.
pub(crate) fn single_rule_scanner(re: RegExp, config: &Config) -> Result<GeneratedScanner> {
    let mut spec = ScannerSpec::new();
    spec.rules.push(Rule::new(1, re, "return TOKEN;"));
    generate_scanner(&mut spec, config)
}

pub(crate) fn class_of(char_map: &[(Interval, ClassId)], c: char) -> Option<ClassId> {
    let c = c as u32;
    char_map
        .binary_search_by(|(iv, _)| {
            if iv.end < c {
                std::cmp::Ordering::Less
            } else if iv.start > c {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok()
        .map(|i| char_map[i].1)
}

/// Whether the DFA, started in lexical state 0, ends in a final state on
/// the whole of `input`.
pub(crate) fn dfa_accepts(scanner: &GeneratedScanner, input: &str) -> bool {
    let Some(mut state) = scanner.dfa.start(0, false) else {
        return false;
    };
    for c in input.chars() {
        let Some(class) = class_of(&scanner.char_map, c) else {
            return false;
        };
        state = scanner.dfa.transition(state, class);
        if state == NO_TARGET {
            return false;
        }
    }
    scanner.dfa.states[state as usize].is_final
}

/// Same as [`dfa_accepts`], reading only the compressed tables.
pub(crate) fn tables_accept(scanner: &GeneratedScanner, input: &str) -> bool {
    let tables = &scanner.tables;
    let mut state = tables.lex_state[0];
    for c in input.chars() {
        let Some(class) = class_of(&scanner.char_map, c) else {
            return false;
        };
        state = tables.lookup(state, class);
        if state == NO_TARGET {
            return false;
        }
    }
    tables.attributes[state as usize] & FINAL != 0
}

/// Longest-match scan of a prefix of `input` from lexical state `lex`.
///
/// Returns the matched length in characters and the action of the final
/// state reached last. Trailing-context rules report the length of the
/// whole match including the context.
pub(crate) fn longest_match<'a>(
    scanner: &'a GeneratedScanner,
    lex: usize,
    bol: bool,
    input: &str,
) -> Option<(usize, &'a Action)> {
    let dfa = &scanner.dfa;
    let mut state: StateId = dfa.start(lex, bol)?;
    let mut best = None;
    if dfa.states[state as usize].is_final {
        best = Some((0, state));
    }
    for (i, c) in input.chars().enumerate() {
        let Some(class) = class_of(&scanner.char_map, c) else {
            break;
        };
        state = dfa.transition(state, class);
        if state == NO_TARGET {
            break;
        }
        if dfa.states[state as usize].is_final {
            best = Some((i + 1, state));
        }
    }
    let (len, state) = best?;
    let action = dfa.states[state as usize].action.as_deref()?;
    Some((len, action))
}

pub(crate) fn has_look_end(scanner: &GeneratedScanner) -> bool {
    scanner.tables.attributes.iter().any(|a| a & LOOKEND != 0)
}

// ══════════════════════════════════════════════════════════════════════════════
// Reference evaluator
// ══════════════════════════════════════════════════════════════════════════════

/// Brute-force matcher over explicit character sequences.
pub(crate) struct Reference<'a> {
    pub macros: &'a MacroTable,
    pub max_char: u32,
}

impl Reference<'_> {
    pub fn matches(&self, re: &RegExp, input: &str) -> bool {
        let chars: Vec<u32> = input.chars().map(|c| c as u32).collect();
        self.ends(re, &chars, 0).contains(&chars.len())
    }

    /// Every `j` such that `re` matches `input[start..j]`.
    fn ends(&self, re: &RegExp, input: &[u32], start: usize) -> BTreeSet<usize> {
        let next_char = |pred: &dyn Fn(u32) -> bool| -> BTreeSet<usize> {
            input.get(start).filter(|&&c| c <= self.max_char && pred(c)).map(|_| start + 1).into_iter().collect()
        };
        match re {
            RegExp::Char(c) => next_char(&|x| x == *c),
            RegExp::CaselessChar(c) => next_char(&|x| x == *c || case_variants(*c).any(|v| v == x)),
            RegExp::CharClass(set) => next_char(&|x| set.contains(x)),
            RegExp::NegatedCharClass(set) => next_char(&|x| !set.contains(x)),
            RegExp::String(s) | RegExp::CaselessString(s) => {
                let caseless = matches!(re, RegExp::CaselessString(_));
                let mut pos = start;
                for expected in s.chars().map(|c| c as u32) {
                    match input.get(pos) {
                        Some(&x) if x == expected => pos += 1,
                        Some(&x) if caseless && case_variants(expected).any(|v| v == x) => pos += 1,
                        _ => return BTreeSet::new(),
                    }
                }
                BTreeSet::from([pos])
            }
            RegExp::Alternation(r1, r2) => {
                let mut out = self.ends(r1, input, start);
                out.extend(self.ends(r2, input, start));
                out
            }
            RegExp::Concatenation(r1, r2) => self
                .ends(r1, input, start)
                .into_iter()
                .flat_map(|mid| self.ends(r2, input, mid))
                .collect(),
            RegExp::Star(r) => self.closure(r, input, start),
            RegExp::Plus(r) => self
                .ends(r, input, start)
                .into_iter()
                .flat_map(|mid| self.closure(r, input, mid))
                .collect(),
            RegExp::Question(r) => {
                let mut out = self.ends(r, input, start);
                out.insert(start);
                out
            }
            RegExp::Negation(r) => {
                let matched = self.ends(r, input, start);
                (start..=input.len()).filter(|j| !matched.contains(j)).collect()
            }
            RegExp::UpTo(r) => (start..=input.len())
                .filter(|&j| {
                    // the match of r ending at j starts at k, and no match of r
                    // lies entirely inside input[start..k]
                    (start..=j).any(|k| {
                        self.ends(r, input, k).contains(&j) && !self.occurs_within(r, input, start, k)
                    })
                })
                .collect(),
            RegExp::MacroUse(name) => match self.macros.definition(name) {
                Some(def) => self.ends(def, input, start),
                None => BTreeSet::new(),
            },
        }
    }

    fn closure(&self, r: &RegExp, input: &[u32], start: usize) -> BTreeSet<usize> {
        let mut reached = BTreeSet::from([start]);
        let mut work = vec![start];
        while let Some(pos) = work.pop() {
            for next in self.ends(r, input, pos) {
                if reached.insert(next) {
                    work.push(next);
                }
            }
        }
        reached
    }

    fn occurs_within(&self, r: &RegExp, input: &[u32], from: usize, to: usize) -> bool {
        (from..=to).any(|a| self.ends(r, input, a).iter().any(|&b| b <= to))
    }
}

/// Every string over `alphabet` of length at most `max_len`.
pub(crate) fn all_strings(alphabet: &[char], max_len: usize) -> Vec<String> {
    let mut out = vec![String::new()];
    let mut layer = vec![String::new()];
    for _ in 0..max_len {
        layer = layer
            .iter()
            .flat_map(|s| {
                alphabet.iter().map(move |&c| {
                    let mut t = s.clone();
                    t.push(c);
                    t
                })
            })
            .collect();
        out.extend(layer.iter().cloned());
    }
    out
}

#[test]
fn test_reference_evaluator_basics() {
    let macros = MacroTable::new();
    let reference = Reference { macros: &macros, max_char: TEST_MAX_CHAR };
    let ab_star = RegExp::star(RegExp::literal("ab"));
    assert!(reference.matches(&ab_star, ""));
    assert!(reference.matches(&ab_star, "abab"));
    assert!(!reference.matches(&ab_star, "aba"));

    let up_to_b = RegExp::up_to(RegExp::ch('b'));
    assert!(reference.matches(&up_to_b, "aab"));
    assert!(!reference.matches(&up_to_b, "abab"));
    assert!(!reference.matches(&up_to_b, ""));

    let not_a = RegExp::negation(RegExp::ch('a'));
    assert!(reference.matches(&not_a, ""));
    assert!(reference.matches(&not_a, "aa"));
    assert!(!reference.matches(&not_a, "a"));
}

//! Language-level properties of the generated automata.
//!
//! Random expressions over a tiny alphabet are compiled through the whole
//! pipeline and compared, string by string, against the reference evaluator.

use proptest::prelude::*;

use super::{
    all_strings, dfa_accepts, single_rule_scanner, tables_accept, test_config, Reference,
    TEST_MAX_CHAR,
};
use crate::automata::charset::{IntCharSet, Interval};
use crate::automata::minimize::minimize_dfa;
use crate::automata::regex::RegExp;
use crate::config::TableEncoding;
use crate::macros::MacroTable;
use crate::Config;

fn sample_inputs() -> Vec<String> {
    let mut inputs = all_strings(&['a', 'b', 'c'], 4);
    inputs.extend(all_strings(&['a', 'd'], 3).into_iter().filter(|s| s.contains('d')));
    inputs
}

fn class_of_chars(chars: Vec<char>) -> IntCharSet {
    IntCharSet::from_intervals(chars.into_iter().map(|c| Interval::single(c as u32)))
}

fn arb_leaf() -> impl Strategy<Value = RegExp> {
    prop_oneof![
        prop::sample::select(vec!['a', 'b', 'c']).prop_map(RegExp::ch),
        "[abc]{0,2}".prop_map(|s| RegExp::literal(&s)),
        prop::sample::subsequence(vec!['a', 'b', 'c'], 1..=2)
            .prop_map(|cs| RegExp::CharClass(class_of_chars(cs))),
        prop::sample::subsequence(vec!['a', 'b', 'c'], 0..=2)
            .prop_map(|cs| RegExp::NegatedCharClass(class_of_chars(cs))),
    ]
}

fn arb_regexp() -> impl Strategy<Value = RegExp> {
    arb_leaf().prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| RegExp::alt(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| RegExp::concat(a, b)),
            inner.clone().prop_map(RegExp::star),
            inner.clone().prop_map(RegExp::plus),
            inner.clone().prop_map(RegExp::question),
            inner.clone().prop_map(RegExp::negation),
            inner.prop_map(RegExp::up_to),
        ]
    })
}

fn arb_encoding() -> impl Strategy<Value = TableEncoding> {
    prop::sample::select(vec![
        TableEncoding::Dense,
        TableEncoding::Packed,
        TableEncoding::InlineBranches,
    ])
}

proptest::proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// The generated DFA accepts exactly the strings the expression matches.
    #[test]
    fn dfa_matches_reference(re in arb_regexp()) {
        let macros = MacroTable::new();
        let reference = Reference { macros: &macros, max_char: TEST_MAX_CHAR };
        let scanner = single_rule_scanner(re.clone(), &test_config()).expect("pipeline");
        for input in sample_inputs() {
            prop_assert_eq!(
                dfa_accepts(&scanner, &input),
                reference.matches(&re, &input),
                "{} on {:?}", re, input
            );
        }
    }

    /// `!r` accepts exactly the strings `r` rejects.
    #[test]
    fn negation_is_complement(re in arb_regexp()) {
        let config = test_config();
        let plain = single_rule_scanner(re.clone(), &config).expect("pipeline");
        let negated = single_rule_scanner(RegExp::negation(re.clone()), &config).expect("pipeline");
        for input in sample_inputs() {
            prop_assert_ne!(dfa_accepts(&plain, &input), dfa_accepts(&negated, &input), "{} on {:?}", re, input);
        }
    }

    /// Minimization never changes the language and never adds states.
    #[test]
    fn minimization_preserves_language(re in arb_regexp()) {
        let full = single_rule_scanner(re.clone(), &Config { skip_minimization: true, ..test_config() })
            .expect("pipeline");
        let min = single_rule_scanner(re.clone(), &test_config()).expect("pipeline");
        prop_assert!(min.stats.num_minimized_states <= full.stats.num_dfa_states);
        for input in sample_inputs() {
            prop_assert_eq!(dfa_accepts(&full, &input), dfa_accepts(&min, &input), "{} on {:?}", re, input);
        }
    }

    /// A minimal DFA is a fixed point of minimization.
    #[test]
    fn minimization_is_idempotent(re in arb_regexp()) {
        let min = single_rule_scanner(re, &test_config()).expect("pipeline");
        let again = minimize_dfa(&min.dfa, false);
        prop_assert_eq!(again.num_states(), min.dfa.num_states());
        prop_assert_eq!(again.lex_state, min.dfa.lex_state.clone());
    }

    /// Table lookup agrees with the uncompressed DFA on every state and class.
    #[test]
    fn compression_is_transparent(re in arb_regexp(), encoding in arb_encoding()) {
        let scanner = single_rule_scanner(re, &Config { encoding, ..test_config() }).expect("pipeline");
        let dfa = &scanner.dfa;
        for state in 0..dfa.num_states() as u32 {
            for class in 0..dfa.num_classes as u32 {
                prop_assert_eq!(scanner.tables.lookup(state, class), dfa.transition(state, class));
            }
        }
        for input in sample_inputs() {
            prop_assert_eq!(tables_accept(&scanner, &input), dfa_accepts(&scanner, &input));
        }
    }
}

#[test]
fn test_up_to_comment() {
    let comment = RegExp::concat(RegExp::literal("/*"), RegExp::up_to(RegExp::literal("*/")));
    let scanner = single_rule_scanner(comment, &test_config()).expect("pipeline");
    assert!(dfa_accepts(&scanner, "/* x */"));
    assert!(dfa_accepts(&scanner, "/***/"));
    assert!(!dfa_accepts(&scanner, "/* x */ y */"));
    assert!(!dfa_accepts(&scanner, "/* x "));
}

#[test]
fn test_up_to_of_epsilon_is_empty() {
    let scanner =
        single_rule_scanner(RegExp::up_to(RegExp::star(RegExp::ch('a'))), &test_config()).expect("pipeline");
    for input in all_strings(&['a', 'b'], 3) {
        assert!(!dfa_accepts(&scanner, &input), "matched {input:?}");
    }
}

#[test]
fn test_double_negation() {
    let re = RegExp::negation(RegExp::negation(RegExp::literal("ab")));
    let scanner = single_rule_scanner(re, &test_config()).expect("pipeline");
    for input in all_strings(&['a', 'b'], 3) {
        assert_eq!(dfa_accepts(&scanner, &input), input == "ab", "on {input:?}");
    }
}

#[test]
fn test_caseless_string() {
    let re = RegExp::CaselessString("If".to_string());
    let scanner = single_rule_scanner(re, &test_config()).expect("pipeline");
    for input in ["if", "IF", "iF", "If"] {
        assert!(dfa_accepts(&scanner, input), "rejected {input:?}");
    }
    assert!(!dfa_accepts(&scanner, "i"));
}

//! Alphabet partitioning into character classes.
//!
//! The automata never see raw characters: every transition is labelled with
//! a class id, where a class is a maximal set of characters that no rule
//! distinguishes. [`CharClassMap`] is the contract the NFA builder needs;
//! [`CharClasses`] is the refinement-based partition computed from a rule
//! set.

use std::collections::BTreeSet;

use super::charset::{case_variants, IntCharSet, Interval};
use super::regex::RegExp;
use super::ClassId;
use crate::macros::MacroTable;
use crate::rules::RuleTable;

/// Mapping from characters to character classes.
///
/// The partition must be fine enough for every set it is asked about: each
/// set passed to [`CharClassMap::class_codes`] is a union of whole classes.
pub trait CharClassMap {
    fn num_classes(&self) -> usize;

    /// Largest character code of the input alphabet.
    fn max_char(&self) -> u32;

    fn class_of(&self, c: u32) -> ClassId;

    /// Classes whose union is `set`, or its case-closed version when
    /// `caseless` is set.
    fn class_codes(&self, set: &IntCharSet, caseless: bool) -> Vec<ClassId>;

    /// Classes disjoint from `set`.
    fn not_class_codes(&self, set: &IntCharSet) -> Vec<ClassId>;

    /// Sorted `(interval, class)` pairs covering `[0, max_char]`.
    fn class_intervals(&self) -> Vec<(Interval, ClassId)>;
}

/// Partition of `[0, max_char]` refined by every set it has been shown.
#[derive(Debug, Clone)]
pub struct CharClasses {
    classes: Vec<IntCharSet>,
    max_char: u32,
}

impl CharClasses {
    /// A single class covering the whole alphabet.
    pub fn new(max_char: u32) -> Self {
        CharClasses { classes: vec![IntCharSet::all(max_char)], max_char }
    }

    /// Partition refined by every character, string and class used in
    /// `rules`, following macro uses through `macros`.
    pub fn from_spec(rules: &RuleTable, macros: &MacroTable, max_char: u32) -> Self {
        let mut classes = CharClasses::new(max_char);
        let mut visited = BTreeSet::new();
        for rule in rules {
            classes.refine_with(&rule.regexp, macros, &mut visited);
            if let Some(look) = &rule.lookahead {
                classes.refine_with(look, macros, &mut visited);
            }
        }
        classes
    }

    fn refine_with(&mut self, re: &RegExp, macros: &MacroTable, visited: &mut BTreeSet<String>) {
        match re {
            RegExp::Alternation(r1, r2) | RegExp::Concatenation(r1, r2) => {
                self.refine_with(r1, macros, visited);
                self.refine_with(r2, macros, visited);
            }
            RegExp::Star(r)
            | RegExp::Plus(r)
            | RegExp::Question(r)
            | RegExp::Negation(r)
            | RegExp::UpTo(r) => self.refine_with(r, macros, visited),
            RegExp::Char(c) => self.make_class_char(*c, false),
            RegExp::CaselessChar(c) => self.make_class_char(*c, true),
            RegExp::CharClass(set) | RegExp::NegatedCharClass(set) => self.make_class(set, false),
            RegExp::String(s) => self.make_class_string(s, false),
            RegExp::CaselessString(s) => self.make_class_string(s, true),
            RegExp::MacroUse(name) => {
                if visited.insert(name.clone()) {
                    if let Some(def) = macros.definition(name) {
                        self.refine_with(def, macros, visited);
                    }
                }
            }
        }
    }

    /// Refine the partition so that `set` is a union of classes.
    pub fn make_class(&mut self, set: &IntCharSet, caseless: bool) {
        let mut rest = if caseless { set.caseless() } else { set.clone() };
        rest = rest.and(&IntCharSet::all(self.max_char));

        let existing = self.classes.len();
        for i in 0..existing {
            if rest.is_empty() {
                break;
            }
            let common = self.classes[i].and(&rest);
            if common.is_empty() {
                continue;
            }
            rest.sub(&common);
            if common != self.classes[i] {
                self.classes[i].sub(&common);
                self.classes.push(common);
            }
        }
    }

    pub fn make_class_char(&mut self, c: u32, caseless: bool) {
        self.make_class(&IntCharSet::from_char(c), caseless);
    }

    /// Give every character of `s` (with its case variants if `caseless`)
    /// a class of its own.
    pub fn make_class_string(&mut self, s: &str, caseless: bool) {
        for ch in s.chars() {
            self.make_class_char(ch as u32, caseless);
        }
    }
}

impl CharClassMap for CharClasses {
    fn num_classes(&self) -> usize {
        self.classes.len()
    }

    fn max_char(&self) -> u32 {
        self.max_char
    }

    fn class_of(&self, c: u32) -> ClassId {
        self.classes
            .iter()
            .position(|set| set.contains(c))
            .map_or(0, |i| i as ClassId)
    }

    fn class_codes(&self, set: &IntCharSet, caseless: bool) -> Vec<ClassId> {
        let set = if caseless { set.caseless() } else { set.clone() };
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| {
                debug_assert!(
                    set.contains_set(class) || set.and(class).is_empty(),
                    "class {class} straddles {set}"
                );
                set.contains_set(class)
            })
            .map(|(i, _)| i as ClassId)
            .collect()
    }

    fn not_class_codes(&self, set: &IntCharSet) -> Vec<ClassId> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| set.and(class).is_empty())
            .map(|(i, _)| i as ClassId)
            .collect()
    }

    fn class_intervals(&self) -> Vec<(Interval, ClassId)> {
        let mut out: Vec<(Interval, ClassId)> = self
            .classes
            .iter()
            .enumerate()
            .flat_map(|(class, set)| set.intervals().iter().map(move |&iv| (iv, class as ClassId)))
            .collect();
        out.sort_unstable_by_key(|(iv, _)| iv.start);
        out
    }
}

/// Class ids of `c` and, when `caseless`, of its case variants.
pub fn char_class_codes(classes: &dyn CharClassMap, c: u32, caseless: bool) -> Vec<ClassId> {
    let mut codes = Vec::new();
    if c <= classes.max_char() {
        codes.push(classes.class_of(c));
    }
    if caseless {
        for variant in case_variants(c) {
            if variant <= classes.max_char() {
                codes.push(classes.class_of(variant));
            }
        }
    }
    codes.sort_unstable();
    codes.dedup();
    codes
}

//! Semantic checks on rule expressions.
//!
//! A trailing-context rule `r/s` can only be scanned precisely if the end of
//! `r` is unambiguous: either `r` has a fixed, non-zero length, or no
//! character that can end a match of `r` can start a match of `s`.
//!
//! The structural helpers here work on expanded trees; macro uses are
//! followed through the macro table.

use log::error;

use crate::automata::charset::IntCharSet;
use crate::automata::regex::RegExp;
use crate::error::{GenerateError, Result};
use crate::macros::MacroTable;
use crate::rules::RuleTable;

/// Checks expressions against one macro table and alphabet.
pub struct SemCheck<'a> {
    macros: &'a MacroTable,
    max_char: u32,
}

impl<'a> SemCheck<'a> {
    pub fn new(macros: &'a MacroTable, max_char: u32) -> Self {
        SemCheck { macros, max_char }
    }

    /// Check every rule. Each illegal lookahead is logged; the first one is
    /// returned as the error.
    pub fn check(&self, rules: &RuleTable) -> Result<()> {
        let mut first_error = None;
        for rule in rules {
            if let Some(lookahead) = &rule.lookahead {
                if !self.is_legal_lookahead(&rule.regexp, lookahead) {
                    error!(
                        "line {}: trailing context {} / {} is ambiguous",
                        rule.line, rule.regexp, lookahead
                    );
                    first_error.get_or_insert(rule.line);
                }
            }
        }
        match first_error {
            Some(line) => Err(GenerateError::Lookahead { line }),
            None => Ok(()),
        }
    }

    pub fn is_legal_lookahead(&self, r: &RegExp, s: &RegExp) -> bool {
        self.length(r).is_some_and(|len| len > 0) || self.last(r).and(&self.first(s)).is_empty()
    }

    /// Length of every string matched by `re`, if they all have the same one.
    pub fn length(&self, re: &RegExp) -> Option<usize> {
        match re {
            RegExp::Alternation(r1, r2) => {
                let l1 = self.length(r1)?;
                (self.length(r2)? == l1).then_some(l1)
            }
            RegExp::Concatenation(r1, r2) => Some(self.length(r1)? + self.length(r2)?),
            RegExp::Star(_)
            | RegExp::Plus(_)
            | RegExp::Question(_)
            | RegExp::Negation(_)
            | RegExp::UpTo(_) => None,
            RegExp::Char(_)
            | RegExp::CaselessChar(_)
            | RegExp::CharClass(_)
            | RegExp::NegatedCharClass(_) => Some(1),
            RegExp::String(s) | RegExp::CaselessString(s) => Some(s.chars().count()),
            RegExp::MacroUse(name) => self.macros.definition(name).and_then(|d| self.length(d)),
        }
    }

    /// Whether `re` matches the empty string.
    pub fn contains_epsilon(&self, re: &RegExp) -> bool {
        match re {
            RegExp::Alternation(r1, r2) => self.contains_epsilon(r1) || self.contains_epsilon(r2),
            RegExp::Concatenation(r1, r2) => self.contains_epsilon(r1) && self.contains_epsilon(r2),
            RegExp::Star(_) | RegExp::Question(_) => true,
            RegExp::Plus(r) => self.contains_epsilon(r),
            RegExp::Negation(r) => !self.contains_epsilon(r),
            // ~r ends with a match of r, and an empty r makes ~r empty.
            RegExp::UpTo(_) => false,
            RegExp::Char(_)
            | RegExp::CaselessChar(_)
            | RegExp::CharClass(_)
            | RegExp::NegatedCharClass(_) => false,
            RegExp::String(s) | RegExp::CaselessString(s) => s.is_empty(),
            RegExp::MacroUse(name) => {
                self.macros.definition(name).map_or(true, |d| self.contains_epsilon(d))
            }
        }
    }

    /// Characters that can start a non-empty match of `re`.
    pub fn first(&self, re: &RegExp) -> IntCharSet {
        match re {
            RegExp::Alternation(r1, r2) => {
                let mut set = self.first(r1);
                set.add_set(&self.first(r2));
                set
            }
            RegExp::Concatenation(r1, r2) => {
                let mut set = self.first(r1);
                if self.contains_epsilon(r1) {
                    set.add_set(&self.first(r2));
                }
                set
            }
            RegExp::Star(r) | RegExp::Plus(r) | RegExp::Question(r) => self.first(r),
            RegExp::Negation(_) | RegExp::UpTo(_) => self.all(),
            RegExp::String(s) => self.edge_char(s.chars().next(), false),
            RegExp::CaselessString(s) => self.edge_char(s.chars().next(), true),
            RegExp::MacroUse(name) => {
                self.macros.definition(name).map_or_else(|| self.all(), |d| self.first(d))
            }
            single => self.single_char_set(single),
        }
    }

    /// Characters that can end a non-empty match of `re`.
    pub fn last(&self, re: &RegExp) -> IntCharSet {
        match re {
            RegExp::Alternation(r1, r2) => {
                let mut set = self.last(r1);
                set.add_set(&self.last(r2));
                set
            }
            RegExp::Concatenation(r1, r2) => {
                let mut set = self.last(r2);
                if self.contains_epsilon(r2) {
                    set.add_set(&self.last(r1));
                }
                set
            }
            RegExp::Star(r) | RegExp::Plus(r) | RegExp::Question(r) => self.last(r),
            RegExp::Negation(_) => self.all(),
            RegExp::UpTo(r) => self.last(r),
            RegExp::String(s) => self.edge_char(s.chars().last(), false),
            RegExp::CaselessString(s) => self.edge_char(s.chars().last(), true),
            RegExp::MacroUse(name) => {
                self.macros.definition(name).map_or_else(|| self.all(), |d| self.last(d))
            }
            single => self.single_char_set(single),
        }
    }

    fn all(&self) -> IntCharSet {
        IntCharSet::all(self.max_char)
    }

    fn edge_char(&self, c: Option<char>, caseless: bool) -> IntCharSet {
        match c {
            Some(c) if caseless => IntCharSet::from_char(c as u32).caseless(),
            Some(c) => IntCharSet::from_char(c as u32),
            None => IntCharSet::new(),
        }
    }

    fn single_char_set(&self, re: &RegExp) -> IntCharSet {
        match re {
            RegExp::Char(c) => IntCharSet::from_char(*c),
            RegExp::CaselessChar(c) => IntCharSet::from_char(*c).caseless(),
            RegExp::CharClass(set) => set.clone(),
            RegExp::NegatedCharClass(set) => set.complement(self.max_char),
            _ => self.all(),
        }
    }
}

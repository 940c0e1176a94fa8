//! Regular-expression syntax tree.
//!
//! Trees are produced by the specification parser (an external collaborator)
//! and consumed by the macro expander, the semantic checker, the partition
//! builder and the NFA builder. After macro expansion no node is shared:
//! every expanded macro use is a deep copy of the definition.

use std::fmt;

use super::charset::{IntCharSet, Interval};
use crate::macros::MacroTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegExp {
    /// `r1 | r2`
    Alternation(Box<RegExp>, Box<RegExp>),
    /// `r1 r2`
    Concatenation(Box<RegExp>, Box<RegExp>),
    /// `r*`
    Star(Box<RegExp>),
    /// `r+`
    Plus(Box<RegExp>),
    /// `r?`
    Question(Box<RegExp>),
    /// `!r`, every string not matched by `r`.
    Negation(Box<RegExp>),
    /// `~r`, the shortest text ending in the first match of `r`.
    UpTo(Box<RegExp>),
    Char(u32),
    CaselessChar(u32),
    /// `[...]`
    CharClass(IntCharSet),
    /// `[^...]`
    NegatedCharClass(IntCharSet),
    /// `"..."`
    String(String),
    CaselessString(String),
    /// `{NAME}`
    MacroUse(String),
}

// ══════════════════════════════════════════════════════════════════════════════
// Constructors
// ══════════════════════════════════════════════════════════════════════════════

impl RegExp {
    pub fn alt(r1: RegExp, r2: RegExp) -> RegExp {
        RegExp::Alternation(Box::new(r1), Box::new(r2))
    }

    pub fn concat(r1: RegExp, r2: RegExp) -> RegExp {
        RegExp::Concatenation(Box::new(r1), Box::new(r2))
    }

    pub fn star(r: RegExp) -> RegExp {
        RegExp::Star(Box::new(r))
    }

    pub fn plus(r: RegExp) -> RegExp {
        RegExp::Plus(Box::new(r))
    }

    pub fn question(r: RegExp) -> RegExp {
        RegExp::Question(Box::new(r))
    }

    pub fn negation(r: RegExp) -> RegExp {
        RegExp::Negation(Box::new(r))
    }

    pub fn up_to(r: RegExp) -> RegExp {
        RegExp::UpTo(Box::new(r))
    }

    pub fn ch(c: char) -> RegExp {
        RegExp::Char(c as u32)
    }

    pub fn literal(s: &str) -> RegExp {
        RegExp::String(s.to_string())
    }

    pub fn macro_use(name: &str) -> RegExp {
        RegExp::MacroUse(name.to_string())
    }

    /// Character class from inclusive `(start, end)` char ranges.
    pub fn class(ranges: &[(char, char)]) -> RegExp {
        RegExp::CharClass(ranges_to_set(ranges))
    }

    /// Negated character class from inclusive `(start, end)` char ranges.
    pub fn not_class(ranges: &[(char, char)]) -> RegExp {
        RegExp::NegatedCharClass(ranges_to_set(ranges))
    }
}

fn ranges_to_set(ranges: &[(char, char)]) -> IntCharSet {
    IntCharSet::from_intervals(
        ranges
            .iter()
            .map(|&(lo, hi)| Interval::new(lo as u32, hi as u32)),
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// Structural queries
// ══════════════════════════════════════════════════════════════════════════════

impl RegExp {
    /// Upper bound on the number of NFA states this expression produces.
    ///
    /// Negation squares its operand's size and precise trailing context
    /// triples that, so the arithmetic saturates instead of overflowing.
    pub fn size(&self, macros: &MacroTable) -> usize {
        match self {
            RegExp::Alternation(r1, r2) => {
                r1.size(macros).saturating_add(r2.size(macros)).saturating_add(2)
            }
            RegExp::Concatenation(r1, r2) => r1.size(macros).saturating_add(r2.size(macros)),
            RegExp::Star(r) | RegExp::Plus(r) => r.size(macros).saturating_add(2),
            RegExp::Question(r) => r.size(macros),
            RegExp::Negation(r) => {
                let s = r.size(macros);
                s.saturating_mul(s)
            }
            RegExp::UpTo(r) => {
                let s = r.size(macros);
                s.saturating_mul(s).saturating_mul(3)
            }
            RegExp::String(s) | RegExp::CaselessString(s) => s.chars().count() + 1,
            RegExp::Char(_)
            | RegExp::CaselessChar(_)
            | RegExp::CharClass(_)
            | RegExp::NegatedCharClass(_) => 2,
            RegExp::MacroUse(name) => macros.definition(name).map_or(2, |def| def.size(macros)),
        }
    }

    /// Whether the expression matches exactly single characters drawn from
    /// a union of character classes, so it compiles to a two-state fragment.
    pub fn is_char_class(&self, macros: &MacroTable) -> bool {
        match self {
            RegExp::Char(_)
            | RegExp::CaselessChar(_)
            | RegExp::CharClass(_)
            | RegExp::NegatedCharClass(_) => true,
            RegExp::Alternation(r1, r2) => r1.is_char_class(macros) && r2.is_char_class(macros),
            RegExp::MacroUse(name) => macros
                .definition(name)
                .is_some_and(|def| def.is_char_class(macros)),
            _ => false,
        }
    }

    /// Call `f` with the name of every macro used directly in this tree.
    pub fn for_each_macro_use<F: FnMut(&str)>(&self, f: &mut F) {
        match self {
            RegExp::Alternation(r1, r2) | RegExp::Concatenation(r1, r2) => {
                r1.for_each_macro_use(f);
                r2.for_each_macro_use(f);
            }
            RegExp::Star(r)
            | RegExp::Plus(r)
            | RegExp::Question(r)
            | RegExp::Negation(r)
            | RegExp::UpTo(r) => r.for_each_macro_use(f),
            RegExp::MacroUse(name) => f(name),
            _ => {}
        }
    }

    pub fn contains_macro_use(&self) -> bool {
        let mut found = false;
        self.for_each_macro_use(&mut |_| found = true);
        found
    }
}

impl fmt::Display for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegExp::Alternation(r1, r2) => write!(f, "({r1} | {r2})"),
            RegExp::Concatenation(r1, r2) => write!(f, "{r1} {r2}"),
            RegExp::Star(r) => write!(f, "({r})*"),
            RegExp::Plus(r) => write!(f, "({r})+"),
            RegExp::Question(r) => write!(f, "({r})?"),
            RegExp::Negation(r) => write!(f, "!({r})"),
            RegExp::UpTo(r) => write!(f, "~({r})"),
            RegExp::Char(c) => write!(f, "{}", Interval::single(*c)),
            RegExp::CaselessChar(c) => write!(f, "%{}", Interval::single(*c)),
            RegExp::CharClass(set) => write!(f, "[{set}]"),
            RegExp::NegatedCharClass(set) => write!(f, "[^{set}]"),
            RegExp::String(s) => write!(f, "{s:?}"),
            RegExp::CaselessString(s) => write!(f, "%{s:?}"),
            RegExp::MacroUse(name) => write!(f, "{{{name}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_estimates() {
        let macros = MacroTable::new();
        let ab = RegExp::alt(RegExp::ch('a'), RegExp::ch('b'));
        assert_eq!(ab.size(&macros), 6);
        assert_eq!(RegExp::star(ab.clone()).size(&macros), 8);
        assert_eq!(RegExp::literal("abc").size(&macros), 4);
        assert_eq!(RegExp::negation(RegExp::ch('a')).size(&macros), 4);
        assert_eq!(RegExp::up_to(RegExp::ch('a')).size(&macros), 12);
    }

    #[test]
    fn test_size_saturates() {
        let macros = MacroTable::new();
        let mut re = RegExp::literal("abcdefghijklmnop");
        for _ in 0..6 {
            re = RegExp::up_to(re);
        }
        assert_eq!(re.size(&macros), usize::MAX);
    }

    #[test]
    fn test_is_char_class() {
        let mut macros = MacroTable::new();
        macros.insert("D", RegExp::class(&[('0', '9')]));
        let re = RegExp::alt(RegExp::macro_use("D"), RegExp::ch('x'));
        assert!(re.is_char_class(&macros));
        assert!(!RegExp::literal("ab").is_char_class(&macros));
        assert!(!RegExp::star(RegExp::ch('x')).is_char_class(&macros));
    }

    #[test]
    fn test_display() {
        let re = RegExp::concat(RegExp::plus(RegExp::class(&[('a', 'z')])), RegExp::macro_use("WS"));
        assert_eq!(re.to_string(), "([{ ['a'-'z'] }])+ {WS}");
    }
}

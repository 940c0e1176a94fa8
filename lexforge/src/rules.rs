//! Rules, actions, lexical states and end-of-file actions.
//!
//! These are the specification-facing tables the parser fills in. Rule
//! priority is the rule's line number: among several rules matching the
//! same longest text, the one declared first wins.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::automata::regex::RegExp;
use crate::macros::MacroTable;

/// Name of the lexical state every scanner starts in.
pub const INITIAL_STATE: &str = "INITIAL";

// ══════════════════════════════════════════════════════════════════════════════
// Actions
// ══════════════════════════════════════════════════════════════════════════════

/// User code attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Code text, emitted verbatim.
    pub content: String,
    /// Line of the owning rule. Lower values take precedence.
    pub priority: u32,
    /// The owning rule has trailing context, so the scanner has to push
    /// the lookahead text back before running this action.
    pub is_lookahead: bool,
}

impl Action {
    pub fn new(content: impl Into<String>, priority: u32) -> Self {
        Action { content: content.into(), priority, is_lookahead: false }
    }

    /// Whichever of `self` and `other` comes from the earlier line. Ties go
    /// to `other`.
    pub fn higher_priority<'a>(&'a self, other: &'a Action) -> &'a Action {
        if other.priority > self.priority {
            self
        } else {
            other
        }
    }

    /// Code compared when deciding whether two actions are interchangeable.
    pub fn equiv_key(&self) -> &str {
        self.content.trim()
    }

}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.priority, self.content.trim())
    }
}

/// The lower-line action of two optional actions.
pub fn merge_actions(a: Option<&Rc<Action>>, b: Option<&Rc<Action>>) -> Option<Rc<Action>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            Some(if std::ptr::eq(a.higher_priority(b), a.as_ref()) { a.clone() } else { b.clone() })
        }
        (Some(a), None) => Some(a.clone()),
        (None, b) => b.cloned(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Rules
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Rule {
    /// Source line; doubles as the rule's priority.
    pub line: u32,
    /// Lexical states the rule is active in. Empty means every inclusive state.
    pub states: Vec<usize>,
    pub regexp: RegExp,
    pub action: Rc<Action>,
    /// Anchored with `^`: only active at the beginning of a line.
    pub is_bol: bool,
    /// Trailing context `r/s`: `s` must follow but is not consumed.
    pub lookahead: Option<RegExp>,
}

impl Rule {
    pub fn new(line: u32, regexp: RegExp, code: impl Into<String>) -> Self {
        Rule {
            line,
            states: Vec::new(),
            regexp,
            action: Rc::new(Action::new(code, line)),
            is_bol: false,
            lookahead: None,
        }
    }

    pub fn in_states(mut self, states: Vec<usize>) -> Self {
        self.states = states;
        self
    }

    pub fn at_bol(mut self) -> Self {
        self.is_bol = true;
        self
    }

    pub fn with_lookahead(mut self, lookahead: RegExp) -> Self {
        self.lookahead = Some(lookahead);
        let mut action = (*self.action).clone();
        action.is_lookahead = true;
        self.action = Rc::new(action);
        self
    }

    /// Name used when reporting macros this rule refers to.
    pub fn describe(&self) -> String {
        format!("rule at line {}", self.line)
    }
}

/// Rules in specification order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Estimated NFA state count for all rules, including the lexical
    /// state entries.
    pub fn nfa_size(&self, macros: &MacroTable, num_lex_states: usize) -> usize {
        self.rules
            .iter()
            .map(|r| {
                let look = r.lookahead.as_ref().map_or(0, |l| l.size(macros));
                r.regexp.size(macros).saturating_add(look)
            })
            .fold(2 * num_lex_states + 2, usize::saturating_add)
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleTable {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        RuleTable { rules: iter.into_iter().collect() }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Lexical states
// ══════════════════════════════════════════════════════════════════════════════

/// Lexical state names, numbered in declaration order.
///
/// Inclusive states pick up every rule that names no state; exclusive
/// states only get rules that name them.
#[derive(Debug, Clone)]
pub struct LexicalStates {
    names: Vec<String>,
    numbers: BTreeMap<String, usize>,
    inclusive: Vec<usize>,
}

impl Default for LexicalStates {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalStates {
    /// A table holding only the inclusive [`INITIAL_STATE`].
    pub fn new() -> Self {
        let mut states =
            LexicalStates { names: Vec::new(), numbers: BTreeMap::new(), inclusive: Vec::new() };
        states.insert(INITIAL_STATE, true);
        states
    }

    /// Declare a state and return its number. Redeclaring returns the
    /// existing number.
    pub fn insert(&mut self, name: &str, is_inclusive: bool) -> usize {
        if let Some(&num) = self.numbers.get(name) {
            return num;
        }
        let num = self.names.len();
        self.names.push(name.to_string());
        self.numbers.insert(name.to_string(), num);
        if is_inclusive {
            self.inclusive.push(num);
        }
        num
    }

    pub fn number(&self, name: &str) -> Option<usize> {
        self.numbers.get(name).copied()
    }

    pub fn name(&self, num: usize) -> Option<&str> {
        self.names.get(num).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn inclusive_states(&self) -> &[usize] {
        &self.inclusive
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// End-of-file actions
// ══════════════════════════════════════════════════════════════════════════════

/// Actions run when input ends, per lexical state, with an optional default
/// for states that have none of their own.
#[derive(Debug, Clone, Default)]
pub struct EofActions {
    actions: BTreeMap<usize, Rc<Action>>,
    default: Option<Rc<Action>>,
}

impl EofActions {
    pub fn new() -> Self {
        EofActions::default()
    }

    /// Register `action` for each of `states`. A state that already has an
    /// action keeps whichever comes from the earlier line.
    pub fn add(&mut self, states: &[usize], action: Rc<Action>) {
        for &state in states {
            let merged = merge_actions(self.actions.get(&state), Some(&action));
            if let Some(merged) = merged {
                self.actions.insert(state, merged);
            }
        }
    }

    /// Set the action for states without one of their own. States that
    /// already have an action switch to `action` if it comes from an
    /// earlier line.
    pub fn set_default(&mut self, action: Rc<Action>) {
        for existing in self.actions.values_mut() {
            if let Some(merged) = merge_actions(Some(&*existing), Some(&action)) {
                *existing = merged;
            }
        }
        self.default = merge_actions(self.default.as_ref(), Some(&action));
    }

    /// Action for `state`, falling back to the default.
    pub fn action(&self, state: usize) -> Option<&Rc<Action>> {
        self.actions.get(&state).or(self.default.as_ref())
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len() + usize::from(self.default.is_some())
    }
}

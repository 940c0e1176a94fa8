//! NFA construction from regular-expression trees.
//!
//! Every sub-expression becomes a Thompson fragment with a single start and
//! a single end state. Expressions that only ever match one character from a
//! union of classes use a two-state fragment with one transition per class.
//!
//! Negation (`!r`) determinizes the fragment for `r` in place, completes it
//! with an absorbing error state and flips finality. Precise trailing context
//! (`~r`) is the negation of `any* r any*` followed by a fresh copy of `r`.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;

use super::partition::{char_class_codes, CharClassMap};
use super::regex::RegExp;
use super::state_set::StateSet;
use super::{ClassId, Nfa, NfaFragment, StateId};
use crate::error::{GenerateError, Result};
use crate::macros::MacroTable;
use crate::rules::{Action, LexicalStates, Rule};

/// Code of the action attached to the standalone rule.
pub const ECHO_ACTION: &str = "echo";

/// Incremental NFA builder for one rule set.
pub struct NfaBuilder<'a> {
    nfa: Nfa,
    classes: &'a dyn CharClassMap,
    macros: &'a MacroTable,
    max_states: usize,
}

impl<'a> NfaBuilder<'a> {
    /// A builder with the entry states of `num_lex_states` lexical states
    /// and room for roughly `estimated_size` states.
    pub fn new(
        classes: &'a dyn CharClassMap,
        macros: &'a MacroTable,
        num_lex_states: usize,
        estimated_size: usize,
        max_states: usize,
    ) -> Result<Self> {
        let mut nfa = Nfa::new(classes.num_classes(), num_lex_states);
        if nfa.states.len() > max_states {
            return Err(GenerateError::ResourceExhaustion { limit: max_states });
        }
        nfa.states
            .try_reserve(estimated_size.min(max_states).saturating_sub(nfa.states.len()))
            .map_err(|_| GenerateError::ResourceExhaustion { limit: max_states })?;
        Ok(NfaBuilder { nfa, classes, macros, max_states })
    }

    pub fn finish(self) -> Nfa {
        self.nfa
    }

    fn add_state(&mut self) -> Result<StateId> {
        if self.nfa.states.len() >= self.max_states {
            return Err(GenerateError::ResourceExhaustion { limit: self.max_states });
        }
        self.nfa
            .states
            .try_reserve(1)
            .map_err(|_| GenerateError::ResourceExhaustion { limit: self.max_states })?;
        Ok(self.nfa.add_state())
    }

    fn add_transitions(&mut self, from: StateId, classes: &[ClassId], to: StateId) {
        for &class in classes {
            self.nfa.add_transition(from, class, to);
        }
    }

    fn all_classes(&self) -> Vec<ClassId> {
        (0..self.nfa.num_classes as ClassId).collect()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Rules
    // ══════════════════════════════════════════════════════════════════════════

    /// Add `rule`, wiring it into the entries of every lexical state it is
    /// active in.
    pub fn add_rule(&mut self, rule: &Rule, lex_states: &LexicalStates) -> Result<()> {
        let states: &[usize] =
            if rule.states.is_empty() { lex_states.inclusive_states() } else { &rule.states };

        let fragment = self.insert(&rule.regexp)?;

        for &k in states {
            if k >= self.nfa.num_lex_states {
                return Err(GenerateError::InternalInconsistency(format!(
                    "rule at line {} refers to lexical state {k}, only {} exist",
                    rule.line, self.nfa.num_lex_states
                )));
            }
            let entry = 2 * k as StateId;
            if !rule.is_bol {
                self.nfa.add_epsilon(entry, fragment.start);
            }
            self.nfa.add_epsilon(entry + 1, fragment.start);
        }

        let (accepting, action) = match &rule.lookahead {
            Some(lookahead) => {
                let look = self.insert(lookahead)?;
                self.nfa.add_epsilon(fragment.end, look.start);
                self.nfa.states[fragment.end as usize].is_pushback = true;
                (look.end, lookahead_action(&rule.action))
            }
            None => (fragment.end, rule.action.clone()),
        };
        let state = &mut self.nfa.states[accepting as usize];
        state.is_final = true;
        state.action = Some(action);
        Ok(())
    }

    /// Add the lowest-priority rule that matches any single character in
    /// every lexical state and echoes it.
    pub fn add_standalone_rule(&mut self) -> Result<()> {
        let start = self.add_state()?;
        let end = self.add_state()?;
        let all = self.all_classes();
        self.add_transitions(start, &all, end);

        for entry in 0..2 * self.nfa.num_lex_states as StateId {
            self.nfa.add_epsilon(entry, start);
        }

        let state = &mut self.nfa.states[end as usize];
        state.is_final = true;
        state.action = Some(Rc::new(Action::new(ECHO_ACTION, u32::MAX)));
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Thompson construction
    // ══════════════════════════════════════════════════════════════════════════

    /// Build the fragment for `re`.
    pub fn insert(&mut self, re: &RegExp) -> Result<NfaFragment> {
        if re.is_char_class(self.macros) {
            let mut classes = Vec::new();
            self.collect_classes(re, &mut classes)?;
            classes.sort_unstable();
            classes.dedup();
            let start = self.add_state()?;
            let end = self.add_state()?;
            self.add_transitions(start, &classes, end);
            return Ok(NfaFragment { start, end });
        }

        match re {
            RegExp::Alternation(r1, r2) => {
                let f1 = self.insert(r1)?;
                let f2 = self.insert(r2)?;
                let start = self.add_state()?;
                let end = self.add_state()?;
                self.nfa.add_epsilon(start, f1.start);
                self.nfa.add_epsilon(start, f2.start);
                self.nfa.add_epsilon(f1.end, end);
                self.nfa.add_epsilon(f2.end, end);
                Ok(NfaFragment { start, end })
            }
            RegExp::Concatenation(r1, r2) => {
                let f1 = self.insert(r1)?;
                let f2 = self.insert(r2)?;
                self.nfa.add_epsilon(f1.end, f2.start);
                Ok(NfaFragment { start: f1.start, end: f2.end })
            }
            RegExp::Star(r) | RegExp::Plus(r) => {
                let f = self.insert(r)?;
                let start = self.add_state()?;
                let end = self.add_state()?;
                self.nfa.add_epsilon(start, f.start);
                self.nfa.add_epsilon(f.end, end);
                self.nfa.add_epsilon(f.end, f.start);
                if matches!(re, RegExp::Star(_)) {
                    self.nfa.add_epsilon(start, end);
                }
                Ok(NfaFragment { start, end })
            }
            RegExp::Question(r) => {
                let f = self.insert(r)?;
                self.nfa.add_epsilon(f.start, f.end);
                Ok(f)
            }
            RegExp::String(s) => self.insert_string(s, false),
            RegExp::CaselessString(s) => self.insert_string(s, true),
            RegExp::MacroUse(name) => {
                let macros = self.macros;
                let definition = macros.definition(name).ok_or_else(|| {
                    GenerateError::InternalInconsistency(format!(
                        "macro `{name}` has no definition after expansion"
                    ))
                })?;
                self.insert(definition)
            }
            RegExp::Negation(r) => {
                let f = self.insert(r)?;
                self.complement(f)
            }
            RegExp::UpTo(r) => self.insert_up_to(r),
            RegExp::Char(_)
            | RegExp::CaselessChar(_)
            | RegExp::CharClass(_)
            | RegExp::NegatedCharClass(_) => Err(GenerateError::InternalInconsistency(format!(
                "character expression {re} missed the class fast path"
            ))),
        }
    }

    fn insert_string(&mut self, s: &str, caseless: bool) -> Result<NfaFragment> {
        let start = self.add_state()?;
        let mut current = start;
        for ch in s.chars() {
            let next = self.add_state()?;
            let classes = char_class_codes(self.classes, ch as u32, caseless);
            self.add_transitions(current, &classes, next);
            current = next;
        }
        if current == start {
            current = self.add_state()?;
            self.nfa.add_epsilon(start, current);
        }
        Ok(NfaFragment { start, end: current })
    }

    /// `~r`: everything up to and including the first match of `r`.
    fn insert_up_to(&mut self, r: &RegExp) -> Result<NfaFragment> {
        let all = self.all_classes();
        let start = self.add_state()?;
        let prefix = self.add_state()?;
        let suffix = self.add_state()?;
        let end = self.add_state()?;
        let inner = self.insert(r)?;

        self.add_transitions(prefix, &all, prefix);
        self.add_transitions(suffix, &all, suffix);
        self.nfa.add_epsilon(start, prefix);
        self.nfa.add_epsilon(prefix, inner.start);
        self.nfa.add_epsilon(inner.end, suffix);
        self.nfa.add_epsilon(suffix, end);

        let not_containing = self.complement(NfaFragment { start, end })?;
        let tail = self.insert(r)?;
        self.nfa.add_epsilon(not_containing.end, tail.start);
        Ok(NfaFragment { start: not_containing.start, end: tail.end })
    }

    fn collect_classes(&self, re: &RegExp, out: &mut Vec<ClassId>) -> Result<()> {
        match re {
            RegExp::Char(c) => out.extend(char_class_codes(self.classes, *c, false)),
            RegExp::CaselessChar(c) => out.extend(char_class_codes(self.classes, *c, true)),
            RegExp::CharClass(set) => out.extend(self.classes.class_codes(set, false)),
            RegExp::NegatedCharClass(set) => out.extend(self.classes.not_class_codes(set)),
            RegExp::Alternation(r1, r2) => {
                self.collect_classes(r1, out)?;
                self.collect_classes(r2, out)?;
            }
            RegExp::MacroUse(name) => {
                let definition = self.macros.definition(name).ok_or_else(|| {
                    GenerateError::InternalInconsistency(format!(
                        "macro `{name}` has no definition after expansion"
                    ))
                })?;
                self.collect_classes(definition, out)?;
            }
            other => {
                return Err(GenerateError::InternalInconsistency(format!(
                    "{other} is not a character class"
                )))
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Negation
    // ══════════════════════════════════════════════════════════════════════════

    /// Fragment matching exactly the strings `fragment` rejects.
    ///
    /// The fragment is determinized into fresh states, every missing
    /// transition is sent to an absorbing error state, non-final states get
    /// an epsilon edge to the new end, and states that cannot reach the new
    /// end are pruned.
    pub fn complement(&mut self, fragment: NfaFragment) -> Result<NfaFragment> {
        let num_classes = self.nfa.num_classes;

        // Positive DFA over the fragment's states.
        let mut sets: Vec<StateSet> = Vec::new();
        let mut index: HashMap<StateSet, usize> = HashMap::new();
        let mut moves: Vec<Vec<Option<usize>>> = Vec::new();

        let initial = epsilon_closure(&self.nfa, &StateSet::singleton(fragment.start));
        index.insert(initial.clone(), 0);
        sets.push(initial);

        let mut next = 0;
        while next < sets.len() {
            let mut by_class: BTreeMap<ClassId, StateSet> = BTreeMap::new();
            for s in sets[next].iter() {
                for &(class, target) in &self.nfa.states[s as usize].transitions {
                    by_class.entry(class).or_default().add(target);
                }
            }

            let mut row = vec![None; num_classes];
            for (class, targets) in by_class {
                let closure = epsilon_closure(&self.nfa, &targets);
                let id = match index.get(&closure) {
                    Some(&id) => id,
                    None => {
                        if sets.len() >= self.max_states {
                            return Err(GenerateError::ResourceExhaustion { limit: self.max_states });
                        }
                        let id = sets.len();
                        index.insert(closure.clone(), id);
                        sets.push(closure);
                        id
                    }
                };
                row[class as usize] = Some(id);
            }
            moves.push(row);
            next += 1;
        }

        // Complemented copy.
        let first = self.nfa.states.len() as StateId;
        for _ in 0..sets.len() {
            self.add_state()?;
        }
        let start = self.add_state()?;
        let error = self.add_state()?;
        let end = self.add_state()?;

        let all = self.all_classes();
        self.add_transitions(error, &all, error);
        self.nfa.add_epsilon(error, end);
        self.nfa.add_epsilon(start, first);

        for (i, set) in sets.iter().enumerate() {
            let state = first + i as StateId;
            if !set.contains(fragment.end) {
                self.nfa.add_epsilon(state, end);
            }
            for (class, target) in moves[i].iter().enumerate() {
                let to = target.map_or(error, |t| first + t as StateId);
                self.nfa.add_transition(state, class as ClassId, to);
            }
        }

        self.remove_dead(first, end);
        debug!(
            "complement: {} positive states, {} NFA states total",
            sets.len(),
            self.nfa.states.len()
        );
        Ok(NfaFragment { start, end })
    }

    /// Drop every edge into states `first..` that cannot reach `end`.
    fn remove_dead(&mut self, first: StateId, end: StateId) {
        let last = self.nfa.states.len() as StateId;
        let span = (last - first) as usize;
        let local = |s: StateId| (s >= first && s < last).then(|| (s - first) as usize);

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); span];
        for s in first..last {
            let state = &self.nfa.states[s as usize];
            let targets = state.transitions.iter().map(|&(_, t)| t).chain(state.epsilon.iter());
            for t in targets {
                if let Some(t) = local(t) {
                    predecessors[t].push((s - first) as usize);
                }
            }
        }

        let mut live = vec![false; span];
        let mut stack = Vec::new();
        if let Some(e) = local(end) {
            live[e] = true;
            stack.push(e);
        }
        while let Some(s) = stack.pop() {
            for &p in &predecessors[s] {
                if !live[p] {
                    live[p] = true;
                    stack.push(p);
                }
            }
        }

        let is_dead = |t: StateId| local(t).is_some_and(|t| !live[t]);
        for s in first..last {
            let state = &mut self.nfa.states[s as usize];
            state.transitions.retain(|&(_, t)| !is_dead(t));
            let dead_eps: Vec<StateId> = state.epsilon.iter().filter(|&t| is_dead(t)).collect();
            for t in dead_eps {
                state.epsilon.remove(t);
            }
        }
    }
}

/// Epsilon closure of `states`.
pub fn epsilon_closure(nfa: &Nfa, states: &StateSet) -> StateSet {
    let mut closure = StateSet::with_capacity(nfa.states.len());
    let mut stack: Vec<StateId> = Vec::new();
    for s in states.iter() {
        closure.add(s);
        stack.push(s);
    }

    while let Some(state) = stack.pop() {
        for target in nfa.states[state as usize].epsilon.iter() {
            if !closure.contains(target) {
                closure.add(target);
                stack.push(target);
            }
        }
    }
    closure
}

/// `action` flagged as ending a trailing-context match.
fn lookahead_action(action: &Rc<Action>) -> Rc<Action> {
    if action.is_lookahead {
        return action.clone();
    }
    Rc::new(Action { is_lookahead: true, ..(**action).clone() })
}

/// Build the NFA for every rule of a specification.
pub fn build_nfa(
    rules: &crate::rules::RuleTable,
    macros: &MacroTable,
    lex_states: &LexicalStates,
    classes: &dyn CharClassMap,
    standalone: bool,
    max_states: usize,
) -> Result<Nfa> {
    let estimate = rules.nfa_size(macros, lex_states.len());
    let mut builder = NfaBuilder::new(classes, macros, lex_states.len(), estimate, max_states)?;
    for rule in rules {
        builder.add_rule(rule, lex_states)?;
    }
    if standalone {
        builder.add_standalone_rule()?;
    }
    let nfa = builder.finish();
    debug!(
        "NFA: {} states for {} rules over {} classes",
        nfa.num_states(),
        rules.len(),
        nfa.num_classes
    );
    Ok(nfa)
}

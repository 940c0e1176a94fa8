//! Automata infrastructure for scanner generation.
//!
//! Provides the NFA/DFA types and the compilation stages:
//! `Rules -> NFA -> DFA -> Minimize -> Compress -> Codegen`
//!
//! NFA states `0..2n` are reserved for the `n` lexical states: state `2k` is
//! the entry of lexical state `k`, state `2k + 1` its entry at the beginning
//! of a line. Subset construction turns each of these into a DFA start state,
//! so the DFA carries the same pair per lexical state in [`Dfa::lex_state`].

pub mod charset;
pub mod codegen;
pub mod compress;
pub mod minimize;
pub mod nfa;
pub mod partition;
pub mod regex;
pub mod state_set;
pub mod subset;

use std::rc::Rc;

use crate::rules::Action;
use state_set::StateSet;

/// Identifier for an automaton state.
pub type StateId = u32;

/// Identifier for a character class.
pub type ClassId = u32;

/// Sentinel for "no transition".
pub const NO_TARGET: StateId = u32::MAX;

/// NFA state with class-labelled and epsilon transitions.
#[derive(Debug, Clone, Default)]
pub struct NfaState {
    /// Labelled transitions: (character class, target state).
    pub transitions: Vec<(ClassId, StateId)>,
    /// States reachable without consuming input.
    pub epsilon: StateSet,
    pub is_final: bool,
    /// End of the primary part of a trailing-context rule.
    pub is_pushback: bool,
    pub action: Option<Rc<Action>>,
}

impl NfaState {
    pub fn new() -> Self {
        NfaState::default()
    }
}

/// A complete NFA over character classes.
#[derive(Debug, Clone)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub num_classes: usize,
    pub num_lex_states: usize,
}

impl Nfa {
    /// An NFA holding only the two entry states of each lexical state.
    pub fn new(num_classes: usize, num_lex_states: usize) -> Self {
        Nfa {
            states: vec![NfaState::new(); 2 * num_lex_states],
            num_classes,
            num_lex_states,
        }
    }

    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(NfaState::new());
        id
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from as usize].epsilon.add(to);
    }

    pub fn add_transition(&mut self, from: StateId, class: ClassId, to: StateId) {
        self.states[from as usize].transitions.push((class, to));
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

/// DFA state with dense per-class transitions.
#[derive(Debug, Clone)]
pub struct DfaState {
    /// `transitions[class] = target`, or [`NO_TARGET`].
    pub transitions: Vec<StateId>,
    pub is_final: bool,
    pub is_pushback: bool,
    /// Accepting state of a trailing-context rule.
    pub is_look_end: bool,
    pub action: Option<Rc<Action>>,
}

impl DfaState {
    /// A non-accepting state without transitions.
    pub fn with_classes(num_classes: usize) -> Self {
        DfaState {
            transitions: vec![NO_TARGET; num_classes],
            is_final: false,
            is_pushback: false,
            is_look_end: false,
            action: None,
        }
    }

    pub fn has_transitions(&self) -> bool {
        self.transitions.iter().any(|&t| t != NO_TARGET)
    }
}

/// A complete DFA with one start pair per lexical state.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub num_classes: usize,
    /// `lex_state[2k]` and `lex_state[2k + 1]` are the start states of
    /// lexical state `k`, without and with beginning-of-line context.
    pub lex_state: Vec<StateId>,
}

impl Dfa {
    pub fn new(num_classes: usize) -> Self {
        Dfa { states: Vec::new(), num_classes, lex_state: Vec::new() }
    }

    pub fn add_state(&mut self, state: DfaState) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(state);
        id
    }

    /// O(1) transition lookup: returns target state or [`NO_TARGET`].
    #[inline]
    pub fn transition(&self, state: StateId, class: ClassId) -> StateId {
        self.states[state as usize].transitions[class as usize]
    }

    #[inline]
    pub fn set_transition(&mut self, state: StateId, class: ClassId, target: StateId) {
        self.states[state as usize].transitions[class as usize] = target;
    }

    /// Start state of lexical state `lex` (at line start if `bol`).
    pub fn start(&self, lex: usize, bol: bool) -> Option<StateId> {
        self.lex_state.get(2 * lex + usize::from(bol)).copied()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Run the DFA over `classes` from `start`; `None` if it gets stuck.
    pub fn run(&self, start: StateId, classes: &[ClassId]) -> Option<StateId> {
        classes.iter().try_fold(start, |state, &class| {
            let next = self.transition(state, class);
            (next != NO_TARGET).then_some(next)
        })
    }
}

/// A sub-automaton with a designated start and end state, used during
/// Thompson construction. The start has no incoming edges and the end no
/// outgoing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfaFragment {
    pub start: StateId,
    pub end: StateId,
}

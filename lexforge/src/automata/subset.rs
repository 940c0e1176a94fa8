//! Subset construction: NFA → DFA conversion.
//!
//! 1. Precompute the epsilon closure of every NFA state
//! 2. Seed the DFA with the closures of the lexical state entries, in order
//! 3. For each DFA state and class, the target is the closure of the union
//!    of the members' moves
//! 4. A DFA state is final (pushback) if any member is, and takes the action
//!    of the earliest rule among its members
//!
//! DFA states are numbered in creation order, so the result is deterministic.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::debug;

use super::nfa::epsilon_closure;
use super::state_set::StateSet;
use super::{ClassId, Dfa, DfaState, Nfa, StateId};
use crate::error::{GenerateError, Result};
use crate::rules::{merge_actions, Action};

/// Convert an NFA to a DFA with at most `max_states` states.
pub fn subset_construction(nfa: &Nfa, max_states: usize) -> Result<Dfa> {
    let num_classes = nfa.num_classes;
    let closures: Vec<StateSet> = (0..nfa.num_states() as StateId)
        .map(|s| epsilon_closure(nfa, &StateSet::singleton(s)))
        .collect();

    let mut dfa = Dfa::new(num_classes);
    let mut sets: Vec<StateSet> = Vec::new();
    let mut index: HashMap<StateSet, StateId> = HashMap::new();

    let mut intern = |set: StateSet, dfa: &mut Dfa, sets: &mut Vec<StateSet>| -> Result<StateId> {
        if let Some(&id) = index.get(&set) {
            return Ok(id);
        }
        if dfa.states.len() >= max_states {
            return Err(GenerateError::ResourceExhaustion { limit: max_states });
        }
        let id = dfa.add_state(resolve_state(nfa, &set, num_classes));
        index.insert(set.clone(), id);
        sets.push(set);
        Ok(id)
    };

    for entry in 0..2 * nfa.num_lex_states {
        let id = intern(closures[entry].clone(), &mut dfa, &mut sets)?;
        dfa.lex_state.push(id);
    }

    let mut next = 0;
    while next < sets.len() {
        let mut by_class: BTreeMap<ClassId, StateSet> = BTreeMap::new();
        for s in sets[next].iter() {
            for &(class, target) in &nfa.states[s as usize].transitions {
                by_class.entry(class).or_default().add_set(&closures[target as usize]);
            }
        }

        for (class, target_set) in by_class {
            let target = intern(target_set, &mut dfa, &mut sets)?;
            dfa.set_transition(next as StateId, class, target);
        }
        next += 1;
    }

    debug!("DFA: {} states from {} NFA states", dfa.num_states(), nfa.num_states());
    Ok(dfa)
}

/// Attributes of the DFA state for the NFA state set `set`.
fn resolve_state(nfa: &Nfa, set: &StateSet, num_classes: usize) -> DfaState {
    let mut state = DfaState::with_classes(num_classes);
    let mut action: Option<Rc<Action>> = None;
    for s in set.iter() {
        let member = &nfa.states[s as usize];
        state.is_pushback |= member.is_pushback;
        if member.is_final {
            state.is_final = true;
            action = merge_actions(action.as_ref(), member.action.as_ref());
        }
    }
    state.is_look_end = action.as_ref().is_some_and(|a| a.is_lookahead);
    state.action = action;
    state
}

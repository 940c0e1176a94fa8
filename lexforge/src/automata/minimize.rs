//! Hopcroft's DFA minimization.
//!
//! Merges equivalent DFA states: states with the same attributes (final,
//! pushback, look-end, action) that transition identically on every class.
//!
//! **Algorithm:** Hopcroft's partition refinement over an inverse transition
//! map. For each splitter (block, class) only the predecessors of the
//! splitter's states are examined. The missing-transition target acts as an
//! implicit block of its own that never needs to be a splitter.
//!
//! **Complexity:** O(n × k × log n) on the number of DFA states and classes.

use std::collections::BTreeMap;

use log::debug;

use super::{ClassId, Dfa, DfaState, StateId, NO_TARGET};

/// Key of the initial partition: states in different blocks can never merge.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct InitialKey<'a> {
    is_final: bool,
    is_pushback: bool,
    is_look_end: bool,
    action: Option<&'a str>,
    rule: Option<u32>,
}

fn initial_key(state: &DfaState, distinguish_rules: bool) -> InitialKey<'_> {
    InitialKey {
        is_final: state.is_final,
        is_pushback: state.is_pushback,
        is_look_end: state.is_look_end,
        action: state.action.as_ref().map(|a| a.equiv_key()),
        rule: state.action.as_ref().filter(|_| distinguish_rules).map(|a| a.priority),
    }
}

/// Minimize a DFA.
///
/// Actions with the same trimmed code are interchangeable unless
/// `distinguish_rules` is set, in which case states are only merged when
/// their actions come from the same rule. New states are numbered by their
/// lowest original member, so minimizing a minimal DFA returns it unchanged.
pub fn minimize_dfa(dfa: &Dfa, distinguish_rules: bool) -> Dfa {
    let n = dfa.states.len();
    if n <= 1 {
        return dfa.clone();
    }

    let num_classes = dfa.num_classes;

    // --- Step 1: Build inverse transition map ---
    // inverse[target][class] = predecessors of target on class.
    let mut inverse: Vec<Vec<Vec<StateId>>> = vec![vec![Vec::new(); num_classes]; n];
    for (state_idx, state) in dfa.states.iter().enumerate() {
        for (class_id, &target) in state.transitions.iter().enumerate() {
            if target != NO_TARGET {
                inverse[target as usize][class_id].push(state_idx as StateId);
            }
        }
    }

    // --- Step 2: Initial partition by attributes ---
    let mut groups: BTreeMap<InitialKey<'_>, Vec<StateId>> = BTreeMap::new();
    for (i, state) in dfa.states.iter().enumerate() {
        groups
            .entry(initial_key(state, distinguish_rules))
            .or_default()
            .push(i as StateId);
    }

    let mut partition_of: Vec<usize> = vec![0; n];
    let mut partitions: Vec<Vec<StateId>> = Vec::with_capacity(groups.len());
    for (_key, states) in groups {
        let part_idx = partitions.len();
        for &s in &states {
            partition_of[s as usize] = part_idx;
        }
        partitions.push(states);
    }

    // --- Step 3: Worklist with every (block, class) pair ---
    let mut worklist: Vec<(usize, ClassId)> = Vec::with_capacity(partitions.len() * num_classes);
    for part_idx in 0..partitions.len() {
        for class_id in 0..num_classes as ClassId {
            worklist.push((part_idx, class_id));
        }
    }

    // --- Step 4: Refinement ---
    let mut affected_partitions: Vec<usize> = Vec::new();
    let mut partition_seen: Vec<bool> = Vec::new();

    while let Some((splitter_idx, class_id)) = worklist.pop() {
        if partitions[splitter_idx].is_empty() {
            continue;
        }

        affected_partitions.clear();
        partition_seen.clear();
        partition_seen.resize(partitions.len(), false);

        for &splitter_state in &partitions[splitter_idx] {
            for &pred in &inverse[splitter_state as usize][class_id as usize] {
                let pred_part = partition_of[pred as usize];
                if !partition_seen[pred_part] {
                    partition_seen[pred_part] = true;
                    affected_partitions.push(pred_part);
                }
            }
        }

        for &part_idx in &affected_partitions {
            if partitions[part_idx].len() <= 1 {
                continue;
            }

            let goes_to_splitter = |state: StateId, partition_of: &[usize]| {
                let target = dfa.transition(state, class_id);
                target != NO_TARGET && partition_of[target as usize] == splitter_idx
            };

            let split_count = partitions[part_idx]
                .iter()
                .filter(|&&s| goes_to_splitter(s, &partition_of))
                .count();
            let keep_count = partitions[part_idx].len() - split_count;
            if split_count == 0 || keep_count == 0 {
                continue;
            }

            // Keep the larger group in place; the smaller becomes a new block.
            let new_part_idx = partitions.len();
            let move_splitting = split_count <= keep_count;
            let (moved, kept): (Vec<StateId>, Vec<StateId>) = partitions[part_idx]
                .iter()
                .partition(|&&s| goes_to_splitter(s, &partition_of) == move_splitting);
            for &state in &moved {
                partition_of[state as usize] = new_part_idx;
            }
            partitions[part_idx] = kept;
            partitions.push(moved);

            // The new block is the smaller half, so each state moves
            // O(log n) times.
            for c in 0..num_classes as ClassId {
                worklist.push((new_part_idx, c));
            }
        }
    }

    // --- Step 5: Build minimized DFA ---
    let mut order: Vec<usize> = (0..partitions.len())
        .filter(|&i| !partitions[i].is_empty())
        .collect();
    order.sort_unstable_by_key(|&i| partitions[i].iter().min().copied());

    let mut partition_to_new_state: Vec<StateId> = vec![NO_TARGET; partitions.len()];
    for (new_id, &part_idx) in order.iter().enumerate() {
        partition_to_new_state[part_idx] = new_id as StateId;
    }

    let mut new_dfa = Dfa::new(num_classes);
    for &part_idx in &order {
        let rep = partitions[part_idx].iter().min().copied().unwrap_or_default();
        let source = &dfa.states[rep as usize];
        let mut state = DfaState {
            transitions: vec![NO_TARGET; num_classes],
            is_final: source.is_final,
            is_pushback: source.is_pushback,
            is_look_end: source.is_look_end,
            action: source.action.clone(),
        };
        for (class_id, &target) in source.transitions.iter().enumerate() {
            if target != NO_TARGET {
                state.transitions[class_id] = partition_to_new_state[partition_of[target as usize]];
            }
        }
        new_dfa.add_state(state);
    }

    new_dfa.lex_state = dfa
        .lex_state
        .iter()
        .map(|&s| partition_to_new_state[partition_of[s as usize]])
        .collect();

    debug!("minimized DFA: {} -> {} states", n, new_dfa.num_states());
    new_dfa
}

/// Pairs of lexical states whose start states coincide in `dfa`, both at
/// the beginning of a line and elsewhere.
pub fn equivalent_lex_states(dfa: &Dfa) -> Vec<(usize, usize)> {
    let starts: Vec<(StateId, StateId)> =
        dfa.lex_state.chunks(2).map(|pair| (pair[0], pair[pair.len() - 1])).collect();
    let mut out = Vec::new();
    for i in 0..starts.len() {
        for j in i + 1..starts.len() {
            if starts[i] == starts[j] {
                out.push((i, j));
            }
        }
    }
    out
}

// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting overlapping input patterns into disjoint symbols.

use crate::{
    incompat::IncompatibilityMatrix,
    intern::{PatternId, PatternTable},
    machine::{Machine, StateId},
};
use indexmap::IndexSet;
use std::collections::VecDeque;
use tracing::debug;

/// Dense index into a [`SymbolTable`]'s alphabet.
pub type SymbolId = usize;

/// A machine's transitions re-indexed by disjoint input symbols.
///
/// Within each compatibility group the symbols are pairwise disjoint and cover the inputs of
/// every transition in the group. A state only has entries for the symbols of its own group.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    patterns: PatternTable,
    input_len: usize,
    output_len: usize,
    alphabet: Vec<PatternId>,
    next_state: Vec<Vec<Option<StateId>>>,
    output: Vec<Vec<Option<PatternId>>>,
}

impl SymbolTable {
    /// Splits the inputs of `machine` group by group.
    ///
    /// The table starts from a copy of the machine's patterns, so the machine's pattern ids stay
    /// valid in [`Self::patterns`].
    pub fn build(machine: &Machine, matrix: &IncompatibilityMatrix) -> Self {
        let mut patterns = machine.patterns().clone();
        let groups = matrix.compatibility_groups();

        let mut alphabet = IndexSet::new();
        let group_symbols: Vec<Vec<SymbolId>> = groups
            .iter()
            .map(|group| {
                disjoint_inputs(&mut patterns, machine, group)
                    .into_iter()
                    .map(|input| alphabet.insert_full(input).0)
                    .collect()
            })
            .collect();

        let state_count = machine.state_count();
        let mut next_state = vec![vec![None; alphabet.len()]; state_count];
        let mut output = vec![vec![None; alphabet.len()]; state_count];

        for (group, symbols) in groups.iter().zip(&group_symbols) {
            for &state in group {
                for transition in machine.state(state).transitions() {
                    for &symbol in symbols {
                        let symbol_pattern = patterns.get(alphabet[symbol]);
                        if !symbol_pattern.is_subset(patterns.get(transition.input)) {
                            continue;
                        }
                        next_state[state][symbol] = Some(transition.next);
                        // Overlapping inputs of one state carry compatible outputs.
                        output[state][symbol] = Some(match output[state][symbol] {
                            Some(existing) => patterns.intersect(existing, transition.output),
                            None => transition.output,
                        });
                    }
                }
            }
        }

        debug!(
            groups = groups.len(),
            symbols = alphabet.len(),
            "split transitions into disjoint symbols"
        );
        Self {
            patterns,
            input_len: machine.input_len(),
            output_len: machine.output_len(),
            alphabet: alphabet.into_iter().collect(),
            next_state,
            output,
        }
    }

    #[inline]
    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    #[inline]
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.next_state.len()
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.alphabet.len()
    }

    /// The input pattern of `symbol`.
    #[inline]
    pub fn symbol(&self, symbol: SymbolId) -> PatternId {
        self.alphabet[symbol]
    }

    #[inline]
    pub fn next_state(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.next_state[state][symbol]
    }

    #[inline]
    pub fn output(&self, state: StateId, symbol: SymbolId) -> Option<PatternId> {
        self.output[state][symbol]
    }
}

/// Refines the inputs of `group` into pairwise disjoint patterns covering the same values.
///
/// Every input is queued in order. An input that overlaps a member of the working set is split
/// against it; the parts lying in the member replace the member, and the remaining fragments
/// are queued again. Each split fixes at least one more bit, so the loop terminates.
fn disjoint_inputs(
    patterns: &mut PatternTable,
    machine: &Machine,
    group: &[StateId],
) -> Vec<PatternId> {
    let inputs: IndexSet<PatternId> = group
        .iter()
        .flat_map(|&state| machine.state(state).transitions())
        .map(|t| t.input)
        .collect();

    // Distinct fully specified patterns are already disjoint.
    if inputs
        .iter()
        .all(|&input| patterns.get(input).is_fully_specified())
    {
        return inputs.into_iter().collect();
    }

    let mut queue: VecDeque<PatternId> = inputs.into_iter().collect();
    let mut disjoint: IndexSet<PatternId> = IndexSet::new();
    while let Some(current) = queue.pop_front() {
        if disjoint.contains(&current) {
            continue;
        }
        let overlapping = disjoint
            .iter()
            .copied()
            .find(|&member| !patterns.get(member).is_disjoint(patterns.get(current)));
        let member = match overlapping {
            Some(member) => member,
            None => {
                disjoint.insert(current);
                continue;
            }
        };

        let current_in_member = patterns.get(current).is_subset(patterns.get(member));
        let member_in_current = patterns.get(member).is_subset(patterns.get(current));
        if !member_in_current {
            disjoint.shift_remove(&member);
            let inters = patterns.intersect(member, current);
            disjoint.insert(inters);
            disjoint.extend(patterns.diff(member, current));
        }
        if !current_in_member {
            queue.extend(patterns.diff(current, member));
        }
    }
    disjoint.into_iter().collect()
}

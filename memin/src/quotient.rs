// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The minimized machine.

use crate::{
    cnf::{Assignment, ClassId, DecodeTable},
    errors::MinimizeError,
    intern::{PatternId, PatternTable},
    machine::{Machine, State, StateId, Transition},
    partition::{SymbolId, SymbolTable},
    pattern::PartialPattern,
};
use bitvec::prelude::*;
use tracing::debug;

/// Dense transition tables of a minimized machine, indexed by class and symbol.
///
/// Owns its patterns; nothing is shared with the machine it was built from.
#[derive(Clone, Debug)]
pub struct QuotientMachine {
    patterns: PatternTable,
    input_len: usize,
    output_len: usize,
    alphabet: Vec<PatternId>,
    members: Vec<Vec<StateId>>,
    next_class: Vec<Vec<Option<ClassId>>>,
    output: Vec<Vec<Option<PatternId>>>,
    reset: Option<ClassId>,
}

impl QuotientMachine {
    /// Merges the states of `table` into the classes chosen by `assignment`.
    ///
    /// The reset class is the first class holding `reset`. Fails if some class has no single
    /// successor class for a symbol, which a satisfying assignment of a closed encoding rules
    /// out.
    pub fn build(
        table: &SymbolTable,
        classes: usize,
        decode: &DecodeTable,
        assignment: &Assignment,
        reset: Option<StateId>,
    ) -> Result<Self, MinimizeError> {
        let state_count = table.state_count();
        let mut members = vec![Vec::new(); classes];
        let mut in_class = bitvec![0; state_count * classes];
        for (state, class) in decode.memberships(assignment) {
            members[class].push(state);
            in_class.set(state * classes + class, true);
        }
        for members in &mut members {
            members.sort_unstable();
        }
        let holds = |state: StateId, class: ClassId| in_class[state * classes + class];

        let mut patterns = PatternTable::new();
        let alphabet: Vec<PatternId> = (0..table.symbol_count())
            .map(|symbol| patterns.intern(table.patterns().get(table.symbol(symbol)).clone()))
            .collect();

        let mut next_class = vec![vec![None; alphabet.len()]; classes];
        let mut output = vec![vec![None; alphabet.len()]; classes];
        for (class, states) in members.iter().enumerate() {
            for symbol in 0..alphabet.len() {
                let moves: Vec<(StateId, PatternId)> = states
                    .iter()
                    .filter_map(|&state| {
                        let next = table.next_state(state, symbol)?;
                        Some((next, table.output(state, symbol)?))
                    })
                    .collect();
                let (first, _) = match moves.first() {
                    Some(&first) => first,
                    None => continue,
                };

                let target = (0..classes)
                    .filter(|&target| holds(first, target))
                    .find(|&target| moves.iter().all(|&(next, _)| holds(next, target)))
                    .ok_or(MinimizeError::NoSuccessorClass { class, symbol })?;

                let merged = merge_outputs(table, moves.iter().map(|&(_, output)| output));
                next_class[class][symbol] = Some(target);
                output[class][symbol] = Some(patterns.intern(merged));
            }
        }

        let reset = reset.and_then(|reset| (0..classes).find(|&class| holds(reset, class)));
        debug!(classes, ?reset, "built quotient machine");
        Ok(Self {
            patterns,
            input_len: table.input_len(),
            output_len: table.output_len(),
            alphabet,
            members,
            next_class,
            output,
            reset,
        })
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.alphabet.len()
    }

    /// States merged into `class`, in ascending order.
    ///
    /// Ids refer to the machine passed to [`crate::minimize`], even if unreachable states were
    /// removed before encoding.
    #[inline]
    pub fn members(&self, class: ClassId) -> &[StateId] {
        &self.members[class]
    }

    /// Replaces every member id `s` by `original[s]`. `original` must be increasing.
    pub(crate) fn renumber_members(&mut self, original: &[StateId]) {
        for members in &mut self.members {
            for state in members.iter_mut() {
                *state = original[*state];
            }
        }
    }

    #[inline]
    pub fn reset(&self) -> Option<ClassId> {
        self.reset
    }

    pub fn symbol(&self, symbol: SymbolId) -> &PartialPattern {
        self.patterns.get(self.alphabet[symbol])
    }

    #[inline]
    pub fn next_class(&self, class: ClassId, symbol: SymbolId) -> Option<ClassId> {
        self.next_class[class][symbol]
    }

    pub fn output(&self, class: ClassId, symbol: SymbolId) -> Option<&PartialPattern> {
        self.output[class][symbol].map(|id| self.patterns.get(id))
    }

    /// Converts the tables into a machine with states `S0`, `S1`, ... and one transition per
    /// defined (class, symbol) pair.
    pub fn to_machine(&self) -> Machine {
        let states = (0..self.class_count())
            .map(|class| {
                let transitions = (0..self.symbol_count())
                    .filter_map(|symbol| {
                        Some(Transition {
                            input: self.alphabet[symbol],
                            next: self.next_class[class][symbol]?,
                            output: self.output[class][symbol]?,
                        })
                    })
                    .collect();
                State::new(format!("S{}", class), transitions)
            })
            .collect();
        Machine::from_parts(
            self.patterns.clone(),
            self.input_len,
            self.output_len,
            states,
            self.reset,
        )
    }
}

// Outputs merged into one class are pairwise compatible.
fn merge_outputs(table: &SymbolTable, outputs: impl Iterator<Item = PatternId>) -> PartialPattern {
    let patterns = table.patterns();
    let mut outputs = outputs.map(|id| patterns.get(id));
    let first = outputs
        .next()
        .cloned()
        .unwrap_or_else(|| PartialPattern::dont_care(table.output_len()));
    outputs.fold(first, |merged, output| {
        if &merged == output {
            merged
        } else {
            merged.intersect(output)
        }
    })
}

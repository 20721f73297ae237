// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    intern::PatternTable,
    machine::{Machine, State, Transition},
    pattern::PartialPattern,
};
use proptest::prelude::*;

impl Arbitrary for PartialPattern {
    /// The pattern length, or a random length up to 8.
    type Parameters = Option<usize>;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(len: Self::Parameters) -> Self::Strategy {
        match len {
            Some(len) => pattern(len).boxed(),
            None => (0..=8_usize).prop_flat_map(pattern).boxed(),
        }
    }
}

/// Patterns of length `len`.
pub fn pattern(len: usize) -> impl Strategy<Value = PartialPattern> {
    prop::collection::vec(any::<Option<bool>>(), len).prop_map(PartialPattern::from_bits)
}

pub fn pattern_pair(len: usize) -> impl Strategy<Value = (PartialPattern, PartialPattern)> {
    (pattern(len), pattern(len))
}

pub fn pattern_triple(
    len: usize,
) -> impl Strategy<Value = (PartialPattern, PartialPattern, PartialPattern)> {
    (pattern(len), pattern(len), pattern(len))
}

/// Pairs of patterns that share at least one value.
pub fn overlapping_pair(len: usize) -> impl Strategy<Value = (PartialPattern, PartialPattern)> {
    let bits = prop::collection::vec(any::<(Option<bool>, Option<bool>)>(), len);
    bits.prop_map(|bits| {
        let (a, b): (Vec<_>, Vec<_>) = bits
            .into_iter()
            .map(|(a, b)| match (a, b) {
                // Resolve conflicts in favor of `a`.
                (Some(a), Some(_)) => (Some(a), Some(a)),
                other => other,
            })
            .unzip();
        (PartialPattern::from_bits(a), PartialPattern::from_bits(b))
    })
}

/// Deterministic machines with between 1 and `max_states` states.
///
/// Each state gets up to four transitions. A transition whose input overlaps earlier transitions
/// of the same state takes their successor, and its output keeps only the bits that agree with
/// theirs; it is dropped if those successors differ. Most machines reset to state 0, the rest
/// have no reset state.
pub fn machine_strategy(
    max_states: usize,
    input_len: usize,
    output_len: usize,
) -> impl Strategy<Value = Machine> {
    (1..=max_states)
        .prop_flat_map(move |state_count| {
            let row = (pattern(input_len), 0..state_count, pattern(output_len));
            (
                prop::collection::vec(prop::collection::vec(row, 0..=4), state_count),
                prop::bool::weighted(0.75),
            )
        })
        .prop_map(move |(rows, has_reset)| {
            let mut patterns = PatternTable::new();
            let states = rows
                .into_iter()
                .enumerate()
                .map(|(ix, row)| {
                    let mut transitions: Vec<Transition> = Vec::new();
                    for (input, mut next, mut output) in row {
                        let overlapping: Vec<&Transition> = transitions
                            .iter()
                            .filter(|t| !patterns.get(t.input).is_disjoint(&input))
                            .collect();
                        if let Some(first) = overlapping.first() {
                            if overlapping.iter().any(|t| t.next != first.next) {
                                continue;
                            }
                            next = first.next;
                            for t in &overlapping {
                                output = relax(&output, patterns.get(t.output));
                            }
                        }
                        transitions.push(Transition {
                            input: patterns.intern(input),
                            next,
                            output: patterns.intern(output),
                        });
                    }
                    State::new(format!("s{}", ix), transitions)
                })
                .collect();
            let reset = if has_reset { Some(0) } else { None };
            Machine::from_parts(patterns, input_len, output_len, states, reset)
        })
}

/// Turns the bits of `output` that conflict with `other` into don't-cares.
fn relax(output: &PartialPattern, other: &PartialPattern) -> PartialPattern {
    PartialPattern::from_bits(output.bits().zip(other.bits()).map(|bits| match bits {
        (Some(a), Some(b)) if a != b => None,
        (a, _) => a,
    }))
}

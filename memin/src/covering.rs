// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavioral inclusion between machines.
//!
//! A machine `m1` covers `m2` if, from corresponding states, every input sequence `m2` accepts is
//! accepted by `m1` and every output of `m1` refines the output of `m2`.

use crate::{
    errors::CoverError,
    machine::{Machine, StateId},
    pattern::PartialPattern,
};
use std::collections::{HashSet, VecDeque};

/// Searches breadth-first for an input sequence on which `m1`, started in `s1`, fails to cover
/// `m2` started in `s2`: either `m2` has a transition that `m1` lacks, or `m1` produces an output
/// that is not a refinement of `m2`'s.
///
/// Returns the shortest such sequence found, or `None` if `s1` covers `s2`.
pub fn find_distinguishing_input(
    m1: &Machine,
    m2: &Machine,
    s1: StateId,
    s2: StateId,
) -> Option<Vec<PartialPattern>> {
    let mut visited = HashSet::from([(s1, s2)]);
    let mut worklist = VecDeque::from([(s1, s2, Vec::new())]);

    while let Some((s1, s2, prefix)) = worklist.pop_front() {
        for t2 in m2.state(s2).transitions() {
            let output2 = m2.pattern(t2.output);
            // Parts of t2's input not yet matched by a transition of s1.
            let mut uncovered = vec![m2.pattern(t2.input).clone()];

            for t1 in m1.state(s1).transitions() {
                let input1 = m1.pattern(t1.input);
                let mut remaining = Vec::with_capacity(uncovered.len());
                for piece in uncovered {
                    if piece.is_disjoint(input1) {
                        remaining.push(piece);
                        continue;
                    }
                    let mut sequence = prefix.clone();
                    sequence.push(input1.intersect(&piece));
                    if !m1.pattern(t1.output).is_subset(output2) {
                        return Some(sequence);
                    }
                    if visited.insert((t1.next, t2.next)) {
                        worklist.push_back((t1.next, t2.next, sequence));
                    }
                    if !piece.is_subset(input1) {
                        remaining.extend(piece.diff(input1));
                    }
                }
                uncovered = remaining;
            }

            if let Some(piece) = uncovered.into_iter().next() {
                let mut sequence = prefix;
                sequence.push(piece);
                return Some(sequence);
            }
        }
    }
    None
}

/// Checks that `m1` covers `m2`.
///
/// With reset states on both sides the machines are compared from their resets. With no reset
/// state on either side every state of `m2` must be covered by some state of `m1`.
pub fn check_covers(m1: &Machine, m2: &Machine) -> Result<(), CoverError> {
    if m1.input_len() != m2.input_len() || m1.output_len() != m2.output_len() {
        return Err(CoverError::WidthMismatch {
            first: (m1.input_len(), m1.output_len()),
            second: (m2.input_len(), m2.output_len()),
        });
    }

    match (m1.reset(), m2.reset()) {
        (Some(r1), Some(r2)) => match find_distinguishing_input(m1, m2, r1, r2) {
            Some(sequence) => Err(CoverError::Counterexample(sequence)),
            None => Ok(()),
        },
        (None, None) => {
            for s2 in 0..m2.state_count() {
                let covered = (0..m1.state_count())
                    .any(|s1| find_distinguishing_input(m1, m2, s1, s2).is_none());
                if !covered {
                    return Err(CoverError::Uncovered {
                        state: m2.state(s2).name().to_owned(),
                    });
                }
            }
            Ok(())
        }
        _ => Err(CoverError::ResetMismatch),
    }
}

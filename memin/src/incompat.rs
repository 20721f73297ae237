// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State incompatibility.
//!
//! Two states are incompatible if some input applicable in both produces conflicting outputs,
//! or if some input applicable in both leads to a pair of incompatible successors.

use crate::{
    intern::PatternTable,
    machine::{Machine, PredecessorMap, StateId},
};
use bitvec::prelude::*;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Symmetric, irreflexive relation over the states of a machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompatibilityMatrix {
    state_count: usize,
    bits: BitVec,
}

impl IncompatibilityMatrix {
    /// Returns a matrix in which every pair of states is compatible.
    pub fn new(state_count: usize) -> Self {
        Self {
            state_count,
            bits: bitvec![0; state_count * state_count],
        }
    }

    /// Computes the incompatibility relation of `machine`.
    ///
    /// Every directly incompatible pair is propagated backwards through the predecessor map,
    /// so the result is closed: if `(s1, s2)` is marked and `p1`, `p2` reach `s1`, `s2` on
    /// overlapping inputs, `(p1, p2)` is marked too.
    pub fn analyze(machine: &Machine) -> Self {
        let state_count = machine.state_count();
        let patterns = machine.patterns();
        let preds = machine.predecessors();
        let mut matrix = Self::new(state_count);

        let mut direct = 0;
        for s1 in 0..state_count {
            for s2 in (s1 + 1)..state_count {
                if matrix.is_incompatible(s1, s2) || !conflicting_outputs(machine, s1, s2) {
                    continue;
                }
                direct += 1;
                matrix.mark(s1, s2);
                matrix.propagate(patterns, preds, s1, s2);
            }
        }

        debug!(
            states = state_count,
            direct,
            total = matrix.incompatible_pair_count(),
            "computed incompatibility matrix"
        );
        matrix
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    #[inline]
    pub fn is_incompatible(&self, s1: StateId, s2: StateId) -> bool {
        self.bits[self.index(s1, s2)]
    }

    /// Marks a pair as incompatible. Returns true if it was not marked before.
    pub fn mark(&mut self, s1: StateId, s2: StateId) -> bool {
        debug_assert_ne!(s1, s2, "a state is never incompatible with itself");
        let ix = self.index(s1, s2);
        if self.bits[ix] {
            return false;
        }
        self.bits.set(ix, true);
        let ix = self.index(s2, s1);
        self.bits.set(ix, true);
        true
    }

    /// Number of states incompatible with `state`.
    pub fn degree(&self, state: StateId) -> usize {
        let start = state * self.state_count;
        self.bits[start..start + self.state_count].count_ones()
    }

    /// Number of unordered incompatible pairs.
    pub fn incompatible_pair_count(&self) -> usize {
        self.bits.count_ones() / 2
    }

    /// States incompatible with `state`, in ascending order.
    pub fn incompatible_with(&self, state: StateId) -> impl Iterator<Item = StateId> + '_ {
        let start = state * self.state_count;
        self.bits[start..start + self.state_count].iter_ones()
    }

    /// Partitions the states into groups connected under "not incompatible".
    ///
    /// States in different groups are incompatible with each other. Groups are ordered by their
    /// smallest state and each group is sorted.
    pub fn compatibility_groups(&self) -> Vec<Vec<StateId>> {
        let mut assigned = bitvec![0; self.state_count];
        let mut groups = Vec::new();

        for seed in 0..self.state_count {
            if assigned[seed] {
                continue;
            }
            assigned.set(seed, true);
            let mut group = vec![seed];
            let mut worklist = VecDeque::from([seed]);
            while let Some(state) = worklist.pop_front() {
                for other in (seed + 1)..self.state_count {
                    if assigned[other] || self.is_incompatible(state, other) {
                        continue;
                    }
                    assigned.set(other, true);
                    group.push(other);
                    worklist.push_back(other);
                }
            }
            group.sort_unstable();
            groups.push(group);
        }
        groups
    }

    /// Greedily selects a set of pairwise incompatible states.
    ///
    /// States are considered by descending degree (ties in state order); a state joins the set
    /// if it is incompatible with every state already selected. Each selected state needs a class
    /// of its own, so the size of the set is a lower bound on the number of classes.
    pub fn pairwise_incompatible_states(&self) -> Vec<StateId> {
        let mut order: Vec<StateId> = (0..self.state_count).collect();
        order.sort_by_key(|&s| std::cmp::Reverse(self.degree(s)));

        let mut selected: Vec<StateId> = Vec::new();
        for state in order {
            if selected.iter().all(|&s| self.is_incompatible(state, s)) {
                selected.push(state);
            }
        }
        selected
    }

    fn propagate(
        &mut self,
        patterns: &PatternTable,
        preds: &PredecessorMap,
        s1: StateId,
        s2: StateId,
    ) {
        let mut worklist = vec![(s1, s2)];
        while let Some((s1, s2)) = worklist.pop() {
            for (input1, preds1) in preds.of(s1) {
                for (input2, preds2) in preds.of(s2) {
                    if patterns.get(input1).is_disjoint(patterns.get(input2)) {
                        continue;
                    }
                    for &p1 in preds1 {
                        for &p2 in preds2 {
                            if p1 != p2 && self.mark(p1, p2) {
                                trace!(p1, p2, via1 = s1, via2 = s2, "propagated incompatibility");
                                worklist.push((p1, p2));
                            }
                        }
                    }
                }
            }
        }
    }

    #[inline]
    fn index(&self, s1: StateId, s2: StateId) -> usize {
        debug_assert!(
            s1 < self.state_count && s2 < self.state_count,
            "states ({}, {}) out of range (state count {})",
            s1,
            s2,
            self.state_count
        );
        s1 * self.state_count + s2
    }
}

// Some pair of overlapping inputs produces conflicting outputs.
fn conflicting_outputs(machine: &Machine, s1: StateId, s2: StateId) -> bool {
    let patterns = machine.patterns();
    machine.state(s1).transitions().iter().any(|t1| {
        machine.state(s2).transitions().iter().any(|t2| {
            !patterns.get(t1.input).is_disjoint(patterns.get(t2.input))
                && !patterns.get(t1.output).is_compatible(patterns.get(t2.output))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        machine::{kiss, ResetPolicy},
        proptest_helpers::machine_strategy,
    };
    use proptest::prelude::*;

    fn parse(text: &str) -> Machine {
        kiss::parse_str(text, ResetPolicy::FirstState).unwrap()
    }

    #[test]
    fn test_dont_care_output_is_not_a_conflict() {
        let machine = parse(
            "\
0 a a -
0 b b 1
0 c c 0
",
        );
        let matrix = IncompatibilityMatrix::analyze(&machine);
        let [a, b, c] = ["a", "b", "c"].map(|n| machine.state_by_name(n).unwrap());

        assert!(!matrix.is_incompatible(a, b));
        assert!(!matrix.is_incompatible(a, c));
        assert!(matrix.is_incompatible(b, c));
        assert_eq!(matrix.degree(a), 0);
        assert_eq!(matrix.degree(b), 1);
        assert_eq!(matrix.compatibility_groups(), vec![vec![a, b, c]]);
    }

    #[test]
    fn test_propagation_through_overlapping_inputs() {
        // x and y agree on every output, but `0-` and `-1` overlap on `01` and lead to the
        // incompatible pair (b, c).
        let machine = parse(
            "\
0- x b 0
1- x x 0
-1 y c 0
-0 y y 0
-- b b 1
-- c c 0
",
        );
        let matrix = IncompatibilityMatrix::analyze(&machine);
        let [x, y, b, c] = ["x", "y", "b", "c"].map(|n| machine.state_by_name(n).unwrap());

        assert!(matrix.is_incompatible(b, c));
        assert!(matrix.is_incompatible(x, y));
        assert!(matrix.is_incompatible(y, x));
        // x reaches b where c stays in c.
        assert!(matrix.is_incompatible(x, c));
        assert_eq!(matrix.incompatible_pair_count(), matrix.bits.count_ones() / 2);
    }

    #[test]
    fn test_disjoint_inputs_do_not_propagate() {
        let machine = parse(
            "\
0 x b 0
1 y c 0
- b b 1
- c c 0
",
        );
        let matrix = IncompatibilityMatrix::analyze(&machine);
        let [x, y, b, c] = ["x", "y", "b", "c"].map(|n| machine.state_by_name(n).unwrap());
        assert!(matrix.is_incompatible(b, c));
        assert!(matrix.is_incompatible(x, c));
        assert!(matrix.is_incompatible(y, b));
        assert!(!matrix.is_incompatible(x, y));
    }

    #[test]
    fn test_groups_and_lower_bound() {
        let mut matrix = IncompatibilityMatrix::new(5);
        // 0 and 1 are compatible only with each other; 2, 3, 4 form an incompatible triangle
        // and are incompatible with everything else.
        for s in 2..5 {
            for t in 0..5 {
                if s != t {
                    matrix.mark(s, t);
                }
            }
        }
        assert_eq!(
            matrix.compatibility_groups(),
            vec![vec![0, 1], vec![2], vec![3], vec![4]]
        );
        assert_eq!(matrix.degree(2), 4);
        assert_eq!(matrix.degree(0), 3);

        let selected = matrix.pairwise_incompatible_states();
        assert_eq!(selected, vec![2, 3, 4, 0]);
        assert!(!matrix.mark(0, 2), "already marked");
    }

    proptest! {
        #[test]
        fn proptest_symmetric_and_irreflexive(machine in machine_strategy(6, 2, 2)) {
            let matrix = IncompatibilityMatrix::analyze(&machine);
            let n = machine.state_count();
            for s1 in 0..n {
                prop_assert!(!matrix.is_incompatible(s1, s1));
                for s2 in 0..n {
                    prop_assert_eq!(matrix.is_incompatible(s1, s2), matrix.is_incompatible(s2, s1));
                }
            }
        }

        #[test]
        fn proptest_closed_under_predecessors(machine in machine_strategy(6, 2, 2)) {
            let matrix = IncompatibilityMatrix::analyze(&machine);
            let patterns = machine.patterns();
            for (p1, state1) in machine.states().iter().enumerate() {
                for (p2, state2) in machine.states().iter().enumerate() {
                    for t1 in state1.transitions() {
                        for t2 in state2.transitions() {
                            if patterns.get(t1.input).is_disjoint(patterns.get(t2.input)) {
                                continue;
                            }
                            if matrix.is_incompatible(t1.next, t2.next) {
                                prop_assert!(
                                    matrix.is_incompatible(p1, p2),
                                    "({}, {}) reach incompatible ({}, {})",
                                    p1, p2, t1.next, t2.next
                                );
                            }
                        }
                    }
                }
            }
        }

        #[test]
        fn proptest_lower_bound_is_a_clique(machine in machine_strategy(8, 2, 1)) {
            let matrix = IncompatibilityMatrix::analyze(&machine);
            let selected = matrix.pairwise_incompatible_states();
            prop_assert!(!selected.is_empty());
            for (i, &s1) in selected.iter().enumerate() {
                for &s2 in &selected[i + 1..] {
                    prop_assert!(matrix.is_incompatible(s1, s2));
                }
            }
            // Different groups are mutually incompatible.
            let groups = matrix.compatibility_groups();
            for (i, g1) in groups.iter().enumerate() {
                for g2 in &groups[i + 1..] {
                    for &s1 in g1 {
                        for &s2 in g2 {
                            prop_assert!(matrix.is_incompatible(s1, s2));
                        }
                    }
                }
            }
        }
    }
}

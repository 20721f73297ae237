// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::caches::MachineCache;
use crate::{
    intern::{PatternId, PatternTable},
    pattern::PartialPattern,
};
use bitvec::prelude::*;
use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::debug;

/// Index of a state within its machine.
pub type StateId = usize;

/// One row of a transition table. Pattern handles refer to the owning machine's table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub input: PatternId,
    pub next: StateId,
    pub output: PatternId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub(super) name: String,
    pub(super) transitions: Vec<Transition>,
}

impl State {
    pub fn new(name: impl Into<String>, transitions: Vec<Transition>) -> Self {
        Self {
            name: name.into(),
            transitions,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

/// An incompletely specified Mealy machine.
///
/// Inputs and outputs are [`PartialPattern`]s interned in the machine's own [`PatternTable`].
/// The inputs of a single state may overlap, but overlapping inputs always agree on the
/// successor and carry compatible outputs.
#[derive(Clone, Debug)]
pub struct Machine {
    patterns: PatternTable,
    input_len: usize,
    output_len: usize,
    states: Vec<State>,
    reset: Option<StateId>,
    cache: MachineCache,
}

impl Machine {
    /// Assembles a machine from already validated parts. Use [`super::MachineBuilder`] for
    /// untrusted input.
    pub fn from_parts(
        patterns: PatternTable,
        input_len: usize,
        output_len: usize,
        states: Vec<State>,
        reset: Option<StateId>,
    ) -> Self {
        Self {
            patterns,
            input_len,
            output_len,
            states,
            reset,
            cache: MachineCache::default(),
        }
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
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    #[inline]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    #[inline]
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name == name)
    }

    #[inline]
    pub fn reset(&self) -> Option<StateId> {
        self.reset
    }

    #[inline]
    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    #[inline]
    pub fn pattern(&self, id: PatternId) -> &PartialPattern {
        self.patterns.get(id)
    }

    /// Returns the predecessor map, computing it on first use.
    #[inline]
    pub fn predecessors(&self) -> &PredecessorMap {
        self.cache.get_or_init_predecessors(&self.states)
    }

    /// Returns the set of states reachable from `from`, including `from` itself.
    pub fn reachable_from(&self, from: StateId) -> BitVec {
        let mut reachable = bitvec![0; self.states.len()];
        reachable.set(from, true);

        let mut worklist = VecDeque::from([from]);
        while let Some(state) = worklist.pop_front() {
            for transition in &self.states[state].transitions {
                if !reachable[transition.next] {
                    reachable.set(transition.next, true);
                    worklist.push_back(transition.next);
                }
            }
        }
        reachable
    }

    /// Removes every state that cannot be reached from the reset state. Surviving states keep
    /// their relative order.
    ///
    /// Returns the original id of every surviving state, indexed by its new id. Does nothing if
    /// the machine has no reset state.
    pub fn retain_reachable(&mut self) -> Vec<StateId> {
        let reset = match self.reset {
            Some(reset) => reset,
            None => return (0..self.states.len()).collect(),
        };
        let reachable = self.reachable_from(reset);
        let survivors: Vec<StateId> = reachable.iter_ones().collect();
        let removed = self.states.len() - survivors.len();
        if removed == 0 {
            return survivors;
        }

        let mut remap = vec![None; self.states.len()];
        for (new_id, &old_id) in survivors.iter().enumerate() {
            remap[old_id] = Some(new_id);
        }

        let states = std::mem::take(&mut self.states);
        self.states = states
            .into_iter()
            .zip(&remap)
            .filter_map(|(mut state, new_id)| {
                new_id.map(|_| {
                    for transition in &mut state.transitions {
                        transition.next = remap[transition.next]
                            .expect("successors of reachable states are reachable");
                    }
                    state
                })
            })
            .collect();
        self.reset = remap[reset];
        self.cache.invalidate();

        debug!(removed, remaining = self.states.len(), "removed unreachable states");
        survivors
    }

    /// Returns the transition that `state` takes on the concrete input `value`, if any.
    pub fn step(&self, state: StateId, value: &[bool]) -> Option<&Transition> {
        self.states[state]
            .transitions
            .iter()
            .find(|t| self.pattern(t.input).contains_value(value))
    }

    /// Runs the machine from `from` over a sequence of concrete inputs and collects the outputs.
    ///
    /// Returns `None` as soon as an input has no transition.
    pub fn run<'a>(
        &'a self,
        from: StateId,
        inputs: impl IntoIterator<Item = &'a [bool]>,
    ) -> Option<Vec<&'a PartialPattern>> {
        let mut state = from;
        let mut outputs = Vec::new();
        for value in inputs {
            let transition = self.step(state, value)?;
            outputs.push(self.pattern(transition.output));
            state = transition.next;
        }
        Some(outputs)
    }
}

/// For each state, its predecessors grouped by the input pattern of the incoming transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PredecessorMap {
    by_state: Vec<IndexMap<PatternId, Vec<StateId>>>,
}

impl PredecessorMap {
    pub fn new(states: &[State]) -> Self {
        let mut by_state = vec![IndexMap::<PatternId, Vec<StateId>>::new(); states.len()];
        for (from, state) in states.iter().enumerate() {
            for transition in &state.transitions {
                let preds = by_state[transition.next]
                    .entry(transition.input)
                    .or_default();
                if preds.last() != Some(&from) {
                    preds.push(from);
                }
            }
        }
        Self { by_state }
    }

    /// Incoming input patterns of `state`, each with the states that take it to `state`.
    pub fn of(&self, state: StateId) -> impl Iterator<Item = (PatternId, &[StateId])> + '_ {
        self.by_state[state]
            .iter()
            .map(|(&input, preds)| (input, preds.as_slice()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::machine::kiss;
    use crate::machine::ResetPolicy;

    const CHAIN: &str = "\
.i 1
.o 1
.r a
0 a b 1
1 a a 0
- b c 0
- c b 1
0 d a 1
1 d d -
";

    #[test]
    fn test_predecessors() {
        let machine = kiss::parse_str(CHAIN, ResetPolicy::FirstState).unwrap();
        let a = machine.state_by_name("a").unwrap();
        let b = machine.state_by_name("b").unwrap();
        let preds = machine.predecessors();

        let into_b: Vec<_> = preds.of(b).collect();
        assert_eq!(into_b.len(), 2, "b is entered on `0` from a and on `-` from c");
        assert!(into_b
            .iter()
            .any(|(input, states)| machine.pattern(*input).to_string() == "0"
                && states.to_vec() == vec![a]));

        let into_a: Vec<_> = preds.of(a).collect();
        // `1 a a` and `0 d a` use different inputs.
        assert_eq!(into_a.len(), 2);
    }

    #[test]
    fn test_retain_reachable() {
        let mut machine = kiss::parse_str(CHAIN, ResetPolicy::FirstState).unwrap();
        assert_eq!(machine.state_count(), 4);
        let _ = machine.predecessors();

        assert_eq!(machine.retain_reachable(), vec![0, 1, 2]);
        assert_eq!(machine.state_count(), 3);
        assert_eq!(machine.state_by_name("d"), None);
        assert_eq!(machine.reset(), machine.state_by_name("a"));

        let c = machine.state_by_name("c").unwrap();
        let b = machine.state_by_name("b").unwrap();
        assert_eq!(machine.state(c).transitions()[0].next, b);
        // The cached predecessor map was rebuilt for the smaller machine.
        assert_eq!(machine.predecessors().len(), 3);
    }

    #[test]
    fn test_run() {
        let machine = kiss::parse_str(CHAIN, ResetPolicy::FirstState).unwrap();
        let a = machine.reset().unwrap();
        let inputs: [&[bool]; 4] = [&[true], &[false], &[true], &[false]];
        let outputs: Vec<_> = machine
            .run(a, inputs)
            .unwrap()
            .into_iter()
            .map(|o| o.to_string())
            .collect();
        assert_eq!(outputs, ["0", "1", "0", "1"]);
    }
}

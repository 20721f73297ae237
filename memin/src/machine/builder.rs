// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Machine, State, StateId, Transition};
use crate::{
    errors::{MachineError, PatternKind},
    intern::{PatternId, PatternTable},
    pattern::PartialPattern,
};
use indexmap::IndexSet;
use itertools::Itertools;

/// Name of a from-state that applies a transition to every state, and of the to-state that
/// stands for an unspecified successor.
pub const WILDCARD_STATE: &str = "*";

/// How the reset state is chosen when the table does not name one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResetPolicy {
    /// The first state named in the table is the reset state.
    FirstState,
    /// There is no designated reset state; any state may serve as reset.
    Any,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self::FirstState
    }
}

/// Assembles a [`Machine`] from textual transitions.
///
/// # Examples
///
/// ```
/// use memin::machine::{MachineBuilder, ResetPolicy};
///
/// let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
/// builder.add_transition("0", "a", "b", "1").unwrap();
/// builder.add_transition("1", "*", "a", "0").unwrap();
/// let machine = builder.build().unwrap();
///
/// assert_eq!(machine.state_count(), 2);
/// assert_eq!(machine.reset(), machine.state_by_name("a"));
/// // The wildcard row was added to both states.
/// assert_eq!(machine.transition_count(), 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MachineBuilder {
    policy: ResetPolicy,
    patterns: PatternTable,
    input_len: Option<usize>,
    output_len: Option<usize>,
    names: IndexSet<String>,
    transitions: Vec<Vec<Transition>>,
    wildcards: Vec<(PatternId, StateId, PatternId)>,
    first_state: Option<StateId>,
    declared_reset: Option<String>,
}

impl MachineBuilder {
    pub fn new(policy: ResetPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Declares the input width. Fails if a different width was declared before or is implied
    /// by a transition already added.
    pub fn input_len(&mut self, len: usize) -> Result<&mut Self, MachineError> {
        declare_width(&mut self.input_len, PatternKind::Input, len)?;
        Ok(self)
    }

    /// Declares the output width, with the same rules as [`Self::input_len`].
    pub fn output_len(&mut self, len: usize) -> Result<&mut Self, MachineError> {
        declare_width(&mut self.output_len, PatternKind::Output, len)?;
        Ok(self)
    }

    /// Declares the reset state. It must occur in some transition by the time [`Self::build`]
    /// is called.
    pub fn reset_state(&mut self, name: impl Into<String>) -> &mut Self {
        self.declared_reset = Some(name.into());
        self
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.names.len()
    }

    pub fn add_transition(
        &mut self,
        input: &str,
        from: &str,
        to: &str,
        output: &str,
    ) -> Result<&mut Self, MachineError> {
        let input = self.pattern(PatternKind::Input, input)?;
        let output = self.pattern(PatternKind::Output, output)?;

        let from = (from != WILDCARD_STATE).then(|| self.state(from));
        let next = self.state(to);
        if self.first_state.is_none() {
            self.first_state = from.or_else(|| (to != WILDCARD_STATE).then(|| next));
        }

        let transition = Transition {
            input,
            next,
            output,
        };
        match from {
            Some(from) => self.transitions[from].push(transition),
            None => self.wildcards.push((input, next, output)),
        }
        Ok(self)
    }

    pub fn build(mut self) -> Result<Machine, MachineError> {
        if self.names.is_empty() {
            return Err(MachineError::NoStates);
        }

        let dont_care_successor = self.names.get_index_of(WILDCARD_STATE);
        for (state, transitions) in self.transitions.iter_mut().enumerate() {
            if Some(state) == dont_care_successor {
                continue;
            }
            transitions.extend(self.wildcards.iter().map(|&(input, next, output)| Transition {
                input,
                next,
                output,
            }));
        }

        let reset = match self.declared_reset.take() {
            Some(name) => Some(
                self.names
                    .get_index_of(&name)
                    .ok_or(MachineError::UnknownResetState(name))?,
            ),
            None => match self.policy {
                ResetPolicy::FirstState => self.first_state,
                ResetPolicy::Any => None,
            },
        };

        let states: Vec<State> = self
            .names
            .into_iter()
            .zip(self.transitions)
            .map(|(name, transitions)| State { name, transitions })
            .collect();
        for state in &states {
            check_deterministic(&self.patterns, state)?;
        }

        Ok(Machine::from_parts(
            self.patterns,
            self.input_len.unwrap_or(0),
            self.output_len.unwrap_or(0),
            states,
            reset,
        ))
    }

    fn state(&mut self, name: &str) -> StateId {
        if let Some(id) = self.names.get_index_of(name) {
            return id;
        }
        let (id, _) = self.names.insert_full(name.to_owned());
        self.transitions.push(Vec::new());
        id
    }

    fn pattern(&mut self, kind: PatternKind, text: &str) -> Result<PatternId, MachineError> {
        let pattern: PartialPattern = text
            .parse()
            .map_err(|source| MachineError::Pattern { kind, source })?;
        let expected = match kind {
            PatternKind::Input => self.input_len.get_or_insert(pattern.len()),
            PatternKind::Output => self.output_len.get_or_insert(pattern.len()),
        };
        if *expected != pattern.len() {
            return Err(MachineError::LengthMismatch {
                kind,
                pattern: text.to_owned(),
                expected: *expected,
                actual: pattern.len(),
            });
        }
        Ok(self.patterns.intern(pattern))
    }
}

fn declare_width(
    width: &mut Option<usize>,
    kind: PatternKind,
    declared: usize,
) -> Result<(), MachineError> {
    match *width {
        Some(known) if known != declared => Err(MachineError::WidthConflict {
            kind,
            known,
            declared,
        }),
        _ => {
            *width = Some(declared);
            Ok(())
        }
    }
}

// Overlapping inputs of one state must lead to the same successor with compatible outputs.
fn check_deterministic(patterns: &PatternTable, state: &State) -> Result<(), MachineError> {
    for (t1, t2) in state.transitions.iter().tuple_combinations() {
        let (in1, in2) = (patterns.get(t1.input), patterns.get(t2.input));
        if in1.is_disjoint(in2) {
            continue;
        }
        if t1.next != t2.next || !patterns.get(t1.output).is_compatible(patterns.get(t2.output)) {
            return Err(MachineError::Nondeterministic {
                state: state.name.clone(),
                first: in1.to_string(),
                second: in2.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_state_reset() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.add_transition("1", "*", "init", "0").unwrap();
        builder.add_transition("0", "x", "y", "1").unwrap();
        let machine = builder.build().unwrap();
        // The wildcard row names `init` first.
        assert_eq!(machine.reset(), machine.state_by_name("init"));
        assert_eq!(machine.state_count(), 3);
    }

    #[test]
    fn test_any_reset() {
        let mut builder = MachineBuilder::new(ResetPolicy::Any);
        builder.add_transition("0", "a", "b", "1").unwrap();
        let machine = builder.clone().build().unwrap();
        assert_eq!(machine.reset(), None);

        builder.reset_state("b");
        let machine = builder.build().unwrap();
        assert_eq!(machine.reset(), machine.state_by_name("b"));
    }

    #[test]
    fn test_unknown_reset() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder
            .reset_state("nowhere")
            .add_transition("0", "a", "a", "1")
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            MachineError::UnknownResetState("nowhere".to_owned())
        );
    }

    #[test]
    fn test_length_mismatch() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.input_len(2).unwrap();
        assert!(matches!(
            builder.add_transition("0", "a", "a", "1"),
            Err(MachineError::LengthMismatch {
                kind: PatternKind::Input,
                expected: 2,
                actual: 1,
                ..
            })
        ));
        builder.add_transition("01", "a", "a", "1").unwrap();
        assert!(matches!(
            builder.add_transition("00", "a", "a", "11"),
            Err(MachineError::LengthMismatch {
                kind: PatternKind::Output,
                ..
            })
        ));
    }

    #[test]
    fn test_width_declared_after_transitions() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.add_transition("0", "a", "a", "1").unwrap();
        // Repeating the implied widths is fine.
        builder.input_len(1).unwrap().output_len(1).unwrap();
        assert_eq!(
            builder.input_len(2).unwrap_err(),
            MachineError::WidthConflict {
                kind: PatternKind::Input,
                known: 1,
                declared: 2,
            }
        );
        assert_eq!(
            builder.output_len(0).unwrap_err(),
            MachineError::WidthConflict {
                kind: PatternKind::Output,
                known: 1,
                declared: 0,
            }
        );
        // The machine keeps the widths of its patterns.
        let machine = builder.build().unwrap();
        assert_eq!((machine.input_len(), machine.output_len()), (1, 1));
    }

    #[test]
    fn test_nondeterministic() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.add_transition("0-", "a", "b", "1").unwrap();
        builder.add_transition("-1", "a", "a", "1").unwrap();
        assert!(matches!(
            builder.build(),
            Err(MachineError::Nondeterministic { .. })
        ));

        // Overlap is fine when successor and outputs agree.
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.add_transition("0-", "a", "a", "1-").unwrap();
        builder.add_transition("-1", "a", "a", "-0").unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_dont_care_successor_keeps_no_transitions() {
        let mut builder = MachineBuilder::new(ResetPolicy::FirstState);
        builder.add_transition("0", "a", "*", "1").unwrap();
        builder.add_transition("1", "*", "a", "0").unwrap();
        let machine = builder.build().unwrap();
        let star = machine.state_by_name(WILDCARD_STATE).unwrap();
        assert!(machine.state(star).transitions().is_empty());
        assert_eq!(machine.state(0).transitions().len(), 2);
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            MachineBuilder::new(ResetPolicy::FirstState)
                .build()
                .unwrap_err(),
            MachineError::NoStates
        );
    }
}

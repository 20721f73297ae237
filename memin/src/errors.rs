// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::pattern::PartialPattern;
use itertools::Itertools;
use thiserror::Error;

/// A pattern could not be parsed from text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid character {ch:?} at position {position} (expected '0', '1' or '-')")]
    InvalidChar { ch: char, position: usize },
}

/// A machine description is inconsistent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("{kind} pattern {pattern} has length {actual}, expected {expected}")]
    LengthMismatch {
        kind: PatternKind,
        pattern: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid {kind} pattern")]
    Pattern {
        kind: PatternKind,
        #[source]
        source: PatternError,
    },
    #[error(
        "state {state} is nondeterministic: inputs {first} and {second} overlap but disagree \
         on successor or output"
    )]
    Nondeterministic {
        state: String,
        first: String,
        second: String,
    },
    #[error("{kind} width declared as {declared}, but {known} is already in use")]
    WidthConflict {
        kind: PatternKind,
        known: usize,
        declared: usize,
    },
    #[error("reset state {0} does not occur in any transition")]
    UnknownResetState(String),
    #[error("machine has no states")]
    NoStates,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternKind {
    Input,
    Output,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A transition table could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read transition table")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: invalid directive")]
    Directive {
        line: usize,
        #[source]
        source: MachineError,
    },
    #[error("line {line}: invalid transition")]
    Transition {
        line: usize,
        #[source]
        source: MachineError,
    },
    #[error("invalid machine")]
    Machine(#[from] MachineError),
}

/// Minimization could not produce a machine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MinimizeError {
    /// The oracle gave no answer for this class count.
    #[error("SAT oracle gave no answer for {classes} classes")]
    Indeterminate { classes: usize },
    /// The satisfying assignment violates the closure constraint. This is a bug in the encoding.
    #[error(
        "internal error: no successor class for class {class} under symbol {symbol} \
         (the encoding is inconsistent)"
    )]
    NoSuccessorClass { class: usize, symbol: usize },
    /// Not even the identity partition was found satisfiable. This is a bug in the encoding.
    #[error("internal error: no partition found with up to {states} classes")]
    Exhausted { states: usize },
}

/// One machine does not cover another.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoverError {
    #[error("counterexample: ({})", .0.iter().join(", "))]
    Counterexample(Vec<PartialPattern>),
    #[error("reset state only specified in one machine")]
    ResetMismatch,
    #[error("no matching state for state {state}")]
    Uncovered { state: String },
    #[error(
        "machines have different widths: {first:?} and {second:?} (inputs, outputs)"
    )]
    WidthMismatch {
        first: (usize, usize),
        second: (usize, usize),
    },
}

// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimization of incompletely specified Mealy machines.
//!
//! States that can be merged without changing any specified behavior are grouped into classes
//! by encoding the grouping as a SAT problem, one class count at a time, starting from a lower
//! bound. See [`search::minimize`] for the pipeline.

pub mod cnf;
pub mod covering;
pub mod errors;
pub mod incompat;
pub mod intern;
pub mod machine;
pub mod partition;
pub mod pattern;
#[cfg(any(test, feature = "proptest1"))]
pub mod proptest_helpers;
pub mod quotient;
pub mod search;

pub use search::{minimize, minimize_with, Minimization, MinimizeOptions};

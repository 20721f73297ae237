// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Cnf, Lit, Var};
use bitvec::prelude::*;
use std::{fmt, time::Instant};
use tracing::{debug, warn};

/// A total assignment of the variables of a [`Cnf`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    values: BitVec,
}

impl Assignment {
    /// Builds an assignment from the literals that hold. Variables not mentioned are false.
    pub fn from_true_lits(var_count: usize, lits: impl IntoIterator<Item = Lit>) -> Self {
        let mut values = bitvec![0; var_count];
        for lit in lits {
            if lit.is_positive() && lit.var().index() < var_count {
                values.set(lit.var().index(), true);
            }
        }
        Self { values }
    }

    /// Variables outside the assignment are false.
    #[inline]
    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).map_or(false, |bit| *bit)
    }

    pub fn satisfies(&self, cnf: &Cnf) -> bool {
        cnf.clauses().iter().all(|clause| {
            clause
                .lits()
                .iter()
                .any(|&lit| self.value(lit.var()) == lit.is_positive())
        })
    }

    pub fn true_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.values.iter_ones().map(|ix| Var::new(ix as u32 + 1))
    }
}

/// Result of one satisfiability query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat(Assignment),
    Unsat,
    /// The oracle gave up without an answer.
    Unknown,
}

impl SolveOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Sat(_) => OutcomeKind::Sat,
            Self::Unsat => OutcomeKind::Unsat,
            Self::Unknown => OutcomeKind::Unknown,
        }
    }
}

/// [`SolveOutcome`] without the assignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Sat,
    Unsat,
    Unknown,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sat => write!(f, "SATISFIABLE"),
            Self::Unsat => write!(f, "UNSATISFIABLE"),
            Self::Unknown => write!(f, "INDETERMINATE"),
        }
    }
}

/// Something that decides satisfiability of a formula.
pub trait SatOracle {
    fn solve(&mut self, cnf: &Cnf) -> SolveOutcome;
}

impl<T: SatOracle + ?Sized> SatOracle for &mut T {
    fn solve(&mut self, cnf: &Cnf) -> SolveOutcome {
        (**self).solve(cnf)
    }
}

/// Oracle backed by the bundled `varisat` CDCL solver. Each query uses a fresh solver.
#[derive(Copy, Clone, Debug, Default)]
pub struct VarisatOracle;

impl VarisatOracle {
    pub fn new() -> Self {
        Self
    }
}

impl SatOracle for VarisatOracle {
    fn solve(&mut self, cnf: &Cnf) -> SolveOutcome {
        let formula = cnf.to_varisat();
        let mut solver = varisat::Solver::new();
        solver.add_formula(&formula);
        let start = Instant::now();
        let result = solver.solve();
        debug!(
            vars = cnf.var_count(),
            clauses = cnf.clause_count(),
            sat = ?result.as_ref().ok(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "varisat finished"
        );
        match result {
            Ok(true) => match solver.model() {
                Some(model) => {
                    debug!(model_len = model.len(), "varisat found a model");
                    let lits = model
                        .into_iter()
                        .map(|lit| Lit::from_dimacs(lit.to_dimacs() as i32));
                    SolveOutcome::Sat(Assignment::from_true_lits(cnf.var_count(), lits))
                }
                None => {
                    warn!("varisat reported SAT without a model");
                    SolveOutcome::Unknown
                }
            },
            Ok(false) => SolveOutcome::Unsat,
            Err(err) => {
                warn!(%err, "varisat failed");
                SolveOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::Clause;

    fn clause(lits: &[i32]) -> Clause {
        lits.iter().map(|&l| Lit::from_dimacs(l)).collect()
    }

    #[test]
    fn test_varisat_sat() {
        let mut cnf = Cnf::new();
        for _ in 0..3 {
            cnf.new_var();
        }
        cnf.add_clause(clause(&[1, 2]));
        cnf.add_clause(clause(&[-1]));
        cnf.add_clause(clause(&[-2, 3]));

        match VarisatOracle::new().solve(&cnf) {
            SolveOutcome::Sat(assignment) => {
                assert!(assignment.satisfies(&cnf));
                assert!(!assignment.value(Var::new(1)));
                assert!(assignment.value(Var::new(2)));
                assert!(assignment.value(Var::new(3)));
                assert_eq!(
                    assignment.true_vars().collect::<Vec<_>>(),
                    vec![Var::new(2), Var::new(3)]
                );
            }
            other => panic!("expected SAT, got {:?}", other),
        }
    }

    #[test]
    fn test_varisat_unsat() {
        let mut cnf = Cnf::new();
        cnf.new_var();
        cnf.add_clause(clause(&[1]));
        cnf.add_clause(clause(&[-1]));
        assert_eq!(VarisatOracle::new().solve(&cnf), SolveOutcome::Unsat);

        let mut cnf = Cnf::new();
        cnf.new_var();
        cnf.add_clause(Clause::new());
        assert_eq!(VarisatOracle::new().solve(&cnf), SolveOutcome::Unsat);
    }

    #[test]
    fn test_empty_formula() {
        let cnf = Cnf::new();
        assert_eq!(
            VarisatOracle::new().solve(&cnf).kind(),
            OutcomeKind::Sat
        );
    }
}

// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clauses in conjunctive normal form.

mod encoder;
mod oracle;

pub use encoder::*;
pub use oracle::*;

use std::{fmt, io, ops::Not};
use varisat::ExtendFormula;

/// A boolean variable (1-indexed, as in DIMACS).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    /// Panics if `id == 0`.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "variable ids start at 1");
        Self(id)
    }

    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    /// Zero-based index, for dense per-variable tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A variable or its negation, stored as a signed DIMACS literal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(i32);

impl Lit {
    #[inline]
    pub fn positive(var: Var) -> Self {
        Self(var.0 as i32)
    }

    #[inline]
    pub fn negative(var: Var) -> Self {
        Self(-(var.0 as i32))
    }

    /// Panics if `value == 0`.
    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "0 is not a literal");
        Self(value)
    }

    #[inline]
    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Not for Lit {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(-self.0)
    }
}

impl From<Var> for Lit {
    fn from(var: Var) -> Self {
        Self::positive(var)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive() {
            write!(f, "{}", self.var())
        } else {
            write!(f, "!{}", self.var())
        }
    }
}

/// A disjunction of literals. The empty clause is unsatisfiable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Clause {
    lits: Vec<Lit>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lit: Lit) -> &mut Self {
        self.lits.push(lit);
        self
    }

    #[inline]
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}

impl FromIterator<Lit> for Clause {
    fn from_iter<I: IntoIterator<Item = Lit>>(iter: I) -> Self {
        Self {
            lits: iter.into_iter().collect(),
        }
    }
}

/// A growable pool of variables and the clauses over them.
#[derive(Clone, Debug, Default)]
pub struct Cnf {
    var_count: u32,
    clauses: Vec<Clause>,
}

impl Cnf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self) -> Var {
        self.var_count += 1;
        Var(self.var_count)
    }

    #[inline]
    pub fn var_count(&self) -> usize {
        self.var_count as usize
    }

    pub fn add_clause(&mut self, clause: Clause) {
        debug_assert!(
            clause.lits.iter().all(|lit| lit.var().0 <= self.var_count),
            "clause {:?} refers to an unallocated variable",
            clause
        );
        self.clauses.push(clause);
    }

    #[inline]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[inline]
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Converts the formula for the `varisat` solver, keeping every variable even if no clause
    /// mentions it.
    pub fn to_varisat(&self) -> varisat::CnfFormula {
        let mut formula = varisat::CnfFormula::new();
        formula.set_var_count(self.var_count());
        let mut lits = Vec::new();
        for clause in &self.clauses {
            lits.clear();
            lits.extend(
                clause
                    .lits
                    .iter()
                    .map(|lit| varisat::Lit::from_dimacs(lit.to_dimacs() as isize)),
            );
            formula.add_clause(&lits);
        }
        formula
    }

    /// Writes the formula in DIMACS CNF format.
    pub fn write_dimacs(&self, mut writer: impl io::Write) -> io::Result<()> {
        varisat::dimacs::write_dimacs(&mut writer, &self.to_varisat())
    }
}

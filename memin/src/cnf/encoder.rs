// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Assignment, Clause, Cnf, Lit, Var};
use crate::{
    incompat::IncompatibilityMatrix,
    machine::StateId,
    partition::{SymbolId, SymbolTable},
};
use bitvec::prelude::*;
use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};
use tracing::{debug, trace};
use twox_hash::XxHash64;

/// Index of a class of the minimized machine.
pub type ClassId = usize;

/// A formula that is satisfiable iff the states can be covered by `classes` closed classes of
/// pairwise compatible states.
#[derive(Clone, Debug)]
pub struct Encoding {
    classes: usize,
    cnf: Cnf,
    decode: DecodeTable,
}

impl Encoding {
    /// Encodes the partition problem for `classes` classes.
    ///
    /// `anchors` must be pairwise incompatible; anchor `i` is placed in class `i`. If there are
    /// more anchors than classes the formula is unsatisfiable.
    pub fn new(
        classes: usize,
        table: &SymbolTable,
        matrix: &IncompatibilityMatrix,
        anchors: &[StateId],
    ) -> Self {
        let mut encoder = Encoder::new(classes, table, matrix, anchors);
        encoder.encode();
        let Encoder { cnf, decode, .. } = encoder;
        debug!(
            classes,
            vars = cnf.var_count(),
            clauses = cnf.clause_count(),
            "encoded partition"
        );
        Self {
            classes,
            cnf,
            decode: DecodeTable { entries: decode },
        }
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    #[inline]
    pub fn cnf(&self) -> &Cnf {
        &self.cnf
    }

    #[inline]
    pub fn decode(&self) -> &DecodeTable {
        &self.decode
    }
}

/// Maps the variables of an [`Encoding`] back to (state, class) pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeTable {
    entries: Vec<Option<(StateId, ClassId)>>,
}

impl DecodeTable {
    /// Returns the pair `var` stands for, or `None` for auxiliary variables.
    pub fn get(&self, var: Var) -> Option<(StateId, ClassId)> {
        self.entries.get(var.index()).copied().flatten()
    }

    /// The (state, class) pairs that hold under `assignment`.
    pub fn memberships<'a>(
        &'a self,
        assignment: &'a Assignment,
    ) -> impl Iterator<Item = (StateId, ClassId)> + 'a {
        assignment.true_vars().filter_map(move |var| self.get(var))
    }
}

struct Encoder<'a> {
    classes: usize,
    table: &'a SymbolTable,
    matrix: &'a IncompatibilityMatrix,
    anchors: &'a [StateId],
    cnf: Cnf,
    state_vars: Vec<Option<Var>>,
    decode: Vec<Option<(StateId, ClassId)>>,
}

impl<'a> Encoder<'a> {
    fn new(
        classes: usize,
        table: &'a SymbolTable,
        matrix: &'a IncompatibilityMatrix,
        anchors: &'a [StateId],
    ) -> Self {
        Self {
            classes,
            table,
            matrix,
            anchors,
            cnf: Cnf::new(),
            state_vars: vec![None; table.state_count() * classes],
            decode: Vec::new(),
        }
    }

    fn encode(&mut self) {
        if self.anchors.len() > self.classes {
            debug!(
                anchors = self.anchors.len(),
                classes = self.classes,
                "more anchors than classes"
            );
            self.cnf.add_clause(Clause::new());
            return;
        }
        self.anchor_clauses();
        self.coverage_clauses();
        self.conflict_clauses();
        self.closure_clauses();
    }

    fn anchor_clauses(&mut self) {
        let anchors = self.anchors;
        for (class, &anchor) in anchors.iter().enumerate() {
            let lit = self.member(anchor, class);
            self.cnf.add_clause(Clause::from_iter([lit]));
        }
    }

    // Every state is in at least one class.
    fn coverage_clauses(&mut self) {
        for state in 0..self.table.state_count() {
            let mut clause = Clause::new();
            for class in 0..self.classes {
                if self.allowed(state, class) {
                    clause.push(self.member(state, class));
                }
            }
            self.cnf.add_clause(clause);
        }
    }

    fn conflict_clauses(&mut self) {
        let matrix = self.matrix;
        let anchors = self.anchors;
        for (class, &anchor) in anchors.iter().enumerate() {
            for state in matrix.incompatible_with(anchor) {
                let lit = !self.member(state, class);
                self.cnf.add_clause(Clause::from_iter([lit]));
            }
        }

        for s1 in 0..self.table.state_count() {
            for s2 in matrix.incompatible_with(s1).filter(|&s2| s2 > s1) {
                for class in 0..self.classes {
                    // Already excluded by a unit clause.
                    if !self.allowed(s1, class) || !self.allowed(s2, class) {
                        continue;
                    }
                    let clause =
                        Clause::from_iter([!self.member(s1, class), !self.member(s2, class)]);
                    self.cnf.add_clause(clause);
                }
            }
        }
    }

    // If a state in class `i` moves to `t` on symbol `a`, every state of class `i` moves into
    // one common class `j` that also holds `t`. The choice of `j` is made by fresh selector
    // variables per (symbol, class).
    fn closure_clauses(&mut self) {
        let table = self.table;
        let symbols = reduce_symbols(table);
        trace!(
            symbols = table.symbol_count(),
            reduced = symbols.len(),
            "reduced symbols for closure"
        );

        let members: Vec<Vec<StateId>> = (0..self.classes)
            .map(|class| {
                (0..table.state_count())
                    .filter(|&state| self.allowed(state, class))
                    .collect()
            })
            .collect();

        for symbol in symbols {
            for (class, members) in members.iter().enumerate() {
                let moves: Vec<(StateId, StateId)> = members
                    .iter()
                    .filter_map(|&state| table.next_state(state, symbol).map(|next| (state, next)))
                    .collect();

                let mut targets = bitvec![0; self.classes];
                for &(_, next) in &moves {
                    for target in 0..self.classes {
                        if self.allowed(next, target) {
                            targets.set(target, true);
                        }
                    }
                }
                if targets.not_any() {
                    continue;
                }

                let selectors: Vec<(ClassId, Var)> = targets
                    .iter_ones()
                    .map(|target| (target, self.aux_var()))
                    .collect();
                self.cnf.add_clause(
                    selectors
                        .iter()
                        .map(|&(_, selector)| Lit::positive(selector))
                        .collect(),
                );

                for &(state, next) in &moves {
                    for &(target, selector) in &selectors {
                        let clause = Clause::from_iter([
                            Lit::negative(selector),
                            !self.member(state, class),
                            self.member(next, target),
                        ]);
                        self.cnf.add_clause(clause);
                    }
                }
            }
        }
    }

    // A state may not share a class with an anchor it is incompatible with.
    fn allowed(&self, state: StateId, class: ClassId) -> bool {
        match self.anchors.get(class) {
            Some(&anchor) => !self.matrix.is_incompatible(state, anchor),
            None => true,
        }
    }

    // The literal "`state` is in `class`", allocating its variable on first use.
    fn member(&mut self, state: StateId, class: ClassId) -> Lit {
        let slot = state * self.classes + class;
        let var = match self.state_vars[slot] {
            Some(var) => var,
            None => {
                let var = self.cnf.new_var();
                self.decode.push(Some((state, class)));
                self.state_vars[slot] = Some(var);
                var
            }
        };
        Lit::positive(var)
    }

    fn aux_var(&mut self) -> Var {
        self.decode.push(None);
        self.cnf.new_var()
    }
}

/// Returns one symbol per distinct successor column, in symbol order.
///
/// Symbols whose successor is the same for every state impose the same closure constraints.
pub fn reduce_symbols(table: &SymbolTable) -> Vec<SymbolId> {
    let column = |symbol: SymbolId| {
        (0..table.state_count()).map(move |state| table.next_state(state, symbol))
    };

    let mut seen: HashMap<u64, Vec<SymbolId>> = HashMap::new();
    let mut representatives = Vec::new();
    for symbol in 0..table.symbol_count() {
        let mut hasher = XxHash64::with_seed(0);
        for next in column(symbol) {
            next.hash(&mut hasher);
        }
        let bucket = seen.entry(hasher.finish()).or_default();
        // Hash collisions fall back to comparing the columns.
        if bucket.iter().any(|&other| column(other).eq(column(symbol))) {
            continue;
        }
        bucket.push(symbol);
        representatives.push(symbol);
    }
    representatives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cnf::{SatOracle, SolveOutcome, VarisatOracle},
        machine::{kiss, Machine, ResetPolicy},
    };

    fn setup(text: &str) -> (Machine, IncompatibilityMatrix, SymbolTable) {
        let machine = kiss::parse_str(text, ResetPolicy::FirstState).unwrap();
        let matrix = IncompatibilityMatrix::analyze(&machine);
        let table = SymbolTable::build(&machine, &matrix);
        (machine, matrix, table)
    }

    fn solve(encoding: &Encoding) -> Option<Vec<(StateId, ClassId)>> {
        match VarisatOracle::new().solve(encoding.cnf()) {
            SolveOutcome::Sat(assignment) => {
                assert!(assignment.satisfies(encoding.cnf()));
                Some(encoding.decode().memberships(&assignment).collect())
            }
            SolveOutcome::Unsat => None,
            SolveOutcome::Unknown => panic!("no answer"),
        }
    }

    // a and b conflict; c agrees with both but moves to b while a moves to a.
    const THREE: &str = "\
0 a a 0
1 a a 0
0 b b 1
1 b b 1
0 c b -
1 c c -
";

    #[test]
    fn test_class_counts() {
        let (_, matrix, table) = setup(THREE);
        let anchors = matrix.pairwise_incompatible_states();
        assert_eq!(anchors.len(), 2);

        assert!(solve(&Encoding::new(1, &table, &matrix, &[])).is_none());
        let memberships = solve(&Encoding::new(2, &table, &matrix, &anchors)).unwrap();
        // Every state is somewhere, and conflicting states never share a class.
        for state in 0..3 {
            assert!(memberships.iter().any(|&(s, _)| s == state));
        }
        for &(s1, c1) in &memberships {
            for &(s2, c2) in &memberships {
                if c1 == c2 {
                    assert!(!matrix.is_incompatible(s1, s2));
                }
            }
        }
    }

    #[test]
    fn test_anchors_exclude_incompatible_states() {
        // c reaches b where a stays in a, so c cannot join a.
        let (machine, matrix, table) = setup(THREE);
        let [a, b, c] = ["a", "b", "c"].map(|n| machine.state_by_name(n).unwrap());
        assert!(matrix.is_incompatible(a, c));
        let memberships = solve(&Encoding::new(2, &table, &matrix, &[a, b])).unwrap();
        assert!(memberships.contains(&(a, 0)));
        assert!(memberships.contains(&(b, 1)));
        assert!(memberships.contains(&(c, 1)));
        assert!(!memberships.contains(&(c, 0)));
    }

    #[test]
    fn test_solution_is_closed() {
        // Four mutually compatible states whose successors are not all compatible.
        let text = "\
0 p q 0
1 p p -
0 q r -
1 q q 1
0 r p -
1 r s 0
0 s s 1
1 s r -
";
        let (_, matrix, table) = setup(text);
        for classes in 1..=4 {
            let memberships = match solve(&Encoding::new(classes, &table, &matrix, &[])) {
                Some(memberships) => memberships,
                None => continue,
            };
            let in_class = |state, class| memberships.contains(&(state, class));
            for class in 0..classes {
                for symbol in 0..table.symbol_count() {
                    let successors: Vec<StateId> = (0..table.state_count())
                        .filter(|&s| in_class(s, class))
                        .filter_map(|s| table.next_state(s, symbol))
                        .collect();
                    if successors.is_empty() {
                        continue;
                    }
                    assert!(
                        (0..classes).any(|target| successors.iter().all(|&t| in_class(t, target))),
                        "class {} has no common successor class under symbol {}",
                        class,
                        symbol
                    );
                }
            }
        }
    }

    #[test]
    fn test_too_many_anchors() {
        let (_, matrix, table) = setup(THREE);
        let anchors = matrix.pairwise_incompatible_states();
        let encoding = Encoding::new(1, &table, &matrix, &anchors);
        assert_eq!(encoding.cnf().clause_count(), 1);
        assert!(solve(&encoding).is_none());
    }

    #[test]
    fn test_decode_table() {
        let (_, matrix, table) = setup(THREE);
        let encoding = Encoding::new(2, &table, &matrix, &[]);
        let decode = encoding.decode();
        let mut pairs: Vec<_> = (1..=encoding.cnf().var_count() as u32)
            .filter_map(|id| decode.get(Var::new(id)))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
        assert_eq!(decode.get(Var::new(10_000)), None);
    }

    #[test]
    fn test_reduce_symbols() {
        // `00` and `01` lead every state to the same successor.
        let (_, _, table) = setup("00 a b 1\n01 a b 1\n10 a a 0\n00 b a 1\n01 b a 0\n10 b a 1\n");
        let reduced = reduce_symbols(&table);
        assert_eq!(table.symbol_count(), 3);
        assert_eq!(reduced.len(), 2);
        let patterns: Vec<String> = reduced
            .iter()
            .map(|&s| table.patterns().get(table.symbol(s)).to_string())
            .collect();
        assert_eq!(patterns, ["00", "10"]);
    }
}

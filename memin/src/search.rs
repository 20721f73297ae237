// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The minimization pipeline.

use crate::{
    cnf::{Encoding, OutcomeKind, SatOracle, SolveOutcome},
    errors::MinimizeError,
    incompat::IncompatibilityMatrix,
    machine::Machine,
    partition::SymbolTable,
    quotient::QuotientMachine,
};
use std::time::{Duration, Instant};
use tracing::info;

/// Options for [`minimize`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MinimizeOptions {
    /// Pin a set of pairwise incompatible states to their own classes in every encoding.
    pub anchors_in_encoding: bool,
    /// Start the search at the size of that set rather than at zero classes. Without it no
    /// anchors are computed, so `anchors_in_encoding` has no effect.
    pub lower_bound: bool,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            anchors_in_encoding: true,
            lower_bound: true,
        }
    }
}

/// Statistics for one class count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialStats {
    pub classes: usize,
    pub vars: usize,
    pub clauses: usize,
    pub outcome: OutcomeKind,
    pub encode_time: Duration,
    pub solve_time: Duration,
}

/// The result of [`minimize`].
#[derive(Clone, Debug)]
pub struct Minimization {
    pub lower_bound: usize,
    pub removed_states: usize,
    pub trials: Vec<TrialStats>,
    pub quotient: QuotientMachine,
}

impl Minimization {
    #[inline]
    pub fn class_count(&self) -> usize {
        self.quotient.class_count()
    }
}

/// Finds the smallest number of classes that the states of `machine` can be merged into, and
/// the merged machine.
pub fn minimize(
    machine: &Machine,
    options: &MinimizeOptions,
    oracle: impl SatOracle,
) -> Result<Minimization, MinimizeError> {
    minimize_with(machine, options, oracle, |_| {})
}

/// Like [`minimize`], and calls `inspect` with every encoding before it is solved.
pub fn minimize_with(
    machine: &Machine,
    options: &MinimizeOptions,
    mut oracle: impl SatOracle,
    mut inspect: impl FnMut(&Encoding),
) -> Result<Minimization, MinimizeError> {
    let original_count = machine.state_count();
    let mut machine = machine.clone();

    let start = Instant::now();
    let survivors = machine.retain_reachable();
    let removed_states = original_count - survivors.len();
    info!(
        removed_states,
        elapsed = ?start.elapsed(),
        "removed unreachable states"
    );

    let start = Instant::now();
    let preds = machine.predecessors();
    info!(states = preds.len(), elapsed = ?start.elapsed(), "computed predecessor map");

    let start = Instant::now();
    let matrix = IncompatibilityMatrix::analyze(&machine);
    info!(
        pairs = matrix.incompatible_pair_count(),
        elapsed = ?start.elapsed(),
        "computed incompatibility matrix"
    );

    let start = Instant::now();
    let table = SymbolTable::build(&machine, &matrix);
    info!(
        symbols = table.symbol_count(),
        elapsed = ?start.elapsed(),
        "split transitions"
    );

    let start = Instant::now();
    let clique = if options.lower_bound {
        matrix.pairwise_incompatible_states()
    } else {
        Vec::new()
    };
    let lower_bound = clique.len();
    let anchors: &[_] = if options.anchors_in_encoding {
        &clique
    } else {
        &[]
    };
    info!(lower_bound, elapsed = ?start.elapsed(), "found pairwise incompatible states");

    let mut trials = Vec::new();
    let search_start = Instant::now();
    for classes in lower_bound..=machine.state_count() {
        let start = Instant::now();
        let encoding = Encoding::new(classes, &table, &matrix, anchors);
        let encode_time = start.elapsed();
        inspect(&encoding);

        let start = Instant::now();
        let outcome = oracle.solve(encoding.cnf());
        let solve_time = start.elapsed();

        let stats = TrialStats {
            classes,
            vars: encoding.cnf().var_count(),
            clauses: encoding.cnf().clause_count(),
            outcome: outcome.kind(),
            encode_time,
            solve_time,
        };
        info!(
            classes,
            vars = stats.vars,
            clauses = stats.clauses,
            encode_time = ?encode_time,
            solve_time = ?solve_time,
            "{}",
            stats.outcome
        );
        trials.push(stats);

        match outcome {
            SolveOutcome::Sat(assignment) => {
                info!(elapsed = ?search_start.elapsed(), "search finished");
                let start = Instant::now();
                let mut quotient = QuotientMachine::build(
                    &table,
                    classes,
                    encoding.decode(),
                    &assignment,
                    machine.reset(),
                )?;
                quotient.renumber_members(&survivors);
                info!(elapsed = ?start.elapsed(), "built minimized machine");
                return Ok(Minimization {
                    lower_bound,
                    removed_states,
                    trials,
                    quotient,
                });
            }
            SolveOutcome::Unsat => {}
            SolveOutcome::Unknown => return Err(MinimizeError::Indeterminate { classes }),
        }
    }

    Err(MinimizeError::Exhausted {
        states: machine.state_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cnf::{Clause, Cnf, Lit, Var, VarisatOracle},
        covering::check_covers,
        machine::{kiss, ResetPolicy},
        proptest_helpers::machine_strategy,
    };
    use proptest::prelude::*;

    fn run(text: &str) -> (Machine, Minimization) {
        run_with(text, ResetPolicy::FirstState)
    }

    fn run_with(text: &str, policy: ResetPolicy) -> (Machine, Minimization) {
        let machine = kiss::parse_str(text, policy).unwrap();
        let result = minimize(&machine, &MinimizeOptions::default(), VarisatOracle::new()).unwrap();
        (machine, result)
    }

    /// Whether some two-class cover puts `state` and `other` in the same class.
    fn can_share_class(machine: &Machine, state: usize, other: usize) -> bool {
        let matrix = IncompatibilityMatrix::analyze(machine);
        let table = SymbolTable::build(machine, &matrix);
        let encoding = Encoding::new(2, &table, &matrix, &[]);
        let mut cnf = encoding.cnf().clone();
        for wanted in [state, other] {
            let var = (1..=cnf.var_count() as u32)
                .map(Var::new)
                .find(|&var| encoding.decode().get(var) == Some((wanted, 0)));
            match var {
                Some(var) => cnf.add_clause(Clause::from_iter([Lit::positive(var)])),
                None => return false,
            }
        }
        VarisatOracle::new().solve(&cnf).kind() == OutcomeKind::Sat
    }

    fn class_of(result: &Minimization, state: usize) -> Vec<usize> {
        (0..result.class_count())
            .filter(|&class| result.quotient.members(class).contains(&state))
            .collect()
    }

    #[test_log::test]
    fn test_identical_states_merge() {
        let (machine, result) = run(".i 1\n.o 2\n0 a b 10\n1 a a 01\n0 b a 10\n1 b b 01\n");
        assert_eq!(result.class_count(), 1);
        assert_eq!(result.lower_bound, 1);
        assert_eq!(result.trials.len(), 1);
        assert_eq!(result.trials[0].outcome, OutcomeKind::Sat);
        check_covers(&result.quotient.to_machine(), &machine).unwrap();
    }

    // {a, b} and {c, d} behave identically within each pair but differ across pairs.
    const FOUR: &str = "\
0 a b 0
1 a c 0
0 b a 0
1 b d 0
0 c d 1
1 c a 1
0 d c 1
1 d b 1
";

    #[test]
    fn test_two_pairs() {
        let (machine, result) = run(FOUR);
        assert_eq!(result.class_count(), 2);
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| machine.state_by_name(n).unwrap());
        assert_eq!(class_of(&result, a), class_of(&result, b));
        assert_eq!(class_of(&result, c), class_of(&result, d));
        assert_ne!(class_of(&result, a), class_of(&result, c));
        check_covers(&result.quotient.to_machine(), &machine).unwrap();
    }

    #[test]
    fn test_conflict_regroups_states() {
        // Every state loops to itself, so outputs alone decide compatibility. Without a reset
        // state nothing is pruned. a and b agree, c and d agree, and the don't-cares of b and c
        // would also let them pair up, until `11` makes b and c conflict.
        let base = "\
.i 2
.o 1
-- a a 0
0- b b -
1- b b 0
-- c c -
-- d d 1
";
        let (machine, result) = run_with(base, ResetPolicy::Any);
        assert_eq!(result.class_count(), 2);
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| machine.state_by_name(n).unwrap());
        assert!(class_of(&result, a)
            .iter()
            .any(|class| class_of(&result, b).contains(class)));
        // Before the conflict c fits with a and b as well as with d.
        let matrix = IncompatibilityMatrix::analyze(&machine);
        assert!(!matrix.is_incompatible(b, c));
        assert!(!matrix.is_incompatible(a, c));
        assert!(can_share_class(&machine, c, a));
        assert!(can_share_class(&machine, c, b));
        assert!(can_share_class(&machine, c, d));

        // Give c an output on `11` that conflicts with b.
        let conflicting = base.replace("-- c c -", "0- c c -\n10 c c -\n11 c c 1");
        let (machine, result) = run_with(&conflicting, ResetPolicy::Any);
        assert_eq!(result.class_count(), 2);
        let matrix = IncompatibilityMatrix::analyze(&machine);
        assert!(matrix.is_incompatible(b, c));
        assert!(!can_share_class(&machine, c, a));
        assert!(!can_share_class(&machine, c, b));
        assert!(can_share_class(&machine, c, d));
        // c now has to go with d, never with a or b.
        for class in class_of(&result, c) {
            assert!(result.quotient.members(class).contains(&d));
            assert!(!result.quotient.members(class).contains(&a));
            assert!(!result.quotient.members(class).contains(&b));
        }
    }

    #[test]
    fn test_minimal_machine_is_unchanged() {
        // Every pair of states is distinguishable.
        let text = "0 a b 0\n1 a a 1\n0 b c 0\n1 b a 0\n0 c c 1\n1 c a 0\n";
        let (machine, result) = run(text);
        assert_eq!(result.class_count(), machine.state_count());
        let minimized = result.quotient.to_machine();
        check_covers(&minimized, &machine).unwrap();
        check_covers(&machine, &minimized).unwrap();

        // Minimizing again changes nothing.
        let again = minimize(&minimized, &MinimizeOptions::default(), VarisatOracle::new()).unwrap();
        assert_eq!(again.class_count(), result.class_count());
    }

    #[test]
    fn test_unreachable_states_are_dropped() {
        let (_, result) = run(".r a\n- a a 0\n- z z 1\n");
        assert_eq!(result.removed_states, 1);
        assert_eq!(result.class_count(), 1);
    }

    #[test]
    fn test_members_use_caller_ids_after_pruning() {
        // `a` comes first but cannot be reached from the reset state.
        let (machine, result) = run(".r b\n- a a 0\n- b c 1\n- c b 0\n");
        assert_eq!(result.removed_states, 1);
        assert_eq!(result.class_count(), 2);
        let [b, c] = ["b", "c"].map(|n| machine.state_by_name(n).unwrap());
        assert_eq!((b, c), (1, 2));

        let mut members: Vec<_> = (0..result.class_count())
            .map(|class| result.quotient.members(class).to_vec())
            .collect();
        members.sort();
        assert_eq!(members, vec![vec![b], vec![c]]);
    }

    #[test]
    fn test_without_lower_bound() {
        let machine = kiss::parse_str(FOUR, ResetPolicy::FirstState).unwrap();
        let options = MinimizeOptions {
            anchors_in_encoding: false,
            lower_bound: false,
        };
        let result = minimize(&machine, &options, VarisatOracle::new()).unwrap();
        assert_eq!(result.class_count(), 2);
        assert_eq!(result.lower_bound, 0);
        let outcomes: Vec<_> = result.trials.iter().map(|t| (t.classes, t.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                (0, OutcomeKind::Unsat),
                (1, OutcomeKind::Unsat),
                (2, OutcomeKind::Sat)
            ]
        );

        let options = MinimizeOptions {
            anchors_in_encoding: false,
            lower_bound: true,
        };
        let result = minimize(&machine, &options, VarisatOracle::new()).unwrap();
        assert_eq!(result.class_count(), 2);
        assert_eq!(result.lower_bound, 2);
    }

    struct GiveUp;

    impl SatOracle for GiveUp {
        fn solve(&mut self, _: &Cnf) -> SolveOutcome {
            SolveOutcome::Unknown
        }
    }

    #[test]
    fn test_indeterminate() {
        let machine = kiss::parse_str(FOUR, ResetPolicy::FirstState).unwrap();
        let err = minimize(&machine, &MinimizeOptions::default(), GiveUp).unwrap_err();
        assert_eq!(err, MinimizeError::Indeterminate { classes: 2 });
    }

    #[test]
    fn test_inspect_sees_every_trial() {
        let machine = kiss::parse_str(FOUR, ResetPolicy::FirstState).unwrap();
        let options = MinimizeOptions {
            anchors_in_encoding: true,
            lower_bound: false,
        };
        let mut seen = Vec::new();
        let mut oracle = VarisatOracle::new();
        minimize_with(&machine, &options, &mut oracle, |encoding| {
            seen.push(encoding.classes())
        })
        .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn proptest_minimize(machine in machine_strategy(6, 2, 2)) {
            let result = minimize(&machine, &MinimizeOptions::default(), VarisatOracle::new())
                .unwrap();
            prop_assert!(result.class_count() >= result.lower_bound);
            prop_assert!(result.class_count() <= machine.state_count());

            let minimized = result.quotient.to_machine();
            prop_assert!(check_covers(&minimized, &machine).is_ok());

            // The lower bound does not change the optimum.
            let options = MinimizeOptions { anchors_in_encoding: false, lower_bound: false };
            let plain = minimize(&machine, &options, VarisatOracle::new()).unwrap();
            prop_assert_eq!(plain.class_count(), result.class_count());
        }
    }
}

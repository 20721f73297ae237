// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use proptest::{
    prelude::*,
    strategy::ValueTree,
    test_runner::{Config, RngAlgorithm, TestRng, TestRunner},
};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// Generates reproducible values from proptest strategies.
pub struct ValueGenerator {
    runner: TestRunner,
}

impl ValueGenerator {
    /// Creates a generator whose output depends only on `seed`.
    pub fn from_seed(seed: impl Hash) -> Self {
        let mut hasher = XxHash64::default();
        seed.hash(&mut hasher);
        let mut seed_bytes = [0_u8; 32];
        seed_bytes[..8].copy_from_slice(&hasher.finish().to_le_bytes());

        let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &seed_bytes);
        Self {
            runner: TestRunner::new_with_rng(Config::default(), rng),
        }
    }

    /// Splits off a generator with its own RNG stream, so values drawn from it do not shift
    /// later values of `self`.
    pub fn partial_clone(&mut self) -> Self {
        Self {
            runner: TestRunner::new_with_rng(self.runner.config().clone(), self.runner.new_rng()),
        }
    }

    pub fn generate<S: Strategy>(&mut self, strategy: S) -> S::Value {
        strategy
            .new_tree(&mut self.runner)
            .expect("strategies used for fixtures never reject")
            .current()
    }
}

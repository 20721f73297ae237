// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PredecessorMap, State};
use once_cell::sync::OnceCell;

/// Cache for data derived from a machine's transitions.
#[derive(Clone, Debug, Default)]
pub(super) struct MachineCache {
    predecessors: OnceCell<PredecessorMap>,
}

impl MachineCache {
    pub(super) fn invalidate(&mut self) {
        self.predecessors = OnceCell::new();
    }

    pub(super) fn get_or_init_predecessors(&self, states: &[State]) -> &PredecessorMap {
        self.predecessors.get_or_init(|| PredecessorMap::new(states))
    }
}

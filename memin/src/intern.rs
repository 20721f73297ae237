// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::pattern::PartialPattern;
use indexmap::IndexSet;
use std::fmt;

/// Handle to a pattern stored in a [`PatternTable`].
///
/// Two handles from the same table are equal exactly when the patterns they refer to are equal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u32);

impl PatternId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Content-keyed registry that stores each distinct pattern once.
#[derive(Clone, Debug, Default)]
pub struct PatternTable {
    patterns: IndexSet<PartialPattern>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `pattern`, storing it if it has not been seen before.
    pub fn intern(&mut self, pattern: PartialPattern) -> PatternId {
        let (ix, _) = self.patterns.insert_full(pattern);
        PatternId(ix as u32)
    }

    /// Returns the handle for `pattern` if it has been interned.
    pub fn lookup(&self, pattern: &PartialPattern) -> Option<PatternId> {
        self.patterns.get_index_of(pattern).map(|ix| PatternId(ix as u32))
    }

    /// Panics if `id` was issued by a different table.
    #[inline]
    pub fn get(&self, id: PatternId) -> &PartialPattern {
        &self.patterns[id.index()]
    }

    /// Interns the intersection of two compatible patterns.
    pub fn intersect(&mut self, a: PatternId, b: PatternId) -> PatternId {
        if a == b {
            return a;
        }
        let inters = self.get(a).intersect(self.get(b));
        self.intern(inters)
    }

    /// Interns the fragments of `a` that do not lie in `b`.
    pub fn diff(&mut self, a: PatternId, b: PatternId) -> Vec<PatternId> {
        let fragments = self.get(a).diff(self.get(b));
        fragments.into_iter().map(|f| self.intern(f)).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &PartialPattern)> + '_ {
        self.patterns
            .iter()
            .enumerate()
            .map(|(ix, pattern)| (PatternId(ix as u32), pattern))
    }
}

// Copyright (c) The memin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::PatternError;
use bitvec::prelude::*;
use std::{fmt, ops::BitAnd, str::FromStr};

type Bits = BitVec<u64, Lsb0>;

/// A fixed-length bit sequence in which some positions may be unspecified ("don't care").
///
/// A pattern stands for the set of concrete values that agree with it on every specified
/// position. Value bits outside the specified mask are always zero, so two patterns are equal
/// exactly when they describe the same set.
///
/// All binary operations require both operands to have the same length.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartialPattern {
    value: Bits,
    mask: Bits,
}

impl PartialPattern {
    /// Returns a pattern of length `len` with every position unspecified.
    pub fn dont_care(len: usize) -> Self {
        Self {
            value: Bits::repeat(false, len),
            mask: Bits::repeat(false, len),
        }
    }

    pub fn from_bits(bits: impl IntoIterator<Item = Option<bool>>) -> Self {
        let mut value = Bits::new();
        let mut mask = Bits::new();
        for bit in bits {
            value.push(bit == Some(true));
            mask.push(bit.is_some());
        }
        Self { value, mask }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Returns the value at `ix`, or `None` if it is unspecified.
    pub fn get(&self, ix: usize) -> Option<bool> {
        assert!(
            ix < self.len(),
            "bit ix {} must be in range [0..{})",
            ix,
            self.len()
        );
        self.mask[ix].then(|| self.value[ix])
    }

    pub fn bits(&self) -> impl Iterator<Item = Option<bool>> + '_ {
        (0..self.len()).map(move |ix| self.get(ix))
    }

    #[inline]
    pub fn is_fully_specified(&self) -> bool {
        self.mask.all()
    }

    #[inline]
    pub fn unspecified_count(&self) -> usize {
        self.mask.count_zeros()
    }

    /// Returns true if `self` and `other` agree on every position specified in both.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.conflicts(other).not_any()
    }

    /// Returns true if no concrete value lies in both patterns.
    #[inline]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        !self.is_compatible(other)
    }

    /// Returns true if every value in `self` also lies in `other`, i.e. `self` is at least as
    /// specific as `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        check_len(self, other);
        let mut uncovered = !self.mask.clone();
        uncovered &= other.mask.as_bitslice();
        uncovered.not_any() && self.is_compatible(other)
    }

    /// Combines two compatible patterns. The result is specified wherever either operand is.
    ///
    /// For incompatible patterns use the `&` operator, which checks compatibility first.
    pub fn intersect(&self, other: &Self) -> Self {
        debug_assert!(
            self.is_compatible(other),
            "intersect requires compatible patterns: {} and {}",
            self,
            other
        );
        let mut value = self.value.clone();
        value |= other.value.as_bitslice();
        let mut mask = self.mask.clone();
        mask |= other.mask.as_bitslice();
        Self { value, mask }
    }

    /// Returns pairwise disjoint patterns that together cover the values of `self` which do not
    /// lie in `other`.
    ///
    /// Every position that is unspecified in `self` but specified in `other` is split in
    /// ascending index order: one fragment takes the complement of `other`'s bit, the remainder
    /// takes `other`'s bit and carries on to the next split. The final remainder is
    /// `self.intersect(other)` and is not returned.
    ///
    /// Requires `self` and `other` to overlap. If `self` is a subset of `other` the result is
    /// empty.
    pub fn diff(&self, other: &Self) -> Vec<Self> {
        debug_assert!(
            !self.is_disjoint(other),
            "diff requires overlapping patterns: {} and {}",
            self,
            other
        );
        let mut split = !self.mask.clone();
        split &= other.mask.as_bitslice();

        let mut fragments = Vec::with_capacity(split.count_ones());
        let mut remainder = self.clone();
        for ix in split.iter_ones() {
            let other_bit = other.value[ix];
            let mut fragment = remainder.clone();
            fragment.fix(ix, !other_bit);
            fragments.push(fragment);
            remainder.fix(ix, other_bit);
        }
        fragments
    }

    /// Returns true if the concrete value `values` lies in this pattern.
    pub fn contains_value(&self, values: &[bool]) -> bool {
        assert_eq!(values.len(), self.len(), "value length must match");
        self.bits()
            .zip(values)
            .all(|(bit, &v)| bit.map_or(true, |b| b == v))
    }

    /// Enumerates every concrete value in this pattern.
    ///
    /// Panics if more than 63 positions are unspecified.
    pub fn values(&self) -> impl Iterator<Item = Vec<bool>> + '_ {
        let free: Vec<usize> = self.mask.iter_zeros().collect();
        assert!(free.len() < 64, "too many unspecified bits to enumerate");
        (0..(1_u64 << free.len())).map(move |combination| {
            let mut values: Vec<bool> = self.value.iter().by_vals().collect();
            for (bit, &ix) in free.iter().enumerate() {
                values[ix] = (combination >> bit) & 1 == 1;
            }
            values
        })
    }

    fn fix(&mut self, ix: usize, value: bool) {
        self.mask.set(ix, true);
        self.value.set(ix, value);
    }

    // Bits specified in both patterns on which they disagree.
    fn conflicts(&self, other: &Self) -> Bits {
        check_len(self, other);
        let mut conflicts = self.value.clone();
        conflicts ^= other.value.as_bitslice();
        conflicts &= self.mask.as_bitslice();
        conflicts &= other.mask.as_bitslice();
        conflicts
    }
}

#[inline]
fn check_len(a: &PartialPattern, b: &PartialPattern) {
    debug_assert_eq!(
        a.len(),
        b.len(),
        "patterns {} and {} must have equal length",
        a,
        b
    );
}

/// Checked intersection: `None` if the patterns are disjoint.
impl<'a, 'b> BitAnd<&'a PartialPattern> for &'b PartialPattern {
    type Output = Option<PartialPattern>;

    fn bitand(self, rhs: &'a PartialPattern) -> Self::Output {
        self.is_compatible(rhs).then(|| self.intersect(rhs))
    }
}

impl FromStr for PartialPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .chars()
            .enumerate()
            .map(|(position, ch)| match ch {
                '0' => Ok(Some(false)),
                '1' => Ok(Some(true)),
                '-' => Ok(None),
                _ => Err(PatternError::InvalidChar { ch, position }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bits(bits))
    }
}

impl fmt::Display for PartialPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for bit in self.bits() {
            let ch = match bit {
                Some(true) => '1',
                Some(false) => '0',
                None => '-',
            };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PartialPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("PartialPattern")
            .field(&format_args!("{}", self))
            .finish()
    }
}

// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-length dense bitset over `u64` words.

use serde::{Deserialize, Serialize};

/// A fixed-length set of bits.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitSet {
    len: usize,
    words: Vec<u64>,
}

impl BitSet {
    /// Create a bitset of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the set has no addressable bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set bit `i`. Returns true if it was previously clear.
    pub fn insert(&mut self, i: usize) -> bool {
        debug_assert!(i < self.len, "bit {i} out of range for BitSet of {}", self.len);
        let (w, b) = (i / 64, i % 64);
        let was_clear = self.words[w] & (1 << b) == 0;
        self.words[w] |= 1 << b;
        was_clear
    }

    /// Clear bit `i`.
    pub fn remove(&mut self, i: usize) {
        if let Some(word) = self.words.get_mut(i / 64) {
            *word &= !(1 << (i % 64));
        }
    }

    /// Whether bit `i` is set. Out-of-range bits read as clear.
    pub fn contains(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .is_some_and(|w| w & (1 << (i % 64)) != 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if any bit is set.
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// `self |= other`.
    pub fn union_with(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len, "bitset lengths differ");
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    /// `self &= !other`.
    pub fn difference_with(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len, "bitset lengths differ");
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !*b;
        }
    }

    /// True if no bit is set in both sets.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & b == 0)
    }

    /// Indices of set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            core::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let b = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * 64 + b)
            })
        })
    }

    /// Fold `bits` into a running union, recording bits seen twice into `overlap`.
    ///
    /// After calling this for every set in a family, `overlap` holds exactly the bits
    /// set in two or more members.
    pub(crate) fn accumulate(&mut self, bits: &Self, overlap: &mut Self) {
        for ((seen, multi), &b) in self
            .words
            .iter_mut()
            .zip(overlap.words.iter_mut())
            .zip(&bits.words)
        {
            *multi |= *seen & b;
            *seen |= b;
        }
    }

    /// Word count matches the length and no bit past `len` is set.
    pub(crate) fn is_well_formed(&self) -> bool {
        if self.words.len() != self.len.div_ceil(64) {
            return false;
        }
        match (self.len % 64, self.words.last()) {
            (0, _) | (_, None) => true,
            (tail, Some(&last)) => last >> tail == 0,
        }
    }
}

impl core::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitSet")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish_non_exhaustive()
    }
}

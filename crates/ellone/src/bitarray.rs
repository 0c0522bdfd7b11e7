//! Fixed-length bit vectors.
//!
//! Every symbol set computed by the analysis (FIRST, FOLLOW, ANY, SYNC and the
//! various visited marks) is a `BitArray`. The length is fixed at construction.
//! Binary operations between two arrays of different lengths only touch the
//! positions `0..min(self.len(), other.len())`; the remaining bits of `self`
//! are left as they are. Terminal sets are created before pragmas get their
//! indices, so this truncation happens on purpose.

use bit_set::BitSet;
use std::{cmp, fmt};

#[derive(Clone, Default)]
pub struct BitArray {
    len: usize,
    bits: BitSet,
}

#[allow(clippy::len_without_is_empty)]
impl BitArray {
    /// Create an array of `len` bits, all cleared.
    pub fn new(len: usize) -> Self {
        Self::with_value(len, false)
    }

    /// Create an array of `len` bits, all set to `value`.
    pub fn with_value(len: usize, value: bool) -> Self {
        let bits = if value {
            (0..len).collect()
        } else {
            BitSet::with_capacity(len)
        };
        Self { len, bits }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bit is set. A zero-length array is trivially clear.
    pub fn none(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of bits that are set.
    pub fn count(&self) -> usize {
        self.bits.len()
    }

    /// The caller must keep `index` below `len()`.
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "bit index out of range");
        self.bits.contains(index)
    }

    /// The caller must keep `index` below `len()`.
    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "bit index out of range");
        if value {
            self.bits.insert(index);
        } else {
            self.bits.remove(index);
        }
    }

    pub fn set_all(&mut self, value: bool) {
        *self = Self::with_value(self.len, value);
    }

    /// Indices of the set bits, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter()
    }

    /// Complement every bit in place.
    pub fn not(&mut self) {
        let mut full: BitSet = (0..self.len).collect();
        full.difference_with(&self.bits);
        self.bits = full;
    }

    pub fn and(&mut self, other: &Self) {
        let n = cmp::min(self.len, other.len);
        let rest: BitSet = self.bits.iter().filter(|&i| i >= n).collect();
        self.bits.intersect_with(&other.operand(n));
        self.bits.union_with(&rest);
    }

    pub fn and_not(&mut self, other: &Self) {
        let n = cmp::min(self.len, other.len);
        self.bits.difference_with(&other.operand(n));
    }

    pub fn or(&mut self, other: &Self) {
        let n = cmp::min(self.len, other.len);
        self.bits.union_with(&other.operand(n));
    }

    pub fn xor(&mut self, other: &Self) {
        let n = cmp::min(self.len, other.len);
        self.bits.symmetric_difference_with(&other.operand(n));
    }

    /// `self | other` as a new array.
    pub fn union(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.or(other);
        res
    }

    /// `self & other` as a new array.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.and(other);
        res
    }

    /// `self & !other` as a new array.
    pub fn difference(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.and_not(other);
        res
    }

    /// Structural equality: same length and same bit pattern.
    pub fn equal(&self, other: &Self) -> bool {
        self.len == other.len && self.bits.is_subset(&other.bits) && other.bits.is_subset(&self.bits)
    }

    /// Whether some index is set in both arrays.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    // the bits of `self` restricted to `0..n`
    fn operand(&self, n: usize) -> BitSet {
        if n >= self.len {
            self.bits.clone()
        } else {
            self.bits.iter().take_while(|&i| i < n).collect()
        }
    }
}

impl PartialEq for BitArray {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl Eq for BitArray {}

impl fmt::Debug for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitArray({})[", self.len)?;
        for i in 0..self.len {
            f.write_str(if self.bits.contains(i) { "1" } else { "0" })?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_bits(len: usize, ones: &[usize]) -> BitArray {
        let mut a = BitArray::new(len);
        for &i in ones {
            a.set(i, true);
        }
        a
    }

    #[test]
    fn construct_and_access() {
        let a = BitArray::with_value(11, true);
        assert_eq!(a.len(), 11);
        assert_eq!(a.count(), 11);
        assert!((0..11).all(|i| a.get(i)));

        let mut b = BitArray::new(11);
        assert!(b.none());
        b.set(3, true);
        b.set(10, true);
        b.set(3, false);
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![10]);

        b.set_all(true);
        assert_eq!(b.count(), 11);
        b.set_all(false);
        assert!(b.none());
    }

    #[test]
    fn not_stays_within_length() {
        let mut a = from_bits(10, &[0, 9]);
        a.not();
        assert_eq!(a.count(), 8);
        assert!(!a.get(0) && !a.get(9) && a.get(5));
        assert!(a.iter().all(|i| i < 10));
    }

    #[test]
    fn and_or_identity() {
        let u = BitArray::with_value(13, true);
        let v = from_bits(13, &[1, 4, 12]);
        let mut w = u.clone();
        w.and(&v);
        w.or(&v);
        assert_eq!(w, v);
    }

    #[test]
    fn xor_with_self_is_clear() {
        let u = from_bits(20, &[0, 7, 8, 19]);
        let mut w = u.clone();
        w.xor(&u);
        assert!(w.equal(&BitArray::new(20)));
        assert!(w.none());
        assert_eq!(w.len(), 20);
        assert!(!u.none());
        assert!(BitArray::new(0).none());
    }

    #[test]
    fn overlaps_matches_definition() {
        let u = from_bits(16, &[2, 5, 9]);
        let v = from_bits(16, &[3, 9]);
        let w = from_bits(16, &[4]);
        assert!(u.overlaps(&v));
        assert!(!u.overlaps(&w));
        assert!(!u.overlaps(&BitArray::new(16)));
    }

    #[test]
    fn and_not_removes_bits() {
        let mut u = from_bits(8, &[1, 2, 3]);
        u.and_not(&from_bits(8, &[2, 7]));
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn mismatched_lengths_truncate() {
        // longer receiver: bits past the shorter operand are untouched
        let mut long = from_bits(12, &[0, 1, 10]);
        long.and(&from_bits(4, &[1]));
        assert_eq!(long.iter().collect::<Vec<_>>(), vec![1, 10]);

        let mut long = from_bits(12, &[10]);
        long.xor(&BitArray::with_value(4, true));
        assert_eq!(long.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 10]);

        // shorter receiver: operand bits past its length are ignored
        let mut short = BitArray::new(4);
        short.or(&from_bits(12, &[2, 8, 11]));
        assert_eq!(short.iter().collect::<Vec<_>>(), vec![2]);

        let mut short = from_bits(4, &[0, 3]);
        short.and_not(&BitArray::with_value(12, true));
        assert!(short.none());
    }

    #[test]
    fn equality_requires_equal_length() {
        assert!(!BitArray::new(3).equal(&BitArray::new(4)));
        assert_eq!(from_bits(5, &[1]), from_bits(5, &[1]));
        assert_ne!(from_bits(5, &[1]), from_bits(5, &[2]));
    }

    #[test]
    fn immutable_operations_leave_operands() {
        let u = from_bits(6, &[0, 1]);
        let v = from_bits(6, &[1, 2]);
        assert_eq!(u.union(&v), from_bits(6, &[0, 1, 2]));
        assert_eq!(u.intersect(&v), from_bits(6, &[1]));
        assert_eq!(u.difference(&v), from_bits(6, &[0]));
        assert_eq!(u, from_bits(6, &[0, 1]));
    }
}

//! The `Range` indexed by `IntervalTree`, representing the closed interval [low, high]
//!
//! Both endpoints belong to the range, so `[0, 10]` and `[10, 20]` overlap at 10.
//! Ranges are ordered by their low endpoint first and their high endpoint second.
//! For instance, with ranges of type `Range<u32>`:
//! - [1,4]<[2,5], because 1<2
//! - [1,4]<[1,5], because 4<5
//!
//! So the order of the ranges above is [1,4]<[1,5]<[2,5].

use std::cmp::Ordering;
use std::fmt;

use crate::error::{RangeTreeError, Result};
use crate::order::{KeyOrder, NaturalOrder};

/// A closed range [low, high]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range<K> {
    low: K,
    high: K,
}

impl<K: Ord> Range<K> {
    /// Create a new `Range` under the natural order of `K`
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high
    ///
    /// # Example
    /// ```rust
    /// use range_tree::{Range, RangeTreeError};
    ///
    /// assert!(Range::new(1, 1).is_ok());
    /// assert_eq!(Range::new(3, 1), Err(RangeTreeError::InvalidRange));
    /// ```
    #[inline]
    pub fn new(low: K, high: K) -> Result<Self> {
        Self::new_by(low, high, &NaturalOrder)
    }

    /// Checks if `value` lies inside the range, endpoints included
    #[inline]
    pub fn contains(&self, value: &K) -> bool {
        self.contains_by(value, &NaturalOrder)
    }

    /// Checks if `value` lies strictly between the endpoints
    #[inline]
    pub fn contains_exclusive(&self, value: &K) -> bool {
        self.contains_exclusive_by(value, &NaturalOrder)
    }

    /// Checks if self overlaps with other range, touching endpoints included
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersects_by(other, &NaturalOrder)
    }

    /// Checks if self overlaps with other range, touching endpoints excluded
    #[inline]
    pub fn intersects_exclusive(&self, other: &Self) -> bool {
        self.intersects_exclusive_by(other, &NaturalOrder)
    }
}

impl<K> Range<K> {
    /// Create a new `Range` under the given key order
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high under `order`
    #[inline]
    pub fn new_by<O: KeyOrder<K>>(low: K, high: K, order: &O) -> Result<Self> {
        if order.gt(&low, &high) {
            return Err(RangeTreeError::InvalidRange);
        }
        Ok(Self { low, high })
    }

    /// Caller guarantees low <= high
    #[inline]
    pub(crate) fn new_unchecked(low: K, high: K) -> Self {
        Self { low, high }
    }

    /// Create the degenerate range [value, value]
    #[inline]
    pub fn point(value: K) -> Self
    where
        K: Clone,
    {
        Self {
            low: value.clone(),
            high: value,
        }
    }

    /// Low endpoint
    #[inline]
    pub fn low(&self) -> &K {
        &self.low
    }

    /// High endpoint
    #[inline]
    pub fn high(&self) -> &K {
        &self.high
    }

    /// Consumes the range, returning `(low, high)`
    #[inline]
    pub fn into_inner(self) -> (K, K) {
        (self.low, self.high)
    }

    pub fn contains_by<O: KeyOrder<K>>(&self, value: &K, order: &O) -> bool {
        !order.lt(value, &self.low) && !order.gt(value, &self.high)
    }

    pub fn contains_exclusive_by<O: KeyOrder<K>>(&self, value: &K, order: &O) -> bool {
        order.gt(value, &self.low) && order.lt(value, &self.high)
    }

    pub fn intersects_by<O: KeyOrder<K>>(&self, other: &Self, order: &O) -> bool {
        self.touches(&other.low, &other.high, order)
    }

    pub fn intersects_exclusive_by<O: KeyOrder<K>>(&self, other: &Self, order: &O) -> bool {
        order.gt(&other.high, &self.low) && order.lt(&other.low, &self.high)
    }

    /// Lexicographic comparison on (low, high) under `order`
    pub fn compare_by<O: KeyOrder<K>>(&self, other: &Self, order: &O) -> Ordering {
        order
            .compare(&self.low, &other.low)
            .then_with(|| order.compare(&self.high, &other.high))
    }

    /// Checks if self overlaps with [from, to] without building a `Range`
    #[inline]
    pub(crate) fn touches<O: KeyOrder<K>>(&self, from: &K, to: &K, order: &O) -> bool {
        !order.lt(to, &self.low) && !order.gt(from, &self.high)
    }
}

impl<K: fmt::Display> fmt::Display for Range<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {}", self.low, self.high)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_range_should_fail() {
        assert_eq!(Range::new(3, 1), Err(RangeTreeError::InvalidRange));
        assert_eq!(Range::new("b", "a"), Err(RangeTreeError::InvalidRange));
        assert_eq!(Range::new('z', 'a'), Err(RangeTreeError::InvalidRange));
    }

    #[test]
    fn endpoints_are_contained() {
        for (low, high) in [(0, 0), (-5, 5), (10, 20)] {
            let range = Range::new(low, high).unwrap();
            assert!(range.contains(&low));
            assert!(range.contains(&high));
            assert!(!range.contains(&(low - 1)));
            assert!(!range.contains(&(high + 1)));
        }
    }

    #[test]
    fn exclusive_checks_drop_the_borders() {
        let range = Range::new(0, 10).unwrap();
        assert!(range.contains_exclusive(&5));
        assert!(!range.contains_exclusive(&0));
        assert!(!range.contains_exclusive(&10));

        let touching = Range::new(10, 20).unwrap();
        assert!(range.intersects(&touching));
        assert!(touching.intersects(&range));
        assert!(!range.intersects_exclusive(&touching));
        assert!(range.intersects_exclusive(&Range::new(9, 20).unwrap()));
        assert!(!range.intersects(&Range::new(11, 20).unwrap()));
    }

    #[test]
    fn ranges_order_by_low_then_high() {
        let a = Range::new(1, 4).unwrap();
        let b = Range::new(1, 5).unwrap();
        let c = Range::new(2, 5).unwrap();
        assert!(a < b && b < c);
        assert_eq!(a.compare_by(&b, &NaturalOrder), Ordering::Less);
        assert_eq!(c.compare_by(&a, &NaturalOrder), Ordering::Greater);
        assert_eq!(a.compare_by(&a.clone(), &NaturalOrder), Ordering::Equal);
    }

    #[test]
    fn custom_order_decides_validity() {
        let reverse = |a: &i32, b: &i32| b.cmp(a);
        assert!(Range::new_by(10, 0, &reverse).is_ok());
        assert_eq!(Range::new_by(0, 10, &reverse), Err(RangeTreeError::InvalidRange));
        let range = Range::new_by(10, 0, &reverse).unwrap();
        assert!(range.contains_by(&5, &reverse));
        assert!(!range.contains_by(&11, &reverse));
    }

    #[test]
    fn point_range_and_display() {
        let point = Range::point(7);
        assert_eq!(point.low(), point.high());
        assert!(point.contains(&7));
        assert_eq!(Range::new(1, 2).unwrap().to_string(), "1 - 2");
    }
}

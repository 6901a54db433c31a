use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::order::{KeyOrder, NaturalOrder};
use crate::range::Range;

/// A range-value pair, the unit indexed by an `IntervalTree`.
///
/// Equality and hashing only look at the value, so two entries carrying
/// equal values are the same entry as far as removal is concerned.
#[derive(Clone, Debug)]
pub struct Entry<K, V> {
    range: Range<K>,
    value: V,
}

impl<K: Ord, V> Entry<K, V> {
    /// Create a new `Entry` under the natural order of `K`
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high
    ///
    /// # Example
    /// ```rust
    /// use range_tree::Entry;
    ///
    /// let entry = Entry::new(0, 10, "a").unwrap();
    /// assert_eq!(entry.low(), &0);
    /// assert_eq!(entry.value(), &"a");
    /// assert!(Entry::new(10, 0, "b").is_err());
    /// ```
    #[inline]
    pub fn new(low: K, high: K, value: V) -> Result<Self> {
        Self::new_by(low, high, value, &NaturalOrder)
    }
}

impl<K, V> Entry<K, V> {
    /// Create a new `Entry` under the given key order
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high under `order`
    #[inline]
    pub fn new_by<O: KeyOrder<K>>(low: K, high: K, value: V, order: &O) -> Result<Self> {
        Ok(Self::from_range(Range::new_by(low, high, order)?, value))
    }

    /// Create a new `Entry` from an already validated `Range`
    #[inline]
    pub fn from_range(range: Range<K>, value: V) -> Self {
        Self { range, value }
    }

    pub fn range(&self) -> &Range<K> {
        &self.range
    }

    pub fn low(&self) -> &K {
        self.range.low()
    }

    pub fn high(&self) -> &K {
        self.range.high()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_parts(self) -> (Range<K>, V) {
        (self.range, self.value)
    }
}

impl<K, V: PartialEq> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K, V: Eq> Eq for Entry<K, V> {}

impl<K, V: Hash> Hash for Entry<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.range, self.value)
    }
}

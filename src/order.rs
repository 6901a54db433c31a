use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::entry::Entry;

/// A total order over the keys of a tree.
///
/// Every tree stores its own order and hands it to each node it builds or
/// queries. Closures of the shape `Fn(&K, &K) -> Ordering` are orders too:
///
/// ```rust
/// use range_tree::IntervalTree;
///
/// // Keys ordered from largest to smallest.
/// let mut tree = IntervalTree::with_order(|a: &i32, b: &i32| b.cmp(a));
/// tree.add(10, 0, "descending").unwrap();
/// assert_eq!(tree.query(&5), vec![&"descending"]);
/// ```
pub trait KeyOrder<K> {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// Returns `true` if `a` sorts before `b`.
    #[inline(always)]
    fn lt(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Returns `true` if `a` sorts after `b`.
    #[inline(always)]
    fn gt(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Greater
    }
}

/// The natural order of a key type, i.e. its `Ord` implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<K: Ord> KeyOrder<K> for NaturalOrder {
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> KeyOrder<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Ordering of the entries stored inside one node.
///
/// Entries must still come out sorted by their low endpoint, since queries
/// stop scanning a node at the first entry that starts past the query.
pub struct EntryOrder<K, V>(Arc<dyn Fn(&Entry<K, V>, &Entry<K, V>) -> Ordering + Send + Sync>);

impl<K, V> EntryOrder<K, V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Entry<K, V>, &Entry<K, V>) -> Ordering + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn compare(&self, a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering {
        (self.0)(a, b)
    }
}

impl<K, V> Clone for EntryOrder<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> fmt::Debug for EntryOrder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("EntryOrder(..)")
    }
}

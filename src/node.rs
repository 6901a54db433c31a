use std::cmp::Ordering;
use std::sync::Arc;

use crate::entry::Entry;
use crate::order::{EntryOrder, KeyOrder};
use crate::range::Range;

/// Node of the centered interval tree
///
/// A node is built once from a fixed list of entries and never changes
/// afterwards; a rebuild replaces the whole tree.
#[derive(Debug)]
pub struct TreeNode<K, V> {
    /// Partition key, `None` only for the empty leaf
    center: Option<K>,
    /// Entries containing the center, sorted by low endpoint
    entries: Option<Box<[Arc<Entry<K, V>>]>>,
    /// Subtree of entries ending before the center
    left: Option<Box<TreeNode<K, V>>>,
    /// Subtree of entries starting after the center
    right: Option<Box<TreeNode<K, V>>>,
    /// Smallest low and largest high endpoint of the subtree
    bounds: Option<Range<K>>,
}

impl<K, V> TreeNode<K, V> {
    /// The empty leaf, which matches nothing
    pub(crate) fn empty() -> Self {
        Self {
            center: None,
            entries: None,
            left: None,
            right: None,
            bounds: None,
        }
    }

    /// Builds the subtree holding `entries`.
    ///
    /// The median of all endpoints becomes the center. Entries ending before
    /// it go left, entries starting after it go right, and the rest stay in
    /// this node.
    pub(crate) fn build<O>(
        entries: Vec<Arc<Entry<K, V>>>,
        order: &O,
        entry_order: Option<&EntryOrder<K, V>>,
    ) -> Self
    where
        K: Clone,
        O: KeyOrder<K>,
    {
        let (center, bounds) = {
            let mut endpoints: Vec<&K> = Vec::with_capacity(entries.len() * 2);
            for entry in &entries {
                endpoints.push(entry.low());
                endpoints.push(entry.high());
            }
            endpoints.sort_by(|a, b| order.compare(a, b));

            match (
                endpoints.first(),
                endpoints.get(endpoints.len() / 2),
                endpoints.last(),
            ) {
                (Some(&min), Some(&center), Some(&max)) => (
                    center.clone(),
                    Range::new_unchecked(min.clone(), max.clone()),
                ),
                _ => return Self::empty(),
            }
        };

        let mut inner = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for entry in entries {
            if order.lt(entry.high(), &center) {
                left.push(entry);
            } else if order.gt(entry.low(), &center) {
                right.push(entry);
            } else {
                inner.push(entry);
            }
        }

        match entry_order {
            Some(entry_order) => inner.sort_by(|a, b| entry_order.compare(a, b)),
            None => inner.sort_by(|a, b| a.range().compare_by(b.range(), order)),
        }

        let child = |entries: Vec<Arc<Entry<K, V>>>| {
            (!entries.is_empty()).then(|| Box::new(Self::build(entries, order, entry_order)))
        };

        Self {
            center: Some(center),
            entries: (!inner.is_empty()).then(|| inner.into_boxed_slice()),
            left: child(left),
            right: child(right),
            bounds: Some(bounds),
        }
    }

    /// Collects every entry containing `value` into `out`.
    ///
    /// Own entries come first, followed by the matches of the one child on
    /// the side of `value`.
    pub(crate) fn query_point<'a, O>(
        &'a self,
        value: &K,
        order: &O,
        out: &mut Vec<&'a Arc<Entry<K, V>>>,
    ) where
        O: KeyOrder<K>,
    {
        let Some(center) = &self.center else {
            return;
        };

        if let Some(entries) = &self.entries {
            for entry in entries.iter() {
                if order.gt(entry.low(), value) {
                    break;
                }
                if !order.gt(value, entry.high()) {
                    out.push(entry);
                }
            }
        }

        // entries containing the center itself all live in this node
        let child = match order.compare(value, center) {
            Ordering::Less => &self.left,
            Ordering::Greater => &self.right,
            Ordering::Equal => return,
        };
        if let Some(child) = child {
            child.query_point(value, order, out);
        }
    }

    /// Collects every entry overlapping [from, to] into `out`.
    pub(crate) fn query_range<'a, O>(
        &'a self,
        from: &K,
        to: &K,
        order: &O,
        out: &mut Vec<&'a Arc<Entry<K, V>>>,
    ) where
        O: KeyOrder<K>,
    {
        let Some(center) = &self.center else {
            return;
        };

        if let Some(entries) = &self.entries {
            for entry in entries.iter() {
                if order.gt(entry.low(), to) {
                    break;
                }
                if entry.range().touches(from, to, order) {
                    out.push(entry);
                }
            }
        }

        if let Some(left) = self.left.as_deref().filter(|_| order.lt(from, center)) {
            left.query_range(from, to, order, out);
        }
        if let Some(right) = self.right.as_deref().filter(|_| order.gt(to, center)) {
            right.query_range(from, to, order, out);
        }
    }

    /// Partition key of the node, `None` for the empty leaf
    pub fn center(&self) -> Option<&K> {
        self.center.as_ref()
    }

    /// Entries stored in this node
    pub fn entries(&self) -> &[Arc<Entry<K, V>>] {
        self.entries.as_deref().unwrap_or_default()
    }

    pub fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }

    pub fn is_empty_leaf(&self) -> bool {
        self.center.is_none()
    }

    /// Smallest low endpoint in the subtree
    pub fn min(&self) -> Option<&K> {
        self.bounds.as_ref().map(Range::low)
    }

    /// Largest high endpoint in the subtree
    pub fn max(&self) -> Option<&K> {
        self.bounds.as_ref().map(Range::high)
    }

    /// Number of entries in the subtree
    pub fn len(&self) -> usize {
        self.entries().len()
            + self.left().map_or(0, Self::len)
            + self.right().map_or(0, Self::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels below and including this node
    pub fn depth(&self) -> usize {
        if self.is_empty_leaf() {
            return 0;
        }
        1 + self
            .left()
            .map_or(0, Self::depth)
            .max(self.right().map_or(0, Self::depth))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::order::NaturalOrder;

    fn entries(ranges: &[(i32, i32)]) -> Vec<Arc<Entry<i32, usize>>> {
        ranges
            .iter()
            .enumerate()
            .map(|(v, &(low, high))| Arc::new(Entry::new(low, high, v).unwrap()))
            .collect()
    }

    fn build(ranges: &[(i32, i32)]) -> TreeNode<i32, usize> {
        TreeNode::build(entries(ranges), &NaturalOrder, None)
    }

    impl TreeNode<i32, usize> {
        /// Every entry in `left` ends before the center, every entry in `right`
        /// starts after it, and own entries contain it, sorted by low endpoint.
        fn check_partition(&self) {
            let Some(&center) = self.center() else {
                assert!(self.entries.is_none());
                assert!(self.left.is_none() && self.right.is_none());
                return;
            };
            if let Some(entries) = &self.entries {
                assert!(!entries.is_empty());
                assert!(entries.iter().all(|e| e.range().contains(&center)));
                assert!(entries.windows(2).all(|w| w[0].range() <= w[1].range()));
            }
            if let Some(left) = self.left() {
                assert!(left.max().is_some_and(|&max| max < center));
                left.check_partition();
            }
            if let Some(right) = self.right() {
                assert!(right.min().is_some_and(|&min| min > center));
                right.check_partition();
            }
        }

        fn point(&self, value: i32) -> Vec<usize> {
            let mut out = Vec::new();
            self.query_point(&value, &NaturalOrder, &mut out);
            out.into_iter().map(|e| *e.value()).collect()
        }

        fn range(&self, from: i32, to: i32) -> Vec<usize> {
            let mut out = Vec::new();
            self.query_range(&from, &to, &NaturalOrder, &mut out);
            out.into_iter().map(|e| *e.value()).collect()
        }
    }

    #[test]
    fn empty_input_builds_empty_leaf() {
        let node = build(&[]);
        assert!(node.is_empty_leaf());
        assert!(node.is_empty());
        assert_eq!(node.depth(), 0);
        assert_eq!(node.min(), None);
        assert_eq!(node.max(), None);
        assert!(node.point(0).is_empty());
        assert!(node.range(i32::MIN, i32::MAX).is_empty());
    }

    #[test]
    fn center_is_the_median_endpoint() {
        let node = build(&[(0, 10), (20, 30), (15, 17), (25, 35)]);
        node.check_partition();
        assert_eq!(node.center(), Some(&20));
        assert_eq!(node.entries().len(), 1);
        assert_eq!(node.left().and_then(TreeNode::center), Some(&15));
        assert_eq!(node.right().and_then(TreeNode::center), Some(&35));
        assert_eq!(node.min(), Some(&0));
        assert_eq!(node.max(), Some(&35));
        assert_eq!(node.len(), 4);
        assert_eq!(node.depth(), 3);
    }

    #[test]
    fn identical_ranges_stay_in_one_node() {
        let node = build(&[(3, 7); 50]);
        node.check_partition();
        assert_eq!(node.depth(), 1);
        assert_eq!(node.entries().len(), 50);
        assert_eq!(node.point(5).len(), 50);
    }

    #[test]
    fn value_on_center_skips_children() {
        let node = build(&[(0, 4), (5, 5), (6, 10)]);
        node.check_partition();
        assert_eq!(node.center(), Some(&5));
        assert_eq!(node.point(5), vec![1]);
        assert_eq!(node.point(4), vec![0]);
        assert_eq!(node.point(6), vec![2]);
    }

    #[test]
    fn early_exit_keeps_every_match() {
        // all of these contain 50, most start well before the query point
        let node = build(&[(50, 60), (0, 100), (40, 55), (49, 51), (10, 50), (51, 90)]);
        node.check_partition();
        let mut found = node.point(50);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn range_query_visits_both_children() {
        let node = build(&[(0, 1), (10, 11), (20, 21), (30, 31), (40, 41)]);
        node.check_partition();
        let mut found = node.range(1, 30);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2, 3]);
        assert_eq!(node.range(42, 50), Vec::<usize>::new());
    }

    #[test]
    fn entry_order_decides_node_layout() {
        let by_value_desc = EntryOrder::new(|a: &Entry<i32, usize>, b: &Entry<i32, usize>| {
            a.range()
                .compare_by(b.range(), &NaturalOrder)
                .then(b.value().cmp(a.value()))
        });
        let node = TreeNode::build(
            entries(&[(0, 10), (0, 10), (0, 10)]),
            &NaturalOrder,
            Some(&by_value_desc),
        );
        assert_eq!(node.point(5), vec![2, 1, 0]);
    }
}

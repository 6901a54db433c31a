use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::entry::Entry;
use crate::error::Result;
use crate::iter::{Iter, Values};
use crate::node::TreeNode;
use crate::order::{EntryOrder, KeyOrder, NaturalOrder};

/// Whether the queryable structure reflects the current entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// The root was built from exactly the current entries.
    Synced,
    /// Entries changed since the last build.
    Stale,
}

/// A centered interval tree over closed ranges, rebuilt lazily.
///
/// Mutations only touch the entry buffer and mark the tree stale. The next
/// query rebuilds the whole tree, so batching mutations before querying
/// amortizes the O(n log n) build.
pub struct IntervalTree<K, V, O = NaturalOrder> {
    /// Every entry of the tree, in insertion order
    pub(crate) items: Vec<Arc<Entry<K, V>>>,
    /// Root built from `items`, possibly stale
    pub(crate) root: TreeNode<K, V>,
    pub(crate) state: SyncState,
    pub(crate) auto_rebuild: bool,
    pub(crate) order: O,
    pub(crate) entry_order: Option<EntryOrder<K, V>>,
}

impl<K, V> IntervalTree<K, V>
where
    K: Ord + Clone,
{
    /// Create an empty `IntervalTree` ordered by `K: Ord`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_order(NaturalOrder)
    }

    /// Create an `IntervalTree` holding `entries`, built right away
    #[inline]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry<K, V>>,
    {
        Self::from_entries_with_order(entries, NaturalOrder)
    }
}

impl<K, V> Default for IntervalTree<K, V>
where
    K: Ord + Clone,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, O> IntervalTree<K, V, O>
where
    K: Clone,
    O: KeyOrder<K>,
{
    /// Create an empty `IntervalTree` using `order` to compare keys
    #[inline]
    pub fn with_order(order: O) -> Self {
        IntervalTree {
            items: Vec::new(),
            root: TreeNode::empty(),
            state: SyncState::Synced,
            auto_rebuild: true,
            order,
            entry_order: None,
        }
    }

    /// Create an `IntervalTree` holding `entries` under `order`, built right away
    ///
    /// The entries must be valid under `order`.
    pub fn from_entries_with_order<I>(entries: I, order: O) -> Self
    where
        I: IntoIterator<Item = Entry<K, V>>,
    {
        let mut tree = Self::with_order(order);
        tree.extend(entries);
        tree.rebuild();
        tree
    }

    /// Build a tree over entries shared with another tree
    pub(crate) fn from_shared(
        items: Vec<Arc<Entry<K, V>>>,
        order: O,
        entry_order: Option<EntryOrder<K, V>>,
    ) -> Self {
        let mut tree = IntervalTree {
            items,
            root: TreeNode::empty(),
            state: SyncState::Stale,
            auto_rebuild: false,
            order,
            entry_order,
        };
        tree.rebuild();
        tree
    }

    /// Sort the entries inside each node with `entry_order` instead of by range.
    ///
    /// `entry_order` must keep entries sorted by their low endpoint, otherwise
    /// queries may miss matches.
    #[must_use]
    pub fn with_entry_order(mut self, entry_order: EntryOrder<K, V>) -> Self {
        self.entry_order = Some(entry_order);
        self.state = SyncState::Stale;
        self
    }

    /// Add an entry covering [low, high]
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high; nothing is stored.
    ///
    /// # Example
    /// ```rust
    /// use range_tree::IntervalTree;
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.add(0, 10, "a").unwrap();
    /// assert!(tree.add(10, 0, "b").is_err());
    /// assert_eq!(tree.len(), 1);
    /// ```
    #[inline]
    pub fn add(&mut self, low: K, high: K, value: V) -> Result<()> {
        let entry = Entry::new_by(low, high, value, &self.order)?;
        self.add_entry(entry);
        Ok(())
    }

    /// Add an already constructed entry
    #[inline]
    pub fn add_entry(&mut self, entry: Entry<K, V>) {
        self.items.push(Arc::new(entry));
        self.state = SyncState::Stale;
    }

    /// Remove every entry carrying `value`. Removing an absent value does nothing.
    ///
    /// # Example
    /// ```rust
    /// use range_tree::IntervalTree;
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.add(1, 3, 1).unwrap();
    /// tree.add(2, 4, 2).unwrap();
    /// tree.remove(&5);
    /// assert_eq!(tree.len(), 2);
    /// tree.remove(&2);
    /// assert_eq!(tree.len(), 1);
    /// assert!(tree.query(&4).is_empty());
    /// ```
    pub fn remove(&mut self, value: &V)
    where
        V: PartialEq,
    {
        self.retain(|entry| entry.value() != value);
    }

    /// Remove every entry whose value is one of `values`
    pub fn remove_all<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = &'a V>,
        V: Eq + Hash + 'a,
    {
        let values: HashSet<&V> = values.into_iter().collect();
        if values.is_empty() {
            return;
        }
        self.retain(|entry| !values.contains(entry.value()));
    }

    fn retain(&mut self, mut keep: impl FnMut(&Entry<K, V>) -> bool) {
        let len = self.items.len();
        self.items.retain(|entry| keep(entry));
        if self.items.len() != len {
            self.state = SyncState::Stale;
        }
    }

    /// Remove all entries
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.root = TreeNode::empty();
        self.state = SyncState::Synced;
    }

    /// Find the values of all entries containing `value`.
    ///
    /// # Example
    /// ```rust
    /// use range_tree::IntervalTree;
    ///
    /// let mut tree = IntervalTree::new();
    /// tree.add(0, 10, "1").unwrap();
    /// tree.add(20, 30, "2").unwrap();
    /// tree.add(15, 17, "3").unwrap();
    /// tree.add(25, 35, "4").unwrap();
    /// assert_eq!(tree.query(&10), vec![&"1"]);
    /// assert_eq!(tree.query(&29), vec![&"2", &"4"]);
    /// ```
    pub fn query(&mut self, value: &K) -> Vec<&V> {
        self.query_entries(value)
            .into_iter()
            .map(Entry::value)
            .collect()
    }

    /// Find the values of all entries overlapping [from, to], endpoints included.
    ///
    /// An inverted query range (from > to) overlaps nothing.
    pub fn query_range(&mut self, from: &K, to: &K) -> Vec<&V> {
        self.query_range_entries(from, to)
            .into_iter()
            .map(Entry::value)
            .collect()
    }

    /// Find all entries containing `value`
    pub fn query_entries(&mut self, value: &K) -> Vec<&Entry<K, V>> {
        self.refresh();
        self.lookup_point(value)
            .into_iter()
            .map(|entry| &**entry)
            .collect()
    }

    /// Find all entries overlapping [from, to]
    pub fn query_range_entries(&mut self, from: &K, to: &K) -> Vec<&Entry<K, V>> {
        self.refresh();
        self.lookup_range(from, to)
            .into_iter()
            .map(|entry| &**entry)
            .collect()
    }

    /// Rebuild the tree from the current entries if it is stale.
    pub fn rebuild(&mut self) {
        if self.state == SyncState::Synced {
            return;
        }
        debug!(entries = self.items.len(), "rebuilding interval tree");
        self.root = TreeNode::build(self.items.clone(), &self.order, self.entry_order.as_ref());
        self.state = SyncState::Synced;
    }

    /// Smallest low endpoint over all entries, `None` when the tree is empty.
    ///
    /// Always rebuilds a stale tree, even with auto-rebuild off.
    pub fn min(&mut self) -> Option<&K> {
        self.rebuild();
        self.root.min()
    }

    /// Largest high endpoint over all entries, `None` when the tree is empty.
    ///
    /// Always rebuilds a stale tree, even with auto-rebuild off.
    pub fn max(&mut self) -> Option<&K> {
        self.rebuild();
        self.root.max()
    }

    /// Rebuild before a read unless auto-rebuild is off
    fn refresh(&mut self) {
        if self.state == SyncState::Stale {
            if self.auto_rebuild {
                self.rebuild();
            } else {
                trace!("serving query from a stale interval tree");
            }
        }
    }

    /// Point lookup on the current root, stale or not
    pub(crate) fn lookup_point(&self, value: &K) -> Vec<&Arc<Entry<K, V>>> {
        let mut out = Vec::new();
        self.root.query_point(value, &self.order, &mut out);
        out
    }

    /// Range lookup on the current root, stale or not
    pub(crate) fn lookup_range(&self, from: &K, to: &K) -> Vec<&Arc<Entry<K, V>>> {
        let mut out = Vec::new();
        if !self.order.gt(from, to) {
            self.root.query_range(from, to, &self.order, &mut out);
        }
        out
    }
}

impl<K, V, O> IntervalTree<K, V, O> {
    /// Return the number of entries in the tree.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` if the tree contains no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get an iterator over the entries, in insertion order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.items)
    }

    /// Get an iterator over the values, in insertion order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(&self.items)
    }

    #[inline]
    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    #[inline]
    pub fn is_in_sync(&self) -> bool {
        self.state == SyncState::Synced
    }

    #[inline]
    pub fn auto_rebuild(&self) -> bool {
        self.auto_rebuild
    }

    /// Turn automatic rebuilds on queries on or off.
    ///
    /// With auto-rebuild off, queries answer from the last built tree until
    /// `rebuild` is called.
    #[inline]
    pub fn set_auto_rebuild(&mut self, auto_rebuild: bool) {
        self.auto_rebuild = auto_rebuild;
    }

    /// Root of the last built tree
    #[inline]
    pub fn root(&self) -> &TreeNode<K, V> {
        &self.root
    }

    #[inline]
    pub fn order(&self) -> &O {
        &self.order
    }
}

impl<K, V, O> Extend<Entry<K, V>> for IntervalTree<K, V, O> {
    fn extend<I: IntoIterator<Item = Entry<K, V>>>(&mut self, iter: I) {
        let len = self.items.len();
        self.items.extend(iter.into_iter().map(Arc::new));
        if self.items.len() != len {
            self.state = SyncState::Stale;
        }
    }
}

impl<K, V> FromIterator<Entry<K, V>> for IntervalTree<K, V>
where
    K: Ord + Clone,
{
    fn from_iter<I: IntoIterator<Item = Entry<K, V>>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<'a, K, V, O> IntoIterator for &'a IntervalTree<K, V, O> {
    type Item = &'a Entry<K, V>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for IntervalTree<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IntervalTree")
            .field("items", &self.items)
            .field("state", &self.state)
            .field("auto_rebuild", &self.auto_rebuild)
            .finish_non_exhaustive()
    }
}

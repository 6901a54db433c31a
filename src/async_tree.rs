//! An interval tree that rebuilds on a background thread.
//!
//! `AsyncIntervalTree` keeps an immutable, fully built `IntervalTree` and two
//! generations of mutation buffers next to it:
//! - the live buffers, receiving every `add` and `remove`;
//! - the rebuilding buffers, frozen while a worker builds the next tree from
//!   the committed one plus their content.
//!
//! Queries never wait for the worker. They answer from the committed tree and
//! both add buffers, hiding every entry removed after it was added. Once the
//! live buffers grow past the `RebuildPolicy` thresholds a worker starts;
//! when it finishes it publishes the new tree and immediately starts over if
//! enough mutations piled up in the meantime.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::sync::atomic::{self, AtomicBool};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::Result;
use crate::order::{KeyOrder, NaturalOrder};
use crate::tree::IntervalTree;

/// Buffer sizes above which a background rebuild starts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RebuildPolicy {
    /// Rebuild once more than this many adds are buffered
    pub add_threshold: usize,
    /// Rebuild once more than this many removes are buffered
    pub remove_threshold: usize,
}

impl RebuildPolicy {
    #[must_use]
    pub fn with_add_threshold(mut self, add_threshold: usize) -> Self {
        self.add_threshold = add_threshold;
        self
    }

    #[must_use]
    pub fn with_remove_threshold(mut self, remove_threshold: usize) -> Self {
        self.remove_threshold = remove_threshold;
        self
    }

    fn exceeded(&self, added: usize, removed: usize) -> bool {
        added > self.add_threshold || removed > self.remove_threshold
    }
}

impl Default for RebuildPolicy {
    fn default() -> Self {
        Self {
            add_threshold: 100,
            remove_threshold: 10,
        }
    }
}

/// Signals a rebuild that its result must not be published
#[derive(Clone, Debug, Default)]
struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn cancel(&self) {
        self.0.store(true, atomic::Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(atomic::Ordering::Acquire)
    }
}

/// Everything a worker needs to build the next tree off the lock
struct Job<K, V, O> {
    base: Arc<IntervalTree<K, V, O>>,
    added: Vec<Arc<Entry<K, V>>>,
    removed: Arc<HashSet<V>>,
    cancel: CancelFlag,
}

impl<K, V, O> Job<K, V, O>
where
    K: Clone,
    V: Eq + Hash,
    O: KeyOrder<K> + Clone,
{
    fn build(self) -> IntervalTree<K, V, O> {
        let mut items: Vec<_> = self
            .base
            .items
            .iter()
            .filter(|entry| !self.removed.contains(entry.value()))
            .cloned()
            .collect();
        items.extend(self.added);
        IntervalTree::from_shared(
            items,
            self.base.order.clone(),
            self.base.entry_order.clone(),
        )
    }
}

struct State<K, V, O> {
    /// Last published tree
    committed: Arc<IntervalTree<K, V, O>>,
    /// Adds since the running rebuild started
    added: Vec<Arc<Entry<K, V>>>,
    /// Removes since the running rebuild started
    removed: HashSet<V>,
    /// Adds being folded into the next tree
    rebuilding_added: Vec<Arc<Entry<K, V>>>,
    /// Removes being applied to the next tree
    rebuilding_removed: Arc<HashSet<V>>,
    rebuilding: bool,
    /// A manual rebuild was asked for
    requested: bool,
    cancel: CancelFlag,
}

impl<K, V, O> State<K, V, O>
where
    V: Eq + Hash,
{
    /// Moves the live buffers into the rebuilding ones if a rebuild is due.
    fn next_job(&mut self, policy: &RebuildPolicy) -> Option<Job<K, V, O>> {
        let due = self.requested || policy.exceeded(self.added.len(), self.removed.len());
        self.requested = false;
        if !due || (self.added.is_empty() && self.removed.is_empty()) {
            return None;
        }
        self.rebuilding_added = mem::take(&mut self.added);
        self.rebuilding_removed = Arc::new(mem::take(&mut self.removed));
        Some(self.current_job())
    }

    fn current_job(&self) -> Job<K, V, O> {
        Job {
            base: Arc::clone(&self.committed),
            added: self.rebuilding_added.clone(),
            removed: Arc::clone(&self.rebuilding_removed),
            cancel: self.cancel.clone(),
        }
    }

    /// Committed hits still visible, plus matching buffered adds
    fn merge<'a, I, F>(&'a self, committed: I, matches: F) -> Vec<Arc<Entry<K, V>>>
    where
        I: IntoIterator<Item = &'a Arc<Entry<K, V>>>,
        F: Fn(&Entry<K, V>) -> bool,
    {
        let committed = committed.into_iter().filter(|entry| {
            !self.rebuilding_removed.contains(entry.value()) && !self.removed.contains(entry.value())
        });
        let rebuilding = self
            .rebuilding_added
            .iter()
            .filter(|entry| matches(entry) && !self.removed.contains(entry.value()));
        // removes purge the live add buffer directly
        let live = self.added.iter().filter(|entry| matches(entry));
        committed.chain(rebuilding).chain(live).cloned().collect()
    }

    fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.rebuilding_added.is_empty()
            && self.rebuilding_removed.is_empty()
    }
}

struct Shared<K, V, O> {
    state: Mutex<State<K, V, O>>,
    /// Notified whenever the worker goes idle
    idle: Condvar,
    policy: RebuildPolicy,
    order: O,
}

impl<K, V, O> Shared<K, V, O>
where
    K: Clone + Send + Sync + 'static,
    V: Eq + Hash + Send + Sync + 'static,
    O: KeyOrder<K> + Clone + Send + Sync + 'static,
{
    /// Starts a worker if a rebuild is due and none is running.
    fn schedule(self: &Arc<Self>, mut state: MutexGuard<'_, State<K, V, O>>) {
        if state.rebuilding {
            return;
        }
        let Some(job) = state.next_job(&self.policy) else {
            return;
        };
        state.rebuilding = true;
        drop(state);

        debug!(
            added = job.added.len(),
            removed = job.removed.len(),
            "starting background rebuild"
        );
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("range-tree-rebuild".to_owned())
            .spawn(move || shared.run(job));
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn rebuild worker, rebuilding inline");
            let job = self.state.lock().current_job();
            self.run(job);
        }
    }

    /// Builds and publishes trees until no rebuild is due.
    fn run(&self, mut job: Job<K, V, O>) {
        loop {
            let cancel = job.cancel.clone();
            let tree = job.build();

            let mut state = self.state.lock();
            if cancel.is_cancelled() {
                debug!("discarding cancelled rebuild");
            } else {
                debug!(entries = tree.len(), "publishing rebuilt interval tree");
                state.committed = Arc::new(tree);
                state.rebuilding_added.clear();
                state.rebuilding_removed = Arc::default();
            }

            match state.next_job(&self.policy) {
                Some(next) => job = next,
                None => {
                    state.rebuilding = false;
                    self.idle.notify_all();
                    return;
                }
            }
        }
    }
}

/// A centered interval tree whose rebuilds run on a background thread.
///
/// All methods take `&self`; the tree can be shared between threads behind an
/// `Arc`. Results may lag behind recent mutations only in the sense that the
/// work of indexing them is deferred: every query sees every completed `add`
/// and `remove`.
///
/// # Example
/// ```rust
/// use range_tree::AsyncIntervalTree;
///
/// let tree = AsyncIntervalTree::new();
/// tree.add(0, 10, "a").unwrap();
/// tree.add(5, 15, "b").unwrap();
/// let mut found = tree.query(&7);
/// found.sort_unstable();
/// assert_eq!(found, vec!["a", "b"]);
///
/// tree.remove("a");
/// assert_eq!(tree.query(&7), vec!["b"]);
/// ```
pub struct AsyncIntervalTree<K, V, O = NaturalOrder> {
    shared: Arc<Shared<K, V, O>>,
}

impl<K, V> AsyncIntervalTree<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Eq + Hash + Send + Sync + 'static,
{
    /// Create an empty tree with the default `RebuildPolicy`
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(RebuildPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: RebuildPolicy) -> Self {
        Self::with_order_and_policy(NaturalOrder, policy)
    }

    /// Create a tree holding `entries`, built right away
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry<K, V>>,
    {
        Self::from_tree(IntervalTree::from_entries(entries), RebuildPolicy::default())
    }
}

impl<K, V> Default for AsyncIntervalTree<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, O> AsyncIntervalTree<K, V, O>
where
    K: Clone + Send + Sync + 'static,
    V: Eq + Hash + Send + Sync + 'static,
    O: KeyOrder<K> + Clone + Send + Sync + 'static,
{
    pub fn with_order(order: O) -> Self {
        Self::with_order_and_policy(order, RebuildPolicy::default())
    }

    pub fn with_order_and_policy(order: O, policy: RebuildPolicy) -> Self {
        Self::from_tree(IntervalTree::with_order(order), policy)
    }

    /// Wrap an existing tree, which becomes the first committed tree
    pub fn from_tree(mut tree: IntervalTree<K, V, O>, policy: RebuildPolicy) -> Self {
        tree.rebuild();
        tree.set_auto_rebuild(false);
        let order = tree.order.clone();
        let state = State {
            committed: Arc::new(tree),
            added: Vec::new(),
            removed: HashSet::new(),
            rebuilding_added: Vec::new(),
            rebuilding_removed: Arc::default(),
            rebuilding: false,
            requested: false,
            cancel: CancelFlag::default(),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                idle: Condvar::new(),
                policy,
                order,
            }),
        }
    }

    /// Add an entry covering [low, high]
    ///
    /// # Errors
    ///
    /// Returns `RangeTreeError::InvalidRange` when low > high; nothing is stored.
    pub fn add(&self, low: K, high: K, value: V) -> Result<()> {
        let entry = Entry::new_by(low, high, value, &self.shared.order)?;
        self.add_entry(entry);
        Ok(())
    }

    pub fn add_entry(&self, entry: Entry<K, V>) {
        let mut state = self.shared.state.lock();
        state.added.push(Arc::new(entry));
        self.shared.schedule(state);
    }

    /// Add every entry of `entries`
    pub fn extend<I>(&self, entries: I)
    where
        I: IntoIterator<Item = Entry<K, V>>,
    {
        let mut state = self.shared.state.lock();
        state.added.extend(entries.into_iter().map(Arc::new));
        self.shared.schedule(state);
    }

    /// Remove every entry carrying `value`.
    ///
    /// Only entries added before this call are removed; adding `value` again
    /// afterwards makes it visible even while a rebuild is still running.
    pub fn remove(&self, value: V) {
        self.remove_all([value]);
    }

    /// Remove every entry whose value is one of `values`
    pub fn remove_all<I>(&self, values: I)
    where
        I: IntoIterator<Item = V>,
    {
        let mut state = self.shared.state.lock();
        state.removed.extend(values);
        let State { added, removed, .. } = &mut *state;
        added.retain(|entry| !removed.contains(entry.value()));
        self.shared.schedule(state);
    }

    /// Remove all entries, dropping the result of any rebuild in flight
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.cancel.cancel();
        state.cancel = CancelFlag::default();
        state.committed = Arc::new(IntervalTree::from_shared(
            Vec::new(),
            state.committed.order.clone(),
            state.committed.entry_order.clone(),
        ));
        state.added.clear();
        state.removed.clear();
        state.rebuilding_added.clear();
        state.rebuilding_removed = Arc::default();
        state.requested = false;
    }

    /// Find all entries containing `value`
    pub fn query_entries(&self, value: &K) -> Vec<Arc<Entry<K, V>>> {
        let order = &self.shared.order;
        let state = self.shared.state.lock();
        let hits = state.committed.lookup_point(value);
        let found = state.merge(hits, |entry| entry.range().contains_by(value, order));
        self.shared.schedule(state);
        found
    }

    /// Find all entries overlapping [from, to]
    pub fn query_range_entries(&self, from: &K, to: &K) -> Vec<Arc<Entry<K, V>>> {
        let order = &self.shared.order;
        let state = self.shared.state.lock();
        let hits = state.committed.lookup_range(from, to);
        let found = state.merge(hits, |entry| {
            !order.gt(from, to) && entry.range().touches(from, to, order)
        });
        self.shared.schedule(state);
        found
    }

    /// Find the values of all entries containing `value`
    pub fn query(&self, value: &K) -> Vec<V>
    where
        V: Clone,
    {
        values_of(self.query_entries(value))
    }

    /// Find the values of all entries overlapping [from, to]
    pub fn query_range(&self, from: &K, to: &K) -> Vec<V>
    where
        V: Clone,
    {
        values_of(self.query_range_entries(from, to))
    }

    /// Start a rebuild for whatever is buffered, regardless of the thresholds.
    ///
    /// If a rebuild is already running, another one follows it.
    pub fn rebuild(&self) {
        let mut state = self.shared.state.lock();
        state.requested = true;
        self.shared.schedule(state);
    }

    /// Block until no rebuild is running
    pub fn wait_for_rebuild(&self) {
        let mut state = self.shared.state.lock();
        while state.rebuilding {
            self.shared.idle.wait(&mut state);
        }
    }

    /// All entries currently visible to queries
    pub fn entries(&self) -> Vec<Arc<Entry<K, V>>> {
        let state = self.shared.state.lock();
        state.merge(&state.committed.items, |_| true)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_rebuilding(&self) -> bool {
        self.shared.state.lock().rebuilding
    }

    /// Whether the committed tree holds every entry and no mutation is buffered
    pub fn is_in_sync(&self) -> bool {
        let state = self.shared.state.lock();
        !state.rebuilding && state.is_empty()
    }

    /// The last published tree
    pub fn committed(&self) -> Arc<IntervalTree<K, V, O>> {
        Arc::clone(&self.shared.state.lock().committed)
    }

    pub fn policy(&self) -> &RebuildPolicy {
        &self.shared.policy
    }
}

impl<K, V, O> Clone for AsyncIntervalTree<K, V, O> {
    /// Clones share the same tree
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V, O> fmt::Debug for AsyncIntervalTree<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("AsyncIntervalTree")
            .field("committed", &state.committed.len())
            .field("added", &(state.added.len() + state.rebuilding_added.len()))
            .field(
                "removed",
                &(state.removed.len() + state.rebuilding_removed.len()),
            )
            .field("rebuilding", &state.rebuilding)
            .field("policy", &self.shared.policy)
            .finish()
    }
}

fn values_of<K, V: Clone>(entries: Vec<Arc<Entry<K, V>>>) -> Vec<V> {
    entries.iter().map(|entry| entry.value().clone()).collect()
}

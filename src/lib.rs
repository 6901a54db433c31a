//! `range_tree` is a centered interval tree over closed ranges.
//!
//! Each node picks the median of all endpoints below it as its center, keeps
//! the entries containing that center sorted by their low endpoint, and hands
//! the entries left and right of it to two child nodes. A point query walks a
//! single root-to-leaf path; a range query may branch at every node it
//! straddles.
//!
//! The tree is immutable once built. Mutations only update a buffer of
//! entries and mark the tree stale, and the next query rebuilds it from
//! scratch, so adding many entries and then querying costs a single build.
//! `AsyncIntervalTree` moves those rebuilds to a background thread and keeps
//! answering queries from the previous tree plus the buffered mutations.
//!
//! # Example
//!
//! ```rust
//! use range_tree::IntervalTree;
//!
//! let mut tree = IntervalTree::new();
//! tree.add(0, 10, "1").unwrap();
//! tree.add(20, 30, "2").unwrap();
//! tree.add(15, 17, "3").unwrap();
//! tree.add(25, 35, "4").unwrap();
//!
//! assert_eq!(tree.query(&5), vec![&"1"]);
//! assert_eq!(tree.query_range(&5, &15), vec![&"3", &"1"]);
//! ```
//!

mod async_tree;
mod entry;
mod error;
mod iter;
mod node;
mod order;
mod range;
mod tree;


pub use async_tree::{AsyncIntervalTree, RebuildPolicy};
pub use entry::Entry;
pub use error::{RangeTreeError, Result};
pub use iter::{Iter, Values};
pub use node::TreeNode;
pub use order::{EntryOrder, KeyOrder, NaturalOrder};
pub use range::Range;
pub use tree::{IntervalTree, SyncState};

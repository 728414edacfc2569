//! chain-hashmap: a single-threaded hash map whose bucket chains are
//! contiguous runs of one shared, arena-backed linked list.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: separate chaining without per-bucket storage. Every record lives
//!   in one `List`; the bucket array only remembers where each chain starts.
//! - Layers:
//!   - List<T>: doubly-linked sequence over a generational `SlotMap` arena,
//!     closed into a ring by a sentinel position. Offers a crate-private
//!     splice capability (extract, detach, splice) that relinks nodes
//!     without touching payloads.
//!   - ChainHashMap<K, V, S>: owns a `List` of records plus a bucket array
//!     of `Option<NodeKey>` heads; all hashing, chain walking and rehash
//!     logic lives here.
//!
//! Constraints
//! - Single-threaded: no internal synchronization; callers needing shared
//!   access provide their own exclusion.
//! - Unique keys; inserting an existing key leaves the stored value alone.
//! - Records of one bucket are never interleaved with another bucket's
//!   records, so "walk from the head while the bucket matches" both finds
//!   every record of a chain and terminates.
//! - Each record caches its full hash and its bucket index. Rehash derives
//!   new indices from the cached hash; `K: Hash` never runs after insert.
//!
//! Rehash
//! - The current ring is detached in one step; its nodes are popped front
//!   to back and spliced into a fresh ring over the same arena under the
//!   new bucket count. No record is cloned, dropped or moved in memory, and
//!   node keys (hence `Handle`s) stay valid.
//! - Each relinked record becomes the head of its new chain, so order
//!   within a bucket may reverse across a rehash.
//!
//! Reentrancy
//! - Entry points that call user `Hash`/`Eq` code hold a debug-only guard;
//!   re-entering the same map from those callbacks panics in debug builds.
//!
//! Notes and non-goals
//! - The load-factor threshold is per instance, set through `MapConfig` or
//!   `set_max_load_factor`.
//! - The table grows geometrically and never shrinks on its own.
//! - Iteration order is sequence order: insertion and rehash dependent,
//!   never sorted.

pub mod chain_hash_map;
mod chain_hash_map_proptest;
pub mod config;
pub mod error;
pub mod list;
mod reentrancy;

// Public surface
pub use chain_hash_map::{ChainHashMap, Handle};
pub use config::MapConfig;
pub use error::MapError;
pub use list::{List, NodeKey, Position};

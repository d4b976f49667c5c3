//! # cachetree
//!
//! In-memory, multi-dimensional result cache with bounded size and LRU
//! eviction.
//!
//! ## Architecture
//! - **Tree**: records nested by an ordered list of key fields
//!   (e.g. `sex / estimate / age / year / location`)
//! - **LRU Index**: arena-backed doubly-linked list; tree leaves are its
//!   entries, so refresh and eviction are O(1)
//! - **Queries**: filtered `get` with arrays and wildcards, universally
//!   quantified `has`, and `get_diff` for partial cache hits
//!
//! ```
//! use cachetree::{CacheTree, Filter};
//! use serde_json::json;
//!
//! let cache = CacheTree::with_capacity(["sex", "age"], 1000)?;
//! cache.set_value(json!([{"sex": 1, "age": 1, "mean": 0.2}]))?;
//!
//! let filter = Filter::new().field("sex", 1).field("age", [1, 2]);
//! assert_eq!(cache.get(&filter).len(), 1);
//! assert!(!cache.has(&filter));
//! assert_eq!(cache.get_diff(&filter)?, Filter::new().field("sex", 1).field("age", [2]));
//! # Ok::<(), cachetree::Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod filter;
pub mod key;
pub mod lru;
mod node;
mod parser;
mod schema;
mod stats;
mod tree;

pub use cache::CacheTree;
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use filter::{Condition, Filter, Record};
pub use parser::parse_filter;
pub use schema::Schema;
pub use stats::{CacheStats, StatsSnapshot};

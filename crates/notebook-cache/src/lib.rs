//! Type-safe key-value storage for the notebook store.
//!
//! Plays the role of browser local storage for the server: string values
//! under string keys, with typed JSON access layered on top. Two backends
//! ship with the crate: an in-memory map and a single JSON file on disk.
//!
//! # Example
//!
//! ```rust
//! use notebook_cache::Cache;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Item {
//!     id: u64,
//!     quantity: i64,
//! }
//!
//! let cache = Cache::memory();
//! cache.set("notebook-cart", &vec![Item { id: 1, quantity: 2 }]).unwrap();
//!
//! let items: Option<Vec<Item>> = cache.get("notebook-cart").unwrap();
//! assert_eq!(items.unwrap()[0].quantity, 2);
//!
//! cache.delete("notebook-cart").unwrap();
//! ```

mod error;
mod kv;
mod store;

pub use error::CacheError;
pub use kv::Cache;
pub use store::{FileStore, MemoryStore, Store};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, FileStore, MemoryStore, Store};
}

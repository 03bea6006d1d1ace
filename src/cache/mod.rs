//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! anonymous GET/HEAD with a cache time
//!     → response.rs cache_key (method, path + query, vary headers)
//!     → store.rs CacheStore::get
//!         hit  → replay stored status, headers, body
//!         miss → dispatch → store for cache_time seconds
//! ```
//!
//! # Design Decisions
//! - Authenticated requests never read or write the shared cache
//! - Only 200 responses are stored

pub mod response;
pub mod store;

pub use response::{cache_key, CachedResponse};
pub use store::{CacheStore, MemoryStore};

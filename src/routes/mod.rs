//! Route discovery subsystem.
//!
//! # Data Flow
//! ```text
//! routes/ directory
//!     → builder.rs (walk, detect page/layout/handlers, bind registries)
//!     → RouteNode tree (node.rs), children in precedence order
//!     → table.rs (flatten + precedence.rs sort) → UrlTable
//!     → client.rs → nested ClientRoute descriptor
//!     → snapshot.rs (RouteSnapshot behind ArcSwap)
//!
//! Development:
//!     watcher.rs (notify) → rebuild → mpsc → RouteTable::replace
//! ```
//!
//! # Design Decisions
//! - The tree is immutable once built; a rebuild produces a new snapshot
//! - Matching is linear over the sorted table, first match wins

pub mod builder;
pub mod client;
pub mod node;
pub mod pattern;
pub mod precedence;
pub mod snapshot;
pub mod table;
pub mod watcher;

pub use builder::RouteTreeBuilder;
pub use client::{client_routes, ClientRoute};
pub use node::{ComponentModule, HandlerBinding, RouteNode};
pub use snapshot::{RouteSnapshot, RouteSource, RouteTable};
pub use table::{RouteMatch, RouteView, UrlEntry, UrlTable};
pub use watcher::RouteWatcher;

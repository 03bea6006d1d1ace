//! Handler subsystem.
//!
//! # Data Flow
//! ```text
//! HandlerModule (explicit table of named entries)
//!     → registry.rs (validate, pick loader, synthesize head, cache defaults)
//!     → HandlerRegistry (immutable, one per route node)
//!
//! At request time:
//!     Handler::call(&RouteRequest) → Reply
//!     → dispatch::coerce (Reply → HTTP response)
//! ```
//!
//! # Design Decisions
//! - Handler configuration is validated when the handler is constructed
//! - Return values are a closed sum type (`Reply` over `Value`)

pub mod handler;
pub mod method;
pub mod module;
pub mod registry;
pub mod reply;
pub mod value;

pub use handler::{CacheConfig, Handler, HandlerConfig, HandlerFn};
pub use method::Method;
pub use module::{HandlerModule, ModuleEntry, ModuleLoader, StaticModules};
pub use registry::HandlerRegistry;
pub use reply::Reply;
pub use value::{Entity, EntityError, Value};

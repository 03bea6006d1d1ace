//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span)
//!     → negotiate.rs (extension interception, Accept ranking, body parsing)
//!     → server.rs route_handler (prefix strip, RouteTable::resolve)
//!     → dispatch::Dispatcher
//!     → Send to client
//! ```

pub mod negotiate;
pub mod request;
pub mod server;

pub use negotiate::prefers_json;
pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

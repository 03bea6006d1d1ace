//! File-system routing for server-rendered sites.
//!
//! A routes directory is walked into a tree of route nodes, each optionally
//! carrying a page component, a layout component and a handler module. The
//! tree is flattened into a precedence-ordered URL table and a client route
//! tree; requests are dispatched to method handlers or rendered as pages.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;

pub use config::schema::SiteConfig;
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routes::{RouteSnapshot, RouteSource, RouteTable};

//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RouteMatch + RouteRequest
//!     → dispatcher.rs (page or handler, 405/OPTIONS, subpath lookup)
//!     → coerce.rs (Reply → Coerced → Response)
//!     → cache_policy.rs (Cache-Control / Expires / Vary)
//!     → page.rs (PageRenderer) for HTML page responses
//! ```
//!
//! # Design Decisions
//! - Dispatch is stateless; only the shared response cache is mutable
//! - Handler bugs surface as `DispatchError`, never as a guessed response

pub mod cache_policy;
pub mod coerce;
pub mod dispatcher;
pub mod error_page;
pub mod page;
pub mod request;

pub use cache_policy::apply_cache_policy;
pub use coerce::{coerce, Coerced};
pub use dispatcher::{allowed_methods, Dispatcher};
pub use error_page::error_response;
pub use page::{PageContext, PageRenderer, RenderError, ShellRenderer, SiteMeta};
pub use request::{Principal, RequestData, RouteRequest};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build routes → Bind listener → Start watcher → Serve
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting, drains → watcher and reload task exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - A route tree that fails to build prevents startup
//! - One shutdown broadcast stops every long-running task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::listen_for_signals;
pub use startup::{route_source, serve, StartupError};

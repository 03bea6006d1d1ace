//! Error taxonomy shared by route discovery and dispatch.
//!
//! # Classes
//! - `ConfigurationError`: raised while building the route tree. Fatal,
//!   prevents startup and never reaches request handling.
//! - `HandlerError`: a handler returned something outside the reply
//!   contract. A bug in route code, surfaced as a 500 with full context.
//! - `SerializationError`: an entity's serialization hook failed.
//! - `DispatchError`: what the dispatcher hands back to the server.

use std::path::PathBuf;
use thiserror::Error;

/// Build-time configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Pattern translation was given an absolute path.
    #[error("Route path must be relative: {0}")]
    AbsolutePath(String),

    /// A dynamic segment with nothing after the marker (`_`).
    #[error("Dynamic segment without a parameter name in route path: {0}")]
    EmptyParameter(String),

    /// The routes root has no `layout.tsx` / `layout.jsx`.
    #[error("Root layout not found in {0} (expected layout.tsx or layout.jsx)")]
    MissingRootLayout(PathBuf),

    /// Both `.tsx` and `.jsx` variants of a component exist in one directory.
    #[error("Ambiguous {kind} module in {dir}: both .tsx and .jsx exist")]
    AmbiguousModule { kind: &'static str, dir: PathBuf },

    /// The routes directory does not exist or is not a directory.
    #[error("Routes directory not found: {0}")]
    MissingRoutesDir(PathBuf),

    /// Reading the routes directory failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A handler file exists but no module was registered for it.
    #[error("No handler module registered for route '{0}'")]
    UnresolvedHandlerModule(String),

    /// A handler module contributed no handlers.
    #[error("Handler module '{0}' doesn't contain any handlers (expected at least one of get, post, etc.)")]
    EmptyHandlerModule(String),

    /// Two handlers for the same (method, subpath).
    #[error("Duplicate {method} handler for path '{subpath}' in handler module '{module}'")]
    DuplicateHandler {
        module: String,
        method: String,
        subpath: String,
    },

    /// A non-GET handler was marked as loader.
    #[error("Cannot use {method} handler '{name}' as a loader (only get handlers can load page data)")]
    InvalidLoader { name: String, method: String },

    /// More than one loader in one module.
    #[error("Only one handler per handler module may be designated as the loader (module '{0}')")]
    MultipleLoaders(String),

    /// `cache_time` on a method other than get/head.
    #[error("Cannot specify cache time for {method} handler '{name}'")]
    CacheTimeNotAllowed { name: String, method: String },

    /// `cache_time` combined with `private = true`.
    #[error("Cannot use private with cache_time (handler '{0}')")]
    PrivateWithCacheTime(String),

    /// Two route directories map to the same node id.
    #[error("Routes '{first}' and '{second}' both map to node id '{id}'")]
    DuplicateNodeId { id: String, first: String, second: String },

    /// An HTTP method name outside the known set.
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),
}

/// A handler returned a value outside the documented reply contract.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler returned tuple with {0} item(s) (expected 2)")]
    TupleArity(usize),

    #[error("Handler returned unexpected HTTP status type {0} (expected int)")]
    StatusType(&'static str),

    #[error("Handler returned invalid HTTP status code {0}")]
    StatusCode(i64),

    #[error("Redirect location should be a string; got {0}")]
    RedirectTarget(&'static str),

    #[error("Redirect location is not a valid header value: {0:?}")]
    InvalidRedirectLocation(String),

    #[error("Handler returned unexpected data type {0} (expected map, entity, or string)")]
    DataType(&'static str),

    #[error("Handler returned unexpected object of type {0} (expected map, entity, string, int, (int, data), none, or response)")]
    ReplyType(&'static str),
}

/// An entity's serialization hook raised an error.
#[derive(Debug, Clone, Error)]
#[error("Entity serialization failed when calling {class_name}.serialize(). Original error: {error_type}: {message}")]
pub struct SerializationError {
    pub class_name: String,
    pub error_type: String,
    pub message: String,
}

/// Failure turning a reply into a response.
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Failure while dispatching a request to a route.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{source} (route '{node}', handler {method} '{subpath}')")]
    Handler {
        node: String,
        method: String,
        subpath: String,
        #[source]
        source: HandlerError,
    },

    #[error("{source} (route '{node}')")]
    Serialization {
        node: String,
        #[source]
        source: SerializationError,
    },

    #[error("Failed to render page for route '{node}': {message}")]
    Render { node: String, message: String },
}

impl DispatchError {
    /// Attach route and handler context to a coercion failure.
    pub fn coercion(node: &str, method: &str, subpath: &str, err: CoercionError) -> Self {
        match err {
            CoercionError::Handler(source) => DispatchError::Handler {
                node: node.to_string(),
                method: method.to_string(),
                subpath: subpath.to_string(),
                source,
            },
            CoercionError::Serialization(source) => DispatchError::Serialization {
                node: node.to_string(),
                source,
            },
        }
    }
}

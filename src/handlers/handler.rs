//! Handler values and their eagerly validated configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::method::Method;
use super::reply::Reply;
use crate::dispatch::RouteRequest;
use crate::error::ConfigurationError;

/// The callable behind a handler.
pub type HandlerFn = Arc<dyn Fn(&RouteRequest) -> Reply + Send + Sync>;

/// Per-handler HTTP caching options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Public cache lifetime in seconds.
    pub cache_time: Option<u32>,

    /// Force `Cache-Control: private`.
    pub private: Option<bool>,

    /// Header names to vary cached responses on.
    pub vary_on: Vec<String>,

    /// Extra `Cache-Control` directives (`None` for valueless ones).
    pub cache_control: BTreeMap<String, Option<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_time: None,
            private: None,
            vary_on: vec!["Accept".to_string()],
            cache_control: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn is_private(&self) -> bool {
        self.private.unwrap_or(false)
    }

    /// `cache_time` and `private = true` cannot be combined.
    pub fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        if self.cache_time.is_some() && self.is_private() {
            return Err(ConfigurationError::PrivateWithCacheTime(name.to_string()));
        }
        Ok(())
    }
}

/// Builder for an explicitly configured handler.
///
/// ```
/// use routekit::handlers::{HandlerConfig, Method};
///
/// let config = HandlerConfig::new(Method::Get)
///     .cache_time(10)
///     .vary_on(["Accept", "Accept-Language"]);
/// ```
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    method: Method,
    path: Option<String>,
    loader: bool,
    cache: Option<CacheConfig>,
}

impl HandlerConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            path: None,
            loader: false,
            cache: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn post() -> Self {
        Self::new(Method::Post)
    }

    /// Subpath under the node. Defaults to the entry name.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use this handler's data when rendering the node's page.
    pub fn loader(mut self) -> Self {
        self.loader = true;
        self
    }

    pub fn cache_time(mut self, seconds: u32) -> Self {
        self.cache_mut().cache_time = Some(seconds);
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.cache_mut().private = Some(private);
        self
    }

    pub fn vary_on<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_mut().vary_on = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache_control(mut self, directive: impl Into<String>, value: Option<&str>) -> Self {
        self.cache_mut()
            .cache_control
            .insert(directive.into(), value.map(str::to_string));
        self
    }

    fn cache_mut(&mut self) -> &mut CacheConfig {
        self.cache.get_or_insert_with(CacheConfig::default)
    }
}

/// One method-specific request handler bound to a node and subpath.
#[derive(Clone)]
pub struct Handler {
    name: String,
    method: Method,
    subpath: String,
    is_loader: bool,
    cache: Option<CacheConfig>,
    implementation: HandlerFn,
}

impl Handler {
    /// Wrap `implementation` with `config`, validating it immediately.
    ///
    /// Without an explicit path the subpath is the entry name with
    /// underscores turned into dashes; a path equal to the method name
    /// means the node itself.
    pub fn new<F>(name: &str, config: HandlerConfig, implementation: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&RouteRequest) -> Reply + Send + Sync + 'static,
    {
        Self::from_fn(name, config, Arc::new(implementation))
    }

    pub(crate) fn from_fn(
        name: &str,
        config: HandlerConfig,
        implementation: HandlerFn,
    ) -> Result<Self, ConfigurationError> {
        let method = config.method;

        let mut subpath = config.path.unwrap_or_else(|| name.replace('_', "-"));
        if subpath == method.as_str() {
            subpath.clear();
        }
        let subpath = subpath.trim_matches('/').to_string();

        if config.loader && method != Method::Get {
            return Err(ConfigurationError::InvalidLoader {
                name: name.to_string(),
                method: method.to_string(),
            });
        }

        if let Some(cache) = &config.cache {
            if cache.cache_time.is_some() && !method.is_safe() {
                return Err(ConfigurationError::CacheTimeNotAllowed {
                    name: name.to_string(),
                    method: method.to_string(),
                });
            }
            cache.validate(name)?;
        }

        Ok(Self {
            name: name.to_string(),
            method,
            subpath,
            is_loader: config.loader,
            cache: config.cache,
            implementation,
        })
    }

    /// Default handler for a bare function named after `method`.
    pub(crate) fn for_method(method: Method, implementation: HandlerFn) -> Self {
        Self {
            name: method.as_str().to_string(),
            method,
            subpath: String::new(),
            is_loader: false,
            cache: None,
            implementation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    pub fn is_loader(&self) -> bool {
        self.is_loader
    }

    /// Cache options, if the handler has any.
    pub fn cache(&self) -> Option<&CacheConfig> {
        self.cache.as_ref()
    }

    pub fn cache_time(&self) -> Option<u32> {
        self.cache.as_ref().and_then(|c| c.cache_time)
    }

    /// Fill in ambient cache defaults when none were configured.
    pub(crate) fn with_default_cache(mut self, defaults: &CacheConfig) -> Self {
        if self.cache.is_none() && self.method.is_safe() {
            self.cache = Some(defaults.clone());
        }
        self
    }

    pub(crate) fn into_loader(mut self) -> Self {
        self.is_loader = true;
        self
    }

    /// Same implementation and cache options under another method.
    pub(crate) fn alias(&self, method: Method) -> Self {
        Self {
            name: self.name.clone(),
            method,
            subpath: self.subpath.clone(),
            is_loader: false,
            cache: self.cache.clone(),
            implementation: Arc::clone(&self.implementation),
        }
    }

    /// Invoke the implementation.
    pub fn call(&self, request: &RouteRequest) -> Reply {
        (self.implementation)(request)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("subpath", &self.subpath)
            .field("is_loader", &self.is_loader)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &RouteRequest) -> Reply {
        Reply::none()
    }

    #[test]
    fn test_subpath_from_name() {
        let handler = Handler::new("last_posts", HandlerConfig::get(), noop).unwrap();
        assert_eq!(handler.subpath(), "last-posts");

        let handler = Handler::new("get", HandlerConfig::get(), noop).unwrap();
        assert_eq!(handler.subpath(), "");

        let handler = Handler::new("x", HandlerConfig::get().path("get"), noop).unwrap();
        assert_eq!(handler.subpath(), "");
    }

    #[test]
    fn test_cache_time_on_post_is_rejected() {
        let err = Handler::new("create", HandlerConfig::post().cache_time(5), noop).unwrap_err();
        assert!(matches!(err, ConfigurationError::CacheTimeNotAllowed { .. }));
    }

    #[test]
    fn test_private_with_cache_time_is_rejected() {
        let config = HandlerConfig::get().cache_time(5).private(true);
        let err = Handler::new("stuff", config, noop).unwrap_err();
        assert!(matches!(err, ConfigurationError::PrivateWithCacheTime(_)));
    }

    #[test]
    fn test_loader_must_be_get() {
        let config = HandlerConfig::post().loader();
        let err = Handler::new("save", config, noop).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidLoader { .. }));
    }

    #[test]
    fn test_defaults_only_fill_missing_cache() {
        let defaults = CacheConfig {
            cache_time: Some(60),
            ..CacheConfig::default()
        };

        let handler = Handler::new("get", HandlerConfig::get(), noop)
            .unwrap()
            .with_default_cache(&defaults);
        assert_eq!(handler.cache_time(), Some(60));

        let handler = Handler::new("get", HandlerConfig::get().private(true), noop)
            .unwrap()
            .with_default_cache(&defaults);
        assert_eq!(handler.cache_time(), None);

        let handler = Handler::new("post", HandlerConfig::post(), noop)
            .unwrap()
            .with_default_cache(&defaults);
        assert!(handler.cache().is_none());
    }
}

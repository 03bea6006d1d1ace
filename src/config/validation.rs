//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::SiteConfig;

/// One semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("not a socket address: {}", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be positive"));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be positive"));
    }

    let prefix = &config.site.prefix;
    if !prefix.is_empty() {
        if prefix == "/" {
            errors.push(ValidationError::new("site.prefix", "use an empty prefix instead of /"));
        } else if prefix.starts_with('/') {
            errors.push(ValidationError::new("site.prefix", "must not start with /"));
        } else if !prefix.ends_with('/') {
            errors.push(ValidationError::new("site.prefix", "must end with /"));
        }
    }

    if config.site.handler_file.trim().is_empty() {
        errors.push(ValidationError::new("site.handler_file", "must not be empty"));
    }

    for suffix in config.site.intercept_extensions().keys() {
        if !suffix.starts_with('.') || suffix.len() < 2 {
            errors.push(ValidationError::new(
                "site.intercept_extensions",
                format!("extension must look like .ext: {}", suffix),
            ));
        }
    }

    if config.cache.cache_time.is_some() && config.cache.is_private() {
        errors.push(ValidationError::new("cache", "cannot use private with cache_time"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

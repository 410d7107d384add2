//! Error types for provider calls and lifecycle operations

use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider interaction or wait
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing credential, bad settings, or a payload the provider would reject
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid target options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("{operation} {resource}: provider returned {status}: {message}")]
    Api {
        operation: &'static str,
        resource: String,
        status: u16,
        message: String,
    },

    #[error("{operation} {resource}: request failed: {source}")]
    Transport {
        operation: &'static str,
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{resource} {name} not found")]
    NotFound { resource: &'static str, name: String },

    #[error("timed out after {elapsed:?} waiting for {operation} on {resource}")]
    Timeout {
        operation: &'static str,
        resource: String,
        elapsed: Duration,
    },
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ProviderError::Config(_) | ProviderError::InvalidOptions(_))
    }
}

/// Failure of a public lifecycle operation, tagged with what was being done
#[derive(Debug, Error)]
#[error("{operation} failed for {resource_name}: {source}")]
pub struct LifecycleError {
    pub operation: &'static str,
    pub resource_name: String,
    #[source]
    pub source: ProviderError,
}

impl LifecycleError {
    pub fn new(operation: &'static str, resource_name: impl Into<String>, source: ProviderError) -> Self {
        Self {
            operation,
            resource_name: resource_name.into(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }

    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }

    pub fn is_config(&self) -> bool {
        self.source.is_config()
    }
}

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

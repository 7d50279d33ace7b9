//! Error handling types and utilities.

use thiserror::Error;

/// A specialized Result type for extension-search I/O edges.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods in sources, configuration and startup code.
pub type Result<T> = anyhow::Result<T>;

/// Error returned by index construction and querying.
///
/// `Clone` because build results are handed to every caller awaiting a shared build future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The registry document could not be fetched or parsed.
    #[error("registry source {origin} is unavailable: {message}")]
    SourceUnavailable { origin: String, message: String },

    /// A query arrived before the first index build completed.
    #[error("search index is not ready; initialization has not completed")]
    IndexNotReady,

    /// A schema document nests deeper than the configured guard.
    #[error("schema {document} of extension {extension} nests deeper than {limit} levels")]
    SchemaTooDeep {
        extension: String,
        document: String,
        limit: usize,
    },

    /// A build completed after a newer refresh had been requested.
    #[error("index build {generation} was superseded by a newer refresh")]
    Superseded { generation: u64 },

    /// The blocking build task panicked or was cancelled.
    #[error("index build failed: {0}")]
    BuildFailed(String),
}

impl IndexError {
    /// Wrap a source failure, keeping the whole `anyhow` context chain in the message.
    pub fn source_unavailable(origin: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            message: format!("{:#}", error),
        }
    }
}

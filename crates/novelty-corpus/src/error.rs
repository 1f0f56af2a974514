//! Error types for the corpus builder.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Recoverable outcomes (a paper without references, a year without a partition) are
//! modelled as result variants in their own modules, not as errors.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the OpenAlex API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }
}

/// Errors raised by the external novelty engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The engine found no partition for the requested year.
    #[error("No corpus partition for year {year}")]
    PartitionMissing {
        /// Year the engine was asked to score
        year: i32,
    },

    /// A paper in the partition has no reference list.
    #[error("Reference field missing in partition {year}")]
    MissingReferenceField {
        /// Year the engine was asked to score
        year: i32,
    },

    /// The engine process could not be started.
    #[error("Failed to launch novelty engine: {0}")]
    Spawn(#[from] std::io::Error),

    /// Any other engine failure.
    #[error("Novelty engine failed: {message}")]
    Failed {
        /// Diagnostic output from the engine
        message: String,
    },
}

impl EngineError {
    /// Create a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed { message: message.into() }
    }
}

/// Errors from corpus building, scoring, persistence and orchestration.
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    /// Error from the API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// The candidate pool is too small to pick the fixed sample ranks.
    #[error("Insufficient candidates: need {required}, got {available}")]
    InsufficientCandidates {
        /// Pool size needed
        required: usize,
        /// Pool size received
        available: usize,
    },

    /// Too few (or mismatched) observations for a correlation.
    #[error("Insufficient samples: need {required} paired values, got {x_len} and {y_len}")]
    InsufficientSamples {
        /// Minimum number of pairs
        required: usize,
        /// Length of the first series
        x_len: usize,
        /// Length of the second series
        y_len: usize,
    },

    /// A required field is absent on a fetched record.
    #[error("Missing field '{field}' on record {record}")]
    MissingField {
        /// Field name
        field: String,
        /// Record identifier, as received
        record: String,
    },

    /// An identifier could not be reduced to its numeric form.
    #[error("Invalid work id: {0}")]
    InvalidId(String),

    /// Filesystem error on a corpus path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The novelty engine failed for a focal year.
    #[error("Window for focal year {focal_year} aborted: {source}")]
    Engine {
        /// Focal year whose window was being processed
        focal_year: i32,
        /// Engine failure
        #[source]
        source: EngineError,
    },
}

impl CorpusError {
    /// Create a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>, record: impl Into<String>) -> Self {
        Self::MissingField { field: field.into(), record: record.into() }
    }

    /// Create an I/O error bound to a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;

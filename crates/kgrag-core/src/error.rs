//! Error types for kgrag operations.
//!
//! Every error carries an [`ErrorCode`] and falls into one [`ErrorKind`]:
//! connectivity failures abort a job, provider failures and schema
//! mismatches are reported per item and the job moves on.

use thiserror::Error;

/// Result type alias for kgrag operations.
pub type KgResult<T> = Result<T, KgError>;

/// Main error type for all kgrag operations.
#[derive(Error, Debug)]
pub enum KgError {
    /// Authentication failed (invalid credentials or API key).
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Could not reach a database or provider.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rate limit or quota exceeded at a provider.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding generation failed.
    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Graph store operation failed.
    #[error("Graph store error: {message}")]
    GraphStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector dimensionality does not match the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported (or its feature is not compiled in).
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Model output could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,
    AuthMissingCredentials,

    // Connection (CONN_xxx)
    ConnDatabaseUnreachable,
    ConnProviderUnreachable,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // LLM (LLM_xxx)
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Embedding (EMB_xxx)
    EmbGenerationFailed,

    // Graph (GRP_xxx)
    GrpOperationFailed,
    GrpIndexFailed,

    // Schema (SCH_xxx)
    SchDimensionMismatch,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Configuration
    Config,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::AuthMissingCredentials => "AUTH_002",
            ErrorCode::ConnDatabaseUnreachable => "CONN_001",
            ErrorCode::ConnProviderUnreachable => "CONN_002",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::LlmGenerationFailed => "LLM_001",
            ErrorCode::LlmInvalidResponse => "LLM_002",
            ErrorCode::EmbGenerationFailed => "EMB_001",
            ErrorCode::GrpOperationFailed => "GRP_001",
            ErrorCode::GrpIndexFailed => "GRP_002",
            ErrorCode::SchDimensionMismatch => "SCH_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Config => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

/// Coarse classification deciding whether a job can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Database or provider unreachable, bad credentials, bad config.
    Connectivity,
    /// A single provider call failed or returned unusable output.
    Provider,
    /// Data does not fit the store schema (e.g. vector dimensionality).
    Schema,
    /// Anything else.
    Internal,
}

impl KgError {
    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbGenerationFailed,
            source: None,
        }
    }

    /// Create a graph store error.
    pub fn graph_store(message: impl Into<String>) -> Self {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: None,
        }
    }

    /// Create a graph store error for index management.
    pub fn index(message: impl Into<String>) -> Self {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpIndexFailed,
            source: None,
        }
    }

    /// Create a database connection error.
    pub fn database_unreachable(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            code: ErrorCode::ConnDatabaseUnreachable,
            source: None,
        }
    }

    /// Create a provider connection error.
    pub fn provider_unreachable(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            code: ErrorCode::ConnProviderUnreachable,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a missing-credentials error.
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthMissingCredentials,
            source: None,
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Connection { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Embedding { code, .. } => *code,
            Self::GraphStore { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::DimensionMismatch { .. } => ErrorCode::SchDimensionMismatch,
            Self::Configuration(_) | Self::UnsupportedProvider { .. } => ErrorCode::Config,
            _ => ErrorCode::Internal,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. }
            | Self::Connection { .. }
            | Self::Configuration(_)
            | Self::UnsupportedProvider { .. } => ErrorKind::Connectivity,
            Self::RateLimit { .. }
            | Self::Llm { .. }
            | Self::Embedding { .. }
            | Self::Parse { .. }
            | Self::Serialization(_) => ErrorKind::Provider,
            Self::DimensionMismatch { .. } => ErrorKind::Schema,
            Self::GraphStore { .. } | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a pipeline may log this error, skip the item and continue.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Provider | ErrorKind::Schema)
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { .. } => Some("Check NEO4J_USERNAME/NEO4J_PASSWORD and provider API keys"),
            Self::Connection { .. } => Some("Check that the database and model server are running and reachable"),
            Self::RateLimit { .. } => Some("Increase KGRAG_EMBED_DELAY_MS or wait before re-running the job"),
            Self::DimensionMismatch { .. } => {
                Some("Drop and recreate the vector index with `kgrag setup --recreate`")
            }
            _ => None,
        }
    }

    /// Convert from an HTTP status code returned by a provider.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
                source: None,
            },
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            _ => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmInvalidResponse,
                source: None,
            },
        }
    }
}

/// Whether an error chain ends in a refused, reset or timed-out connection.
///
/// For client libraries that fold transport failures into one error type.
pub fn is_transport_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    use std::io::ErrorKind as Io;

    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                Io::ConnectionRefused
                    | Io::ConnectionReset
                    | Io::ConnectionAborted
                    | Io::NotConnected
                    | Io::AddrNotAvailable
                    | Io::TimedOut
            ) {
                return true;
            }
        }
        let message = e.to_string().to_lowercase();
        if ["error sending request", "connection refused", "tcp connect error", "dns error", "timed out"]
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_errors_are_recoverable() {
        assert!(KgError::llm("bad output").is_item_recoverable());
        assert!(KgError::parse("not json").is_item_recoverable());
        assert!(KgError::dimension_mismatch(768, 1536).is_item_recoverable());
    }

    #[test]
    fn test_connectivity_errors_abort() {
        let err = KgError::database_unreachable("connection refused");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(!err.is_item_recoverable());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_from_http_status() {
        let err = KgError::from_http_status(429, "quota");
        assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
        assert_eq!(err.kind(), ErrorKind::Provider);

        let err = KgError::from_http_status(401, "bad key");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::SchDimensionMismatch.as_str(), "SCH_001");
        assert_eq!(KgError::dimension_mismatch(3, 4).code().as_str(), "SCH_001");
    }

    #[derive(Debug, Error)]
    #[error("request failed")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn test_transport_failure_in_source_chain() {
        let refused = Wrapped(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "nope"));
        assert!(is_transport_failure(&refused));

        let message = std::io::Error::other("error sending request for url (http://localhost:11434/api/chat)");
        assert!(is_transport_failure(&message));

        let model = std::io::Error::other("model \"gemma3:12b\" not found, try pulling it first");
        assert!(!is_transport_failure(&model));
    }
}

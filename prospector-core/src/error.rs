//! Error types for the Prospector core library.
//!
//! Uses `thiserror` for structured error variants covering the generation
//! capability, the search capability, job lifecycle, and configuration.

/// Top-level error type for the Prospector core library.
#[derive(Debug, thiserror::Error)]
pub enum ProspectorError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the generation capability.
///
/// `RateLimited`, `Timeout`, and `Connection` are transient and eligible for
/// retry; the remaining variants are permanent.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the search capability.
///
/// Callers at the aggregation layer degrade these into empty result lists;
/// they are surfaced only for logging.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search backend returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Search response parse error: {message}")]
    BadResponse { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },
}

/// Errors from the job lifecycle and follow-up surface.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job not found: {id}")]
    NotFound { id: String },

    #[error("Job {id} has no completed report yet")]
    ReportNotReady { id: String },

    #[error("Follow-up question quota exhausted for job {id}")]
    QuotaExhausted { id: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `ProspectorError`.
pub type Result<T> = std::result::Result<T, ProspectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_llm() {
        let err = ProspectorError::Llm(LlmError::ApiRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "LLM error: API request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_search() {
        let err = ProspectorError::Search(SearchError::UpstreamStatus {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(
            err.to_string(),
            "Search error: Search backend returned 502: bad gateway"
        );
    }

    #[test]
    fn test_error_display_job() {
        let err = JobError::QuotaExhausted { id: "abc".into() };
        assert_eq!(
            err.to_string(),
            "Follow-up question quota exhausted for job abc"
        );

        let err = JobError::ReportNotReady { id: "abc".into() };
        assert_eq!(err.to_string(), "Job abc has no completed report yet");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ProspectorError = io_err.into();
        assert!(matches!(err, ProspectorError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ProspectorError = serde_err.into();
        assert!(matches!(err, ProspectorError::Serialization(_)));
    }

    #[test]
    fn test_llm_error_variants() {
        let err = LlmError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.to_string(), "Rate limited by provider, retry after 30s");

        let err = LlmError::Timeout { timeout_secs: 120 };
        assert_eq!(err.to_string(), "Request timed out after 120s");
    }
}

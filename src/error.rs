//! Error types for the analyzer library

use thiserror::Error;

/// A fetch from a contest platform failed
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Transport failures, throttling and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Decode { .. } => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("Failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The judging payload names a main issue the titles fetch did not return
    #[error("Main issue {issue_id} referenced by judging data is missing from issue titles")]
    DataIntegrity { issue_id: String },

    #[error("Exceeded maximum retries ({attempts})")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<AnalyzerError>,
    },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// `error` followed by each of its sources, separated by `": "`
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com".to_string(),
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(status_error(500).is_retryable());
        assert!(status_error(503).is_retryable());
        assert!(status_error(429).is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!status_error(401).is_retryable());
        assert!(!status_error(404).is_retryable());
    }

    #[test]
    fn test_decode_errors_are_not_retryable() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FetchError::Decode {
            url: "https://example.com".to_string(),
            source,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_keeps_cause_as_source() {
        let err = AnalyzerError::RetriesExhausted {
            attempts: 5,
            last: Box::new(AnalyzerError::DataIntegrity {
                issue_id: "42".to_string(),
            }),
        };
        assert_eq!(err.to_string(), "Exceeded maximum retries (5)");
        let cause = std::error::Error::source(&err).map(|s| s.to_string());
        assert!(cause.is_some_and(|c| c.contains("Main issue 42")));
    }

    #[test]
    fn test_error_chain_lists_each_cause_once() {
        let err = AnalyzerError::RetriesExhausted {
            attempts: 2,
            last: Box::new(AnalyzerError::DataIntegrity {
                issue_id: "9".to_string(),
            }),
        };
        let chain = error_chain(&err);
        assert_eq!(
            chain,
            "Exceeded maximum retries (2): Main issue 9 referenced by judging data \
             is missing from issue titles"
        );
        assert_eq!(chain.matches("Main issue 9").count(), 1);
    }

    #[test]
    fn test_error_chain_through_transparent_fetch_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let detail = source.to_string();
        let err = AnalyzerError::RetriesExhausted {
            attempts: 3,
            last: Box::new(AnalyzerError::Fetch(FetchError::Decode {
                url: "https://example.com".to_string(),
                source,
            })),
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with(
            "Exceeded maximum retries (3): Failed to decode response from https://example.com: "
        ));
        assert_eq!(chain.matches(detail.as_str()).count(), 1);
    }
}

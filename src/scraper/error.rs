use crate::models::{AssetKind, RecordError};
use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by one scrape of one ticker.
///
/// Malformed cells and absent sections never show up here: they are absorbed
/// as absent values and empty sections.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("ticker {ticker} not found on source")]
    NotFound { ticker: String },

    #[error("failed to fetch ticker {ticker}")]
    Fetch {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch ticker {ticker}: HTTP {status}")]
    Http { ticker: String, status: StatusCode },

    #[error("invalid data for ticker {ticker}")]
    Invalid {
        ticker: String,
        #[source]
        source: RecordError,
    },

    #[error("no assembler registered for asset kind {0}")]
    UnsupportedKind(AssetKind),
}

impl ScrapeError {
    /// Worth another attempt: connection trouble, throttling or a 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Fetch { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ScrapeError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScrapeError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let http = |status| ScrapeError::Http { ticker: "PETR4".into(), status };
        assert!(http(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(http(StatusCode::BAD_GATEWAY).is_transient());
        assert!(!http(StatusCode::FORBIDDEN).is_transient());
    }

    #[test]
    fn test_not_found_is_final() {
        let err = ScrapeError::NotFound { ticker: "XXXX3".into() };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "ticker XXXX3 not found on source");
    }

    #[test]
    fn test_invalid_names_ticker_and_field() {
        let err = ScrapeError::Invalid {
            ticker: "PETR4".into(),
            source: RecordError::Validation("missing field `ticker`".into()),
        };
        assert_eq!(err.to_string(), "invalid data for ticker PETR4");
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert!(chain.contains("missing field `ticker`"), "{chain}");
    }
}

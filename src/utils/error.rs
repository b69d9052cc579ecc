use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against a backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Request(e) if e.is_timeout())
    }
}

/// Coarse failure taxonomy used for status codes and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    UpstreamQuery,
    Timeout,
    Configuration,
    Unknown,
}

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("campaignId is required")]
    MissingCampaignId,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Campaign not found: {campaign_id}")]
    CampaignNotFound { campaign_id: String },

    #[error("Campaign lookup failed: {source}")]
    CampaignLookup {
        #[source]
        source: StoreError,
    },

    #[error("Delivery log query failed: {source}")]
    LogQuery {
        #[source]
        source: StoreError,
    },

    #[error("Contact query failed: {source}")]
    ContactQuery {
        #[source]
        source: StoreError,
    },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("{message}")]
    Unknown { message: String },
}

impl SelectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SelectionError::MissingCampaignId | SelectionError::InvalidRequest { .. } => {
                ErrorKind::Validation
            }
            SelectionError::CampaignNotFound { .. } => ErrorKind::NotFound,
            SelectionError::CampaignLookup { .. }
            | SelectionError::LogQuery { .. }
            | SelectionError::ContactQuery { .. } => ErrorKind::UpstreamQuery,
            SelectionError::Timeout { .. } => ErrorKind::Timeout,
            SelectionError::Config { .. }
            | SelectionError::InvalidConfigValue { .. }
            | SelectionError::MissingConfig { .. } => ErrorKind::Configuration,
            SelectionError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SelectionError::MissingCampaignId => "missing_campaign_id",
            SelectionError::InvalidRequest { .. } => "invalid_request",
            SelectionError::CampaignNotFound { .. } => "campaign_not_found",
            SelectionError::CampaignLookup { .. } => "campaign_lookup_failed",
            SelectionError::LogQuery { .. } => "log_query_failed",
            SelectionError::ContactQuery { .. } => "contact_query_failed",
            SelectionError::Timeout { .. } => "store_timeout",
            SelectionError::Config { .. }
            | SelectionError::InvalidConfigValue { .. }
            | SelectionError::MissingConfig { .. } => "configuration",
            SelectionError::Unknown { .. } => "unknown",
        }
    }

    /// HTTP status for this failure. Validation is the caller's fault, store
    /// failures are reported as gateway errors.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::UpstreamQuery => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::Configuration | ErrorKind::Unknown => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SelectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status_mapping() {
        assert_eq!(SelectionError::MissingCampaignId.status_code(), 400);
        assert_eq!(
            SelectionError::CampaignNotFound {
                campaign_id: "c1".to_string()
            }
            .status_code(),
            404
        );

        let upstream = SelectionError::LogQuery {
            source: StoreError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        };
        assert_eq!(upstream.kind(), ErrorKind::UpstreamQuery);
        assert_eq!(upstream.status_code(), 502);
        assert_eq!(upstream.as_label(), "log_query_failed");

        let timeout = SelectionError::Timeout {
            operation: "contact query",
            timeout: Duration::from_secs(3),
        };
        assert_eq!(timeout.status_code(), 504);
    }

    #[test]
    fn test_messages_carry_underlying_cause() {
        let err = SelectionError::ContactQuery {
            source: StoreError::Status {
                status: 400,
                body: "column contacts.tags does not exist".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Contact query failed: store responded with 400: column contacts.tags does not exist"
        );
        assert_eq!(SelectionError::MissingCampaignId.to_string(), "campaignId is required");
    }
}

//! Error types for CiviCRM API operations.

/// Result type alias for CiviCRM API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// CiviCRM API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not reach or complete against the CRM.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CRM answered with a non-2xx status.
    #[error("CiviCRM request failed ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The CRM answered but flagged the call as failed.
    ///
    /// The message is the CRM's `error_message`, verbatim.
    #[error("{0}")]
    Api(String),

    /// A lookup for a specific record returned no rows.
    #[error("{entity} {id} was not found")]
    NotFound {
        /// Entity name (e.g. `Contact`).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid CiviCRM response: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured site URL is not a valid URL.
    #[error("Invalid site URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates an application error from a CRM-reported message.
    #[must_use]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    /// Creates a not-found error for the given entity and id.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true for failures that a retry may fix (network, non-2xx).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }

    /// Returns true when a specific record lookup found nothing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_is_verbatim() {
        let err = Error::api("API permission check failed for Contact/get");
        assert_eq!(err.to_string(), "API permission check failed for Contact/get");
        assert!(!err.is_transport());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_status_is_transport() {
        let err = Error::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "CiviCRM request failed (503): maintenance");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("Contact", "42");
        assert!(err.is_not_found());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Contact 42 was not found");
    }
}

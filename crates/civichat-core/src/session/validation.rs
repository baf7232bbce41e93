//! Credential validation.

use civichat_api::Credentials;
use url::Url;

/// Validation error for a credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Site URL is empty.
    EmptySiteUrl,
    /// Site URL is not an absolute http(s) URL.
    InvalidSiteUrl,
    /// API key is empty.
    EmptyApiKey,
    /// Site key is empty.
    EmptySiteKey,
    /// Contact ID is empty.
    EmptyContactId,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptySiteUrl => "Site URL is required",
            Self::InvalidSiteUrl => "Site URL must start with http:// or https://",
            Self::EmptyApiKey => "API key is required",
            Self::EmptySiteKey => "Site key is required",
            Self::EmptyContactId => "Contact ID is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptySiteUrl | Self::InvalidSiteUrl => "site_url",
            Self::EmptyApiKey => "api_key",
            Self::EmptySiteKey => "site_key",
            Self::EmptyContactId => "contact_id",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a credential set.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a credential set.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_credentials(credentials: &Credentials) -> ValidationResult {
    let mut errors = Vec::new();

    let site_url = credentials.site_url.trim();
    if site_url.is_empty() {
        errors.push(ValidationError::EmptySiteUrl);
    } else if !is_valid_site_url(site_url) {
        errors.push(ValidationError::InvalidSiteUrl);
    }

    if credentials.api_key.trim().is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    if credentials.site_key.trim().is_empty() {
        errors.push(ValidationError::EmptySiteKey);
    }

    if credentials.contact_id.as_str().trim().is_empty() {
        errors.push(ValidationError::EmptyContactId);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_site_url(site_url: &str) -> bool {
    Url::parse(site_url)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

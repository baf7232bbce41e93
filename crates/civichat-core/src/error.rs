//! Error types for the core library.

use thiserror::Error;

use crate::session::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// CRM call failed.
    #[error(transparent)]
    Api(#[from] civichat_api::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credentials failed validation.
    #[error("{}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// An operation needed an authenticated session.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The message draft is empty after trimming.
    #[error("Message is empty")]
    EmptyDraft,

    /// A send is already running for this conversation.
    #[error("A message is already being sent")]
    SendInProgress,
}

/// Coarse classification of failures, mirroring how each is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or non-2xx response; retrying may help.
    Transport,
    /// The CRM reported an error; shown verbatim.
    Application,
    /// A specific record lookup found nothing.
    NotFound,
    /// Local snapshot store failure.
    Cache,
    /// Invalid user input (credentials, empty draft, double send).
    Input,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(api) if api.is_transport() => ErrorKind::Transport,
            Self::Api(api) if api.is_not_found() => ErrorKind::NotFound,
            Self::Api(_) | Self::NotAuthenticated => ErrorKind::Application,
            Self::Database(_) | Self::Serde(_) | Self::Io(_) => ErrorKind::Cache,
            Self::Validation(_) | Self::EmptyDraft | Self::SendInProgress => ErrorKind::Input,
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

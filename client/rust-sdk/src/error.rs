use thiserror::Error;

/// Failure classes surfaced by the stores.
///
/// Nothing here is fatal to the process: store methods return these as values
/// and the worst case downstream is an error message or a defaulted score.
/// `Api` carries the message the backend produced, already normalized for
/// display.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected locally, before any request was issued.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a signed-in user and none is present.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The account exists but the email is not verified yet. Callers route
    /// the whole application into verification mode on this, not a generic
    /// error screen.
    #[error("Account verification required")]
    VerificationRequired,

    /// Client-side role gate for admin UI. The backend enforces the real rule.
    #[error("{0}")]
    Forbidden(String),

    /// The backend refused the request: non-2xx status or `success: false`.
    #[error("{message}")]
    Api { message: String },

    /// The request never completed (connect, send or body read failed).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),

    /// Response parsed as JSON but the expected data could not be probed out.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ClientError {
    pub fn api(message: impl Into<String>) -> Self {
        ClientError::Api {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn shape(message: impl Into<String>) -> Self {
        ClientError::Shape(message.into())
    }

    /// True for errors produced without any request being issued.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_)
                | ClientError::NotAuthenticated
                | ClientError::VerificationRequired
                | ClientError::Forbidden(_)
        )
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

/// Snapshot cache failures. Callers log and continue: the cache is a startup
/// fallback, never a source of truth.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

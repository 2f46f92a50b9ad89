//! Domain errors surfaced by connectors and the orchestrator.

/// Classification of a deployment or credential failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Missing or malformed request fields, caught before any network call.
    InvalidInput,
    /// A required subsystem (e.g. git for cloning) is not available yet.
    NotReady,
    /// The required credential is absent or was never verified.
    Unauthenticated,
    /// The provider rejected the credential or reported another identity.
    VerificationFailed,
    /// Transport failure, timeout, or an unexpected provider status.
    NetworkError,
    /// The hosting call completed but returned no usable URL.
    DeployFailed,
    /// Another deployment is still in flight.
    AlreadyInProgress,
}

/// An error with a kind and a short message suitable for display.
///
/// Messages never contain raw provider response bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeployError {
    kind: ErrorKind,
    message: String,
}

impl DeployError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotReady, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VerificationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn deploy_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeployFailed, message)
    }

    pub fn already_in_progress() -> Self {
        Self::new(
            ErrorKind::AlreadyInProgress,
            "A deployment is already in progress",
        )
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for DeployError {
    fn from(err: reqwest::Error) -> Self {
        tracing::debug!(error = %err, "HTTP request failed");

        let message = if err.is_timeout() {
            "Request to provider timed out"
        } else if err.is_connect() {
            "Could not connect to provider"
        } else if err.is_decode() {
            "Provider returned an unreadable response"
        } else {
            "Request to provider failed"
        };
        Self::network(message)
    }
}

/// Failure taxonomy for the authorization-code flow.
///
/// `Timeout` and `Network` are the only variants a caller may sensibly
/// retry; everything else reports a configuration problem or a provider
/// rejection that will not go away on its own.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid static configuration. Fix the config and rerun.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The `state` echoed by the redirect does not match the value stored
    /// when the flow began. Possible CSRF; the exchange is never attempted.
    #[error("state mismatch: redirect does not belong to this flow")]
    StateMismatch,

    /// The provider rejected the code-for-token exchange.
    #[error("token exchange rejected (HTTP {status}): {body}")]
    TokenExchange { status: u16, body: String },

    /// The provider rejected the refresh request (invalid, revoked, or
    /// expired refresh token). Not retryable.
    #[error("token refresh rejected (HTTP {status}): {body}")]
    TokenRefresh { status: u16, body: String },

    /// The token endpoint did not answer within the request timeout.
    #[error("token endpoint request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("token storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Classify a transport error, keeping timeouts distinct from other
    /// network failures so callers can treat them as retryable.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }

    /// Whether the failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout | Error::Network(_))
    }
}

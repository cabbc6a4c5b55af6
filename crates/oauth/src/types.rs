use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// OAuth 2.0 provider configuration.
///
/// Passed explicitly into [`crate::OAuthFlow`]; there is no process-wide
/// configuration object. Credentials come from the environment or a config
/// file, never from source.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider name, used as the token file key (e.g. "google-drive").
    pub name: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    /// Must match a redirect URI registered with the provider.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Extra authorization query parameters (`access_type`, `prompt`,
    /// `include_granted_scopes`, ...), appended verbatim.
    pub extra_auth_params: Vec<(String, String)>,
    /// Attach a PKCE S256 challenge to the authorization request.
    pub use_pkce: bool,
}

/// A fully-formed authorization request: the URL to open in a browser and
/// the anti-forgery `state` baked into it. Immutable once issued.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Tokens returned by the provider's token endpoint.
///
/// This is also the persisted JSON format written by
/// [`crate::TokenStore`]; the token endpoint and client id are recorded so
/// a stored token is self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Unix timestamp when the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Scopes the provider actually granted.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Token endpoint this response came from.
    pub token_url: String,
    pub client_id: String,
}

/// PKCE verifier/challenge pair (S256).
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use secrecy::ExposeSecret;
use serde::Deserialize;
use url::Url;

use crate::{
    error::Error,
    pkce,
    session::{AuthorizationState, SessionStore},
    types::{AuthorizationRequest, ProviderConfig, TokenResponse},
};

/// Bound on token endpoint requests. A timeout surfaces as
/// [`Error::Timeout`], distinct from a provider rejection.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one provider's authorization-code flow: build the authorization
/// URL, exchange the redirected code for tokens, refresh.
pub struct OAuthFlow {
    config: ProviderConfig,
    auth_url: Url,
    client: reqwest::Client,
}

impl OAuthFlow {
    /// Validate the configuration and build a flow with a bounded-timeout
    /// HTTP client. The authorization endpoint is parsed once here.
    pub fn new(config: ProviderConfig) -> Result<Self, Error> {
        let auth_url = validate(&config)?;
        let client = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            config,
            auth_url,
            client,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Build the authorization URL with a fresh `state`, persisting the
    /// state (and PKCE verifier, when enabled) for the session. Replaces
    /// any pending entry, so only the newest `state` is accepted later.
    pub fn begin(
        &self,
        sessions: &SessionStore,
        session_id: &str,
    ) -> Result<AuthorizationRequest, Error> {
        let state = pkce::generate_state();
        let mut url = self.auth_url.clone();

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", &state);
            for (key, value) in &self.config.extra_auth_params {
                query.append_pair(key, value);
            }
        }

        let verifier = if self.config.use_pkce {
            let pair = pkce::generate_challenge();
            url.query_pairs_mut()
                .append_pair("code_challenge", &pair.challenge)
                .append_pair("code_challenge_method", "S256");
            Some(pair.verifier)
        } else {
            None
        };

        sessions.put(
            session_id,
            AuthorizationState {
                state: state.clone(),
                verifier,
            },
        );
        tracing::debug!(provider = %self.config.name, %session_id, "authorization flow started");

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Verify the echoed `state` and exchange the authorization code for
    /// tokens.
    ///
    /// The pending session entry is consumed up front; a mismatched or
    /// missing `state` is rejected before any network traffic. The code is
    /// URL-decoded exactly as received from the redirect query string.
    pub async fn exchange(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        code: &str,
        state: &str,
    ) -> Result<TokenResponse, Error> {
        let Some(pending) = sessions.take(session_id) else {
            tracing::warn!(provider = %self.config.name, "no pending state for session, rejecting exchange");
            return Err(Error::StateMismatch);
        };
        if pending.state != state {
            tracing::warn!(provider = %self.config.name, "state mismatch on redirect, rejecting exchange");
            return Err(Error::StateMismatch);
        }

        let code = urlencoding::decode(code)
            .map_err(|_| Error::Configuration("authorization code is not valid UTF-8".into()))?;

        let mut params = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.into_owned()),
            ("client_id", self.config.client_id.clone()),
            (
                "client_secret",
                self.config.client_secret.expose_secret().clone(),
            ),
            ("redirect_uri", self.config.redirect_uri.clone()),
        ];
        if let Some(verifier) = pending.verifier {
            params.push(("code_verifier", verifier));
        }

        let token = self.request_token(&params, TokenGrant::Exchange).await?;
        tracing::info!(provider = %self.config.name, "authorization code exchanged");
        Ok(token)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
            ("client_id", self.config.client_id.clone()),
            (
                "client_secret",
                self.config.client_secret.expose_secret().clone(),
            ),
        ];

        let token = self.request_token(&params, TokenGrant::Refresh).await?;
        tracing::info!(provider = %self.config.name, "access token refreshed");
        Ok(token)
    }

    async fn request_token(
        &self,
        params: &[(&str, String)],
        grant: TokenGrant,
    ) -> Result<TokenResponse, Error> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::from_reqwest)?;
        if !status.is_success() {
            return Err(grant.rejected(status.as_u16(), body));
        }

        let wire: WireTokenResponse = serde_json::from_str(&body).map_err(|e| {
            grant.rejected(status.as_u16(), format!("malformed token response: {e}"))
        })?;

        let scopes = match wire.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.config.scopes.clone(),
        };

        Ok(TokenResponse {
            access_token: wire.access_token,
            refresh_token: wire.refresh_token,
            token_type: wire.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: wire.expires_in.map(|secs| unix_now() + secs),
            scopes,
            token_url: self.config.token_url.clone(),
            client_id: self.config.client_id.clone(),
        })
    }
}

/// Which grant a token request carries; decides the rejection variant.
#[derive(Clone, Copy)]
enum TokenGrant {
    Exchange,
    Refresh,
}

impl TokenGrant {
    fn rejected(self, status: u16, body: String) -> Error {
        match self {
            TokenGrant::Exchange => Error::TokenExchange { status, body },
            TokenGrant::Refresh => Error::TokenRefresh { status, body },
        }
    }
}

/// Token endpoint response per RFC 6749 §5.1. Providers vary in which
/// optional fields they send.
#[derive(Deserialize)]
struct WireTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Check the configuration and return the parsed authorization endpoint.
fn validate(config: &ProviderConfig) -> Result<Url, Error> {
    if config.client_id.trim().is_empty() {
        return Err(Error::Configuration("client_id is not set".into()));
    }
    if config.client_secret.expose_secret().trim().is_empty() {
        return Err(Error::Configuration("client_secret is not set".into()));
    }
    if config.scopes.is_empty() {
        return Err(Error::Configuration(
            "at least one scope is required".into(),
        ));
    }
    for (field, value) in [
        ("token_url", &config.token_url),
        ("redirect_uri", &config.redirect_uri),
    ] {
        Url::parse(value).map_err(|e| Error::Configuration(format!("invalid {field}: {e}")))?;
    }
    Url::parse(&config.auth_url).map_err(|e| Error::Configuration(format!("invalid auth_url: {e}")))
}

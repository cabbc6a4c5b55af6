//! OAuth 2.0 authorization-code flow: URL building, code-for-token exchange,
//! refresh, and the transient session state that ties a redirect back to the
//! flow that issued it.
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod callback_server;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod providers;
pub mod session;
pub mod storage;
pub mod types;

pub use callback_server::CallbackServer;
pub use error::Error;
pub use flow::OAuthFlow;
pub use session::SessionStore;
pub use storage::TokenStore;
pub use types::{AuthorizationRequest, PkceChallenge, ProviderConfig, TokenResponse};

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use {
    anyhow::Context,
    axum::{
        Router,
        extract::{RawQuery, State},
        response::Html,
        routing::get,
    },
    tokio::sync::oneshot,
};

/// Parameters captured from the provider's redirect, exactly as they
/// appeared in the callback query string — still percent-encoded. The
/// exchanger owns the single URL-decode of the code.
#[derive(Debug, Clone)]
pub struct RedirectParams {
    pub code: String,
    pub state: String,
}

type ResultSlot = Arc<Mutex<Option<oneshot::Sender<anyhow::Result<RedirectParams>>>>>;

/// Loopback HTTP server that receives the OAuth redirect callback and hands
/// it back to the flow driver, replacing manual copy-paste of the redirect
/// URL.
pub struct CallbackServer {
    addr: SocketAddr,
    listener: tokio::net::TcpListener,
}

impl CallbackServer {
    /// Bind the callback listener on 127.0.0.1. Port 0 picks an ephemeral
    /// port; check [`Self::local_addr`] for the result. Bind before opening
    /// the browser: a redirect that lands between bind and serve queues in
    /// the listener backlog instead of being refused.
    pub async fn bind(port: u16) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind callback port {port}"))?;
        let addr = listener.local_addr()?;
        Ok(Self { addr, listener })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve `/auth/callback` until the first redirect arrives, then shut
    /// down and return its parameters. A provider-reported error
    /// (`?error=access_denied`) becomes an `Err`.
    pub async fn wait_for_redirect(self) -> anyhow::Result<RedirectParams> {
        let (tx, rx) = oneshot::channel();
        let slot: ResultSlot = Arc::new(Mutex::new(Some(tx)));
        let app = Router::new()
            .route("/auth/callback", get(handle_callback))
            .with_state(slot);

        tracing::debug!(addr = %self.addr, "callback server listening");
        let server = tokio::spawn(async move { axum::serve(self.listener, app).await });
        let result = rx
            .await
            .context("callback server closed before a redirect arrived")?;
        server.abort();
        result
    }
}

/// Extract the raw, still percent-encoded value of `key` from a query
/// string.
pub fn raw_query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}

fn parse_redirect(query: &str) -> anyhow::Result<RedirectParams> {
    if let Some(error) = raw_query_param(query, "error") {
        let detail = raw_query_param(query, "error_description")
            .map(|d| {
                urlencoding::decode(d)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| d.to_string())
            })
            .unwrap_or_default();
        anyhow::bail!("provider returned '{error}': {detail}");
    }
    match (
        raw_query_param(query, "code"),
        raw_query_param(query, "state"),
    ) {
        (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => Ok(RedirectParams {
            code: code.to_string(),
            state: state.to_string(),
        }),
        _ => Err(anyhow::anyhow!("redirect is missing code or state")),
    }
}

async fn handle_callback(
    State(slot): State<ResultSlot>,
    RawQuery(query): RawQuery,
) -> Html<&'static str> {
    let outcome = parse_redirect(query.as_deref().unwrap_or_default());

    let page = if outcome.is_ok() {
        Html("<html><body><h1>Authorization complete</h1><p>You can close this window.</p></body></html>")
    } else {
        Html("<html><body><h1>Authorization failed</h1><p>You can close this window.</p></body></html>")
    };

    // Only the first redirect wins; later hits still get a page back.
    if let Some(tx) = slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
        let _ = tx.send(outcome);
    }
    page
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_delivers_code_and_state_from_redirect() {
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr();
        let waiter = tokio::spawn(server.wait_for_redirect());

        let resp = reqwest::get(format!(
            "http://{addr}/auth/callback?code=abc123&state=xyz"
        ))
        .await
        .unwrap();
        assert!(resp.status().is_success());

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code, "abc123");
        assert_eq!(params.state, "xyz");
    }

    #[tokio::test]
    async fn test_code_is_delivered_without_decoding() {
        // A raw code of x%3Dy travels in the redirect as x%253Dy and must
        // come out still encoded; the exchanger performs the only decode.
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr();
        let waiter = tokio::spawn(server.wait_for_redirect());

        reqwest::get(format!(
            "http://{addr}/auth/callback?code=x%253Dy&state=s1"
        ))
        .await
        .unwrap();

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code, "x%253Dy");
    }

    #[tokio::test]
    async fn test_redirect_before_serve_is_not_lost() {
        // The listener is bound before the browser opens; a fast redirect
        // queues in the backlog until wait_for_redirect starts serving.
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr();

        let request = tokio::spawn(async move {
            reqwest::get(format!("http://{addr}/auth/callback?code=fast&state=s1")).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let params = server.wait_for_redirect().await.unwrap();
        assert_eq!(params.code, "fast");
        request.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_provider_error_redirect_fails_the_wait() {
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr();
        let waiter = tokio::spawn(server.wait_for_redirect());

        reqwest::get(format!(
            "http://{addr}/auth/callback?error=access_denied&error_description=denied"
        ))
        .await
        .unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_missing_parameters_fail_the_wait() {
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr();
        let waiter = tokio::spawn(server.wait_for_redirect());

        reqwest::get(format!("http://{addr}/auth/callback?code=only-code"))
            .await
            .unwrap();

        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("missing code or state"));
    }

    #[test]
    fn test_raw_query_param_keeps_encoding() {
        let query = "code=x%253Dy&state=abc&empty=";
        assert_eq!(raw_query_param(query, "code"), Some("x%253Dy"));
        assert_eq!(raw_query_param(query, "state"), Some("abc"));
        assert_eq!(raw_query_param(query, "empty"), Some(""));
        assert_eq!(raw_query_param(query, "missing"), None);
    }
}

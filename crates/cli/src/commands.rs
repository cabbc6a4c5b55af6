use anyhow::{Context, Result};
use authflow_oauth::{
    CallbackServer, OAuthFlow, SessionStore, TokenResponse, TokenStore,
    callback_server::raw_query_param, providers,
};

/// Run the full authorization-code flow: open the browser, receive the
/// redirect (or prompt for it in manual mode), exchange, save the token.
pub async fn login(provider: &str, port: u16, manual: bool) -> Result<()> {
    let config = providers::by_name(provider)?;
    let flow = OAuthFlow::new(config)?;
    let sessions = SessionStore::new();
    let session_id = uuid::Uuid::new_v4().to_string();

    let req = flow.begin(&sessions, &session_id)?;

    let (code, state) = if manual {
        open_browser(&req.url);
        prompt_redirect()?
    } else {
        // Bind before opening the browser so a fast redirect cannot hit an
        // unbound port.
        let server = CallbackServer::bind(port).await?;
        open_browser(&req.url);
        println!("Waiting for callback on http://127.0.0.1:{port}/auth/callback ...");
        let params = server.wait_for_redirect().await?;
        (params.code, params.state)
    };

    println!("Exchanging code for tokens...");
    let token = flow.exchange(&sessions, &session_id, &code, &state).await?;
    print_token(&token);

    let store = TokenStore::new()?;
    store.save(provider, &token)?;
    println!("\nToken saved for {provider}.");
    Ok(())
}

/// Refresh the stored token. Providers may omit the refresh token in the
/// refresh response; the original one is kept in that case.
pub async fn refresh(provider: &str) -> Result<()> {
    let store = TokenStore::new()?;
    let Some(token) = store.load(provider)? else {
        anyhow::bail!("no stored token for {provider}; run `authflow login` first");
    };
    let refresh_token = token
        .refresh_token
        .context("stored token has no refresh token; log in again")?;

    let flow = OAuthFlow::new(providers::by_name(provider)?)?;
    let mut refreshed = flow.refresh(&refresh_token).await?;
    if refreshed.refresh_token.is_none() {
        refreshed.refresh_token = Some(refresh_token);
    }

    store.save(provider, &refreshed)?;
    print_token(&refreshed);
    println!("\nToken refreshed for {provider}.");
    Ok(())
}

pub fn status() -> Result<()> {
    let store = TokenStore::new()?;
    let providers = store.list();
    if providers.is_empty() {
        println!("No stored tokens.");
        return Ok(());
    }
    for provider in providers {
        if let Some(token) = store.load(&provider)? {
            let expiry = token.expires_at.map_or("unknown expiry".to_string(), |ts| {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                if ts > now {
                    let remaining = ts - now;
                    let hours = remaining / 3600;
                    let mins = (remaining % 3600) / 60;
                    format!("valid ({hours}h {mins}m remaining)")
                } else {
                    "expired".to_string()
                }
            });
            let refresh = if token.refresh_token.is_some() {
                "refresh token"
            } else {
                "no refresh token"
            };
            println!("{provider} [{expiry}, {refresh}]");
        }
    }
    Ok(())
}

pub fn logout(provider: &str) -> Result<()> {
    let store = TokenStore::new()?;
    store.delete(provider)?;
    println!("Deleted stored token for {provider}.");
    Ok(())
}

fn open_browser(url: &str) {
    println!("Opening browser for authorization...");
    if open::that(url).is_err() {
        println!("Could not open browser. Please visit:\n{url}");
    }
}

/// Read the full redirect URL from stdin and pull out `code` and `state`,
/// still percent-encoded as the provider sent them — the exchange performs
/// the only decode.
fn prompt_redirect() -> Result<(String, String)> {
    println!("Paste the full redirect URL from the browser:");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let url = url::Url::parse(line.trim()).context("pasted redirect is not a valid URL")?;
    let query = url.query().unwrap_or_default();

    let code = raw_query_param(query, "code")
        .filter(|v| !v.is_empty())
        .context("redirect URL has no `code` parameter")?;
    let state = raw_query_param(query, "state")
        .filter(|v| !v.is_empty())
        .context("redirect URL has no `state` parameter")?;
    Ok((code.to_string(), state.to_string()))
}

fn print_token(token: &TokenResponse) {
    println!("\nAccess token:  {}", token.access_token);
    if let Some(ref refresh) = token.refresh_token {
        println!("Refresh token: {refresh}");
    }
    println!("Token type:    {}", token.token_type);
    if let Some(ts) = token.expires_at {
        println!("Expires at:    {ts} (unix)");
    }
    println!("Scopes:        {}", token.scopes.join(" "));
    println!("Token URL:     {}", token.token_url);
    println!("Client ID:     {}", token.client_id);
}

use secrecy::SecretString;

use crate::{error::Error, types::ProviderConfig};

pub const GOOGLE_DRIVE: &str = "google-drive";
pub const SALESFORCE: &str = "salesforce";

/// Build the configuration for a known provider, with credentials taken
/// from the environment.
pub fn by_name(name: &str) -> Result<ProviderConfig, Error> {
    match name {
        GOOGLE_DRIVE => google_drive(),
        SALESFORCE => salesforce(),
        _ => Err(Error::Configuration(format!(
            "unknown provider '{name}' (expected '{GOOGLE_DRIVE}' or '{SALESFORCE}')"
        ))),
    }
}

/// Google Drive. `access_type=offline` + `prompt=consent` so a refresh
/// token is issued on first grant; no PKCE on this flow.
pub fn google_drive() -> Result<ProviderConfig, Error> {
    Ok(ProviderConfig {
        name: GOOGLE_DRIVE.to_string(),
        client_id: require_env("GOOGLE_DRIVE_CLIENT_ID")?,
        client_secret: SecretString::new(require_env("GOOGLE_DRIVE_CLIENT_SECRET")?),
        auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_url: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uri: require_env("GOOGLE_DRIVE_REDIRECT_URI")?,
        scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
        extra_auth_params: vec![
            ("access_type".to_string(), "offline".to_string()),
            ("include_granted_scopes".to_string(), "true".to_string()),
            ("prompt".to_string(), "consent".to_string()),
        ],
        use_pkce: false,
    })
}

/// Salesforce, against the production login host, with PKCE.
pub fn salesforce() -> Result<ProviderConfig, Error> {
    Ok(ProviderConfig {
        name: SALESFORCE.to_string(),
        client_id: require_env("SALESFORCE_CLIENT_ID")?,
        client_secret: SecretString::new(require_env("SALESFORCE_CLIENT_SECRET")?),
        auth_url: "https://login.salesforce.com/services/oauth2/authorize".to_string(),
        token_url: "https://login.salesforce.com/services/oauth2/token".to_string(),
        redirect_uri: require_env("SALESFORCE_REDIRECT_URI")?,
        scopes: vec!["api".to_string(), "refresh_token".to_string()],
        extra_auth_params: vec![("prompt".to_string(), "consent".to_string())],
        use_pkce: true,
    })
}

fn require_env(key: &str) -> Result<String, Error> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Configuration(format!("{key} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let err = by_name("dropbox").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("dropbox"));
    }

    #[test]
    fn test_require_env_rejects_missing_key() {
        assert!(matches!(
            require_env("AUTHFLOW_TEST_DOES_NOT_EXIST"),
            Err(Error::Configuration(_))
        ));
    }
}

use std::path::PathBuf;

use crate::{error::Error, types::TokenResponse};

/// On-disk store for exchanged tokens, one JSON file per provider under
/// `~/.authflow/tokens/`. The files are at-rest secrets and are written
/// owner-readable only on unix.
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new() -> Result<Self, Error> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| Error::Storage("could not determine home directory".into()))?;
        Ok(Self::with_dir(base.home_dir().join(".authflow/tokens")))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, provider: &str) -> PathBuf {
        self.dir.join(format!("{provider}.json"))
    }

    /// Persist the token for a provider, replacing any previous file.
    pub fn save(&self, provider: &str, token: &TokenResponse) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir).map_err(storage_err)?;
        let path = self.path_for(provider);
        let json = serde_json::to_string_pretty(token).map_err(storage_err)?;
        std::fs::write(&path, json).map_err(storage_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(storage_err)?;
        }

        tracing::info!(%provider, path = %path.display(), "token saved");
        Ok(())
    }

    /// Load the stored token for a provider, if any.
    pub fn load(&self, provider: &str) -> Result<Option<TokenResponse>, Error> {
        let path = self.path_for(provider);
        if !path.is_file() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).map_err(storage_err)?;
        let token = serde_json::from_str(&json).map_err(storage_err)?;
        Ok(Some(token))
    }

    /// Provider names that have a stored token, sorted.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut providers: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        providers.sort();
        providers
    }

    /// Delete the stored token for a provider. Missing files are fine.
    pub fn delete(&self, provider: &str) -> Result<(), Error> {
        let path = self.path_for(provider);
        if path.is_file() {
            std::fs::remove_file(&path).map_err(storage_err)?;
            tracing::info!(%provider, "token deleted");
        }
        Ok(())
    }
}

fn storage_err(err: impl std::fmt::Display) -> Error {
    Error::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> TokenResponse {
        TokenResponse {
            access_token: "at-1".to_string(),
            refresh_token: Some("rt-1".to_string()),
            token_type: "Bearer".to_string(),
            expires_at: Some(1_900_000_000),
            scopes: vec!["read".to_string(), "write".to_string()],
            token_url: "https://id.example/token".to_string(),
            client_id: "client-123".to_string(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(tmp.path());
        let token = sample_token();

        store.save("google-drive", &token).unwrap();
        let loaded = store.load("google-drive").unwrap().unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn test_load_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(tmp.path());
        assert_eq!(store.load("nobody").unwrap(), None);
    }

    #[test]
    fn test_list_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(tmp.path());
        store.save("salesforce", &sample_token()).unwrap();
        store.save("google-drive", &sample_token()).unwrap();
        assert_eq!(store.list(), vec!["google-drive", "salesforce"]);

        store.delete("salesforce").unwrap();
        assert_eq!(store.list(), vec!["google-drive"]);
        // Deleting again is a no-op.
        store.delete("salesforce").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let store = TokenStore::with_dir(tmp.path());
        store.save("salesforce", &sample_token()).unwrap();

        let meta = std::fs::metadata(tmp.path().join("salesforce.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}

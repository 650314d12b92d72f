use forum_core::{PersistenceError, SettingsProvider, TokenPair, FORUM_TOKENS_FILE};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_TOKENS_FILE: &str = "forum-tokens.json";

/// JSON file holding the latest `{accessToken, refreshToken}` pair.
///
/// Writers are not coordinated; the last write wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `FORUM_TOKENS_FILE`, else `forum-tokens.json` in the working directory.
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        match settings.get(FORUM_TOKENS_FILE) {
            Some(path) => Self::new(path),
            None => {
                let cwd = std::env::current_dir().unwrap_or_default();
                Self::new(cwd.join(DEFAULT_TOKENS_FILE))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn try_load(&self) -> Result<Option<TokenPair>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| PersistenceError::Read {
            path: self.path.clone(),
            source,
        })?;
        let tokens: TokenPair =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(tokens.is_complete().then_some(tokens))
    }

    /// Load tokens, treating any failure as "no tokens".
    pub fn load(&self) -> Option<TokenPair> {
        match self.try_load() {
            Ok(Some(tokens)) => {
                info!("Forum tokens loaded from file");
                Some(tokens)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Error loading tokens from file: {}", e);
                None
            }
        }
    }

    pub fn save(&self, tokens: &TokenPair) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(tokens).map_err(|source| {
            PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, content).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("Forum tokens saved to file");
        Ok(())
    }

    /// Save and log on failure; in-memory tokens stay in use either way.
    pub fn save_or_log(&self, tokens: &TokenPair) -> bool {
        match self.save(tokens) {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving tokens to file: {}", e);
                false
            }
        }
    }
}

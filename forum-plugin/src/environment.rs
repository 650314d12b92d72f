use forum_client::TokenStore;
use forum_core::{
    SettingsProvider, TokenPair, DEFAULT_API_BASE_URL, FORUM_ACCESS_TOKEN, FORUM_API_BASE_URL,
    FORUM_REFRESH_TOKEN,
};
use tracing::{info, warn};

/// Seed settings from the token file and vice versa at plugin load.
///
/// Returns whether both tokens are available afterwards.
pub fn initialize_forum_environment(settings: &dyn SettingsProvider, store: &TokenStore) -> bool {
    if settings.get(FORUM_ACCESS_TOKEN).is_none() || settings.get(FORUM_REFRESH_TOKEN).is_none() {
        if let Some(tokens) = store.load() {
            settings.set(FORUM_ACCESS_TOKEN, &tokens.access_token);
            settings.set(FORUM_REFRESH_TOKEN, &tokens.refresh_token);
            info!("Forum environment initialized from {}", store.path().display());
        }
    }

    if settings.get(FORUM_API_BASE_URL).is_none() {
        settings.set(FORUM_API_BASE_URL, DEFAULT_API_BASE_URL);
        info!("Using default forum API base URL");
    }

    let tokens = match (settings.get(FORUM_ACCESS_TOKEN), settings.get(FORUM_REFRESH_TOKEN)) {
        (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
        _ => None,
    };

    match tokens {
        Some(tokens) => {
            if !store.exists() && store.save_or_log(&tokens) {
                info!("Initial forum tokens file created");
            }
            info!("Forum environment is initialized");
            true
        }
        None => {
            warn!("Forum environment is not fully initialized. Tokens are missing.");
            false
        }
    }
}

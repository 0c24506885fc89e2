//! Authentication for urlcast
//!
//! Credentials come from a [`KeyProvider`]: the resource principal handed to
//! code running inside a function, or a user API key from the CLI config
//! file for local runs. [`RequestSigner`] turns them into signed HTTP
//! headers.

pub mod api_key;
pub mod error;
pub mod key;
pub mod principal;
pub mod signer;

pub use api_key::ApiKeyProvider;
pub use error::{AuthError, AuthResult};
pub use key::{load_private_key, KeyProvider, SigningCredentials};
pub use principal::ResourcePrincipalProvider;
pub use signer::{RequestSigner, SignedHeaders};

use std::sync::Arc;
use tracing::info;
use urlcast_core::config::{AuthConfig, AuthMode};

/// Build the provider selected by configuration.
///
/// Credentials are loaded eagerly so that a broken identity setup fails at
/// startup rather than on the first publish.
pub fn provider_from_config(config: &AuthConfig) -> AuthResult<Arc<dyn KeyProvider>> {
    match config.mode {
        AuthMode::ResourcePrincipal => {
            let provider = ResourcePrincipalProvider::from_env()?;
            info!("Using resource principal credentials");
            Ok(Arc::new(provider))
        }
        AuthMode::ApiKey => {
            let path = match &config.config_file {
                Some(path) => path.clone(),
                None => api_key::default_config_path()?,
            };
            let provider = ApiKeyProvider::from_config_file(&path, &config.profile)?;
            info!(
                "Using API key credentials from {:?} [{}]",
                path, config.profile
            );
            Ok(Arc::new(provider))
        }
    }
}

//! Resource principal credentials
//!
//! Functions receive a resource principal session token (RPST) and a
//! matching private key through the environment. Either value may be given
//! inline or as an absolute path to a file the platform keeps refreshed.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AuthError, AuthResult};
use crate::key::{load_private_key, KeyProvider, SigningCredentials};

pub const ENV_VERSION: &str = "OCI_RESOURCE_PRINCIPAL_VERSION";
pub const ENV_RPST: &str = "OCI_RESOURCE_PRINCIPAL_RPST";
pub const ENV_PRIVATE_PEM: &str = "OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM";
pub const ENV_PRIVATE_PEM_PASSPHRASE: &str = "OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM_PASSPHRASE";
pub const ENV_REGION: &str = "OCI_RESOURCE_PRINCIPAL_REGION";

const SUPPORTED_VERSION: &str = "2.2";

/// Refresh file-backed tokens this long before they expire
const REFRESH_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone)]
enum Source {
    Inline(String),
    File(PathBuf),
}

impl Source {
    fn from_value(value: String) -> Self {
        let path = PathBuf::from(&value);
        if path.is_absolute() {
            Source::File(path)
        } else {
            Source::Inline(value)
        }
    }

    fn read(&self) -> AuthResult<String> {
        match self {
            Source::Inline(value) => Ok(value.clone()),
            Source::File(path) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
        }
    }

    fn is_file(&self) -> bool {
        matches!(self, Source::File(_))
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
}

/// Read the `exp` claim of the RPST.
///
/// The token is only forwarded to the service, which verifies it; the
/// signature is not checked here.
fn token_expiry(token: &str) -> AuthResult<Option<DateTime<Utc>>> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| AuthError::InvalidToken(format!("bad token: {}", e)))?;

    Ok(data
        .claims
        .exp
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single()))
}

struct Session {
    credentials: Arc<SigningCredentials>,
    expires_at: Option<DateTime<Utc>>,
}

/// Credentials for code running as a resource principal
pub struct ResourcePrincipalProvider {
    token_source: Source,
    key_source: Source,
    passphrase: Option<String>,
    region: Option<String>,
    session: RwLock<Session>,
}

impl ResourcePrincipalProvider {
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let version = lookup(ENV_VERSION).ok_or_else(|| AuthError::MissingEnv(ENV_VERSION.into()))?;
        if version != SUPPORTED_VERSION {
            return Err(AuthError::UnsupportedVersion(version));
        }

        let token_source = lookup(ENV_RPST)
            .map(Source::from_value)
            .ok_or_else(|| AuthError::MissingEnv(ENV_RPST.into()))?;
        let key_source = lookup(ENV_PRIVATE_PEM)
            .map(Source::from_value)
            .ok_or_else(|| AuthError::MissingEnv(ENV_PRIVATE_PEM.into()))?;

        let passphrase = match lookup(ENV_PRIVATE_PEM_PASSPHRASE).map(Source::from_value) {
            Some(source) => Some(source.read()?),
            None => None,
        };
        let region = lookup(ENV_REGION);

        let session = Self::load(&token_source, &key_source, passphrase.as_deref())?;
        debug!(
            "Loaded resource principal session, expires at {:?}",
            session.expires_at
        );

        Ok(Self {
            token_source,
            key_source,
            passphrase,
            region,
            session: RwLock::new(session),
        })
    }

    fn load(token_source: &Source, key_source: &Source, passphrase: Option<&str>) -> AuthResult<Session> {
        let token = token_source.read()?;
        if token.is_empty() {
            return Err(AuthError::InvalidToken("token is empty".into()));
        }
        let expires_at = token_expiry(&token)?;

        let pem = key_source.read()?;
        let private_key = load_private_key(&pem, passphrase)?;

        Ok(Session {
            credentials: Arc::new(SigningCredentials::new(format!("ST${}", token), private_key)),
            expires_at,
        })
    }

    fn needs_refresh(&self, expires_at: Option<DateTime<Utc>>) -> bool {
        if !self.token_source.is_file() {
            return false;
        }
        match expires_at {
            Some(at) => at - Duration::seconds(REFRESH_WINDOW_SECS) <= Utc::now(),
            None => false,
        }
    }
}

impl KeyProvider for ResourcePrincipalProvider {
    fn credentials(&self) -> AuthResult<Arc<SigningCredentials>> {
        {
            let session = self.session.read();
            if !self.needs_refresh(session.expires_at) {
                return Ok(session.credentials.clone());
            }
        }

        let mut session = self.session.write();
        // Another caller may have refreshed while we waited for the lock
        if self.needs_refresh(session.expires_at) {
            *session = Self::load(&self.token_source, &self.key_source, self.passphrase.as_deref())?;
            info!(
                "Refreshed resource principal session, expires at {:?}",
                session.expires_at
            );
        }
        Ok(session.credentials.clone())
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

//! User API key credentials from the CLI config file
//!
//! Config file location: ~/.oci/config
//!
//! Example config:
//! ```ini
//! [DEFAULT]
//! user=ocid1.user.oc1..aaaa
//! fingerprint=20:3b:97:13:55:1c:5b:0d:d3:37:d8:50:4e:c5:3a:34
//! tenancy=ocid1.tenancy.oc1..aaaa
//! region=us-ashburn-1
//! key_file=~/.oci/oci_api_key.pem
//!
//! [OPERATOR]
//! user=ocid1.user.oc1..bbbb
//! ```
//!
//! Profiles inherit unset keys from `DEFAULT`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AuthError, AuthResult};
use crate::key::{load_private_key, KeyProvider, SigningCredentials};

const DEFAULT_PROFILE: &str = "DEFAULT";

/// Default config file path (`~/.oci/config`)
pub fn default_config_path() -> AuthResult<PathBuf> {
    Ok(home_dir()?.join(".oci").join("config"))
}

fn home_dir() -> AuthResult<PathBuf> {
    Ok(directories::BaseDirs::new()
        .ok_or_else(|| AuthError::ConfigFile("Could not determine home directory".into()))?
        .home_dir()
        .to_path_buf())
}

fn expand_home(path: &str) -> AuthResult<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Parse INI-style profiles, `#` and `;` start comments
fn parse_profiles(content: &str) -> AuthResult<HashMap<String, HashMap<String, String>>> {
    let mut profiles: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            profiles.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            AuthError::ConfigFile(format!("line {}: expected key=value", number + 1))
        })?;
        let profile = current.as_ref().ok_or_else(|| {
            AuthError::ConfigFile(format!("line {}: entry outside of a profile", number + 1))
        })?;

        profiles
            .entry(profile.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(profiles)
}

/// Credentials of an individual user
pub struct ApiKeyProvider {
    credentials: Arc<SigningCredentials>,
    region: Option<String>,
}

impl ApiKeyProvider {
    pub fn from_config_file(path: &Path, profile: &str) -> AuthResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ConfigFile(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_config_str(&content, profile)
    }

    pub fn from_config_str(content: &str, profile: &str) -> AuthResult<Self> {
        let profiles = parse_profiles(content)?;

        let mut entries = profiles.get(DEFAULT_PROFILE).cloned().unwrap_or_default();
        if profile != DEFAULT_PROFILE {
            let selected = profiles
                .get(profile)
                .ok_or_else(|| AuthError::ConfigFile(format!("Profile not found: {}", profile)))?;
            entries.extend(selected.clone());
        } else if !profiles.contains_key(DEFAULT_PROFILE) {
            return Err(AuthError::ConfigFile(format!("Profile not found: {}", profile)));
        }

        let required = |key: &str| {
            entries
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| AuthError::ConfigFile(format!("[{}] is missing {}", profile, key)))
        };

        let tenancy = required("tenancy")?;
        let user = required("user")?;
        let fingerprint = required("fingerprint")?;
        let key_file = expand_home(&required("key_file")?)?;

        let pem = std::fs::read_to_string(&key_file).map_err(|e| {
            AuthError::ConfigFile(format!("Failed to read key {}: {}", key_file.display(), e))
        })?;
        let passphrase = entries.get("pass_phrase").map(String::as_str);
        let private_key = load_private_key(&pem, passphrase)?;

        Ok(Self {
            credentials: Arc::new(SigningCredentials::new(
                format!("{}/{}/{}", tenancy, user, fingerprint),
                private_key,
            )),
            region: entries.get("region").cloned(),
        })
    }
}

impl KeyProvider for ApiKeyProvider {
    fn credentials(&self) -> AuthResult<Arc<SigningCredentials>> {
        Ok(self.credentials.clone())
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::tests::TEST_KEY;

    fn config_with_key(dir: &Path) -> String {
        let key_path = dir.join("api_key.pem");
        std::fs::write(&key_path, TEST_KEY).unwrap();
        format!(
            "# generated\n[DEFAULT]\nuser=ocid1.user.oc1..aaaa\nfingerprint=aa:bb:cc\ntenancy=ocid1.tenancy.oc1..tttt\nregion=us-ashburn-1\nkey_file={}\n\n[OPERATOR]\nuser = ocid1.user.oc1..bbbb\nregion = eu-frankfurt-1\n",
            key_path.display()
        )
    }

    #[test]
    fn test_default_profile() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ApiKeyProvider::from_config_str(&config_with_key(dir.path()), "DEFAULT").unwrap();

        let creds = provider.credentials().unwrap();
        assert_eq!(
            creds.key_id,
            "ocid1.tenancy.oc1..tttt/ocid1.user.oc1..aaaa/aa:bb:cc"
        );
        assert_eq!(provider.region(), Some("us-ashburn-1"));
    }

    #[test]
    fn test_profile_inherits_default() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ApiKeyProvider::from_config_str(&config_with_key(dir.path()), "OPERATOR").unwrap();

        let creds = provider.credentials().unwrap();
        assert_eq!(
            creds.key_id,
            "ocid1.tenancy.oc1..tttt/ocid1.user.oc1..bbbb/aa:bb:cc"
        );
        assert_eq!(provider.region(), Some("eu-frankfurt-1"));
    }

    #[test]
    fn test_missing_profile_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let content = config_with_key(dir.path());
        assert!(matches!(
            ApiKeyProvider::from_config_str(&content, "NOPE"),
            Err(AuthError::ConfigFile(_))
        ));

        let incomplete = "[DEFAULT]\nuser=ocid1.user.oc1..aaaa\n";
        assert!(matches!(
            ApiKeyProvider::from_config_str(incomplete, "DEFAULT"),
            Err(AuthError::ConfigFile(ref m)) if m.contains("tenancy")
        ));

        assert!(parse_profiles("user=orphan").is_err());
    }
}

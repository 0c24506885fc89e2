//! Signing credentials and private key loading

use std::sync::Arc;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::error::{AuthError, AuthResult};

/// Key id plus the RSA key that signs requests on its behalf
#[derive(Clone)]
pub struct SigningCredentials {
    pub key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl SigningCredentials {
    pub fn new(key_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::<Sha256>::new(private_key),
        }
    }

    pub fn signing_key(&self) -> &SigningKey<Sha256> {
        &self.signing_key
    }
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Source of request signing credentials.
///
/// Implementations cache what they load; `credentials` is called once per
/// outgoing request and must be cheap when nothing needs refreshing.
pub trait KeyProvider: Send + Sync {
    fn credentials(&self) -> AuthResult<Arc<SigningCredentials>>;

    /// Region the credentials were issued for, when known
    fn region(&self) -> Option<&str> {
        None
    }
}

/// Parse a PEM encoded RSA private key (PKCS#8, encrypted PKCS#8 or PKCS#1)
pub fn load_private_key(pem: &str, passphrase: Option<&str>) -> AuthResult<RsaPrivateKey> {
    let pem = pem.trim();

    if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        let passphrase = passphrase.ok_or_else(|| {
            AuthError::InvalidKey("key is encrypted but no passphrase was given".into())
        })?;
        return RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("cannot decrypt key: {}", e)));
    }

    if pem.contains("BEGIN RSA PRIVATE KEY") {
        if pem.contains("Proc-Type: 4,ENCRYPTED") {
            return Err(AuthError::InvalidKey(
                "legacy encrypted PKCS#1 keys are not supported, convert to PKCS#8".into(),
            ));
        }
        return RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| AuthError::InvalidKey(e.to_string()));
    }

    if pem.contains("BEGIN PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()));
    }

    Err(AuthError::InvalidKey("no PEM private key found".into()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_KEY: &str = include_str!("../testdata/test_key.pem");
    pub(crate) const TEST_KEY_PKCS1: &str = include_str!("../testdata/test_key_pkcs1.pem");
    pub(crate) const TEST_KEY_ENCRYPTED: &str = include_str!("../testdata/test_key_encrypted.pem");

    #[test]
    fn test_load_pkcs8_and_pkcs1_agree() {
        let a = load_private_key(TEST_KEY, None).unwrap();
        let b = load_private_key(TEST_KEY_PKCS1, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_encrypted_key() {
        let plain = load_private_key(TEST_KEY, None).unwrap();
        let decrypted = load_private_key(TEST_KEY_ENCRYPTED, Some("hunter2")).unwrap();
        assert_eq!(plain, decrypted);

        assert!(matches!(
            load_private_key(TEST_KEY_ENCRYPTED, None),
            Err(AuthError::InvalidKey(_))
        ));
        assert!(load_private_key(TEST_KEY_ENCRYPTED, Some("wrong")).is_err());
    }

    #[test]
    fn test_load_garbage() {
        assert!(matches!(
            load_private_key("hello", None),
            Err(AuthError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let creds = SigningCredentials::new("ST$token", load_private_key(TEST_KEY, None).unwrap());
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ST$token"));
        assert!(!debug.contains("signing_key"));
    }
}

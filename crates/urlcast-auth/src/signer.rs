//! HTTP request signing (draft-cavage HTTP signatures, rsa-sha256)
//!
//! The signing string is the newline-joined list of `name: value` lines for
//! the signed headers, in the order they are listed in the `headers`
//! parameter of the `authorization` header.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::key::{KeyProvider, SigningCredentials};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub headers: Vec<(&'static str, String)>,
}

impl SignedHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Signs outgoing requests with credentials from a [`KeyProvider`]
#[derive(Clone)]
pub struct RequestSigner {
    provider: Arc<dyn KeyProvider>,
}

impl RequestSigner {
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self { provider }
    }

    /// Sign a request at the current time
    pub fn sign(&self, method: &str, url: &Url, body: Option<&[u8]>) -> AuthResult<SignedHeaders> {
        let credentials = self.provider.credentials()?;
        sign_request(&credentials, method, url, body, Utc::now())
    }
}

/// Produce the signed header set for one request.
///
/// Requests with a body also sign `content-length`, `content-type` and
/// `x-content-sha256`; the body is always sent as JSON.
pub fn sign_request(
    credentials: &SigningCredentials,
    method: &str,
    url: &Url,
    body: Option<&[u8]>,
    now: DateTime<Utc>,
) -> AuthResult<SignedHeaders> {
    let host = host_header(url)?;
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let request_target = format!("{} {}", method.to_lowercase(), target);

    let mut signed: Vec<(&'static str, String)> = vec![
        ("date", date),
        ("(request-target)", request_target),
        ("host", host),
    ];

    if let Some(body) = body {
        signed.push(("content-length", body.len().to_string()));
        signed.push(("content-type", CONTENT_TYPE_JSON.to_string()));
        signed.push(("x-content-sha256", STANDARD.encode(Sha256::digest(body))));
    }

    let signing_string = signing_string(&signed);
    debug!("Signing string:\n{}", signing_string);

    let signature = credentials
        .signing_key()
        .try_sign(signing_string.as_bytes())
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    let signature = STANDARD.encode(signature.to_bytes());

    let header_names = signed
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ");

    let authorization = format!(
        r#"Signature version="1",keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
        credentials.key_id, header_names, signature
    );

    let mut headers: Vec<(&'static str, String)> = signed
        .into_iter()
        .filter(|(name, _)| *name != "(request-target)")
        .collect();
    headers.push(("authorization", authorization));

    Ok(SignedHeaders { headers })
}

fn signing_string(headers: &[(&'static str, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn host_header(url: &Url) -> AuthResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AuthError::Signing(format!("URL has no host: {}", url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

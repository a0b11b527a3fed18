//! Service-account authentication for the realtime database REST API.
//!
//! The credential file is the JSON key downloaded from the Firebase console.
//! It is exchanged for a short-lived OAuth2 access token using the JWT-bearer
//! grant: sign an RS256 assertion with the account's private key, POST it to
//! the key's `token_uri`, read back `access_token`.

use crate::error::{Result, SetpointError};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Fields of a service-account key file needed to mint tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SetpointError::MissingCredentialFile(path.to_path_buf()))
            }
            Err(e) => return Err(SetpointError::InvalidCredentials(e.to_string())),
        };
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| SetpointError::InvalidCredentials(e.to_string()))?;
        if key.client_email.trim().is_empty() {
            return Err(SetpointError::InvalidCredentials(
                "client_email is empty".into(),
            ));
        }
        Ok(key)
    }

    /// Build the signed JWT assertion, issued at `now` (unix seconds).
    pub fn assertion(&self, now: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATABASE_SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SetpointError::InvalidCredentials(format!("private_key: {e}")))?;

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| SetpointError::InvalidCredentials(format!("signing assertion: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Produces a bearer token for database requests.
pub trait TokenSource {
    fn access_token(&self) -> Result<String>;
}

/// A token obtained elsewhere, used as-is.
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Exchanges a service-account assertion for an access token.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    http: reqwest::blocking::Client,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http: reqwest::blocking::Client) -> Self {
        Self { key, http }
    }
}

impl TokenSource for ServiceAccountTokenSource {
    fn access_token(&self) -> Result<String> {
        let assertion = self.key.assertion(chrono::Utc::now().timestamp())?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;

        let status = resp.status();
        let body = resp.text().unwrap_or_else(|_| "<unreadable>".to_string());
        if !status.is_success() {
            return Err(SetpointError::Auth(format!("{status}: {body}")));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SetpointError::Auth(format!("unparsable token response: {e}")))?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                tracing::debug!(client_email = %self.key.client_email, "obtained database access token");
                Ok(token)
            }
            _ => Err(SetpointError::Auth(format!(
                "no access_token in response: {} {}",
                parsed.error.unwrap_or_default(),
                parsed.error_description.unwrap_or_default()
            ))),
        }
    }
}

//! Service-account authentication.
//!
//! A service-account key signs a short-lived JWT assertion (RS256) which is
//! exchanged at the key's `token_uri` for a bearer token. Tokens are cached
//! until shortly before they expire.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

use crate::error::{BigQueryError, Result};

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key that the client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BigQueryError::Credentials(format!("invalid service account key: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BigQueryError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

/// How the client authenticates its requests.
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    /// Pre-issued bearer token (emulators, tests).
    AccessToken(String),
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Hands out bearer tokens for the configured credentials.
pub struct TokenProvider {
    credentials: Credentials,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(credentials: Credentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            http_client,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String> {
        let key = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.exchange(key).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
        let assertion = sign_assertion(key, Utc::now())?;

        tracing::debug!(client_email = %key.client_email, "Exchanging service account assertion");
        let resp = self
            .http_client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BigQueryError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        Ok(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        })
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: BIGQUERY_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| BigQueryError::Credentials(format!("invalid private key: {}", e)))?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| BigQueryError::Auth(format!("failed to sign assertion: {}", e)))
}

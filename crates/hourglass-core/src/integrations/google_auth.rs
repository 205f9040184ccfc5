//! Google service-account authentication.
//!
//! Signs an RS256 JWT assertion with the service account's private key and
//! exchanges it for an access token at the credential's `token_uri`
//! (JWT bearer grant). Tokens are cached until shortly before they expire.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::storage::ServiceAccountKey;
use crate::sync::SyncError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Access-token source for one service account.
pub struct ServiceAccountAuth {
    http: Client,
    key: ServiceAccountKey,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(http: Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            cache: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// Build the signed JWT assertion sent to the token endpoint.
    pub fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, SyncError> {
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SyncError::Auth(format!("invalid service account private key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SyncError::Auth(format!("failed to sign assertion: {e}")))
    }

    /// Return a cached token, or exchange a fresh assertion for one.
    pub async fn access_token(&self) -> Result<String, SyncError> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > now {
                return Ok(cached.access_token.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "token exchange failed (HTTP {status}): {text}"
            )));
        }

        let token: TokenResponse = resp.json().await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained Google access token"
        );
        // Google never issues tokens outliving the assertion that bought them.
        let lifetime = token
            .expires_in
            .saturating_sub(EXPIRY_MARGIN_SECS)
            .clamp(0, ASSERTION_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

/// Where a Sheets client gets its bearer token.
#[derive(Clone)]
pub enum TokenSource {
    ServiceAccount(Arc<ServiceAccountAuth>),
    /// A fixed token, for tests and short-lived scripts.
    Static(String),
}

impl TokenSource {
    pub async fn token(&self) -> Result<String, SyncError> {
        match self {
            TokenSource::ServiceAccount(auth) => auth.access_token().await,
            TokenSource::Static(token) => Ok(token.clone()),
        }
    }
}

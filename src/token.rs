//! OAuth2 token lifecycle against the Keycloak token endpoint.
//!
//! The manager is the exclusive owner of the persisted refresh token and
//! the in-memory access token. Startup runs at most one password grant
//! (only when no usable refresh token is persisted) followed by one
//! refresh grant; afterwards [`TokenManager::bearer`] serves the header
//! from memory, renewing via another refresh grant when the access token
//! approaches expiry.

use crate::config::KeycloakConfig;
use crate::error::{BridgeError, BridgeResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Scope requested with the password grant so the endpoint issues a
/// long-lived refresh token.
const OFFLINE_SCOPE: &str = "offline_access";

/// Renew the access token when it is this close to expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct AccessState {
    token: String,
    expires_at: Instant,
}

/// Owner of the OAuth2 refresh-token/access-token lifecycle.
pub struct TokenManager {
    http: reqwest::Client,
    creds: KeycloakConfig,
    refresh_token: String,
    access: RwLock<AccessState>,
}

impl TokenManager {
    /// Acquire tokens at startup.
    ///
    /// Reads the persisted refresh token from `token_file` if present and
    /// non-empty; otherwise performs a password grant and persists the
    /// returned refresh token. Then exchanges the refresh token for an
    /// access token. Any grant failure here is fatal to startup.
    pub async fn bootstrap(creds: KeycloakConfig, token_file: PathBuf) -> BridgeResult<Self> {
        let http = reqwest::Client::new();

        let refresh_token = match read_token_file(&token_file)? {
            Some(token) => {
                info!(file = %token_file.display(), "using persisted refresh token");
                token
            }
            None => {
                info!("no persisted refresh token, performing password grant");
                let token = password_grant(&http, &creds).await?;
                std::fs::write(&token_file, &token)?;
                debug!(file = %token_file.display(), "persisted refresh token");
                token
            }
        };

        let access = refresh_grant(&http, &creds, &refresh_token).await?;
        info!("access token acquired");

        Ok(Self {
            http,
            creds,
            refresh_token,
            access: RwLock::new(access),
        })
    }

    /// Current `Authorization` header value (`Bearer <access_token>`).
    ///
    /// Serves from memory; runs a refresh grant first when the held token
    /// is within [`EXPIRY_MARGIN`] of expiry.
    pub async fn bearer(&self) -> BridgeResult<String> {
        {
            let access = self.access.read().await;
            if !near_expiry(&access) {
                return Ok(format!("Bearer {}", access.token));
            }
        }

        let mut access = self.access.write().await;
        // Another caller may have renewed while we waited for the lock.
        if near_expiry(&access) {
            warn!("access token near expiry, renewing");
            *access = refresh_grant(&self.http, &self.creds, &self.refresh_token).await?;
        }
        Ok(format!("Bearer {}", access.token))
    }
}

fn near_expiry(access: &AccessState) -> bool {
    Instant::now() + EXPIRY_MARGIN >= access.expires_at
}

/// Read the persisted refresh token, treating a missing or blank file as
/// absent.
fn read_token_file(path: &Path) -> BridgeResult<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let token = content.trim();
    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(token.to_string()))
    }
}

fn basic_auth(creds: &KeycloakConfig) -> String {
    let id = format!("{}:{}", creds.id_client, creds.id_secret);
    format!("Basic {}", BASE64.encode(id))
}

/// Exchange the resource-owner credentials for a refresh token.
async fn password_grant(http: &reqwest::Client, creds: &KeycloakConfig) -> BridgeResult<String> {
    let form = [
        ("grant_type", "password"),
        ("username", creds.username.as_str()),
        ("password", creds.password.as_str()),
        ("scope", OFFLINE_SCOPE),
    ];

    let response = http
        .post(&creds.url)
        .header("Authorization", basic_auth(creds))
        .form(&form)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(BridgeError::Token(format!(
            "password grant rejected: {}",
            response.status()
        )));
    }

    let body: TokenResponse = response.json().await?;
    body.refresh_token
        .ok_or_else(|| BridgeError::Token("token endpoint returned no refresh_token".to_string()))
}

/// Exchange the refresh token for an access token.
async fn refresh_grant(
    http: &reqwest::Client,
    creds: &KeycloakConfig,
    refresh_token: &str,
) -> BridgeResult<AccessState> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let response = http
        .post(&creds.url)
        .header("Authorization", basic_auth(creds))
        .form(&form)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(BridgeError::Token(format!(
            "refresh grant rejected: {}",
            response.status()
        )));
    }

    let body: TokenResponse = response.json().await?;
    let token = body
        .access_token
        .ok_or_else(|| BridgeError::Token("token endpoint returned no access_token".to_string()))?;
    let lifetime = body
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME);

    Ok(AccessState {
        token,
        expires_at: Instant::now() + lifetime,
    })
}

//! Directory lookup: resolves creator ids to display names and view counts.
//!
//! The enricher only sees the `DirectoryLookup` trait. `HelixDirectory` is the
//! production implementation, a blocking client for the Helix users endpoint.

use crate::{config::DirectoryConfig, types::CreatorId};
use serde::Deserialize;
use std::cell::OnceCell;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("cannot read response body: {0}")]
    Body(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("directory returned non-numeric id {0:?}")]
    InvalidId(String),

    #[error("{requested} ids requested, directory accepts at most {cap}")]
    TooManyIds { requested: usize, cap: usize },

    #[error("missing credentials: {0}")]
    Credentials(String),
}

/// One directory answer. `display_name` is optional because the enricher
/// must be able to detect entries that arrive without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: CreatorId,
    pub display_name: Option<String>,
    pub view_count: Option<i64>,
}

pub trait DirectoryLookup {
    /// Resolve a batch of ids. Entries may come back in any order and may
    /// omit ids the directory does not know.
    fn resolve(&self, ids: &[CreatorId]) -> Result<Vec<DirectoryEntry>, LookupError>;
}

// ── Helix wire format ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    view_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AppToken {
    access_token: String,
}

fn decode_users(body: &str) -> Result<Vec<DirectoryEntry>, LookupError> {
    let page: UsersPage = serde_json::from_str(body)?;
    page.data
        .into_iter()
        .map(|user| {
            let id = user
                .id
                .trim()
                .parse::<CreatorId>()
                .map_err(|_| LookupError::InvalidId(user.id.clone()))?;
            Ok(DirectoryEntry {
                id,
                display_name: user.display_name.filter(|n| !n.is_empty()),
                view_count: user.view_count,
            })
        })
        .collect()
}

pub struct HelixDirectory {
    agent: ureq::Agent,
    users_url: String,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    cap: usize,
    token: OnceCell<String>,
}

impl HelixDirectory {
    pub fn new(config: &DirectoryConfig, cap: usize) -> Result<Self, LookupError> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| LookupError::Credentials(DirectoryConfig::CLIENT_ID_VAR.into()))?;
        if config.oauth_token.is_none() && config.client_secret.is_none() {
            return Err(LookupError::Credentials(format!(
                "{} or {}",
                DirectoryConfig::OAUTH_TOKEN_VAR,
                DirectoryConfig::CLIENT_SECRET_VAR
            )));
        }
        let token = config
            .oauth_token
            .clone()
            .map(OnceCell::from)
            .unwrap_or_default();
        Ok(Self {
            agent: ureq::Agent::new(),
            users_url: format!("{}/users", config.base_url.trim_end_matches('/')),
            token_url: config.token_url.clone(),
            client_id,
            client_secret: config.client_secret.clone(),
            cap,
            token,
        })
    }

    /// Bearer token, minted once via the client-credentials grant when none
    /// was configured.
    fn bearer(&self) -> Result<&str, LookupError> {
        if let Some(token) = self.token.get() {
            return Ok(token.as_str());
        }
        let secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| LookupError::Credentials(DirectoryConfig::CLIENT_SECRET_VAR.into()))?;
        let body = self
            .agent
            .post(&self.token_url)
            .send_form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", secret),
                ("grant_type", "client_credentials"),
            ])
            .map_err(|e| LookupError::Request(format!("POST {}: {e}", self.token_url)))?
            .into_string()?;
        let minted: AppToken = serde_json::from_str(&body)?;
        log::info!("obtained app access token for client {}", self.client_id);
        Ok(self.token.get_or_init(|| minted.access_token).as_str())
    }
}

impl DirectoryLookup for HelixDirectory {
    fn resolve(&self, ids: &[CreatorId]) -> Result<Vec<DirectoryEntry>, LookupError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > self.cap {
            return Err(LookupError::TooManyIds {
                requested: ids.len(),
                cap: self.cap,
            });
        }

        let token = self.bearer()?;
        let mut request = self
            .agent
            .get(&self.users_url)
            .set("Client-Id", &self.client_id)
            .set("Authorization", &format!("Bearer {token}"));
        for id in ids {
            request = request.query("id", &id.to_string());
        }

        let body = request
            .call()
            .map_err(|e| LookupError::Request(format!("GET {}: {e}", self.users_url)))?
            .into_string()?;
        let entries = decode_users(&body)?;
        log::debug!("directory resolved {}/{} ids", entries.len(), ids.len());
        Ok(entries)
    }
}

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::Utc;
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{
    auth::{
        token::{generate_token_value, TokenInfo},
        user::{Role, UserId, UserInfo},
    },
    store::{SessionStore, StoreError},
    util::format_datetime,
};

/// `auth:token:<token>` holds the login id the token belongs to
pub const TOKEN_PREFIX: &str = "auth:token:";
/// `auth:session:<login id>` holds the JSON [`SessionBundle`] plus a `tokens` list
/// with every token value issued to that user
pub const SESSION_PREFIX: &str = "auth:session:";

const MAX_TOKEN_ATTEMPTS: usize = 8;

fn token_key(token: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, token)
}

fn session_key(login_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, login_id)
}

/// shortened token for log lines
fn redact(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

fn parse_entry(raw: Option<&str>) -> Option<Map<String, Value>> {
    raw.and_then(|raw| serde_json::from_str(raw).ok())
}

fn tokens_in(entry: &Map<String, Value>) -> Vec<String> {
    entry
        .get("tokens")
        .and_then(|tokens| serde_json::from_value(tokens.clone()).ok())
        .unwrap_or_default()
}

fn entry_json(mut entry: Map<String, Value>, tokens: Vec<String>) -> String {
    entry.insert("tokens".into(), Value::from(tokens));
    Value::Object(entry).to_string()
}

/// `now + remaining`, or `never` for keys without a representable deadline
fn format_expiration(remaining: Option<Duration>) -> String {
    remaining
        .and_then(|remaining| chrono::Duration::from_std(remaining).ok())
        .and_then(|remaining| Utc::now().checked_add_signed(remaining))
        .map(|at| format_datetime(&at))
        .unwrap_or_else(|| "never".to_owned())
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// lifetime of every issued token
    pub timeout: Duration,
    /// whether one user may hold several live tokens at once
    pub concurrent: bool,
}

/// The value cached per logged in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub user: UserInfo,
    pub token: TokenInfo,
}

/// A token resolved to its owner.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub login_id: UserId,
    pub bundle: SessionBundle,
}

/// Flattened view of one live token, as shown by the session listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub token: String,
    pub perms: BTreeSet<String>,
    pub roles: BTreeSet<Role>,
    pub email: Option<String>,
    pub id: UserId,
    pub username: String,
    pub real_name: Option<String>,
    /// Absolute expiry time, `yyyy-MM-dd HH:mm:ss` in server local time
    #[schema(example = "2024-01-05 13:37:00")]
    pub expiration: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionPage {
    pub records: Vec<SessionRecord>,
    /// Number of live tokens, taken from the same snapshot as `records`
    pub total: u64,
}

/// Issues, resolves and revokes tokens on top of a [`SessionStore`].
///
/// Each user has one bundle no matter how many tokens they hold. The bundle
/// always describes the most recent login and outlives every token pointing at it.
/// The token list stored next to the bundle is only changed through
/// [`SessionStore::update`], so logins and logouts racing on the same user
/// never lose each other's tokens.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, settings: SessionSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(key.to_owned())),
            None => Ok(None),
        }
    }

    /// Claims a fresh token key for `login_id`.
    async fn claim_token(&self, login_id: &str) -> Result<String, StoreError> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_token_value();
            let claimed = self
                .store
                .set_if_absent(&token_key(&token), login_id.to_owned(), Some(self.settings.timeout))
                .await?;

            if claimed {
                return Ok(token);
            }
        }

        Err(StoreError::Unavailable(
            "could not generate a unique token".into(),
        ))
    }

    /// The user's listed tokens, split into those that still resolve and dead ones.
    async fn listed_tokens(&self, login_id: &str) -> Result<(Vec<String>, Vec<String>), StoreError> {
        let raw = self.store.get(&session_key(login_id)).await?;
        let listed = parse_entry(raw.as_deref())
            .map(|entry| tokens_in(&entry))
            .unwrap_or_default();

        let keys: Vec<String> = listed.iter().map(|t| token_key(t)).collect();
        let owners = self.store.multi_get(&keys).await?;

        let (live, dead): (Vec<_>, Vec<_>) = listed
            .into_iter()
            .zip(owners)
            .partition(|(_, owner)| owner.as_deref() == Some(login_id));

        Ok((
            live.into_iter().map(|(token, _)| token).collect(),
            dead.into_iter().map(|(token, _)| token).collect(),
        ))
    }

    /// Tokens issued to the user that still resolve.
    pub async fn tokens_of(&self, login_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.listed_tokens(login_id).await?.0)
    }

    /// Starts a session for an already verified user and returns the new token.
    pub async fn login(&self, user: UserInfo) -> Result<TokenInfo, StoreError> {
        let user = user.without_password();
        let login_id = user.id.clone();
        let key = session_key(&login_id);

        let (_, dead) = self.listed_tokens(&login_id).await?;
        let token = self.claim_token(&login_id).await?;
        let token_info = TokenInfo {
            token: token.clone(),
            expiration: i64::try_from(self.settings.timeout.as_secs()).unwrap_or(i64::MAX),
        };

        let bundle = SessionBundle {
            user,
            token: token_info.clone(),
        };
        let bundle = match serde_json::to_value(&bundle) {
            Ok(Value::Object(bundle)) => bundle,
            _ => return Err(StoreError::Corrupt(key)),
        };

        let concurrent = self.settings.concurrent;
        let issued = token.clone();
        let previous = self
            .store
            .update(
                &key,
                Some(self.settings.timeout),
                Box::new(move |old: Option<&str>| {
                    let mut tokens = match parse_entry(old) {
                        Some(old) if concurrent => tokens_in(&old),
                        _ => Vec::new(),
                    };
                    tokens.retain(|t| !dead.contains(t));
                    tokens.push(issued);
                    Some(entry_json(bundle, tokens))
                }),
            )
            .await?;

        if !concurrent {
            let replaced = parse_entry(previous.as_deref())
                .map(|entry| tokens_in(&entry))
                .unwrap_or_default();
            for old in replaced.iter().filter(|old| **old != token) {
                if self.store.delete(&token_key(old)).await? {
                    info!("token {}... of user {} replaced by a new login", redact(old), login_id);
                }
            }
        }

        info!("login success for user {}", login_id);
        Ok(token_info)
    }

    /// Looks up the session a token belongs to. `None` means unauthenticated.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let login_id = match self.store.get(&token_key(token)).await? {
            Some(login_id) => login_id,
            None => return Ok(None),
        };

        let bundle: Option<SessionBundle> = self.get_json(&session_key(&login_id)).await?;
        Ok(bundle.map(|bundle| Session {
            token: token.to_owned(),
            login_id,
            bundle,
        }))
    }

    /// Invalidates one token and returns its owner, or `None` when the token was not live.
    /// The bundle goes away with the user's last token.
    async fn revoke(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let key = token_key(token);
        let login_id = match self.store.get(&key).await? {
            Some(login_id) => login_id,
            None => return Ok(None),
        };

        self.store.delete(&key).await?;

        let (_, dead) = self.listed_tokens(&login_id).await?;
        let revoked = token.to_owned();
        self.store
            .update(
                &session_key(&login_id),
                None,
                Box::new(move |old: Option<&str>| {
                    let entry = parse_entry(old)?;
                    let tokens: Vec<String> = tokens_in(&entry)
                        .into_iter()
                        .filter(|t| *t != revoked && !dead.contains(t))
                        .collect();

                    if tokens.is_empty() {
                        None
                    } else {
                        Some(entry_json(entry, tokens))
                    }
                }),
            )
            .await?;

        Ok(Some(login_id))
    }

    /// Ends the caller's own session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.revoke(token).await?.is_some())
    }

    /// Forcibly invalidates someone's token. Unknown tokens are ignored.
    pub async fn kickout(&self, token: &str) -> Result<bool, StoreError> {
        match self.revoke(token).await? {
            Some(login_id) => {
                info!("token {}... of user {} kicked out", redact(token), login_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// One page of live tokens. Tokens that vanish between the key scan and the
    /// bundle lookup are skipped, so a page may hold fewer than `limit` records.
    pub async fn list_sessions(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<SessionPage, StoreError> {
        let page = self.store.scan(TOKEN_PREFIX, offset, limit).await?;
        let owners = self.store.multi_get(&page.keys).await?;

        let mut records = Vec::with_capacity(page.keys.len());
        for (key, owner) in page.keys.iter().zip(owners) {
            let login_id = match owner {
                Some(login_id) => login_id,
                None => continue,
            };

            let bundle: SessionBundle = match self.get_json(&session_key(&login_id)).await {
                Ok(Some(bundle)) => bundle,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping session of user {}: {}", login_id, e);
                    continue;
                }
            };

            let expiration = match self.store.ttl(key).await? {
                Some(remaining) => format_expiration(remaining),
                None => continue,
            };

            let user = bundle.user;
            records.push(SessionRecord {
                token: key[TOKEN_PREFIX.len()..].to_owned(),
                perms: user.perms,
                roles: user.roles,
                email: user.email,
                id: user.id,
                username: user.username,
                real_name: user.real_name,
                expiration,
            });
        }

        Ok(SessionPage {
            records,
            total: page.total,
        })
    }
}

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HandlerError;

pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    /// Machine readable role code, e.g. `administrator`
    pub code: String,
    pub name: String,
}

/// struct containing user info
/// the password is the stored ciphertext and must be cleared with
/// [`UserInfo::without_password`] before the struct leaves the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub email: Option<String>,
    pub real_name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub perms: BTreeSet<String>,
}

impl UserInfo {
    pub fn without_password(mut self) -> Self {
        self.password = None;
        self
    }
}

/// Where user records come from. Postgres in production, see `db.rs`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when no user has that username.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserInfo>, HandlerError>;
}

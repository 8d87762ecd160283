use std::sync::Arc;

use derive_more::{Display, Error};
use log::warn;

use crate::{
    auth::user::{UserDirectory, UserInfo},
    crypto,
    error::HandlerError,
    security::are_credentials_present,
    util::constant_time_compare,
};

#[derive(Debug, Display, Error)]
pub enum LoginError {
    /// A field was blank. Nothing was looked up.
    #[display(fmt = "username or password is empty")]
    MissingCredentials,
    /// Unknown user and wrong password deliberately share this variant.
    #[display(fmt = "invalid credentials")]
    InvalidCredentials,
    #[display(fmt = "{}", _0)]
    Backend(HandlerError),
}

impl From<LoginError> for HandlerError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::MissingCredentials => {
                HandlerError::validation("username or password is empty")
            }
            LoginError::InvalidCredentials => HandlerError::unauthorized("invalid credentials"),
            LoginError::Backend(e) => e,
        }
    }
}

/// Checks a username/password pair against the user directory.
pub struct CredentialVerifier {
    directory: Arc<dyn UserDirectory>,
    secret_key: [u8; 32],
}

impl CredentialVerifier {
    pub fn new(directory: Arc<dyn UserDirectory>, secret_key: [u8; 32]) -> Self {
        Self {
            directory,
            secret_key,
        }
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Returns the matching user with the password already cleared.
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserInfo, LoginError> {
        if !are_credentials_present(username, password) {
            return Err(LoginError::MissingCredentials);
        }

        let user = self
            .directory
            .find_by_username(username)
            .await
            .map_err(LoginError::Backend)?
            .ok_or(LoginError::InvalidCredentials)?;

        let stored = match &user.password {
            Some(stored) => stored,
            None => {
                warn!("user {} has no stored password, refusing login", user.id);
                return Err(LoginError::InvalidCredentials);
            }
        };

        let plaintext = match crypto::decrypt(&self.secret_key, stored) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                // usually means AUTH_SECRET_KEY differs from the key the row was written with
                warn!("could not decrypt stored password of user {}: {}", user.id, e);
                return Err(LoginError::InvalidCredentials);
            }
        };

        if !constant_time_compare(&plaintext, password) {
            return Err(LoginError::InvalidCredentials);
        }

        Ok(user.without_password())
    }
}

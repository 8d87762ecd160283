use actix_web::{
    get,
    web::{Data, Json},
};

use crate::{
    auth::{
        credentials::CredentialVerifier,
        identity::Identity,
        user::UserInfo,
    },
    error::{HResult, HandlerError},
};

/// Who Am I
///
/// Get the profile of the logged in user. The user is reloaded from the
/// directory so profile changes show up without logging in again.
#[utoipa::path(
    responses(
        (status = OK, description = "Success", body = UserInfo),
        (status = UNAUTHORIZED, description = "No live session", body = HandlerError)
    ),
    tag = "auth",
    security(("token" = []))
)]
#[get("/auth/info")]
pub async fn info(verifier: Data<CredentialVerifier>, identity: Identity) -> HResult<Json<UserInfo>> {
    let username = &identity.bundle.user.username;

    match verifier.directory().find_by_username(username).await? {
        Some(user) => Ok(Json(user.without_password())),
        // deleted since login
        None => Err(HandlerError::from(401)),
    }
}

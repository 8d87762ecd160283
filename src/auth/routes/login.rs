use actix_web::{
    post,
    web::{Data, Json},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::{credentials::CredentialVerifier, token::TokenInfo, SessionManager},
    error::HResult,
};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// The username of the account
    #[serde(default)]
    username: String,
    /// The plaintext password
    #[serde(default)]
    password: String,
}

/// Login
///
/// Verify a username and password and start a session. The returned token is
/// used as a bearer token for every other endpoint.
#[utoipa::path(
    request_body = LoginRequest,
    responses(
        (status = OK, description = "Login successful", body = TokenInfo),
        (status = BAD_REQUEST, description = "Username or password is empty", body = HandlerError),
        (status = UNAUTHORIZED, description = "Invalid credentials", body = HandlerError)
    ),
    tag = "auth"
)]
#[post("/auth/login")]
pub async fn login(
    verifier: Data<CredentialVerifier>,
    sm: Data<SessionManager>,
    req: Json<LoginRequest>,
) -> HResult<Json<TokenInfo>> {
    let user = verifier.verify(&req.username, &req.password).await?;
    let token = sm.login(user).await?;

    Ok(Json(token))
}

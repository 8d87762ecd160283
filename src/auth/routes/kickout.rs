use actix_web::{
    delete,
    web::{Data, Path},
    HttpResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{perms::RequirePermission, SessionManager},
    error::HResult,
};

#[derive(Deserialize, IntoParams)]
pub struct TokenParams {
    /// The token to invalidate
    pub token: String,
}

/// Kick Out Token
///
/// Invalidate any live token, ending that user's session on the device that
/// holds it. Requires the `auth:delete` permission. Unknown tokens are ignored.
#[utoipa::path(
    params(TokenParams),
    responses(
        (status = OK, description = "Token invalidated (or was not live)", example = "success"),
        (status = UNAUTHORIZED, description = "No live session", body = HandlerError),
        (status = FORBIDDEN, description = "Missing the auth:delete permission", body = HandlerError)
    ),
    tag = "auth",
    security(("token" = []))
)]
#[delete("/auth/token/{token}", wrap = "RequirePermission::new(\"auth:delete\")")]
pub async fn kickout(sm: Data<SessionManager>, path: Path<TokenParams>) -> HResult<HttpResponse> {
    sm.kickout(&path.token).await?;

    Ok(HttpResponse::Ok().body("success"))
}

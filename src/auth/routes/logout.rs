use actix_web::{delete, web::Data, HttpResponse};

use crate::{
    auth::{identity::BearerToken, SessionManager},
    error::HResult,
};

/// Logout
///
/// End the session of the presented token. Succeeds even when there is no
/// session to end, so it is safe to call more than once.
#[utoipa::path(
    responses(
        (status = OK, description = "Session ended (or there was none)", example = "success")
    ),
    tag = "auth",
    security(("token" = []))
)]
#[delete("/auth/logout")]
pub async fn logout(sm: Data<SessionManager>, token: Option<BearerToken>) -> HResult<HttpResponse> {
    if let Some(token) = token {
        sm.logout(&token).await?;
    }

    Ok(HttpResponse::Ok().body("success"))
}

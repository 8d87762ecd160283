use actix_web::{
    get,
    web::{Data, Json, Query},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{identity::Identity, session_manager::SessionPage, SessionManager},
    error::{macros::err, HResult},
};

pub const MAX_PAGE_SIZE: u64 = 100;

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[param(default = 1, minimum = 1)]
    pub page: u64,
    /// Records per page
    #[serde(default = "default_limit")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub limit: u64,
}

/// List Sessions
///
/// Page through every live token together with the profile cached for its
/// user. `total` and `records` come from the same snapshot of the store.
#[utoipa::path(
    params(PageParams),
    responses(
        (status = OK, description = "Success", body = SessionPage),
        (status = BAD_REQUEST, description = "Invalid page or limit", body = HandlerError),
        (status = UNAUTHORIZED, description = "No live session", body = HandlerError)
    ),
    tag = "auth",
    security(("token" = []))
)]
#[get("/auth/token/page")]
pub async fn token_page(
    sm: Data<SessionManager>,
    _identity: Identity,
    query: Query<PageParams>,
) -> HResult<Json<SessionPage>> {
    if query.page == 0 {
        return err!(400, "page starts at 1");
    }

    if query.limit == 0 || query.limit > MAX_PAGE_SIZE {
        return err!(400, "limit must be between 1 and 100");
    }

    let offset = (query.page - 1).saturating_mul(query.limit);
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);

    let page = sm.list_sessions(offset, query.limit as usize).await?;
    Ok(Json(page))
}

use actix_web::web::{JsonConfig, QueryConfig, ServiceConfig};
use utoipa::OpenApi;

use crate::error::HandlerError;

pub mod info;
pub mod kickout;
pub mod login;
pub mod logout;
pub mod token_page;

pub fn configure_app(cfg: &mut ServiceConfig) {
    // malformed bodies and query strings get the same envelope as every other error
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        HandlerError::validation(&format!("invalid request body: {}", err)).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        HandlerError::validation(&format!("invalid query string: {}", err)).into()
    }));

    cfg.service(login::login)
        .service(logout::logout)
        .service(info::info)
        // before kickout, whose path also matches `/auth/token/page`
        .service(token_page::token_page)
        .service(kickout::kickout);
}

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "auth", description = "Login, logout and session management")
    ),
    paths(
        login::login,
        logout::logout,
        info::info,
        kickout::kickout,
        token_page::token_page
    ),
    components(schemas(
        login::LoginRequest,
        crate::auth::token::TokenInfo,
        crate::auth::user::UserInfo,
        crate::auth::user::Role,
        crate::auth::session_manager::SessionRecord,
        crate::auth::session_manager::SessionPage,
        crate::error::HandlerError,
    ))
)]
pub struct AuthApiDocs;

use std::{future::Ready, ops::Deref, pin::Pin};

use actix_web::{web::Data, FromRequest, HttpMessage, HttpRequest};
use futures::Future;

use crate::{
    auth::session_manager::{Session, SessionManager},
    error::{HResult, HandlerError, IntoHandlerErrorResult},
    security::is_plausible_token,
};

/// The raw bearer value from `Authorization: Bearer <token>`.
/// Says nothing about whether the token is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn from_request_head(req: &HttpRequest) -> Option<Self> {
        let header = req.headers().get("Authorization")?.to_str().ok()?;

        // needs to be a Bearer token
        let token = header.strip_prefix("Bearer ")?.trim();

        is_plausible_token(token).then(|| BearerToken(token.to_owned()))
    }
}

impl Deref for BearerToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for BearerToken {
    type Error = HandlerError;
    type Future = Ready<HResult<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        std::future::ready(Self::from_request_head(req).or_err(401))
    }
}

/// The caller's resolved session. Extracting it fails with 401 when the request
/// carries no live token.
#[derive(Debug, Clone)]
pub struct Identity(pub Session);

impl Identity {
    /// Resolves the caller once per request; later calls reuse the cached result.
    pub async fn resolve(req: &HttpRequest) -> HResult<Self> {
        if let Some(session) = req.extensions().get::<Session>() {
            return Ok(Identity(session.clone()));
        }

        let token = BearerToken::from_request_head(req).or_err(401)?;
        let sm = req.app_data::<Data<SessionManager>>().or_err(500)?;

        let session = sm.resolve(&token).await?.or_err(401)?;
        req.extensions_mut().insert(session.clone());

        Ok(Identity(session))
    }
}

impl Deref for Identity {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Identity {
    type Error = HandlerError;
    type Future = Pin<Box<dyn Future<Output = HResult<Self>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { Identity::resolve(&req).await })
    }
}

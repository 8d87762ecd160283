use std::{
    collections::BTreeSet,
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::warn;

use crate::{auth::identity::Identity, error::HandlerError};

/// Whether `granted` covers `required`.
///
/// `*` grants everything and `auth:*` grants every permission under `auth:`.
pub fn has_permission(granted: &BTreeSet<String>, required: &str) -> bool {
    granted.iter().any(|perm| {
        if perm == required || perm == "*" {
            return true;
        }

        match perm.strip_suffix('*') {
            Some(scope) if scope.ends_with(':') => required.starts_with(scope),
            _ => false,
        }
    })
}

/// Rejects requests whose caller lacks `permission` before the wrapped handler runs.
///
/// ```ignore
/// #[delete("/auth/token/{token}", wrap = "RequirePermission::new(\"auth:delete\")")]
/// ```
#[derive(Clone)]
pub struct RequirePermission {
    permission: Rc<str>,
}

impl RequirePermission {
    pub fn new(permission: &str) -> Self {
        Self {
            permission: permission.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequirePermission
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequirePermissionMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequirePermissionMiddleware {
            service: Rc::new(service),
            permission: Rc::clone(&self.permission),
        }))
    }
}

pub struct RequirePermissionMiddleware<S> {
    service: Rc<S>,
    permission: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for RequirePermissionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let permission = Rc::clone(&self.permission);

        Box::pin(async move {
            let identity = match Identity::resolve(req.request()).await {
                Ok(identity) => identity,
                Err(e) => return Ok(req.error_response(e).map_into_right_body()),
            };

            if !has_permission(&identity.bundle.user.perms, &permission) {
                warn!(
                    "user {} denied {} {} (missing `{}`)",
                    identity.login_id,
                    req.method(),
                    req.path(),
                    permission
                );
                return Ok(req
                    .error_response(HandlerError::from(403))
                    .map_into_right_body());
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn exact_match() {
        assert!(has_permission(&perms(&["auth:delete"]), "auth:delete"));
        assert!(!has_permission(&perms(&["auth:list"]), "auth:delete"));
        assert!(!has_permission(&perms(&[]), "auth:delete"));
    }

    #[test]
    fn wildcards() {
        assert!(has_permission(&perms(&["*"]), "auth:delete"));
        assert!(has_permission(&perms(&["auth:*"]), "auth:delete"));
        assert!(!has_permission(&perms(&["user:*"]), "auth:delete"));
        // a bare trailing star is not a scope
        assert!(!has_permission(&perms(&["auth*"]), "auth:delete"));
    }
}

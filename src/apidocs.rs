use utoipa::{OpenApi, openapi::security::{SecurityScheme, HttpBuilder, HttpAuthScheme}};

use crate::auth::routes::AuthApiDocs;

#[derive(OpenApi)]
#[openapi(
    modifiers(&TokenSecurityAddon)
)]
pub struct ApiDocs;

pub fn setup_oapi() -> utoipa::openapi::OpenApi {
    let mut oapi = ApiDocs::openapi();

    oapi.merge(AuthApiDocs::openapi());

    oapi
}

struct TokenSecurityAddon;

impl utoipa::Modify for TokenSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("SessionToken")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_auth_route() {
        let oapi = setup_oapi();
        for path in ["/auth/login", "/auth/logout", "/auth/info", "/auth/token/{token}", "/auth/token/page"] {
            assert!(oapi.paths.paths.contains_key(path), "{path} missing");
        }
        let components = oapi.components.expect("components");
        assert!(components.security_schemes.contains_key("token"));
        assert!(components.schemas.contains_key("SessionPage"));
    }
}

use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length of generated token values. The nanoid alphabet gives 6 bits per character.
pub const TOKEN_LENGTH: usize = 64;

/// Token metadata cached in a session bundle and returned on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Opaque bearer value. Send it back as `Authorization: Bearer <token>`.
    #[schema(example = "V1StGXR8_Z5jdHi6B-myTV1StGXR8_Z5jdHi6B-myTV1StGXR8_Z5jdHi6B-myTabc")]
    pub token: String,
    /// Validity of the token in seconds, counted from issuance.
    #[schema(example = 2592000)]
    pub expiration: i64,
}

pub fn generate_token_value() -> String {
    nanoid!(TOKEN_LENGTH)
}

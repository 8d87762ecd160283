/*

   security.rs

   General input validation for the auth endpoints.
   Put functions that check user supplied values before they reach the session store here.

   Cryptographic functions should be put in crypto.rs.

*/

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_-]{16,128}$").unwrap();
}

/// Rejects bearer values that could never have been issued by this server,
/// so they never turn into store lookups.
pub fn is_plausible_token(token: &str) -> bool {
    TOKEN_REGEX.is_match(token)
}

/// Both login fields must contain something other than whitespace.
pub fn are_credentials_present(username: &str, password: &str) -> bool {
    !username.trim().is_empty() && !password.trim().is_empty()
}

// Re-export internels for use under langchat_auth crate namespace
// Mainly for use in tests
pub mod apidocs;
pub mod auth;
pub mod crypto;
pub mod db;
pub mod error;
pub mod options;
pub mod security;
pub mod store;
pub mod util;

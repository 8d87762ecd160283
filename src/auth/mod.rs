pub mod credentials;
pub mod identity;
pub mod perms;
pub mod routes;
pub mod session_manager;
pub mod token;
pub mod user;

// re-export
pub use credentials::{CredentialVerifier, LoginError};
pub use identity::{BearerToken, Identity};
pub use session_manager::{SessionManager, SessionSettings};
pub use user::{UserDirectory, UserInfo};

//! Credentials, access tokens and the request authentication layer

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_auth, AuthUser};
pub use token::{IssuedToken, TokenIssuer};

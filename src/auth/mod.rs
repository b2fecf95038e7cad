//! Authentication: accounts, tokens, and password recovery.

pub mod extract;
pub mod jwt;
pub mod model;
pub mod password;
pub mod routes;
pub mod service;

pub use extract::AuthUser;
pub use model::User;
pub use service::AuthService;

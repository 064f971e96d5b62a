//! Authentication: session state, token refresh and login

pub mod service;
pub mod session;

pub use service::AuthService;
pub use session::{AuthSession, LogRedirect, LoginRedirect, SESSION_KEY};

//! Authentication for Steward: bearer-token sessions that establish the
//! calling actor for every request.

pub mod error;
pub mod session;

pub use error::{Result, UserError};
pub use session::{Session, SessionConfig, SessionStore};

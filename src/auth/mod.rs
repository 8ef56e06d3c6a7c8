//! Authentication module
//!
//! Token verification and the authorization gate wrapped around every
//! protected operation.

mod gate;
mod token;

pub use gate::AuthorizationGate;
pub use token::{AuthError, Claims, TokenVerifier};

//! Central identity and session handling for the admin console.
//! Keep the public surface thin and split implementation across sub-modules.

mod resolver;
mod store;
mod user;

pub use resolver::{AuthBackend, HttpAuthBackend, IdentityResolver};
pub use store::{LoadingState, SessionState, SessionStore};
pub use user::{Credentials, Role, User, UserRecord};

mod identity;
mod session;

pub use identity::{AuthCallback, IdentityProvider, LocalIdentity};
pub use session::SessionStore;

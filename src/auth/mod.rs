//! Session and token lifecycle.

mod claims;
mod manager;
mod session;

pub use claims::{decode, Claims, DecodeError, TokenState, DEFAULT_REFRESH_THRESHOLD_MINUTES};
pub use manager::{AuthError, LoginOutcome, TokenLifecycleManager};
pub use session::SessionStore;

mod page;
mod role;
mod session;

pub use page::{MenuEntry, Page};
pub use role::*;
pub use session::{Claims, IdentityProfile, LoginState, Principal, Session, TokenResponse};

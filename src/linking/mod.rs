//! Professional access-code linking.
//!
//! A professional types a client's 8-character share code. The code is
//! checked locally, looked up once in the client directory, and a match
//! is handed back as a [`ClientBinding`].

pub mod code;
pub mod manager;
pub mod protocol;
pub mod routes;

pub use code::{CodeEntry, CodeFormatError, SHARE_CODE_PREFIX, ShareCode};
pub use manager::LinkingManager;
pub use protocol::{ClientBinding, LinkOutcome, LinkState, LinkingSession, LinkingStatus};
pub use routes::{LinkingRouteState, linking_routes};

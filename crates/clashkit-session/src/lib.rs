//! Session state for clashkit.
//!
//! A client owns exactly one logical session. This crate holds the two
//! pieces of data that describe it:
//!
//! 1. **Identity** ([`SessionIdentity`]): who the server thinks we are.
//!    Starts anonymous, filled in by a successful login, and sent back on
//!    the next login.
//! 2. **Connection state** ([`ConnectionState`]): where the session is in
//!    the connect → handshake → steady-state flow.
//!
//! ```text
//! Client (above)  ← drives transitions, owns the lock around both values
//!     ↕
//! Session (this crate)  ← pure data + transition rules, no I/O
//! ```

mod error;
mod identity;
mod state;

pub use error::SessionError;
pub use identity::SessionIdentity;
pub use state::ConnectionState;

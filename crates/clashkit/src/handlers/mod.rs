//! Handlers every client registers unless told otherwise.
//!
//! | id    | packet            | handler                                   |
//! |-------|-------------------|-------------------------------------------|
//! | 20104 | LoginOk           | [`login::handle_login_ok`]                |
//! | 20103 | LoginFailed       | [`login::handle_login_failed`]            |
//! | 24715 | ChatMessageServer | [`in_game::handle_chat_message`]          |
//! | 20108 | KeepAliveOk       | [`in_game::handle_keep_alive_ok`]         |
//!
//! Build the client with
//! [`ClientBuilder::default_handlers(false)`](crate::ClientBuilder::default_handlers)
//! to replace any of these with your own.

pub mod in_game;
pub mod login;

use crate::registry::HandlerRegistry;
use crate::ClientError;

/// Registers the login and in-game handlers into `registry`.
///
/// # Errors
/// [`ClientError::DuplicateHandler`] if one of the ids is already taken.
pub fn register_defaults(registry: &mut HandlerRegistry) -> Result<(), ClientError> {
    login::register(registry)?;
    in_game::register(registry)
}

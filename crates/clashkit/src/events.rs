//! Events raised by the client.
//!
//! Each event kind has its own [`EventHub`]: an explicit list of
//! subscribers that is iterated on every emit. Subscribers run on the task
//! that raised the event (the receive loop for login and chat, whichever
//! task hit the failure for faults), so they must not block.

use std::sync::Arc;

use clashkit_protocol::ChatMessageServer;
use parking_lot::Mutex;
use serde::Serialize;

use crate::ClientError;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of subscribers for one event kind.
///
/// Emitting iterates over a snapshot of the list, so a subscriber may
/// subscribe further callbacks without deadlocking; those only see later
/// events. A panicking subscriber propagates to the emitter.
pub struct EventHub<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

impl<T> EventHub<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribers.lock().push(Arc::new(callback));
    }

    /// Calls every subscriber in subscription order. No subscribers: no-op.
    pub fn emit(&self, event: &T) {
        let snapshot = self.subscribers.lock().clone();
        for subscriber in snapshot {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Outcome of a login handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoginResult {
    /// The server accepted the login and assigned this identity.
    Success { user_id: i64, user_token: String },
    /// The server rejected the login. The client faults right after.
    Failed { reason: i32, message: Option<String> },
}

/// Raised once per connection when the login reply arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginEvent {
    pub result: LoginResult,
}

impl LoginEvent {
    pub fn is_success(&self) -> bool {
        matches!(self.result, LoginResult::Success { .. })
    }
}

/// A chat line broadcast by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessageEvent {
    pub message: String,
    pub username: String,
    pub user_id: i64,
    pub level: i32,
    pub clan_name: Option<String>,
}

impl From<&ChatMessageServer> for ChatMessageEvent {
    fn from(msg: &ChatMessageServer) -> Self {
        Self {
            message: msg.message.clone(),
            username: msg.username.clone(),
            user_id: msg.user_id,
            level: msg.level,
            clan_name: msg.clan_name.clone(),
        }
    }
}

/// Raised when the client moves to `Faulted`.
#[derive(Debug, Clone)]
pub struct FaultEvent {
    pub error: Arc<ClientError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let hub: EventHub<u32> = EventHub::new();
        hub.emit(&1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_reaches_every_subscriber_in_order() {
        let hub: EventHub<u32> = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            hub.subscribe(move |n: &u32| seen.lock().push(format!("{tag}{n}")));
        }

        hub.emit(&7);

        assert_eq!(*seen.lock(), vec!["a7", "b7"]);
    }

    #[test]
    fn test_subscribing_during_emit_does_not_deadlock() {
        let hub: Arc<EventHub<u32>> = Arc::new(EventHub::new());
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let hub2 = Arc::clone(&hub);
            let calls = Arc::clone(&calls);
            hub.subscribe(move |_| {
                let calls = Arc::clone(&calls);
                hub2.subscribe(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                });
            });
        }

        hub.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(hub.subscriber_count(), 2);

        hub.emit(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chat_event_from_server_packet() {
        let packet = ChatMessageServer {
            message: "gg".into(),
            username: "barb".into(),
            user_id: 3,
            level: 40,
            clan_name: None,
        };
        let event = ChatMessageEvent::from(&packet);
        assert_eq!(event.message, "gg");
        assert_eq!(event.username, "barb");
        assert_eq!(event.clan_name, None);
    }

    #[test]
    fn test_login_event_serializes() {
        let event = LoginEvent {
            result: LoginResult::Success {
                user_id: 1,
                user_token: "t".into(),
            },
        };
        assert!(event.is_success());
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"result":{"Success":{"user_id":1,"user_token":"t"}}}"#);
    }
}

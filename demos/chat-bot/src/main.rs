//! Logs into a game server, greets the chat, and prints every chat line
//! until Ctrl-C or the session faults.
//!
//! ```text
//! chat-bot [host:port] [greeting]
//! RUST_LOG=info,clashkit::packets=debug chat-bot 127.0.0.1:9339 "hi all"
//! ```

use clashkit::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "127.0.0.1:9339";
const DEFAULT_GREETING: &str = "hello";

fn build_client() -> Client {
    let client = Client::new();
    client.on_login(|event| match &event.result {
        LoginResult::Success { user_id, .. } => info!(user_id, "logged in"),
        LoginResult::Failed { reason, message } => {
            error!(reason, message = message.as_deref().unwrap_or(""), "login failed")
        }
    });
    client.on_chat_message(|msg| {
        info!(
            from = %msg.username,
            level = msg.level,
            clan = msg.clan_name.as_deref().unwrap_or("-"),
            "{}",
            msg.message
        );
    });
    client.on_fault(|event| error!(error = %event.error, "session faulted"));
    client
}

/// Connects, waits for the login to finish, and sends `greeting`.
async fn greet(client: &Client, server: &str, greeting: &str) -> Result<(), ClientError> {
    let mut states = client.state_changes();
    client.connect(server)?;

    let reached = states
        .wait_for(|s| matches!(s, ConnectionState::Active | ConnectionState::Faulted))
        .await
        .map(|s| *s)
        .map_err(|_| ClientError::NotConnected)?;
    if reached == ConnectionState::Faulted {
        return Err(ClientError::NotConnected);
    }

    client.send_chat_message(greeting)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let greeting = args.next().unwrap_or_else(|| DEFAULT_GREETING.to_string());

    info!(%server, "starting chat bot");
    let client = build_client();
    greet(&client, &server, &greeting).await?;

    let mut states = client.state_changes();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
        _ = states.wait_for(|s| *s == ConnectionState::Faulted) => {}
    }
    client.disconnect();
    Ok(())
}

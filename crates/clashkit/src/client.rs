//! The session client: one connection, one login, one steady state.
//!
//! [`Client`] ties the lower layers together:
//!
//! ```text
//!  connect() ─► Connector ─► PacketChannel ─► receive loop ─► HandlerRegistry
//!                                 ▲                                │
//!  queue_packet() ────────────────┤                      LoginOk ─► complete_login()
//!  KeepAliveScheduler ────────────┘                                │
//!                                                       starts ◄───┘
//! ```
//!
//! All mutable session data (state, identity, channel, keep-alive) lives
//! behind one lock, so every transition is atomic with respect to
//! concurrent `queue_packet` calls. The lock is never held while user code
//! runs: handlers, event subscribers, and the packet logger are all called
//! after it is released.

use std::sync::{Arc, Weak};

use clashkit_keepalive::{KeepAliveScheduler, KeepAliveSink, KeepAliveStats};
use clashkit_protocol::{
    ChatMessageClient, JsonCodec, LoginFailed, LoginOk, LoginRequest, Packet, PacketCodec,
    PacketDirection,
};
use clashkit_session::{ConnectionState, SessionError, SessionIdentity};
use clashkit_transport::{
    ChannelId, Connector, Endpoint, PacketChannel, TcpConnector, TransportError,
};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::events::{ChatMessageEvent, EventHub, FaultEvent, LoginEvent, LoginResult};
use crate::handlers;
use crate::logger::{PacketLogger, TracingPacketLogger};
use crate::registry::{HandlerRegistry, PacketHandler};
use crate::ClientError;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything that changes over a session's lifetime.
#[derive(Default)]
struct SessionCore {
    state: ConnectionState,
    identity: SessionIdentity,
    channel: Option<Arc<PacketChannel>>,
    keep_alive: Option<KeepAliveScheduler>,
    seed: Option<u32>,
    /// Incremented per `connect`, so a late result from an abandoned
    /// attempt can be recognized and dropped.
    attempt: u64,
}

struct ClientInner {
    config: ClientConfig,
    codec: Arc<dyn PacketCodec>,
    logger: Arc<dyn PacketLogger>,
    /// Copy-on-write: dispatch clones the `Arc`, registration replaces it.
    registry: RwLock<Arc<HandlerRegistry>>,
    session: Mutex<SessionCore>,
    state_tx: watch::Sender<ConnectionState>,
    login_events: EventHub<LoginEvent>,
    chat_events: EventHub<ChatMessageEvent>,
    fault_events: EventHub<FaultEvent>,
}

impl ClientInner {
    /// Applies a transition and publishes it. Caller holds the session lock.
    fn set_state(&self, core: &mut SessionCore, next: ConnectionState) -> Result<(), SessionError> {
        core.state.transition(next)?;
        self.state_tx.send_replace(next);
        Ok(())
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let core = self.session.get_mut();
        if let Some(keep_alive) = core.keep_alive.take() {
            keep_alive.stop();
        }
        if let Some(channel) = core.channel.take() {
            channel.close();
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A handle to one game session.
///
/// Cheap to clone; every clone drives the same session. The connection is
/// closed once the last handle is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use clashkit::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client = Client::new();
/// client.on_login(|event| tracing::info!(?event, "login"));
/// client.on_chat_message(|msg| println!("{}: {}", msg.username, msg.message));
///
/// client.connect("gamea.clashofclans.com:9339")?;
///
/// let mut states = client.state_changes();
/// while *states.borrow_and_update() != ConnectionState::Active {
///     states.changed().await.map_err(|_| ClientError::NotConnected)?;
/// }
/// client.send_chat_message("hello")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// A client with the default config, the JSON codec, the tracing packet
    /// logger, and the default handlers.
    pub fn new() -> Self {
        Self::from_parts(
            ClientConfig::default(),
            Arc::new(JsonCodec),
            Arc::new(TracingPacketLogger),
            default_registry(),
        )
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn from_parts(
        config: ClientConfig,
        codec: Arc<dyn PacketCodec>,
        logger: Arc<dyn PacketLogger>,
        registry: HandlerRegistry,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let identity = config.identity.clone();
        Self {
            inner: Arc::new(ClientInner {
                config,
                codec,
                logger,
                registry: RwLock::new(Arc::new(registry)),
                session: Mutex::new(SessionCore {
                    identity,
                    ..SessionCore::default()
                }),
                state_tx,
                login_events: EventHub::new(),
                chat_events: EventHub::new(),
                fault_events: EventHub::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Starts connecting to `endpoint` (`host:port`) over TCP.
    ///
    /// See [`connect_with`](Self::connect_with).
    pub fn connect(&self, endpoint: &str) -> Result<(), ClientError> {
        self.connect_with(TcpConnector, endpoint)
    }

    /// Starts connecting to `endpoint` through `connector`.
    ///
    /// Returns as soon as the attempt is spawned. On success the client
    /// sends its login request and moves to `AwaitingHandshake`; on failure
    /// it moves to `Faulted` and raises `on_fault`. Watch
    /// [`state_changes`](Self::state_changes) to follow along.
    ///
    /// # Errors
    /// - [`ClientError::InvalidArgument`]: `endpoint` does not parse, no
    ///   Tokio runtime is running, or the client is already connecting or
    ///   connected.
    /// - [`ClientError::NotConnected`]: the client has faulted. Build a new
    ///   one to try again.
    pub fn connect_with<K: Connector>(&self, connector: K, endpoint: &str) -> Result<(), ClientError> {
        let endpoint: Endpoint = endpoint.parse()?;
        let runtime = Handle::try_current().map_err(|_| {
            ClientError::InvalidArgument("connect must be called inside a Tokio runtime".into())
        })?;

        let attempt = {
            let mut core = self.inner.session.lock();
            match core.state {
                ConnectionState::Disconnected => {}
                ConnectionState::Faulted => return Err(ClientError::NotConnected),
                state => {
                    return Err(ClientError::InvalidArgument(format!(
                        "connect called while {state}"
                    )));
                }
            }
            self.inner.set_state(&mut core, ConnectionState::Connecting)?;
            core.attempt += 1;
            core.attempt
        };

        info!(%endpoint, attempt, "connecting");
        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            let result = connector.connect(&endpoint).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let client = Client { inner };
            match result {
                Ok(stream) => client.on_connected(attempt, stream),
                Err(e) => client.on_connect_failed(attempt, e),
            }
        });
        Ok(())
    }

    fn on_connected<S>(&self, attempt: u64, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let channel = PacketChannel::open(stream, Arc::clone(&self.inner.codec));
        let channel_id = channel.id();
        let seed: u32 = rand::rng().random();

        // The identity only changes in `AwaitingHandshake`, so reading it
        // here and publishing the channel later sees the same value.
        let login = {
            let core = self.inner.session.lock();
            if core.attempt != attempt || core.state != ConnectionState::Connecting {
                debug!(%channel_id, attempt, "dropping connection from an abandoned attempt");
                channel.close();
                return;
            }
            Packet::LoginRequest(LoginRequest::new(
                core.identity.user_id(),
                core.identity.user_token().map(str::to_owned),
                &self.inner.config.client_info,
                seed,
            ))
        };
        self.log_packet(&login, PacketDirection::ToServer);

        let on_packet = {
            let weak = Arc::downgrade(&self.inner);
            move |_raw: &[u8], packet: Packet| {
                if let Some(inner) = weak.upgrade() {
                    Client { inner }.handle_inbound(channel_id, packet);
                }
            }
        };
        let on_error = {
            let weak = Arc::downgrade(&self.inner);
            move |error: TransportError| {
                if let Some(inner) = weak.upgrade() {
                    Client { inner }.fault_channel(channel_id, error.into());
                }
            }
        };

        // The login is queued in the same critical section that publishes
        // the channel: no other sender can get a frame in ahead of it.
        let started = {
            let mut core = self.inner.session.lock();
            if core.attempt != attempt || core.state != ConnectionState::Connecting {
                debug!(%channel_id, attempt, "dropping connection from an abandoned attempt");
                channel.close();
                return;
            }
            if let Err(e) = self.inner.set_state(&mut core, ConnectionState::AwaitingHandshake) {
                debug!(error = %e, "cannot enter handshake");
                channel.close();
                return;
            }
            core.channel = Some(Arc::clone(&channel));
            core.seed = Some(seed);
            channel
                .send(&login)
                .and_then(|()| channel.start_receiving(on_packet, on_error))
        };

        match started {
            Ok(()) => info!(%channel_id, seed, "connected, login sent"),
            Err(e) => self.fault_channel(channel_id, e.into()),
        }
    }

    fn on_connect_failed(&self, attempt: u64, error: TransportError) {
        self.fault_where(error.into(), |core| {
            core.attempt == attempt && core.state == ConnectionState::Connecting
        });
    }

    /// Closes the connection and returns to `Disconnected`.
    ///
    /// The identity is kept, so a later [`connect`](Self::connect) logs back
    /// into the same account. Does nothing when already disconnected or
    /// faulted.
    pub fn disconnect(&self) {
        let (channel, keep_alive) = {
            let mut core = self.inner.session.lock();
            if matches!(
                core.state,
                ConnectionState::Disconnected | ConnectionState::Faulted
            ) {
                return;
            }
            if let Err(e) = self.inner.set_state(&mut core, ConnectionState::Disconnected) {
                debug!(error = %e, "disconnect rejected");
                return;
            }
            core.seed = None;
            (core.channel.take(), core.keep_alive.take())
        };
        if let Some(keep_alive) = keep_alive {
            keep_alive.stop();
        }
        if let Some(channel) = channel {
            channel.close();
        }
        info!("disconnected");
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Accepts the server's login reply: stores the assigned identity, moves
    /// to `Active`, starts keep-alives, and raises `on_login`.
    ///
    /// Called by the default `LoginOk` handler; a custom handler replacing
    /// it should call this too.
    ///
    /// # Errors
    /// - [`ClientError::InvalidArgument`]: called outside a Tokio runtime,
    ///   which the keep-alive timer needs. The state is left unchanged.
    /// - [`ClientError::NotConnected`]: the client is not awaiting the
    ///   handshake.
    pub fn complete_login(&self, ok: &LoginOk) -> Result<(), ClientError> {
        Handle::try_current().map_err(|_| {
            ClientError::InvalidArgument("complete_login must be called inside a Tokio runtime".into())
        })?;
        {
            let mut core = self.inner.session.lock();
            if core.state != ConnectionState::AwaitingHandshake {
                return Err(ClientError::NotConnected);
            }
            let channel_id = core
                .channel
                .as_ref()
                .map(|c| c.id())
                .ok_or(ClientError::NotConnected)?;

            self.inner.set_state(&mut core, ConnectionState::Active)?;
            core.identity.authenticate(ok.user_id, ok.user_token.clone());

            let keep_alive = KeepAliveScheduler::new(self.inner.config.keep_alive.clone());
            keep_alive.start(KeepAliveLink {
                client: Arc::downgrade(&self.inner),
                channel_id,
            })?;
            core.keep_alive = Some(keep_alive);
        }

        info!(
            user_id = ok.user_id,
            server_build = ok.server_build,
            environment = %ok.server_environment,
            "logged in"
        );
        self.inner.login_events.emit(&LoginEvent {
            result: LoginResult::Success {
                user_id: ok.user_id,
                user_token: ok.user_token.clone(),
            },
        });
        Ok(())
    }

    /// Handles a rejected login: raises `on_login` with the failure, then
    /// faults the client with [`ClientError::LoginRejected`].
    ///
    /// # Errors
    /// [`ClientError::NotConnected`] unless the client is awaiting the
    /// handshake. Nothing is raised in that case.
    pub fn fail_login(&self, failed: &LoginFailed) -> Result<(), ClientError> {
        let channel_id = {
            let core = self.inner.session.lock();
            if core.state != ConnectionState::AwaitingHandshake {
                return Err(ClientError::NotConnected);
            }
            core.channel.as_ref().map(|c| c.id()).ok_or(ClientError::NotConnected)?
        };

        warn!(reason = failed.reason, message = ?failed.message, "login rejected");
        self.inner.login_events.emit(&LoginEvent {
            result: LoginResult::Failed {
                reason: failed.reason,
                message: failed.message.clone(),
            },
        });
        self.fault_channel(
            channel_id,
            ClientError::LoginRejected {
                reason: failed.reason,
                message: failed.message.clone(),
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Logs `packet` as outbound and queues it for sending.
    ///
    /// Packets from all callers share one queue and reach the wire in the
    /// order this is called.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`]: no transport (not connected yet,
    ///   disconnected, or faulted).
    /// - [`ClientError::Codec`]: the packet could not be encoded.
    pub fn queue_packet(&self, packet: &Packet) -> Result<(), ClientError> {
        let channel = self.current_channel().ok_or(ClientError::NotConnected)?;
        self.send_on(&channel, packet)
    }

    /// Queues a chat line.
    pub fn send_chat_message(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.queue_packet(&Packet::ChatMessageClient(ChatMessageClient {
            message: text.into(),
        }))
    }

    fn send_on(&self, channel: &PacketChannel, packet: &Packet) -> Result<(), ClientError> {
        self.log_packet(packet, PacketDirection::ToServer);
        channel.send(packet)?;
        Ok(())
    }

    /// Like `queue_packet`, but only through the channel with `channel_id`.
    fn queue_on(&self, channel_id: ChannelId, packet: &Packet) -> Result<(), ClientError> {
        match self.current_channel() {
            Some(channel) if channel.id() == channel_id => self.send_on(&channel, packet),
            _ => Err(ClientError::NotConnected),
        }
    }

    fn current_channel(&self) -> Option<Arc<PacketChannel>> {
        let core = self.inner.session.lock();
        if !core.state.has_transport() {
            return None;
        }
        core.channel.clone()
    }

    // -----------------------------------------------------------------------
    // Receiving
    // -----------------------------------------------------------------------

    /// Registers `handler` for packets with id `id`.
    ///
    /// # Errors
    /// - [`ClientError::InvalidArgument`]: the client is not disconnected.
    ///   Handlers are set up before connecting.
    /// - [`ClientError::DuplicateHandler`]: `id` already has a handler.
    pub fn register_handler<H: PacketHandler>(&self, id: u16, handler: H) -> Result<(), ClientError> {
        let state = self.state();
        if state != ConnectionState::Disconnected {
            return Err(ClientError::InvalidArgument(format!(
                "handlers can only be registered while disconnected (client is {state})"
            )));
        }
        let mut registry = self.inner.registry.write();
        Arc::make_mut(&mut *registry).register(id, handler)
    }

    fn handle_inbound(&self, channel_id: ChannelId, packet: Packet) {
        if !self.is_current_channel(channel_id) {
            trace!(%channel_id, %packet, "dropping packet from a stale channel");
            return;
        }
        self.log_packet(&packet, PacketDirection::FromServer);

        // Snapshot, so the handler runs without the registry lock held.
        let registry = Arc::clone(&*self.inner.registry.read());
        if !registry.dispatch(self, &packet) {
            trace!(%packet, "no handler registered");
        }
    }

    fn is_current_channel(&self, channel_id: ChannelId) -> bool {
        let core = self.inner.session.lock();
        core.channel.as_ref().is_some_and(|c| c.id() == channel_id)
    }

    fn log_packet(&self, packet: &Packet, direction: PacketDirection) {
        if let Err(e) = self.inner.logger.log(packet, direction) {
            debug!(error = %e, %packet, %direction, "packet logger failed");
        }
    }

    // -----------------------------------------------------------------------
    // Faults
    // -----------------------------------------------------------------------

    fn fault_channel(&self, channel_id: ChannelId, error: ClientError) {
        self.fault_where(error, |core| {
            core.channel.as_ref().is_some_and(|c| c.id() == channel_id)
        });
    }

    /// Moves to `Faulted` if `is_current` accepts the session as it is now.
    /// A second fault, or one from a source that is no longer current, is
    /// ignored.
    fn fault_where<F>(&self, error: ClientError, is_current: F)
    where
        F: FnOnce(&SessionCore) -> bool,
    {
        let (channel, keep_alive) = {
            let mut core = self.inner.session.lock();
            if !is_current(&core) || !core.state.can_transition_to(ConnectionState::Faulted) {
                debug!(error = %error, state = %core.state, "ignoring stale fault");
                return;
            }
            if let Err(e) = self.inner.set_state(&mut core, ConnectionState::Faulted) {
                debug!(error = %e, "cannot fault");
                return;
            }
            (core.channel.take(), core.keep_alive.take())
        };
        if let Some(keep_alive) = keep_alive {
            keep_alive.stop();
        }
        if let Some(channel) = channel {
            channel.close();
        }

        warn!(error = %error, "client faulted");
        self.inner.fault_events.emit(&FaultEvent {
            error: Arc::new(error),
        });
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn on_login<F>(&self, callback: F)
    where
        F: Fn(&LoginEvent) + Send + Sync + 'static,
    {
        self.inner.login_events.subscribe(callback);
    }

    pub fn on_chat_message<F>(&self, callback: F)
    where
        F: Fn(&ChatMessageEvent) + Send + Sync + 'static,
    {
        self.inner.chat_events.subscribe(callback);
    }

    /// Called once when the client faults, with the cause.
    pub fn on_fault<F>(&self, callback: F)
    where
        F: Fn(&FaultEvent) + Send + Sync + 'static,
    {
        self.inner.fault_events.subscribe(callback);
    }

    pub(crate) fn emit_chat_message(&self, event: ChatMessageEvent) {
        self.inner.chat_events.emit(&event);
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    /// A receiver that sees every state transition from now on.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether a live transport exists (awaiting the handshake or active).
    pub fn is_connected(&self) -> bool {
        let core = self.inner.session.lock();
        core.state.has_transport() && core.channel.as_ref().is_some_and(|c| c.is_open())
    }

    pub fn identity(&self) -> SessionIdentity {
        self.inner.session.lock().identity.clone()
    }

    /// The handshake seed of the current connection, if any.
    pub fn seed(&self) -> Option<u32> {
        self.inner.session.lock().seed
    }

    /// Keep-alive counters for the current session; `None` before login.
    pub fn keep_alive_stats(&self) -> Option<KeepAliveStats> {
        self.inner.session.lock().keep_alive.as_ref().map(|k| k.stats())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Keep-alive plumbing
// ---------------------------------------------------------------------------

/// Sends keep-alives on one channel. Holds the client weakly so a running
/// scheduler never keeps a dropped client alive.
struct KeepAliveLink {
    client: Weak<ClientInner>,
    channel_id: ChannelId,
}

impl KeepAliveSink for KeepAliveLink {
    type Error = ClientError;

    fn send_keep_alive(&self) -> Result<(), ClientError> {
        let inner = self.client.upgrade().ok_or(ClientError::NotConnected)?;
        Client { inner }.queue_on(self.channel_id, &Packet::KeepAlive)
    }

    fn keep_alive_failed(&self, error: ClientError) {
        if let Some(inner) = self.client.upgrade() {
            Client { inner }.fault_channel(self.channel_id, error);
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    // An empty registry has no ids to collide with.
    if let Err(e) = handlers::register_defaults(&mut registry) {
        warn!(error = %e, "default handlers not registered");
    }
    registry
}

/// Builder for configuring a [`Client`].
///
/// ```rust
/// use std::time::Duration;
/// use clashkit::prelude::*;
///
/// let config = ClientConfig {
///     keep_alive: KeepAliveConfig::with_interval(Duration::from_secs(10)),
///     ..ClientConfig::default()
/// };
/// let client = Client::builder()
///     .config(config)
///     .handler(24101, |_: &Client, packet: &Packet| tracing::info!(%packet))
///     .build()
///     .unwrap();
/// assert_eq!(client.state(), ConnectionState::Disconnected);
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    codec: Arc<dyn PacketCodec>,
    logger: Arc<dyn PacketLogger>,
    default_handlers: bool,
    handlers: Vec<(u16, Box<dyn FnOnce(&mut HandlerRegistry) -> Result<(), ClientError>>)>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            codec: Arc::new(JsonCodec),
            logger: Arc::new(TracingPacketLogger),
            default_handlers: true,
            handlers: Vec::new(),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the packet codec. Defaults to [`JsonCodec`].
    pub fn codec(mut self, codec: impl PacketCodec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Sets the packet logger. Defaults to [`TracingPacketLogger`].
    pub fn logger(mut self, logger: impl PacketLogger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Whether to register the built-in login and in-game handlers
    /// (default `true`).
    pub fn default_handlers(mut self, enabled: bool) -> Self {
        self.default_handlers = enabled;
        self
    }

    /// Adds a handler for `id`.
    pub fn handler<H: PacketHandler>(mut self, id: u16, handler: H) -> Self {
        self.handlers.push((
            id,
            Box::new(move |registry: &mut HandlerRegistry| registry.register(id, handler)),
        ));
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    /// [`ClientError::DuplicateHandler`] if two handlers share an id, or one
    /// collides with a default handler.
    pub fn build(self) -> Result<Client, ClientError> {
        let mut registry = HandlerRegistry::new();
        if self.default_handlers {
            handlers::register_defaults(&mut registry)?;
        }
        for (id, register) in self.handlers {
            trace!(id, "registering builder handler");
            register(&mut registry)?;
        }

        Ok(Client::from_parts(
            self.config.validated(),
            self.codec,
            self.logger,
            registry,
        ))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! WebSocket Game Server
//!
//! Async WebSocket front end for the arena. Each connection gets an id, a
//! reader loop and a writer task fed by a bounded channel. Commands are run
//! against the arena under one mutex, so the core never sees two commands
//! at once.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex, Notify, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::arena::{Arena, ConnectionId, Outbound};
use crate::core::rng::DeterministicRng;
use crate::network::protocol::{ClientMessage, ErrorKind, Routed, ServerMessage, ServerStats};

/// How long a closing connection may spend flushing its last messages.
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Per-connection outbound queue length.
    pub outbound_buffer: usize,
    /// Connections silent for longer than this are evicted.
    pub idle_timeout: Duration,
    /// Queue entries older than this are dropped (None keeps them forever).
    pub queue_timeout: Option<Duration>,
    /// How long ended sessions are kept for late lookups.
    pub session_retention: Duration,
    /// Period of the maintenance loop.
    pub cleanup_interval: Duration,
    /// Fixed RNG seed for reproducible dice and AI moves.
    pub rng_seed: Option<u64>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            outbound_buffer: 64,
            idle_timeout: Duration::from_secs(300),
            queue_timeout: Some(Duration::from_secs(120)),
            session_retention: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(30),
            rng_seed: None,
            version: crate::VERSION.to_string(),
        }
    }
}

/// Parse an environment variable, keeping `default` when unset or invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load configuration from `DUEL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| Duration::from_secs(env_or(key, default.as_secs()));

        let queue_timeout_secs = env_or(
            "DUEL_QUEUE_TIMEOUT_SECS",
            defaults.queue_timeout.map_or(0, |t| t.as_secs()),
        );

        Self {
            bind_addr: env_or("DUEL_BIND_ADDR", defaults.bind_addr),
            max_connections: env_or("DUEL_MAX_CONNECTIONS", defaults.max_connections),
            outbound_buffer: defaults.outbound_buffer,
            idle_timeout: secs("DUEL_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            queue_timeout: (queue_timeout_secs > 0).then(|| Duration::from_secs(queue_timeout_secs)),
            session_retention: secs("DUEL_SESSION_RETENTION_SECS", defaults.session_retention),
            // A zero period would make the interval panic
            cleanup_interval: secs("DUEL_CLEANUP_INTERVAL_SECS", defaults.cleanup_interval)
                .max(Duration::from_secs(1)),
            rng_seed: std::env::var("DUEL_RNG_SEED").ok().and_then(|v| v.trim().parse().ok()),
            version: defaults.version,
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Peer address.
    addr: SocketAddr,
    /// Connection time.
    connected_at: Instant,
    /// Last inbound frame.
    last_activity: Instant,
    /// Outbound message queue.
    sender: mpsc::Sender<ServerMessage>,
    /// Wakes the reader loop when the connection is evicted.
    evict: Arc<Notify>,
}

/// State shared by the accept loop, connection tasks and the cleanup loop.
#[derive(Clone)]
struct Shared {
    config: Arc<ServerConfig>,
    arena: Arc<Mutex<Arena>>,
    clients: Arc<RwLock<BTreeMap<ConnectionId, ConnectedClient>>>,
    /// One permit per connection task, handshake included.
    connection_slots: Arc<Semaphore>,
}

/// The game server.
pub struct GameServer {
    shared: Shared,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let connection_slots = Semaphore::new(config.max_connections.min(Semaphore::MAX_PERMITS));
        let rng = match config.rng_seed {
            Some(seed) => DeterministicRng::new(seed),
            None => DeterministicRng::from_entropy(),
        };

        Self {
            shared: Shared {
                config: Arc::new(config),
                arena: Arc::new(Mutex::new(Arena::new(rng))),
                clients: Arc::new(RwLock::new(BTreeMap::new())),
                connection_slots: Arc::new(connection_slots),
            },
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(self.shared.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let cleanup_shared = self.shared.clone();
        let cleanup_handle = tokio::spawn(async move {
            cleanup_shared.run_cleanup_loop().await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let Ok(permit) = self.shared.connection_slots.clone().try_acquire_owned() else {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, permit);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection. The slot is released when the task ends.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, slot: OwnedSemaphorePermit) {
        let shared = self.shared.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _slot = slot;
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let connection_id = ConnectionId::generate();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(shared.config.outbound_buffer);
            let evict = Arc::new(Notify::new());

            {
                let mut clients = shared.clients.write().await;
                clients.insert(connection_id, ConnectedClient {
                    addr,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                    evict: evict.clone(),
                });
            }
            debug!("Connection {} assigned to {}", connection_id, addr);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    frame = ws_receiver.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                shared.touch(&connection_id).await;
                                match ClientMessage::from_json(&text) {
                                    Ok(msg) => shared.dispatch(connection_id, msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", connection_id, e);
                                        send_direct(&msg_tx, ServerMessage::error(
                                            ErrorKind::InvalidMessage,
                                            "Invalid message format",
                                        ));
                                    }
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                shared.touch(&connection_id).await;
                                send_direct(&msg_tx, ServerMessage::error(
                                    ErrorKind::InvalidMessage,
                                    "Binary frames are not supported",
                                ));
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", connection_id);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", connection_id, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite
                            Some(Ok(_)) => shared.touch(&connection_id).await,
                        }
                    }
                    _ = evict.notified() => {
                        info!("Evicting idle connection {} ({})", connection_id, addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        send_direct(&msg_tx, ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        });
                        break;
                    }
                }
            }

            shared.disconnect(connection_id).await;

            // Let the writer flush whatever is queued, then close
            drop(msg_tx);
            if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, sender_task).await.is_err() {
                warn!("Sender for {} did not drain in time", connection_id);
            }

            info!("Client {} cleaned up", connection_id);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get open connection count.
    pub async fn connection_count(&self) -> usize {
        self.shared.clients.read().await.len()
    }

    /// Aggregate statistics across the transport and the arena.
    pub async fn stats(&self) -> ServerStats {
        self.shared.stats().await
    }
}

/// Queue a reply on a connection's own channel without blocking the reader.
fn send_direct(sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    if let Err(e) = sender.try_send(message) {
        warn!("Dropping direct reply: {}", e);
    }
}

/// Milliseconds since the Unix epoch.
fn unix_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

impl Shared {
    /// Record inbound activity for idle tracking.
    async fn touch(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(connection_id) {
            client.last_activity = Instant::now();
        }
    }

    /// Route one parsed command.
    async fn dispatch(&self, from: ConnectionId, msg: ClientMessage) {
        match msg.route() {
            Routed::Ping { timestamp } => {
                self.deliver(vec![Outbound {
                    to: from,
                    message: ServerMessage::Pong { timestamp, server_time: unix_millis() },
                }])
                .await;
            }
            Routed::GetStats => {
                let stats = self.stats().await;
                self.deliver(vec![Outbound { to: from, message: ServerMessage::Stats(stats) }]).await;
            }
            Routed::Arena(command) => {
                // Delivered under the arena lock so per-recipient order
                // matches command order
                let mut arena = self.arena.lock().await;
                let outbox = arena.handle(from, command);
                self.deliver(outbox).await;
            }
        }
    }

    /// Tear down a closed connection and notify whoever it affected.
    async fn disconnect(&self, connection_id: ConnectionId) {
        if let Some(client) = self.clients.write().await.remove(&connection_id) {
            debug!(
                "Connection {} from {} lasted {:?}",
                connection_id,
                client.addr,
                client.connected_at.elapsed(),
            );
        }

        let mut arena = self.arena.lock().await;
        arena.handle_disconnect(connection_id);
        let outbox = arena.take_outbox();
        self.deliver(outbox).await;
    }

    /// Hand notifications to their connections' writer tasks.
    ///
    /// Never blocks: a full or closed queue drops the message with a warning.
    async fn deliver(&self, outbox: Vec<Outbound>) {
        if outbox.is_empty() {
            return;
        }

        let clients = self.clients.read().await;
        for Outbound { to, message } in outbox {
            match clients.get(&to) {
                Some(client) => {
                    if let Err(e) = client.sender.try_send(message) {
                        warn!("Dropping notification for {}: {}", to, e);
                    }
                }
                None => debug!("No open connection for {}, dropping notification", to),
            }
        }
    }

    async fn stats(&self) -> ServerStats {
        let open_connections = self.clients.read().await.len();
        let core = self.arena.lock().await.stats();
        ServerStats {
            open_connections,
            registered_players: core.registered_players,
            live_sessions: core.live_sessions,
            queue_depths: core.queue_depths,
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(self) {
        let mut ticker = interval(self.config.cleanup_interval);

        loop {
            ticker.tick().await;
            self.cleanup(Instant::now()).await;
        }
    }

    /// One maintenance pass: idle eviction, queue expiry, session pruning.
    ///
    /// A player who has moved and is waiting on a human opponent is not
    /// evicted; the opponent's own idle timer settles the round.
    async fn cleanup(&self, now: Instant) {
        let idle: Vec<_> = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .filter(|(_, c)| now.duration_since(c.last_activity) > self.config.idle_timeout)
                .map(|(id, c)| (*id, c.evict.clone()))
                .collect()
        };

        let mut arena = self.arena.lock().await;

        // The reader loop runs the disconnect path once woken
        for (connection_id, evict) in idle {
            if arena.awaiting_opponent(&connection_id) {
                debug!("Connection {} idle but waiting on its opponent", connection_id);
                continue;
            }
            debug!("Connection {} idle past {:?}", connection_id, self.config.idle_timeout);
            evict.notify_one();
        }

        let wall_now = Utc::now();
        let expired = match self.config.queue_timeout {
            Some(max_wait) => arena.expire_queue_entries(wall_now, max_wait),
            None => 0,
        };
        let pruned = arena.prune_ended_sessions(wall_now, self.config.session_retention);
        let outbox = arena.take_outbox();
        self.deliver(outbox).await;

        if expired > 0 || pruned > 0 {
            info!("Cleanup: {} queue entries expired, {} sessions pruned", expired, pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaCommand;
    use tokio_tungstenite::connect_async;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            rng_seed: Some(42),
            ..Default::default()
        }
    }

    /// Start a server on an ephemeral port.
    async fn start_server(config: ServerConfig) -> (Arc<GameServer>, SocketAddr) {
        let listener = TcpListener::bind(config.bind_addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::new(config));
        let runner = server.clone();
        tokio::spawn(async move { runner.serve(listener).await });
        (server, addr)
    }

    async fn recv_json<S>(ws: &mut S) -> ServerMessage
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream closed")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return ServerMessage::from_json(&text).unwrap();
            }
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.queue_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_env_or_falls_back() {
        std::env::set_var("DUEL_TEST_ENV_OR_BAD", "not-a-number");
        assert_eq!(env_or("DUEL_TEST_ENV_OR_BAD", 7usize), 7);
        std::env::set_var("DUEL_TEST_ENV_OR_GOOD", " 12 ");
        assert_eq!(env_or("DUEL_TEST_ENV_OR_GOOD", 7usize), 12);
        assert_eq!(env_or("DUEL_TEST_ENV_OR_UNSET", 7usize), 7);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(test_config());

        assert_eq!(server.connection_count().await, 0);
        let stats = server.stats().await;
        assert_eq!(stats.registered_players, 0);
        assert_eq!(stats.live_sessions, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = GameServer::new(test_config());
        server.shutdown();
        // Should not panic
    }

    /// Insert a client record without a socket, returning its eviction handle.
    async fn attach_client(
        shared: &Shared,
        connection_id: ConnectionId,
        last_activity: Instant,
    ) -> (Arc<Notify>, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(64);
        let evict = Arc::new(Notify::new());
        shared.clients.write().await.insert(connection_id, ConnectedClient {
            addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            connected_at: last_activity,
            last_activity,
            sender,
            evict: evict.clone(),
        });
        (evict, receiver)
    }

    async fn was_evicted(evict: &Notify) -> bool {
        tokio::time::timeout(Duration::from_millis(50), evict.notified()).await.is_ok()
    }

    #[tokio::test]
    async fn test_cleanup_spares_player_waiting_on_opponent() {
        let config = ServerConfig { idle_timeout: Duration::from_millis(300), ..test_config() };
        let server = GameServer::new(config);
        let shared = &server.shared;

        let start = Instant::now();
        let alice = ConnectionId::from_u128(1);
        let bob = ConnectionId::from_u128(2);
        let (alice_evict, _alice_rx) = attach_client(shared, alice, start).await;
        // Bob's last frame (a leaderboard request) came 200ms after alice moved
        let (bob_evict, _bob_rx) = attach_client(shared, bob, start + Duration::from_millis(200)).await;

        {
            let mut arena = shared.arena.lock().await;
            for (conn, name) in [(alice, "alice"), (bob, "bob")] {
                arena.handle(conn, ArenaCommand::Register { name: Some(name.into()) });
                arena.handle(conn, ArenaCommand::JoinQueue { game_type: "rps".into() });
            }
            let session_id = arena.player(&alice).and_then(|p| p.session_id).unwrap();
            arena.handle(alice, ArenaCommand::SubmitMove { session_id, choice: "rock".into() });
        }

        shared.cleanup(start + Duration::from_millis(400)).await;
        assert!(!was_evicted(&alice_evict).await);
        assert!(!was_evicted(&bob_evict).await);

        // The staller times out on its own clock
        shared.cleanup(start + Duration::from_millis(600)).await;
        assert!(was_evicted(&bob_evict).await);
        assert!(!was_evicted(&alice_evict).await);
    }

    #[tokio::test]
    async fn test_cleanup_evicts_idle_player_mid_round() {
        let config = ServerConfig { idle_timeout: Duration::from_millis(300), ..test_config() };
        let server = GameServer::new(config);
        let shared = &server.shared;

        let start = Instant::now();
        let alice = ConnectionId::from_u128(1);
        let bob = ConnectionId::from_u128(2);
        let (alice_evict, _alice_rx) = attach_client(shared, alice, start).await;
        let (bob_evict, _bob_rx) = attach_client(shared, bob, start).await;

        {
            let mut arena = shared.arena.lock().await;
            for (conn, name) in [(alice, "alice"), (bob, "bob")] {
                arena.handle(conn, ArenaCommand::Register { name: Some(name.into()) });
                arena.handle(conn, ArenaCommand::JoinQueue { game_type: "rps".into() });
            }
        }

        // Nobody has moved, so both sides are fair game
        shared.cleanup(start + Duration::from_millis(400)).await;
        assert!(was_evicted(&alice_evict).await);
        assert!(was_evicted(&bob_evict).await);
    }

    #[tokio::test]
    async fn test_connection_limit_counts_handshakes() {
        let config = ServerConfig { max_connections: 1, ..test_config() };
        let (server, addr) = start_server(config).await;
        let url = format!("ws://{}", addr);

        let (first, _) = connect_async(url.as_str()).await.unwrap();
        assert!(connect_async(url.as_str()).await.is_err());

        // Slot comes back once the first connection's task has finished
        drop(first);
        let mut reconnected = None;
        for _ in 0..50 {
            if let Ok((ws, _)) = connect_async(url.as_str()).await {
                reconnected = Some(ws);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(reconnected.is_some());

        server.shutdown();
    }

    #[tokio::test]
    async fn test_register_and_ping_over_websocket() {
        let (server, addr) = start_server(test_config()).await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let register = ClientMessage::Register { name: Some("alice".into()) };
        ws.send(Message::Text(register.to_json().unwrap())).await.unwrap();
        match recv_json(&mut ws).await {
            ServerMessage::Registered { display_name, .. } => assert_eq!(display_name, "alice"),
            other => panic!("unexpected reply: {:?}", other),
        }

        ws.send(Message::Text(ClientMessage::Ping { timestamp: 99 }.to_json().unwrap())).await.unwrap();
        match recv_json(&mut ws).await {
            ServerMessage::Pong { timestamp, .. } => assert_eq!(timestamp, 99),
            other => panic!("unexpected reply: {:?}", other),
        }

        ws.send(Message::Text(ClientMessage::GetStats.to_json().unwrap())).await.unwrap();
        match recv_json(&mut ws).await {
            ServerMessage::Stats(stats) => {
                assert_eq!(stats.open_connections, 1);
                assert_eq!(stats.registered_players, 1);
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error() {
        let (server, addr) = start_server(test_config()).await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Text("{\"type\":\"teleport\"}".into())).await.unwrap();
        match recv_json(&mut ws).await {
            ServerMessage::Error(e) => assert_eq!(e.kind, ErrorKind::InvalidMessage),
            other => panic!("unexpected reply: {:?}", other),
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_socket_close_forfeits_session() {
        let (server, addr) = start_server(test_config()).await;
        let (mut alice, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        let (mut bob, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        for (ws, name) in [(&mut alice, "alice"), (&mut bob, "bob")] {
            let register = ClientMessage::Register { name: Some(name.into()) };
            ws.send(Message::Text(register.to_json().unwrap())).await.unwrap();
            assert!(matches!(recv_json(ws).await, ServerMessage::Registered { .. }));
        }

        let join = ClientMessage::JoinQueue { game_type: "rps".into() };
        alice.send(Message::Text(join.to_json().unwrap())).await.unwrap();
        assert!(matches!(recv_json(&mut alice).await, ServerMessage::Queued { position: 1, .. }));
        bob.send(Message::Text(join.to_json().unwrap())).await.unwrap();

        let session_id = match recv_json(&mut alice).await {
            ServerMessage::SessionStarted(info) => info.session_id,
            other => panic!("unexpected reply: {:?}", other),
        };

        bob.close(None).await.unwrap();

        match recv_json(&mut alice).await {
            ServerMessage::OpponentLeft { session_id: ended, .. } => assert_eq!(ended, session_id),
            other => panic!("unexpected reply: {:?}", other),
        }

        server.shutdown();
    }
}

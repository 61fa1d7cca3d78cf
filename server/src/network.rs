//! Server network layer: WebSocket transport and the control loop
//!
//! Connection tasks only parse frames and forward them; all game state lives
//! in one [`GameState`] owned by [`Server::run`], which handles network
//! events, tick fires and respawn deadlines one at a time.

use crate::broadcast::Outbound;
use crate::client_manager::{ClientManager, OUTBOUND_QUEUE_SIZE};
use crate::config::ServerConfig;
use crate::game::GameState;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ClientId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the control loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        client_id: ClientId,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
    },
    Message {
        client_id: ClientId,
        event: ClientEvent,
    },
    Disconnected {
        client_id: ClientId,
    },
    Shutdown,
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    game: GameState,
    config: ServerConfig,

    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let game = GameState::new(&config);
        Self::with_game(config, game).await
    }

    /// Binds the listener around an existing game state
    pub async fn with_game(
        config: ServerConfig,
        game: GameState,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(),
            game,
            config,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender that stops [`Server::run`] when given [`NetworkEvent::Shutdown`]
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<NetworkEvent> {
        self.event_tx.clone()
    }

    /// Spawns the task accepting TCP connections and upgrading them
    fn spawn_acceptor(&self, listener: TcpListener) {
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut next_client_id: ClientId = 1;

            loop {
                let accepted = tokio::select! {
                    accepted = listener.accept() => accepted,
                    _ = event_tx.closed() => break,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        let client_id = next_client_id;
                        next_client_id = next_client_id.wrapping_add(1).max(1);
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            client_id,
                            event_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
            debug!("Acceptor stopped");
        });
    }

    fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected {
                client_id,
                addr,
                sender,
            } => {
                if self.clients.add_client(client_id, addr, sender) {
                    self.game.connect(client_id);
                } else {
                    warn!("Duplicate client id {} from {}", client_id, addr);
                }
            }
            NetworkEvent::Message { client_id, event } => {
                let out = self.game.handle_event(client_id, event, Instant::now());
                self.dispatch(out);
            }
            NetworkEvent::Disconnected { client_id } => {
                self.clients.remove_client(&client_id);
                let out = self.game.disconnect(client_id);
                self.dispatch(out);
            }
            NetworkEvent::Shutdown => {}
        }
    }

    /// Serialises each event once and queues it for its recipients
    fn dispatch(&mut self, outbound: Vec<Outbound>) {
        for message in outbound {
            let json = match message.event().encode() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode {} event: {}", message.event().name(), e);
                    continue;
                }
            };

            match message {
                Outbound::Send { to, .. } => {
                    self.clients.send_to(to, &json);
                }
                Outbound::Broadcast { exclude, .. } => {
                    self.clients.broadcast(&json, exclude);
                }
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self.listener.take().ok_or("server is already running")?;
        self.spawn_acceptor(listener);

        let tick_duration = self.config.tick_duration();
        let fixed_tick = self.game.broadcaster.is_fixed_tick();
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!(
            "Server started ({:?} broadcast, {} pickups)",
            self.game.broadcast_mode(),
            self.game.world.pickup_count()
        );

        loop {
            let respawn_at = self.game.next_respawn_at();

            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(NetworkEvent::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(event) => self.handle_network_event(event),
                    }
                },

                _ = tick_interval.tick(), if fixed_tick => {
                    let now = Instant::now();
                    let gap = now.duration_since(last_tick);
                    last_tick = now;
                    if gap > tick_duration * 2 {
                        warn!(
                            "Tick fired {:.1}ms late",
                            (gap - tick_duration).as_secs_f64() * 1000.0
                        );
                    }

                    let out = self.game.tick();
                    self.dispatch(out);

                    let ticks = self.game.broadcaster.ticks();
                    let stats_every = self.config.tick_rate.max(1) as u64 * 10;
                    if ticks % stats_every == 0 && !self.clients.is_empty() {
                        debug!(
                            "Tick {}: {} clients, {} players, {} pickups, {} respawns pending",
                            ticks,
                            self.clients.len(),
                            self.game.world.player_count(),
                            self.game.world.pickup_count(),
                            self.game.pickups.pending_respawns()
                        );
                    }
                },

                _ = wait_until(respawn_at) => {
                    let out = self.game.respawn_due(Instant::now());
                    self.dispatch(out);
                },
            }
        }

        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Runs one WebSocket connection until the peer leaves
///
/// Text frames are decoded into [`ClientEvent`]s; anything malformed is
/// dropped. Outbound frames arrive on a bounded queue drained by a writer
/// task.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    client_id: ClientId,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let (sender, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_SIZE);
    if event_tx
        .send(NetworkEvent::Connected {
            client_id,
            addr,
            sender,
        })
        .is_err()
    {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if ws_writer.send(message).await.is_err() {
                break;
            }
        }
        let _ = ws_writer.close().await;
    });

    while let Some(result) = ws_reader.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientEvent::decode(&text) {
                Ok(event) => {
                    if event_tx
                        .send(NetworkEvent::Message { client_id, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => debug!("Ignoring malformed message from client {}: {}", client_id, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from client {}: {}", client_id, e);
                break;
            }
        }
    }

    let _ = event_tx.send(NetworkEvent::Disconnected { client_id });
    writer.abort();
}

//! Connection registry for the arena server
//!
//! This module tracks every open WebSocket connection, including:
//! - The peer address and connection time for logging
//! - The outbound queue feeding that connection's writer task
//! - Fan-out of serialised events to one, all, or all-but-one connection
//!
//! The registry is owned by the control loop. Sends never wait: a full
//! outbound queue means the client is not keeping up, and the frame is
//! dropped for that client alone.

use log::{info, warn};
use shared::ClientId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// Frames buffered per connection before new ones are dropped
pub const OUTBOUND_QUEUE_SIZE: usize = 256;

/// A connected client and its outbound queue
#[derive(Debug)]
pub struct Client {
    /// Identifier assigned when the connection was accepted
    pub id: ClientId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// When the connection was registered
    pub connected_at: Instant,
    /// Frames dropped because the queue was full
    pub dropped_frames: u64,
    sender: mpsc::Sender<Message>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            dropped_frames: 0,
            sender,
        }
    }

    /// Queues a text frame for this client
    ///
    /// Returns false if the frame was not queued, either because the
    /// queue is full or because the writer has gone away.
    pub fn send_text(&mut self, text: &str) -> bool {
        match self.sender.try_send(Message::Text(text.to_string())) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_frames += 1;
                if self.dropped_frames.is_power_of_two() {
                    warn!(
                        "Client {} is not keeping up ({} frames dropped)",
                        self.id, self.dropped_frames
                    );
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Manages all open connections
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<ClientId, Client>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Registers a connection. Returns false if the id is already taken.
    pub fn add_client(
        &mut self,
        id: ClientId,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
    ) -> bool {
        if self.clients.contains_key(&id) {
            return false;
        }

        info!("Client {} connected from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, sender));
        true
    }

    /// Removes a client. Returns true if it was registered.
    ///
    /// Dropping the client drops its sender, which ends the writer task.
    pub fn remove_client(&mut self, id: &ClientId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    pub fn send_to(&mut self, id: ClientId, text: &str) -> bool {
        match self.clients.get_mut(&id) {
            Some(client) => client.send_text(text),
            None => false,
        }
    }

    /// Queues `text` for every client except `exclude`; returns how many accepted it
    pub fn broadcast(&mut self, text: &str, exclude: Option<ClientId>) -> usize {
        self.clients
            .values_mut()
            .filter(|client| Some(client.id) != exclude)
            .map(|client| client.send_text(text))
            .filter(|queued| *queued)
            .count()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

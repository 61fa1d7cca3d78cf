//! Per-connection lifecycle
//!
//! Every connection moves through
//! `Unjoined -> Active -> (Eliminated | gone)`. An eliminated connection
//! stays open and may `join` again, which puts it back in `Active` with a
//! brand-new player under the same id. Events that do not fit the current
//! state are dropped without telling the client.

use crate::broadcast::{pickup_snapshot, player_snapshot, Outbound};
use crate::collision::{self, Absorption, CollisionOutcome};
use crate::name_filter::filter_name;
use crate::pickups::PickupManager;
use crate::world::{Player, World};
use log::{debug, info};
use shared::{ClientId, MoveInput, ServerEvent};
use std::collections::HashMap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no player yet
    Unjoined,
    /// Owns a player in the world
    Active,
    /// Player was absorbed; connection still open
    Eliminated,
}

#[derive(Debug, Default)]
pub struct SessionHandler {
    sessions: HashMap<ClientId, SessionState>,
}

impl SessionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection. Returns false if the id is already known.
    pub fn connect(&mut self, id: ClientId) -> bool {
        if self.sessions.contains_key(&id) {
            return false;
        }
        self.sessions.insert(id, SessionState::Unjoined);
        true
    }

    pub fn state(&self, id: ClientId) -> Option<SessionState> {
        self.sessions.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Creates (or recreates) the connection's player
    ///
    /// The joining connection gets `init` with the whole world; everybody
    /// else gets `playerJoined`.
    pub fn join(&mut self, world: &mut World, id: ClientId, raw_name: &str) -> Vec<Outbound> {
        let state = match self.sessions.get_mut(&id) {
            Some(state) => state,
            None => {
                debug!("Ignoring join from unknown connection {}", id);
                return Vec::new();
            }
        };

        let name = filter_name(raw_name);
        let public = world.upsert_player(Player::new(id, name)).to_public();
        *state = SessionState::Active;
        info!("Connection {} joined as {:?}", id, public.name);

        vec![
            Outbound::to(
                id,
                ServerEvent::Init {
                    id,
                    players: player_snapshot(world),
                    pickups: pickup_snapshot(world),
                },
            ),
            Outbound::all_except(id, ServerEvent::PlayerJoined(public)),
        ]
    }

    /// Applies a movement update and runs collision checks for it
    ///
    /// Returns `None` when the move was ignored: the connection has no
    /// active player or the input carries non-finite numbers.
    pub fn apply_move(
        &mut self,
        world: &mut World,
        pickups: &mut PickupManager,
        id: ClientId,
        input: &MoveInput,
        now: Instant,
    ) -> Option<CollisionOutcome> {
        if self.state(id) != Some(SessionState::Active) {
            debug!("Ignoring move from connection {} without a player", id);
            return None;
        }
        if !input.is_finite() {
            debug!("Ignoring non-finite move from connection {}", id);
            return None;
        }

        world.player_mut(id)?.apply_move(input);
        Some(collision::resolve_after_move(world, pickups, id, now))
    }

    /// Marks absorbed connections as eliminated and notifies each of them
    pub fn eliminate(&mut self, absorptions: &[Absorption]) -> Vec<Outbound> {
        let mut out = Vec::new();
        for absorption in absorptions {
            if let Some(state) = self.sessions.get_mut(&absorption.absorbed) {
                *state = SessionState::Eliminated;
                out.push(Outbound::to(absorption.absorbed, ServerEvent::Eliminated));
            }
        }
        out
    }

    /// Forgets the connection and removes its player, if any
    ///
    /// A connection that is not registered produces nothing, so repeated
    /// disconnects are harmless.
    pub fn disconnect(&mut self, world: &mut World, id: ClientId) -> Vec<Outbound> {
        if self.sessions.remove(&id).is_none() {
            return Vec::new();
        }

        if world.remove_player(id).is_some() {
            info!("Removed player {}", id);
        }
        vec![Outbound::all(ServerEvent::PlayerLeft(id))]
    }
}

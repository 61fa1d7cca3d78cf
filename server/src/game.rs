//! The single owned simulation handle
//!
//! `GameState` bundles the world, pickup lifecycle, session table and
//! broadcast scheduler. The control loop owns exactly one instance and feeds
//! it connection events, timer fires and respawn deadlines in arrival order.
//! Every method returns the events to deliver; nothing here does I/O.

use crate::broadcast::{BroadcastMode, BroadcastScheduler, Outbound};
use crate::collision;
use crate::config::ServerConfig;
use crate::pickups::PickupManager;
use crate::session::{SessionHandler, SessionState};
use crate::world::World;
use shared::{ClientEvent, ClientId, MoveInput};
use tokio::time::Instant;

pub struct GameState {
    pub world: World,
    pub pickups: PickupManager,
    pub sessions: SessionHandler,
    pub broadcaster: BroadcastScheduler,
}

impl GameState {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_pickups(config, PickupManager::new(config.respawn_delay))
    }

    /// Same as [`GameState::new`] with reproducible pickup placement
    pub fn with_seed(config: &ServerConfig, seed: u64) -> Self {
        Self::with_pickups(config, PickupManager::with_seed(config.respawn_delay, seed))
    }

    fn with_pickups(config: &ServerConfig, mut pickups: PickupManager) -> Self {
        let mut world = World::new();
        pickups.spawn_initial(&mut world, config.initial_pickups);

        Self {
            world,
            pickups,
            sessions: SessionHandler::new(),
            broadcaster: BroadcastScheduler::new(config.broadcast_mode),
        }
    }

    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.broadcaster.mode()
    }

    pub fn connect(&mut self, id: ClientId) -> bool {
        self.sessions.connect(id)
    }

    pub fn session_state(&self, id: ClientId) -> Option<SessionState> {
        self.sessions.state(id)
    }

    pub fn handle_event(
        &mut self,
        id: ClientId,
        event: ClientEvent,
        now: Instant,
    ) -> Vec<Outbound> {
        match event {
            ClientEvent::Join(name) => self.join(id, &name),
            ClientEvent::Move(input) => self.apply_move(id, &input, now),
        }
    }

    pub fn join(&mut self, id: ClientId, name: &str) -> Vec<Outbound> {
        self.sessions.join(&mut self.world, id, name)
    }

    pub fn apply_move(&mut self, id: ClientId, input: &MoveInput, now: Instant) -> Vec<Outbound> {
        let outcome = match self
            .sessions
            .apply_move(&mut self.world, &mut self.pickups, id, input, now)
        {
            Some(outcome) => outcome,
            None => return Vec::new(),
        };

        let mut out = self.sessions.eliminate(&outcome.absorptions);
        if outcome.absorptions.is_empty() {
            out.extend(self.broadcaster.on_move(&self.world, id, now));
        } else {
            out.extend(self.broadcaster.on_world_changed(&self.world));
        }
        out
    }

    pub fn disconnect(&mut self, id: ClientId) -> Vec<Outbound> {
        self.broadcaster.forget(id);
        self.sessions.disconnect(&mut self.world, id)
    }

    /// Fixed-rate timer fire: settle absorptions, then snapshot everybody
    pub fn tick(&mut self) -> Vec<Outbound> {
        let absorptions = collision::resolve_absorptions(&mut self.world);
        let mut out = self.sessions.eliminate(&absorptions);
        out.extend(self.broadcaster.on_tick(&self.world));
        out
    }

    pub fn next_respawn_at(&self) -> Option<Instant> {
        self.pickups.next_respawn_at()
    }

    /// Adds every replacement pickup due by `now`
    pub fn respawn_due(&mut self, now: Instant) -> Vec<Outbound> {
        if self.pickups.respawn_due(&mut self.world, now) == 0 {
            return Vec::new();
        }
        self.broadcaster.on_world_changed(&self.world)
    }
}

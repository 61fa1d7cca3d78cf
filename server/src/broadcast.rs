//! Outbound event routing and snapshot cadence
//!
//! Simulation code never touches sockets. It returns [`Outbound`] values that
//! the network layer serialises and delivers. The [`BroadcastScheduler`]
//! decides when full snapshots go out:
//!
//! - [`BroadcastMode::FixedTick`] pushes `update` and `updatePickups` to every
//!   connection on each tick, whether or not anything changed. Outbound
//!   traffic is bounded by the tick rate, not by how often clients send input.
//! - [`BroadcastMode::PerMove`] pushes a snapshot after every accepted move,
//!   optionally limited per sender. Idle clients only hear about the world
//!   when somebody else moves.

use crate::world::World;
use shared::{ClientId, Pickup, PlayerPublic, ServerEvent};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// An event on its way to one or more connections
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Send {
        to: ClientId,
        event: ServerEvent,
    },
    Broadcast {
        event: ServerEvent,
        exclude: Option<ClientId>,
    },
}

impl Outbound {
    pub fn to(to: ClientId, event: ServerEvent) -> Self {
        Outbound::Send { to, event }
    }

    pub fn all(event: ServerEvent) -> Self {
        Outbound::Broadcast {
            event,
            exclude: None,
        }
    }

    pub fn all_except(exclude: ClientId, event: ServerEvent) -> Self {
        Outbound::Broadcast {
            event,
            exclude: Some(exclude),
        }
    }

    pub fn event(&self) -> &ServerEvent {
        match self {
            Outbound::Send { event, .. } | Outbound::Broadcast { event, .. } => event,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastMode {
    #[default]
    FixedTick,
    PerMove { throttle: Option<Duration> },
}

pub fn player_snapshot(world: &World) -> BTreeMap<ClientId, PlayerPublic> {
    world
        .players()
        .iter()
        .map(|(id, player)| (*id, player.to_public()))
        .collect()
}

pub fn pickup_snapshot(world: &World) -> Vec<Pickup> {
    world.pickups().to_vec()
}

/// `update` followed by `updatePickups`, both to everyone
pub fn snapshot_events(world: &World) -> Vec<Outbound> {
    vec![
        Outbound::all(ServerEvent::Update(player_snapshot(world))),
        Outbound::all(ServerEvent::UpdatePickups(pickup_snapshot(world))),
    ]
}

pub struct BroadcastScheduler {
    mode: BroadcastMode,
    ticks: u64,
    last_sent: HashMap<ClientId, Instant>,
}

impl BroadcastScheduler {
    pub fn new(mode: BroadcastMode) -> Self {
        Self {
            mode,
            ticks: 0,
            last_sent: HashMap::new(),
        }
    }

    pub fn mode(&self) -> BroadcastMode {
        self.mode
    }

    pub fn is_fixed_tick(&self) -> bool {
        self.mode == BroadcastMode::FixedTick
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Snapshot for a timer fire; empty outside fixed-tick mode
    pub fn on_tick(&mut self, world: &World) -> Vec<Outbound> {
        match self.mode {
            BroadcastMode::FixedTick => {
                self.ticks += 1;
                snapshot_events(world)
            }
            BroadcastMode::PerMove { .. } => Vec::new(),
        }
    }

    /// Snapshot after `sender` moved, subject to the per-sender throttle
    pub fn on_move(&mut self, world: &World, sender: ClientId, now: Instant) -> Vec<Outbound> {
        let throttle = match self.mode {
            BroadcastMode::FixedTick => return Vec::new(),
            BroadcastMode::PerMove { throttle } => throttle,
        };

        if let (Some(limit), Some(last)) = (throttle, self.last_sent.get(&sender)) {
            if now.duration_since(*last) < limit {
                return Vec::new();
            }
        }

        self.last_sent.insert(sender, now);
        snapshot_events(world)
    }

    /// Snapshot for changes not caused by a throttled move (respawns, absorptions)
    pub fn on_world_changed(&self, world: &World) -> Vec<Outbound> {
        match self.mode {
            BroadcastMode::FixedTick => Vec::new(),
            BroadcastMode::PerMove { .. } => snapshot_events(world),
        }
    }

    pub fn forget(&mut self, id: ClientId) {
        self.last_sent.remove(&id);
    }
}

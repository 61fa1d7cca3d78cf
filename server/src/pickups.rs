//! Pickup creation, consumption and delayed respawn
//!
//! Consumed pickups are removed from the world immediately. Each one books a
//! replacement in a min-heap keyed by fire time; the control loop sleeps until
//! the earliest deadline and then calls [`PickupManager::respawn_due`], so
//! respawning happens on the same thread as every other mutation.

use crate::utils::{get_timestamp, random_world_position};
use crate::world::World;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{distance, ClientId, Pickup, PICKUP_GROWTH, PICKUP_SIZE};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;
use tokio::time::Instant;

pub struct PickupManager {
    rng: StdRng,
    respawn_delay: Duration,
    /// One entry per consumed pickup still waiting for its replacement
    pending: BinaryHeap<Reverse<Instant>>,
}

impl PickupManager {
    pub fn new(respawn_delay: Duration) -> Self {
        Self::with_rng(respawn_delay, StdRng::from_entropy())
    }

    /// Deterministic positions, for tests and replays
    pub fn with_seed(respawn_delay: Duration, seed: u64) -> Self {
        Self::with_rng(respawn_delay, StdRng::seed_from_u64(seed))
    }

    fn with_rng(respawn_delay: Duration, rng: StdRng) -> Self {
        Self {
            rng,
            respawn_delay,
            pending: BinaryHeap::new(),
        }
    }

    /// Creates a pickup at a uniformly random position
    ///
    /// Ids combine the wall-clock millisecond with 32 random bits.
    pub fn create_pickup(&mut self) -> Pickup {
        let (x, y) = random_world_position(&mut self.rng);
        let nonce: u32 = self.rng.gen();
        Pickup {
            id: format!("{}-{:08x}", get_timestamp(), nonce),
            x,
            y,
            size: PICKUP_SIZE,
        }
    }

    pub fn spawn_initial(&mut self, world: &mut World, count: usize) {
        for _ in 0..count {
            let pickup = self.create_pickup();
            world.add_pickup(pickup);
        }
        info!("Spawned {} pickups", count);
    }

    /// Consumes every pickup touching `player_id`
    ///
    /// All pickups are tested against the same size snapshot taken before
    /// any growth, and each consumed pickup adds a flat [`PICKUP_GROWTH`].
    pub fn try_consume(&self, world: &mut World, player_id: ClientId) -> Vec<Pickup> {
        let (px, py, size) = match world.player(player_id) {
            Some(p) => (p.x, p.y, p.size),
            None => return Vec::new(),
        };

        let consumed = world.take_pickups_where(|pickup| {
            distance(px, py, pickup.x, pickup.y) < size / 2.0 + pickup.size
        });

        if !consumed.is_empty() {
            if let Some(player) = world.player_mut(player_id) {
                player.grow(PICKUP_GROWTH * consumed.len() as f64);
            }
            debug!("Player {} consumed {} pickups", player_id, consumed.len());
        }

        consumed
    }

    /// Books one replacement per consumed pickup, due `respawn_delay` after `now`
    pub fn schedule_respawn(&mut self, consumed: &[Pickup], now: Instant) {
        let due = now + self.respawn_delay;
        for _ in consumed {
            self.pending.push(Reverse(due));
        }
    }

    pub fn next_respawn_at(&self) -> Option<Instant> {
        self.pending.peek().map(|Reverse(at)| *at)
    }

    pub fn pending_respawns(&self) -> usize {
        self.pending.len()
    }

    /// Inserts a fresh pickup for every booking due at or before `now`
    ///
    /// Returns how many pickups were added.
    pub fn respawn_due(&mut self, world: &mut World, now: Instant) -> usize {
        let mut spawned = 0;
        while let Some(Reverse(at)) = self.pending.peek() {
            if *at > now {
                break;
            }
            self.pending.pop();
            let pickup = self.create_pickup();
            world.add_pickup(pickup);
            spawned += 1;
        }

        if spawned > 0 {
            debug!("Respawned {} pickups ({} pending)", spawned, self.pending.len());
        }
        spawned
    }
}

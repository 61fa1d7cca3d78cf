//! Authoritative world state: connected players and active pickups
//!
//! The world is plain data. It is owned by the game state and only ever
//! mutated from the server's control loop, so it carries no locking. The
//! store enforces the invariants that do not depend on other components:
//! player keys equal their owning connection id, positions stay inside the
//! world square and sizes never shrink.

use log::info;
use shared::{clamp_to_world, ClientId, MoveInput, Pickup, PlayerPublic, STARTING_SIZE};
use std::collections::HashMap;

/// Server-side player record
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Id of the connection that owns this player
    pub id: ClientId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Visual scale and mass; only ever grows
    pub size: f64,
    /// Client-reported orientation, relayed for rendering only
    pub angle: f64,
    /// Client-reported speed, kept but never sent on the wire
    pub speed: f64,
    /// Join order stamp; lower values joined earlier
    pub join_seq: u64,
}

impl Player {
    /// Creates a fresh player at the origin with the starting size
    pub fn new(id: ClientId, name: String) -> Self {
        Self {
            id,
            name,
            x: 0.0,
            y: 0.0,
            size: STARTING_SIZE,
            angle: 0.0,
            speed: 0.0,
            join_seq: 0,
        }
    }

    /// Applies a client movement update, clamping the position into the world
    pub fn apply_move(&mut self, input: &MoveInput) {
        self.x = clamp_to_world(input.x);
        self.y = clamp_to_world(input.y);
        self.angle = input.angle;
        self.speed = input.speed;
    }

    pub fn grow(&mut self, amount: f64) {
        if amount > 0.0 {
            self.size += amount;
        }
    }

    pub fn to_public(&self) -> PlayerPublic {
        PlayerPublic {
            id: self.id,
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            size: self.size,
            angle: self.angle,
        }
    }
}

#[derive(Debug, Default)]
pub struct World {
    players: HashMap<ClientId, Player>,
    pickups: Vec<Pickup>,
    next_join_seq: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn players(&self) -> &HashMap<ClientId, Player> {
        &self.players
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: ClientId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Inserts or replaces the player keyed by `player.id`
    ///
    /// The record is stamped with a new join sequence number, so a player
    /// that rejoins moves to the back of the collision order.
    pub fn upsert_player(&mut self, mut player: Player) -> &Player {
        player.join_seq = self.next_join_seq;
        self.next_join_seq += 1;

        let id = player.id;
        info!(
            "Player {} ({}) entered at ({}, {})",
            id, player.name, player.x, player.y
        );
        self.players.insert(id, player);
        &self.players[&id]
    }

    pub fn remove_player(&mut self, id: ClientId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Player ids ordered by ascending join sequence
    pub fn players_in_join_order(&self) -> Vec<ClientId> {
        let mut ordered: Vec<&Player> = self.players.values().collect();
        ordered.sort_by_key(|p| p.join_seq);
        ordered.into_iter().map(|p| p.id).collect()
    }

    pub fn add_pickup(&mut self, pickup: Pickup) {
        self.pickups.push(pickup);
    }

    pub fn remove_pickup(&mut self, id: &str) -> Option<Pickup> {
        let index = self.pickups.iter().position(|p| p.id == id)?;
        Some(self.pickups.swap_remove(index))
    }

    /// Removes and returns every pickup matching `predicate`
    pub fn take_pickups_where<F>(&mut self, mut predicate: F) -> Vec<Pickup>
    where
        F: FnMut(&Pickup) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.pickups.len());
        for pickup in self.pickups.drain(..) {
            if predicate(&pickup) {
                taken.push(pickup);
            } else {
                kept.push(pickup);
            }
        }
        self.pickups = kept;
        taken
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PICKUP_SIZE, WORLD_SIZE};

    fn pickup(id: &str, x: f64, y: f64) -> Pickup {
        Pickup {
            id: id.to_string(),
            x,
            y,
            size: PICKUP_SIZE,
        }
    }

    #[test]
    fn test_player_creation() {
        let player = Player::new(3, "Alice".to_string());
        assert_eq!(player.id, 3);
        assert_eq!(player.x, 0.0);
        assert_eq!(player.y, 0.0);
        assert_eq!(player.size, STARTING_SIZE);
    }

    #[test]
    fn test_apply_move_clamps() {
        let mut player = Player::new(1, "Bob".to_string());
        player.apply_move(&MoveInput {
            x: 5000.0,
            y: -1200.0,
            angle: 2.0,
            speed: 4.0,
        });

        assert_eq!(player.x, WORLD_SIZE);
        assert_eq!(player.y, -WORLD_SIZE);
        assert_eq!(player.angle, 2.0);
        assert_eq!(player.speed, 4.0);
    }

    #[test]
    fn test_grow_never_shrinks() {
        let mut player = Player::new(1, "Bob".to_string());
        player.grow(-10.0);
        assert_eq!(player.size, STARTING_SIZE);
        player.grow(3.0);
        assert_eq!(player.size, STARTING_SIZE + 3.0);
    }

    #[test]
    fn test_public_view_drops_speed() {
        let mut player = Player::new(9, "Cat".to_string());
        player.speed = 12.0;
        let public = player.to_public();
        assert_eq!(public.id, 9);
        assert_eq!(public.name, "Cat");
        assert_eq!(public.size, STARTING_SIZE);
    }

    #[test]
    fn test_upsert_replaces_and_reorders() {
        let mut world = World::new();
        world.upsert_player(Player::new(1, "a".to_string()));
        world.upsert_player(Player::new(2, "b".to_string()));
        assert_eq!(world.players_in_join_order(), vec![1, 2]);

        let mut grown = Player::new(1, "a".to_string());
        grown.size = 50.0;
        world.upsert_player(grown);

        assert_eq!(world.player_count(), 2);
        assert_eq!(world.player(1).unwrap().size, 50.0);
        assert_eq!(world.players_in_join_order(), vec![2, 1]);
    }

    #[test]
    fn test_remove_player() {
        let mut world = World::new();
        world.upsert_player(Player::new(1, "a".to_string()));

        assert!(world.remove_player(1).is_some());
        assert!(world.remove_player(1).is_none());
        assert_eq!(world.player_count(), 0);
    }

    #[test]
    fn test_pickup_add_remove() {
        let mut world = World::new();
        world.add_pickup(pickup("a", 0.0, 0.0));
        world.add_pickup(pickup("b", 10.0, 10.0));

        assert_eq!(world.remove_pickup("a").map(|p| p.id), Some("a".to_string()));
        assert!(world.remove_pickup("a").is_none());
        assert_eq!(world.pickup_count(), 1);
    }

    #[test]
    fn test_take_pickups_where() {
        let mut world = World::new();
        world.add_pickup(pickup("near", 1.0, 1.0));
        world.add_pickup(pickup("far", 900.0, 900.0));
        world.add_pickup(pickup("near2", -2.0, 0.0));

        let taken = world.take_pickups_where(|p| p.x.abs() < 10.0);

        assert_eq!(taken.len(), 2);
        assert_eq!(world.pickup_count(), 1);
        assert_eq!(world.pickups()[0].id, "far");
    }
}

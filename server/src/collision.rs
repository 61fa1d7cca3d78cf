//! Player-pickup and player-player interaction
//!
//! Absorption is checked over every unordered pair of players, which is
//! quadratic in the player count. Player counts are expected in the tens.
//!
//! Pairs are visited in ascending join order and always compared using the
//! sizes as they stand at that moment, so a player that has just grown can
//! go on to absorb someone later in the same pass. A player that has been
//! absorbed is skipped for the rest of the pass. Passes repeat until one
//! completes without any absorption.

use crate::pickups::PickupManager;
use crate::world::{Player, World};
use log::info;
use shared::{distance, ClientId, Pickup, ABSORB_MARGIN};
use tokio::time::Instant;

/// One player swallowing another
#[derive(Debug, Clone, PartialEq)]
pub struct Absorption {
    pub absorber: ClientId,
    pub absorbed: ClientId,
    /// Size added to the absorber
    pub gained: f64,
}

/// Everything a single move caused
#[derive(Debug, Default)]
pub struct CollisionOutcome {
    pub consumed: Vec<Pickup>,
    pub absorptions: Vec<Absorption>,
}

/// Two players touch when their centers are closer than the mean of their sizes
pub fn in_contact(a: &Player, b: &Player) -> bool {
    distance(a.x, a.y, b.x, b.y) < (a.size + b.size) / 2.0
}

/// Returns `(absorber, absorbed)` when the pair is in contact and one side
/// leads by more than [`ABSORB_MARGIN`]
pub fn absorption_between(a: &Player, b: &Player) -> Option<(ClientId, ClientId)> {
    if !in_contact(a, b) {
        return None;
    }

    if a.size > b.size + ABSORB_MARGIN {
        Some((a.id, b.id))
    } else if b.size > a.size + ABSORB_MARGIN {
        Some((b.id, a.id))
    } else {
        None
    }
}

/// Runs absorption passes over the whole world until nothing changes
pub fn resolve_absorptions(world: &mut World) -> Vec<Absorption> {
    let mut absorptions = Vec::new();

    loop {
        let order = world.players_in_join_order();
        let mut changed = false;

        for i in 0..order.len() {
            for j in (i + 1)..order.len() {
                let outcome = match (world.player(order[i]), world.player(order[j])) {
                    (Some(a), Some(b)) => absorption_between(a, b),
                    _ => continue,
                };

                if let Some((absorber, absorbed)) = outcome {
                    if let Some(absorption) = absorb(world, absorber, absorbed) {
                        absorptions.push(absorption);
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    absorptions
}

fn absorb(world: &mut World, absorber: ClientId, absorbed: ClientId) -> Option<Absorption> {
    let victim = world.remove_player(absorbed)?;
    let gained = (victim.size / 2.0).floor();

    let winner = world.player_mut(absorber)?;
    winner.grow(gained);
    info!(
        "Player {} absorbed player {} (size {} -> {})",
        absorber,
        absorbed,
        winner.size - gained,
        winner.size
    );

    Some(Absorption {
        absorber,
        absorbed,
        gained,
    })
}

/// Collision checks triggered by `mover` changing position
///
/// Only the mover is tested against pickups; absorption is re-evaluated for
/// every pair in the world.
pub fn resolve_after_move(
    world: &mut World,
    pickups: &mut PickupManager,
    mover: ClientId,
    now: Instant,
) -> CollisionOutcome {
    let consumed = pickups.try_consume(world, mover);
    pickups.schedule_respawn(&consumed, now);

    let absorptions = resolve_absorptions(world);

    CollisionOutcome {
        consumed,
        absorptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Pickup, PICKUP_SIZE, STARTING_SIZE};
    use std::time::Duration;

    fn place(world: &mut World, id: ClientId, x: f64, y: f64, size: f64) {
        let mut player = Player::new(id, format!("p{}", id));
        player.x = x;
        player.y = y;
        player.size = size;
        world.upsert_player(player);
    }

    #[test]
    fn test_contact_threshold() {
        let mut a = Player::new(1, "a".to_string());
        let mut b = Player::new(2, "b".to_string());
        b.x = 20.0;
        assert!(!in_contact(&a, &b));

        b.x = 19.99;
        assert!(in_contact(&a, &b));

        a.x = -500.0;
        assert!(!in_contact(&a, &b));
    }

    #[test]
    fn test_bigger_absorbs_smaller() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 20.0);
        place(&mut world, 2, 0.0, 0.0, 30.0);

        let absorptions = resolve_absorptions(&mut world);

        assert_eq!(
            absorptions,
            vec![Absorption {
                absorber: 2,
                absorbed: 1,
                gained: 10.0,
            }]
        );
        assert!(world.player(1).is_none());
        assert_eq!(world.player(2).unwrap().size, 40.0);
    }

    #[test]
    fn test_stalemate_within_margin() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 20.0);
        place(&mut world, 2, 1.0, 1.0, 25.0);

        assert!(resolve_absorptions(&mut world).is_empty());
        assert_eq!(world.player_count(), 2);
        assert_eq!(world.player(1).unwrap().size, 20.0);
        assert_eq!(world.player(2).unwrap().size, 25.0);
    }

    #[test]
    fn test_gain_is_floored_half() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 50.0);
        place(&mut world, 2, 0.0, 0.0, 21.0);

        let absorptions = resolve_absorptions(&mut world);

        assert_eq!(absorptions[0].gained, 10.0);
        assert_eq!(world.player(1).unwrap().size, 60.0);
    }

    #[test]
    fn test_no_absorption_out_of_contact() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 20.0);
        place(&mut world, 2, 100.0, 0.0, 80.0);

        assert!(resolve_absorptions(&mut world).is_empty());
    }

    #[test]
    fn test_grown_absorber_resolved_to_fixpoint() {
        // 1 and 3 start in stalemate (24 vs 28); after 3 eats 2 it leads by enough
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 24.0);
        place(&mut world, 2, 0.0, 0.0, 20.0);
        place(&mut world, 3, 0.0, 0.0, 28.0);

        let absorptions = resolve_absorptions(&mut world);

        assert_eq!(absorptions.len(), 2);
        assert_eq!(absorptions[0].absorbed, 2);
        assert_eq!(absorptions[0].absorber, 3);
        assert_eq!(absorptions[1].absorbed, 1);
        assert_eq!(absorptions[1].absorber, 3);
        assert_eq!(world.player_count(), 1);
        assert_approx_eq!(world.player(3).unwrap().size, 28.0 + 10.0 + 12.0, 1e-9);
    }

    #[test]
    fn test_absorbed_player_leaves_pass() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, 10.0);
        place(&mut world, 2, 0.0, 0.0, 40.0);
        place(&mut world, 3, 0.0, 0.0, 39.0);

        let absorptions = resolve_absorptions(&mut world);

        // 1 is absorbed by 2 first and must not be eaten a second time by 3;
        // 2 then leads 3 by 6 and absorbs it within the same pass
        assert_eq!(absorptions.len(), 2);
        assert_eq!(absorptions[0].absorbed, 1);
        assert_eq!(absorptions[0].absorber, 2);
        assert_eq!(absorptions[1].absorber, 2);
        assert_eq!(absorptions[1].absorbed, 3);
        assert_approx_eq!(world.player(2).unwrap().size, 40.0 + 5.0 + 19.0, 1e-9);
    }

    #[test]
    fn test_fixpoint_leaves_no_qualifying_pair() {
        let mut world = World::new();
        for id in 1..=8 {
            place(&mut world, id, (id as f64) * 3.0, 0.0, 10.0 + (id as f64) * 4.0);
        }

        resolve_absorptions(&mut world);

        let order = world.players_in_join_order();
        for i in 0..order.len() {
            for j in (i + 1)..order.len() {
                let a = world.player(order[i]).unwrap();
                let b = world.player(order[j]).unwrap();
                assert!(absorption_between(a, b).is_none());
            }
        }
    }

    #[test]
    fn test_resolve_after_move_books_respawn() {
        let mut world = World::new();
        place(&mut world, 1, 0.0, 0.0, STARTING_SIZE);
        world.add_pickup(Pickup {
            id: "p".to_string(),
            x: 0.0,
            y: 0.0,
            size: PICKUP_SIZE,
        });
        let mut pickups = PickupManager::with_seed(Duration::from_secs(15), 11);
        let now = Instant::now();

        let outcome = resolve_after_move(&mut world, &mut pickups, 1, now);

        assert_eq!(outcome.consumed.len(), 1);
        assert!(outcome.absorptions.is_empty());
        assert_eq!(world.player(1).unwrap().size, STARTING_SIZE + 1.0);
        assert_eq!(pickups.next_respawn_at(), Some(now + Duration::from_secs(15)));
    }
}

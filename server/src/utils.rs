use rand::Rng;
use shared::WORLD_SIZE;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Uniformly random point inside the world square
pub fn random_world_position<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    (
        rng.gen_range(-WORLD_SIZE..=WORLD_SIZE),
        rng.gen_range(-WORLD_SIZE..=WORLD_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_positions_stay_in_world() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let (x, y) = random_world_position(&mut rng);
            assert!((-WORLD_SIZE..=WORLD_SIZE).contains(&x));
            assert!((-WORLD_SIZE..=WORLD_SIZE).contains(&y));
        }
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01 in unix millis
        assert!(get_timestamp() > 1_577_836_800_000);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Half extent of the square world; positions live in `[-WORLD_SIZE, WORLD_SIZE]`.
pub const WORLD_SIZE: f64 = 1000.0;
pub const TICK_RATE: u32 = 30;
pub const INITIAL_PICKUP_COUNT: usize = 100;
pub const PICKUP_SIZE: f64 = 10.0;
pub const PICKUP_RESPAWN_MS: u64 = 15_000;
pub const PICKUP_GROWTH: f64 = 1.0;
pub const STARTING_SIZE: f64 = 20.0;
/// Minimum size lead required before contact turns into an absorption.
pub const ABSORB_MARGIN: f64 = 5.0;
pub const MAX_NAME_LEN: usize = 15;
pub const FALLBACK_NAME: &str = "Player";

/// Connection identifier; a player's id is the id of the connection owning it.
pub type ClientId = u32;

/// Events sent by a client. Framed as `{"event": ..., "data": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join(String),
    Move(MoveInput),
}

impl ClientEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct MoveInput {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub speed: f64,
}

impl MoveInput {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite() && self.speed.is_finite()
    }
}

/// Events pushed by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Init {
        id: ClientId,
        players: BTreeMap<ClientId, PlayerPublic>,
        pickups: Vec<Pickup>,
    },
    Update(BTreeMap<ClientId, PlayerPublic>),
    UpdatePickups(Vec<Pickup>),
    PlayerJoined(PlayerPublic),
    PlayerLeft(ClientId),
    Eliminated,
}

impl ServerEvent {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Wire name of the event, as it appears in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Init { .. } => "init",
            ServerEvent::Update(_) => "update",
            ServerEvent::UpdatePickups(_) => "updatePickups",
            ServerEvent::PlayerJoined(_) => "playerJoined",
            ServerEvent::PlayerLeft(_) => "playerLeft",
            ServerEvent::Eliminated => "eliminated",
        }
    }
}

/// The part of a player every client may see. `speed` never leaves the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerPublic {
    pub id: ClientId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub angle: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pickup {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

pub fn clamp_to_world(v: f64) -> f64 {
    v.clamp(-WORLD_SIZE, WORLD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn sample_player() -> PlayerPublic {
        PlayerPublic {
            id: 7,
            name: "Alice".to_string(),
            x: 12.5,
            y: -3.0,
            size: 20.0,
            angle: 1.25,
        }
    }

    #[test]
    fn test_distance() {
        assert_approx_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0, 1e-9);
        assert_approx_eq!(distance(-1.0, -1.0, -1.0, -1.0), 0.0, 1e-9);
    }

    #[test]
    fn test_clamp_to_world() {
        assert_eq!(clamp_to_world(1500.0), WORLD_SIZE);
        assert_eq!(clamp_to_world(-1500.0), -WORLD_SIZE);
        assert_eq!(clamp_to_world(42.0), 42.0);
    }

    #[test]
    fn test_decode_join() {
        let event = ClientEvent::decode(r#"{"event":"join","data":"Alice"}"#).unwrap();
        assert_eq!(event, ClientEvent::Join("Alice".to_string()));
    }

    #[test]
    fn test_decode_move_defaults_missing_fields() {
        let event = ClientEvent::decode(r#"{"event":"move","data":{"x":10,"y":-20.5}}"#).unwrap();
        match event {
            ClientEvent::Move(input) => {
                assert_approx_eq!(input.x, 10.0, 1e-9);
                assert_approx_eq!(input.y, -20.5, 1e-9);
                assert_eq!(input.angle, 0.0);
                assert_eq!(input.speed, 0.0);
            }
            _ => panic!("Expected move event"),
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(ClientEvent::decode("not json").is_err());
        assert!(ClientEvent::decode(r#"{"event":"fly","data":{}}"#).is_err());
        assert!(ClientEvent::decode(r#"{"event":"move","data":{"x":"left"}}"#).is_err());
        assert!(ClientEvent::decode(r#"{"event":"join"}"#).is_err());
    }

    #[test]
    fn test_move_input_finite() {
        let mut input = MoveInput {
            x: 1.0,
            y: 2.0,
            angle: 0.5,
            speed: 3.0,
        };
        assert!(input.is_finite());
        input.speed = f64::NAN;
        assert!(!input.is_finite());
    }

    #[test]
    fn test_eliminated_has_no_payload() {
        let json = ServerEvent::Eliminated.encode().unwrap();
        assert_eq!(json, r#"{"event":"eliminated"}"#);
        assert_eq!(ServerEvent::decode(&json).unwrap(), ServerEvent::Eliminated);
    }

    #[test]
    fn test_update_is_keyed_by_id() {
        let mut players = BTreeMap::new();
        players.insert(7, sample_player());
        let json = ServerEvent::Update(players).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["event"], "update");
        assert_eq!(value["data"]["7"]["name"], "Alice");
        assert!(value["data"]["7"].get("speed").is_none());
    }

    #[test]
    fn test_init_layout() {
        let mut players = BTreeMap::new();
        players.insert(7, sample_player());
        let pickups = vec![Pickup {
            id: "1700000000000-0000abcd".to_string(),
            x: 1.0,
            y: 2.0,
            size: PICKUP_SIZE,
        }];
        let event = ServerEvent::Init {
            id: 7,
            players,
            pickups,
        };
        let value: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();

        assert_eq!(value["event"], "init");
        assert_eq!(value["data"]["id"], 7);
        assert_eq!(value["data"]["pickups"][0]["size"], 10.0);
        assert_eq!(value["data"]["players"]["7"]["id"], 7);
    }

    #[test]
    fn test_event_names_match_wire() {
        let events = vec![
            ServerEvent::UpdatePickups(Vec::new()),
            ServerEvent::PlayerJoined(sample_player()),
            ServerEvent::PlayerLeft(3),
        ];
        for event in events {
            let value: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}

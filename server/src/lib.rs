//! # Arena Server Library
//!
//! Authoritative server for a shared-world arena game. Players steer a growing
//! shape around a square plane, eat pickups to grow, and absorb smaller
//! players on contact. The server owns the canonical world, applies client
//! movement, resolves collisions and pushes snapshots to every connection.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Clients report their own position, angle and speed. The server trusts the
//! position only after clamping it into the world square and never integrates
//! movement itself. Sizes are decided exclusively by the server.
//!
//! ### Collision Resolution
//! Every accepted move checks the mover against pickups and re-runs the
//! absorption pass over all player pairs. A player absorbs another when they
//! touch and it is more than five units larger; smaller gaps are a stalemate.
//!
//! ### Snapshot Broadcasting
//! By default a fixed 30 Hz timer sends the full player map and pickup list
//! to every connection, independent of how often clients send input. A
//! per-move mode is kept for comparison.
//!
//! ## Architecture Design
//!
//! ### Single Control Loop
//! Connection tasks parse frames and forward events over one channel. A
//! single loop owns the [`game::GameState`] and processes those events, tick
//! fires and respawn deadlines one at a time, so the world needs no locks.
//!
//! ### Events Out, Not Sockets
//! Simulation code returns [`broadcast::Outbound`] values. The network layer
//! serialises each one once and queues it to the relevant connections.
//!
//! ## Module Organization
//!
//! - `world`: players and pickups, plus the invariants they carry
//! - `pickups`: spawning, consumption and the respawn delay queue
//! - `collision`: pickup reach and player absorption
//! - `session`: per-connection join / move / disconnect handling
//! - `broadcast`: outbound events and snapshot cadence
//! - `game`: the single simulation handle tying the above together
//! - `client_manager`: open connections and their outbound queues
//! - `network`: WebSocket transport and the control loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 3000,
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod collision;
pub mod config;
pub mod game;
pub mod name_filter;
pub mod network;
pub mod pickups;
pub mod session;
pub mod utils;
pub mod world;

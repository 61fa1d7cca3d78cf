//! Headless load client
//!
//! Opens one WebSocket per bot, joins, then wanders around sending `move`
//! events until the run time is up. Counts what comes back so the server's
//! broadcast cadence can be checked from the outside.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::Rng;
use shared::{clamp_to_world, ClientEvent, MoveInput, ServerEvent};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[clap(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Display name prefix for the bots
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// Number of concurrent bots
    #[clap(short, long, default_value = "1")]
    bots: usize,
    /// How long each bot stays connected, in seconds
    #[clap(short, long, default_value = "10")]
    duration: u64,
    /// Milliseconds between moves
    #[clap(long, default_value = "50")]
    move_interval_ms: u64,
}

#[derive(Debug, Default)]
struct BotReport {
    events: BTreeMap<&'static str, u64>,
    final_size: Option<f64>,
    eliminated: bool,
}

async fn run_bot(
    url: String,
    name: String,
    run_for: Duration,
    move_every: Duration,
) -> Result<BotReport, Box<dyn std::error::Error + Send + Sync>> {
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut writer, mut reader) = ws_stream.split();

    writer
        .send(Message::Text(ClientEvent::Join(name.clone()).encode()?))
        .await?;

    let mut report = BotReport::default();
    let mut my_id = None;
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    let mut angle = 0.0_f64;

    let deadline = Instant::now() + run_for;
    let mut moves = interval(move_every);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,

            _ = moves.tick(), if my_id.is_some() && !report.eliminated => {
                let (turn, speed) = {
                    let mut rng = rand::thread_rng();
                    (rng.gen_range(-0.5..0.5), rng.gen_range(1.0..5.0))
                };
                angle += turn;
                x = clamp_to_world(x + angle.cos() * speed);
                y = clamp_to_world(y + angle.sin() * speed);

                let input = MoveInput { x, y, angle, speed };
                writer.send(Message::Text(ClientEvent::Move(input).encode()?)).await?;
            },

            frame = reader.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                let event = match ServerEvent::decode(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("{}: undecodable frame: {}", name, e);
                        continue;
                    }
                };
                *report.events.entry(event.name()).or_insert(0) += 1;

                match event {
                    ServerEvent::Init { id, .. } => {
                        info!("{} joined as player {}", name, id);
                        my_id = Some(id);
                    }
                    ServerEvent::Update(players) => {
                        if let Some(me) = my_id.and_then(|id| players.get(&id)) {
                            report.final_size = Some(me.size);
                        }
                    }
                    ServerEvent::Eliminated => {
                        info!("{} was eliminated", name);
                        report.eliminated = true;
                    }
                    other => debug!("{}: {}", name, other.name()),
                }
            },
        }
    }

    let _ = writer.close().await;
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let run_for = Duration::from_secs(args.duration);
    let move_every = Duration::from_millis(args.move_interval_ms.max(1));

    info!("Starting {} bot(s) against {}", args.bots, args.url);

    let handles: Vec<_> = (0..args.bots)
        .map(|i| {
            let name = format!("{}{}", args.name, i);
            tokio::spawn(run_bot(args.url.clone(), name, run_for, move_every))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(report)) => {
                let seconds = run_for.as_secs_f64().max(1.0);
                let updates = report.events.get("update").copied().unwrap_or(0);
                info!(
                    "bot {}: {:.1} updates/s, final size {:?}, eliminated: {}, events: {:?}",
                    i,
                    updates as f64 / seconds,
                    report.final_size,
                    report.eliminated,
                    report.events
                );
            }
            Ok(Err(e)) => warn!("bot {} failed: {}", i, e),
            Err(e) => warn!("bot {} panicked: {}", i, e),
        }
    }

    Ok(())
}

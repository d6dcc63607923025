//! Several joiners claim the gold seat at once.

use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::info;
use turnsync::rules::grid::GridEngine;
use turnsync::{Identity, MatchClient, SessionId, SyncConfig};
use turnsync_runtime::MemoryNetwork;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
	pub name: String,
	pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceReport {
	pub session: SessionId,
	pub winner: String,
	pub turned_away: Vec<Rejection>,
}

pub async fn run(config: &SyncConfig, joiners: u8) -> Result<RaceReport> {
	let network = MemoryNetwork::manual();
	let engine = Arc::new(GridEngine);
	let client = |name: &str| {
		MatchClient::new(
			network.peer(name).into_store(),
			Arc::clone(&engine),
			Identity::authenticated(format!("pk-{name}")),
			config.clone(),
		)
	};

	let host = client("host").create("Host").await.context("creating match")?;
	network.deliver_all();
	let id = host.id().clone();

	let racers: Vec<(String, MatchClient<GridEngine>)> = (1..=joiners)
		.map(|n| {
			let name = format!("joiner-{n}");
			let racer = client(&name);
			(name, racer)
		})
		.collect();

	// Every claim is written before the first read-back; deliver halfway
	// through the settle window so the writes cross.
	let crossing = async {
		tokio::time::sleep(config.seat_settle() / 2).await;
		network.deliver_all()
	};
	let claims = join_all(racers.iter().map(|(name, racer)| {
		let id = &id;
		async move { (name.clone(), racer.join(id, name).await) }
	}));
	let (results, crossed) = tokio::join!(claims, crossing);
	info!(target = "turnsync.race", session = %id, joiners, crossed, "claims settled");

	let mut winners = Vec::new();
	let mut turned_away = Vec::new();
	for (name, result) in results {
		match result {
			Ok(handle) => winners.push((name, handle)),
			Err(err) => turned_away.push(Rejection { name, error: err.to_string() }),
		}
	}
	let (winner, handle) = match winners.len() {
		1 => winners.remove(0),
		0 => bail!("no joiner kept the seat"),
		n => bail!("{n} joiners believe they hold the seat"),
	};

	network.deliver_all();
	let seen = host.wait_for_opponent().await.context("host never saw the gold seat")?;
	let seated = seen.players.gold.as_ref().map(|info| info.name.as_str());
	ensure!(seated == Some(winner.as_str()), "host sees {seated:?} seated, expected {winner}");

	handle.leave();
	host.leave();
	Ok(RaceReport {
		session: id,
		winner,
		turned_away,
	})
}

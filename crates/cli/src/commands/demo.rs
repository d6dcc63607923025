//! Scripted match: Ada hosts, Lin joins, a spectator follows along.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};
use turnsync::rules::grid::GridEngine;
use turnsync::{Identity, MatchClient, Seat, SessionId, SyncConfig};
use turnsync_runtime::{Delivery, MemoryNetwork};

#[derive(Debug, Clone)]
pub struct DemoOptions {
	pub moves: u32,
	pub seed: u64,
	pub delivery: Delivery,
	pub late_spectator: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
	pub ply: u64,
	pub seat: Seat,
	pub from: String,
	pub to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
	pub session: SessionId,
	pub green: String,
	pub gold: String,
	pub moves: Vec<MoveRecord>,
	pub final_ply: u64,
	pub winner: Option<Seat>,
	pub spectator_ply: u64,
	/// Guest and spectator ended with the host's state and seats.
	pub converged: bool,
}

pub async fn run(config: &SyncConfig, options: &DemoOptions) -> Result<DemoReport> {
	let network = MemoryNetwork::new(options.delivery);
	let engine = Arc::new(GridEngine);
	let client = |name: &str, identity: Identity| {
		let peer = network.peer(name);
		(peer.clone(), MatchClient::new(peer.into_store(), Arc::clone(&engine), identity, config.clone()))
	};

	let (_, ada) = client("ada", Identity::from_key(Some("pk-ada")));
	let (_, lin) = client("lin", Identity::anonymous());

	let host = ada.create("Ada").await.context("creating match")?;
	network.deliver_all();
	let guest = lin.join(host.id(), "Lin").await.context("joining match")?;
	network.deliver_all();
	host.wait_for_opponent().await.context("waiting for the guest seat")?;

	let (spectator_peer, spectator) = client("sam", Identity::anonymous());
	let view = spectator.observe(host.id()).await.context("attaching spectator")?;
	if options.late_spectator {
		network.disconnect(&spectator_peer);
	}

	let mut rng = StdRng::seed_from_u64(options.seed);
	let mut moves = Vec::new();
	for _ in 0..options.moves {
		let current = host.current().context("host has no session view")?;
		let Some(&(from, to)) = current.state.legal_moves().choose(&mut rng) else {
			break;
		};
		let seat = current.current_turn();
		let mover = if seat == host.local_seat() { &host } else { &guest };

		let after = mover.make_move(&from, &to).await.with_context(|| format!("{seat} moving {from} -> {to}"))?;
		network.deliver_all();
		host.wait_for_ply(after.ply()).await?;
		guest.wait_for_ply(after.ply()).await?;
		debug!(target = "turnsync.demo", ply = after.ply(), %seat, %from, %to, "move converged");

		moves.push(MoveRecord {
			ply: after.ply(),
			seat,
			from: from.to_string(),
			to: to.to_string(),
		});
		if after.state.winner.is_some() {
			break;
		}
	}

	if options.late_spectator {
		network.reconnect(&spectator_peer);
		network.duplicate_pending();
		network.shuffle_pending(options.seed);
		network.deliver_all();
	}

	let last = host.current().context("host has no session view")?;
	let seen = view.wait_for_ply(last.ply(), config.operation_timeout()).await.context("waiting for the spectator")?;
	let converged = [guest.current(), Some(seen.clone())]
		.iter()
		.all(|other| other.as_ref().is_some_and(|other| other.state == last.state && other.players == last.players));
	info!(target = "turnsync.demo", session = %last.id, ply = last.ply(), converged, "demo finished");

	let name = |seat: Seat| last.players.get(seat).map(|info| info.name.clone()).unwrap_or_default();
	let report = DemoReport {
		session: last.id.clone(),
		green: name(Seat::Green),
		gold: name(Seat::Gold),
		moves,
		final_ply: last.ply(),
		winner: last.state.winner,
		spectator_ply: seen.ply(),
		converged,
	};

	view.unsubscribe();
	guest.leave();
	host.leave();
	Ok(report)
}

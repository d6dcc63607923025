#![allow(dead_code)]

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use turnsync::rules::grid::{GridEngine, Position};
use turnsync::{Identity, MatchClient, MatchHandle, SyncConfig};
use turnsync_runtime::{MemoryNetwork, MemoryPeer};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_test_writer()
		.try_init();
}

pub fn config() -> SyncConfig {
	SyncConfig {
		seat_settle_ms: 50,
		..SyncConfig::default()
	}
}

/// A participant on `network`, identified by `pk-<name>`.
pub fn participant(network: &MemoryNetwork, name: &str) -> (MemoryPeer, MatchClient<GridEngine>) {
	let peer = network.peer(name);
	let client = MatchClient::new(
		peer.clone().into_store(),
		Arc::new(GridEngine),
		Identity::authenticated(format!("pk-{name}")),
		config(),
	);
	(peer, client)
}

pub fn pos(raw: &str) -> Position {
	raw.parse().unwrap()
}

/// Hosts a match as `ada` and seats `lin`, delivering as needed on a manual
/// network.
pub async fn seated_pair(network: &MemoryNetwork) -> (Pair, Pair) {
	let (ada_peer, ada) = participant(network, "ada");
	let (lin_peer, lin) = participant(network, "lin");

	let host = ada.create("Ada").await.unwrap();
	network.deliver_all();
	let guest = lin.join(host.id(), "Lin").await.unwrap();
	network.deliver_all();
	host.wait_for_opponent().await.unwrap();

	(
		Pair {
			peer: ada_peer,
			client: ada,
			handle: host,
		},
		Pair {
			peer: lin_peer,
			client: lin,
			handle: guest,
		},
	)
}

pub struct Pair {
	pub peer: MemoryPeer,
	pub client: MatchClient<GridEngine>,
	pub handle: MatchHandle<GridEngine>,
}

/// Plays `moves` alternately starting with green, delivering after each one
/// and waiting until both seats have seen it.
pub async fn play(network: &MemoryNetwork, green: &Pair, gold: &Pair, moves: &[(&str, &str)]) {
	for (from, to) in moves {
		let current = green.handle.current().unwrap();
		let mover = if current.current_turn() == turnsync::Seat::Green { green } else { gold };
		let after = mover.handle.make_move(&pos(from), &pos(to)).await.unwrap();
		network.deliver_all();
		green.handle.wait_for_ply(after.ply()).await.unwrap();
		gold.handle.wait_for_ply(after.ply()).await.unwrap();
	}
}

/// Opening used across tests; legal for `GridEngine` from the start position.
pub const OPENING: [(&str, &str); 6] = [("0,1", "1,1"), ("7,1", "6,1"), ("1,1", "2,1"), ("6,1", "5,1"), ("0,3", "1,3"), ("7,3", "6,3")];

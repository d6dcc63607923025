mod support;

use std::sync::Arc;

use serde_json::json;
use support::{OPENING, config, init_tracing, participant, play, pos, seated_pair};
use turnsync::rules::grid::GridEngine;
use turnsync::{Error, Identity, Phase, Seat, SessionId, TurnArbiter};
use turnsync_protocol::path;
use turnsync_runtime::{MemoryNetwork, NodeRef, WriteBehavior};

#[tokio::test(start_paused = true)]
async fn host_and_guest_play_the_first_move() {
	init_tracing();
	let network = MemoryNetwork::manual();
	let (ada, lin) = seated_pair(&network).await;

	let joined = lin.handle.current().unwrap();
	assert_eq!(lin.handle.local_seat(), Seat::Gold);
	assert_eq!(joined.players.green.as_ref().unwrap().name, "Ada");
	assert_eq!(joined.players.gold.as_ref().unwrap().name, "Lin");
	assert_eq!(joined.phase(), Phase::Active);

	let after = ada.handle.make_move(&pos("0,1"), &pos("1,1")).await.unwrap();
	assert_eq!(after.ply(), 1);
	assert_eq!(after.current_turn(), Seat::Gold);
	assert!(after.last_move_at.is_some());

	// Lin has not received move 1 yet, so green still holds the turn locally.
	let writes = lin.peer.write_count();
	let err = lin.handle.make_move(&pos("7,1"), &pos("6,1")).await.unwrap_err();
	assert_eq!(err, Error::NotYourTurn { turn: Seat::Green });
	assert_eq!(lin.peer.write_count(), writes);

	network.deliver_all();
	let seen = lin.handle.wait_for_ply(1).await.unwrap();
	assert_eq!(seen.state, after.state);
	assert_eq!(seen.current_turn(), Seat::Gold);

	let reply = lin.handle.make_move(&pos("7,1"), &pos("6,1")).await.unwrap();
	assert_eq!(reply.ply(), 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_turn_moves_issue_no_write() {
	let network = MemoryNetwork::manual();
	let (ada, lin) = seated_pair(&network).await;
	play(&network, &ada, &lin, &OPENING[..1]).await;

	let writes = ada.peer.write_count();
	let err = ada.handle.make_move(&pos("1,1"), &pos("2,1")).await.unwrap_err();
	assert_eq!(err, Error::NotYourTurn { turn: Seat::Gold });
	assert_eq!(ada.peer.write_count(), writes);
	assert_eq!(network.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn moves_wait_for_an_opponent() {
	let network = MemoryNetwork::manual();
	let (ada_peer, ada) = participant(&network, "ada");
	let host = ada.create("Ada").await.unwrap();
	assert_eq!(host.current().unwrap().phase(), Phase::Waiting);

	let writes = ada_peer.write_count();
	let err = host.make_move(&pos("0,1"), &pos("1,1")).await.unwrap_err();
	assert_eq!(err, Error::NotReady);
	assert_eq!(ada_peer.write_count(), writes);
}

#[tokio::test(start_paused = true)]
async fn engine_rejections_are_illegal_moves() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	let writes = ada.peer.write_count();
	let err = ada.handle.make_move(&pos("0,1"), &pos("3,1")).await.unwrap_err();
	assert_eq!(err, Error::IllegalMove);
	assert_eq!(ada.peer.write_count(), writes);
	assert_eq!(ada.handle.current().unwrap().ply(), 0);
}

#[tokio::test(start_paused = true)]
async fn misshapen_remote_board_is_an_illegal_move() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	let mut garbled = ada.handle.current().unwrap();
	garbled.state.board.truncate(1);
	garbled.state.ply = 2;
	assert!(ada.handle.synchronizer().apply_remote(&garbled.encode().unwrap()).is_accepted());

	let writes = ada.peer.write_count();
	let err = ada.handle.make_move(&pos("0,1"), &pos("1,1")).await.unwrap_err();
	assert_eq!(err, Error::IllegalMove);
	assert_eq!(ada.peer.write_count(), writes);
}

#[tokio::test(start_paused = true)]
async fn outsiders_cannot_move() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	let eve_store = network.peer("eve").into_store();
	let eve = turnsync::MatchClient::new(Arc::clone(&eve_store), Arc::new(GridEngine), Identity::authenticated("pk-eve"), config());
	let sync = eve.observe(ada.handle.id()).await.unwrap();
	assert_eq!(sync.current().unwrap().phase(), Phase::Active);

	let node = NodeRef::at(eve_store, path::session_path(&config().namespace, ada.handle.id()));
	let arbiter = TurnArbiter::new(Arc::new(GridEngine), node, eve.identity().clone(), config());
	let err = arbiter.make_move(&sync, &pos("0,1"), &pos("1,1")).await.unwrap_err();
	assert_eq!(err, Error::NotAPlayer);
}

#[tokio::test(start_paused = true)]
async fn concurrent_moves_from_one_handle_are_serialized() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	let writes = ada.peer.write_count();
	let (from_a, to_a) = (pos("0,1"), pos("1,1"));
	let (from_b, to_b) = (pos("0,2"), pos("1,2"));
	let (first, second) = tokio::join!(ada.handle.make_move(&from_a, &to_a), ada.handle.make_move(&from_b, &to_b));

	let outcomes = [first, second];
	assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
	assert!(outcomes.iter().any(|outcome| matches!(outcome, Err(Error::NotYourTurn { turn: Seat::Gold }))));
	assert_eq!(ada.peer.write_count(), writes + 1);
	assert_eq!(ada.handle.current().unwrap().ply(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejoining_returns_the_held_seat() {
	let network = MemoryNetwork::manual();
	let (ada, lin) = seated_pair(&network).await;

	let writes = lin.peer.write_count();
	let again = lin.client.registry().join_session(ada.handle.id(), lin.client.identity(), "Lin").await.unwrap();
	assert!(again.rejoined);
	assert_eq!(again.seat, Seat::Gold);
	assert_eq!(lin.peer.write_count(), writes);

	let host_again = ada.client.join(ada.handle.id(), "Ada").await.unwrap();
	assert_eq!(host_again.local_seat(), Seat::Green);
}

#[tokio::test(start_paused = true)]
async fn third_joiner_finds_the_session_full() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	let (kim_peer, kim) = participant(&network, "kim");
	let err = kim.join(ada.handle.id(), "Kim").await.unwrap_err();
	assert_eq!(err, Error::SessionFull(ada.handle.id().clone()));
	assert_eq!(kim_peer.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn joining_an_unknown_session_gives_up() {
	let network = MemoryNetwork::manual();
	let (_peer, lin) = participant(&network, "lin");
	let id = SessionId::parse("match-0-missing").unwrap();
	assert!(config().validate().is_ok());

	let err = lin.join(&id, "Lin").await.unwrap_err();
	assert_eq!(err, Error::SessionNotFound(id));
}

#[tokio::test(start_paused = true)]
async fn joining_a_garbled_session_is_a_serialization_error() {
	let network = MemoryNetwork::live();
	let (_peer, lin) = participant(&network, "lin");
	let vandal = network.peer("vandal").into_store();
	let id = SessionId::parse("match-0-garbled").unwrap();
	NodeRef::at(vandal, path::session_path(&config().namespace, &id))
		.put(json!({
			"id": "match-0-garbled",
			"createdAt": 1,
			"players": { "green": r#"{"id":"pk-v","pub":"pk-v","name":"V","joinedAt":1}"# },
			"state": 5,
		}))
		.await
		.unwrap();

	let err = lin.join(&id, "Lin").await.unwrap_err();
	assert!(matches!(err, Error::Serialization(msg) if msg.contains("state")));
}

#[tokio::test(start_paused = true)]
async fn stalled_writes_time_out() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	ada.peer.set_write_behavior(WriteBehavior::Stall);
	let err = ada.handle.make_move(&pos("0,1"), &pos("1,1")).await.unwrap_err();
	assert!(err.is_timeout());
	assert_eq!(ada.handle.current().unwrap().ply(), 0);

	let (stalled_peer, stalled) = participant(&network, "mo");
	stalled_peer.set_write_behavior(WriteBehavior::Stall);
	assert!(stalled.create("Mo").await.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn stalled_seat_claim_times_out() {
	let network = MemoryNetwork::manual();
	let (_ada_peer, ada) = participant(&network, "ada");
	let host = ada.create("Ada").await.unwrap();
	network.deliver_all();

	let (lin_peer, lin) = participant(&network, "lin");
	lin_peer.set_write_behavior(WriteBehavior::Stall);
	let err = lin.join(host.id(), "Lin").await.unwrap_err();
	assert!(err.is_timeout(), "expected a timeout, got {err:?}");
	assert_eq!(host.current().unwrap().phase(), Phase::Waiting);
}

#[tokio::test(start_paused = true)]
async fn rejected_writes_surface_as_store_errors() {
	let network = MemoryNetwork::manual();
	let (ada, _lin) = seated_pair(&network).await;

	ada.peer.set_write_behavior(WriteBehavior::Fail("quota exceeded".into()));
	let err = ada.handle.make_move(&pos("0,1"), &pos("1,1")).await.unwrap_err();
	assert!(matches!(err, Error::Store(_)));
	assert_eq!(err.to_string(), "write rejected by store: quota exceeded");
	assert_eq!(ada.handle.current().unwrap().ply(), 0);
}

#[tokio::test(start_paused = true)]
async fn listeners_see_each_accepted_update_once() {
	let network = MemoryNetwork::manual();
	let (ada, lin) = seated_pair(&network).await;

	let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
	let log = Arc::clone(&seen);
	lin.handle.subscribe(move |session| log.lock().push(session.ply())).await.unwrap();

	play(&network, &ada, &lin, &OPENING[..3]).await;
	network.duplicate_pending();
	network.deliver_all();
	tokio::task::yield_now().await;

	// ply 0 is the session already cached when the listener registered
	assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
	lin.handle.leave();
	ada.handle.leave();
}

#[tokio::test(start_paused = true)]
async fn one_client_runs_independent_matches() {
	let network = MemoryNetwork::live();
	let (_ada_peer, ada) = participant(&network, "ada");
	let (_lin_peer, lin) = participant(&network, "lin");

	let first = ada.create("Ada").await.unwrap();
	let second = ada.create("Ada").await.unwrap();
	assert_ne!(first.id(), second.id());

	let first_guest = lin.join(first.id(), "Lin").await.unwrap();
	let _second_guest = lin.join(second.id(), "Lin").await.unwrap();
	first.wait_for_opponent().await.unwrap();
	second.wait_for_opponent().await.unwrap();

	first.make_move(&pos("0,1"), &pos("1,1")).await.unwrap();
	first_guest.wait_for_ply(1).await.unwrap();

	assert_eq!(first.current().unwrap().ply(), 1);
	assert_eq!(second.current().unwrap().ply(), 0);
	second.leave();
	assert_eq!(first.current().unwrap().ply(), 1);
}

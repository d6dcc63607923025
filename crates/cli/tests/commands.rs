use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use turnsync::SyncConfig;
use turnsync_cli::commands::{demo, race};
use turnsync_runtime::Delivery;

fn turnsync_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_turnsync"))
}

fn run_turnsync(args: &[&str]) -> (bool, String, String) {
	let output = Command::new(turnsync_binary()).args(args).output().expect("failed to execute turnsync");
	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	(output.status.success(), stdout, stderr)
}

fn fast_config() -> SyncConfig {
	SyncConfig {
		seat_settle_ms: 40,
		..SyncConfig::default()
	}
}

#[tokio::test]
async fn demo_converges_with_manual_delivery() {
	let options = demo::DemoOptions {
		moves: 8,
		seed: 3,
		delivery: Delivery::Manual,
		late_spectator: false,
	};
	let report = demo::run(&fast_config(), &options).await.unwrap();

	assert_eq!(report.green, "Ada");
	assert_eq!(report.gold, "Lin");
	assert_eq!(report.moves.len() as u64, report.final_ply);
	assert_eq!(report.spectator_ply, report.final_ply);
	assert!(report.converged);
	assert!(report.moves.iter().enumerate().all(|(i, record)| record.ply == i as u64 + 1));
}

#[tokio::test]
async fn late_spectator_still_converges() {
	let options = demo::DemoOptions {
		moves: 10,
		seed: 11,
		delivery: Delivery::Manual,
		late_spectator: true,
	};
	let report = demo::run(&fast_config(), &options).await.unwrap();
	assert!(report.converged);
	assert_eq!(report.spectator_ply, report.final_ply);
}

#[tokio::test]
async fn race_has_a_single_winner() {
	let report = race::run(&fast_config(), 4).await.unwrap();
	assert!(report.winner.starts_with("joiner-"));
	assert_eq!(report.turned_away.len(), 3);
	assert!(report.turned_away.iter().all(|rejection| rejection.name != report.winner));
	assert!(report.turned_away.iter().all(|rejection| rejection.error.contains("claimed by another player")));
}

#[test]
fn config_command_prints_effective_settings() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(br#"{ "namespace": "arena/games", "seatSettleMs": 75 }"#).unwrap();

	let (success, stdout, stderr) = run_turnsync(&["--config", file.path().to_str().unwrap(), "config"]);
	assert!(success, "stderr: {stderr}");
	let printed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(printed["namespace"], "arena/games");
	assert_eq!(printed["seatSettleMs"], 75);
	assert_eq!(printed["operationTimeoutMs"], 4000);
}

#[test]
fn bad_config_fails_the_command() {
	let dir = tempfile::tempdir().unwrap();
	let missing = dir.path().join("missing.json");
	let (success, stdout, _) = run_turnsync(&["--config", missing.to_str().unwrap(), "config"]);
	assert!(!success);
	assert!(stdout.is_empty());
}

#[test]
fn demo_binary_prints_a_json_report() {
	let (success, stdout, stderr) = run_turnsync(&["demo", "--moves", "4", "--delivery", "live"]);
	assert!(success, "stderr: {stderr}");
	let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(report["finalPly"], 4);
	assert_eq!(report["converged"], true);
}

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "turnsync")]
#[command(about = "Peer-to-peer turn-based match sync, run in-process")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Sync settings as JSON (camelCase keys, all optional)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Play a match between two peers plus a spectator and report the result
	Demo {
		/// Stop after this many moves
		#[arg(long, default_value = "12")]
		moves: u32,

		/// Seed for move choice and delivery shuffling
		#[arg(long, default_value = "0")]
		seed: u64,

		/// How updates travel between peers
		#[arg(long, value_enum, default_value = "manual")]
		delivery: DeliveryMode,

		/// Keep the spectator offline until the end, then deliver everything
		/// shuffled and duplicated
		#[arg(long)]
		late_spectator: bool,
	},

	/// Let several joiners race for the second seat
	Race {
		/// Number of competing joiners
		#[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(2..=16))]
		joiners: u8,
	},

	/// Print the effective sync settings
	Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
	/// Deliver inside each write
	Live,
	/// Queue updates and deliver them between moves
	Manual,
}

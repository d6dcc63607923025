//! Command implementations. Each returns a serializable report that
//! [`dispatch`] prints as JSON on stdout.

pub mod demo;
pub mod race;

use anyhow::{Context, Result};
use serde::Serialize;
use turnsync::SyncConfig;
use turnsync_runtime::Delivery;

use crate::cli::{Cli, Commands, DeliveryMode};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = SyncConfig::load_or_default(cli.config.as_deref()).context("loading sync config")?;

	match cli.command {
		Commands::Demo {
			moves,
			seed,
			delivery,
			late_spectator,
		} => {
			let options = demo::DemoOptions {
				moves,
				seed,
				delivery: delivery.into(),
				late_spectator,
			};
			print_json(&demo::run(&config, &options).await?)
		}
		Commands::Race { joiners } => print_json(&race::run(&config, joiners).await?),
		Commands::Config => print_json(&config),
	}
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

impl From<DeliveryMode> for Delivery {
	fn from(mode: DeliveryMode) -> Self {
		match mode {
			DeliveryMode::Live => Delivery::Live,
			DeliveryMode::Manual => Delivery::Manual,
		}
	}
}

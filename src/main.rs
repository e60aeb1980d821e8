use std::{fs::read_to_string, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use url::Url;

use crate::core::{db::RegistrationDb, proofs::ProofStore, settings::Settings};

mod core;
mod error;
mod web;

#[derive(Parser, Debug)]
#[command(name = "picklereg")]
#[command(version = "0.1")]
#[command(about = "A registration service for local pickleball tournaments.", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: RunType,
}

#[derive(Subcommand, Debug)]
enum RunType {
    /// Create the registration database named in the settings file.
    Init {
        /// Location of the settings file.
        settings_file: PathBuf,
    },

    /// Run the registration server.
    Serve {
        /// Location of the settings file. It names the database file,
        /// the proof storage directory, the public base URL, the roster
        /// password and the per-event category configuration.
        settings_file: PathBuf,
    },
}

fn load_settings(file: &PathBuf) -> anyhow::Result<Settings> {
    Ok(serde_json::from_str::<Settings>(&read_to_string(file)?)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    match &args.command {
        RunType::Init { settings_file } => {
            let settings = load_settings(settings_file)?;
            RegistrationDb::init(&PathBuf::from(&settings.database_file)).await?;
            log::info!("Created registration database at {}", settings.database_file);
            Ok(())
        }
        RunType::Serve { settings_file } => {
            let settings = Arc::new(load_settings(settings_file)?);

            let db = Arc::new(RegistrationDb::load(&PathBuf::from(&settings.database_file)).await?);
            let public_base = Url::parse(&settings.public_base_url)?;
            let proofs = Arc::new(ProofStore::new(
                PathBuf::from(&settings.proof_dir),
                public_base,
            ));

            log::info!(
                "picklereg initialized, serving {} event(s) on port {}",
                settings.events.len(),
                settings.web_port.unwrap_or(28010)
            );

            web::run_http_server(db, proofs, settings).await
        }
    }
}

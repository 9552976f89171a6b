use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use vote_guard::config::{load_config, load_from_env, GuardConfig};
use vote_guard::security::ReputationClassifier;
use vote_guard::token::TokenCodec;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Operator CLI for the vote guard", long_about = None)]
struct Cli {
    /// Guard config file. Defaults plus environment overrides when omitted.
    #[arg(short, long, env = "GUARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint an access token bound to an address
    Issue {
        #[arg(long)]
        ip: String,
    },
    /// Decode and verify an access token
    Inspect {
        #[arg(long)]
        token: String,
        #[arg(long)]
        ip: String,
    },
    /// Run the reputation lookup for an address
    Classify {
        #[arg(long)]
        ip: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config: GuardConfig = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    match cli.command {
        Commands::Issue { ip } => {
            let codec = TokenCodec::from_config(&config.session);
            println!("{}", codec.issue_blocking(&ip).await?);
        }
        Commands::Inspect { token, ip } => {
            let codec = TokenCodec::from_config(&config.session);
            let report = match codec.verify(&token, &ip) {
                Ok(payload) => json!({ "valid": true, "payload": payload }),
                Err(e) => json!({ "valid": false, "error": e.kind(), "detail": e.to_string() }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Classify { ip } => {
            let classifier = ReputationClassifier::from_config(&config.reputation)?;
            let verdict = classifier.classify(&ip).await;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}

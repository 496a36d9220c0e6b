use std::time::Duration;

use clap::{Parser, Subcommand};
use keyward_server::config::loader::load_config;

#[derive(Parser)]
#[command(name = "keyward-server")]
#[command(about = "Issues and verifies RS256 bearer tokens")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = "KEYWARD_CONFIG", default_value = "keyward.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Generate a new signing key and store it
    RotateKeys {
        /// Key lifetime, e.g. "90d" (defaults to auth.signing.key_lifetime)
        #[arg(long, value_parser = parse_duration)]
        lifetime: Option<Duration>,
    },
    /// Print an Argon2 hash for a user seed's password_hash field
    HashPassword {
        password: String,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    keyward_server::observability::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %format!("{e:#}"), "keyward-server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::HashPassword { password }) = &cli.command {
        println!("{}", keyward_server::hash_password(password)?);
        return Ok(());
    }

    let cfg = match load_config(Some(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(path = %cli.config, "Configuration loaded");
    keyward_server::observability::apply_logging_level(&cfg.logging.level);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => keyward_server::run(cfg).await,
        Commands::RotateKeys { lifetime } => {
            let rotated = keyward_server::rotate_keys(&cfg, lifetime).await?;
            println!("{}", rotated.kid);
            Ok(())
        }
        Commands::HashPassword { .. } => Ok(()),
    }
}

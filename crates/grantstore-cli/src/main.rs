mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use grantstore::config::loader::load_config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use output::{print_entity, print_error, print_success, print_ttl};

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    // Prefer RUST_LOG from env, otherwise use the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    if let Some(url) = cli.url.clone() {
        cfg.store.url = Some(url);
    }
    init_tracing(&cfg.logging.level);

    let adapter = grantstore_redis::create_adapter(&cfg.store)
        .await
        .context("Failed to initialize token store")?;

    match &cli.command {
        Commands::Ping => {
            adapter.ping().await?;
            print_success("Store is reachable");
        }
        Commands::Find(args) => {
            let entity = adapter.find(&args.kind, &args.id).await?;
            print_entity(entity, cli.format)?;
        }
        Commands::FindUid { uid } => {
            let entity = adapter.find_by_uid(uid).await?;
            print_entity(entity, cli.format)?;
        }
        Commands::FindUserCode { code } => {
            let entity = adapter.find_by_user_code(code).await?;
            print_entity(entity, cli.format)?;
        }
        Commands::Destroy(args) => {
            adapter.destroy(&args.kind, &args.id).await?;
            print_success(&format!("Destroyed {}:{}", args.kind, args.id));
        }
        Commands::Consume(args) => {
            adapter.consume(&args.kind, &args.id).await?;
            print_success(&format!("Consumed {}:{}", args.kind, args.id));
        }
        Commands::RevokeGrant(args) => {
            adapter.revoke_by_grant_id(&args.grant_id).await?;
            print_success(&format!("Revoked grant {}", args.grant_id));
        }
        Commands::GrantTtl(args) => {
            let ttl = adapter.grant_ttl(&args.grant_id).await?;
            print_ttl(&args.grant_id, ttl);
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "grantstore")]
#[command(about = "Inspect and revoke stored OAuth/OIDC artifacts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to grantstore.toml in the working directory)
    #[arg(short, long, global = true, env = "GRANTSTORE_CONFIG")]
    pub config: Option<String>,

    /// Store URL (overrides config)
    #[arg(short, long, global = true, env = "REDIS_URL")]
    pub url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the store is reachable
    Ping,
    /// Read a record by kind and id (e.g. AccessToken abc123)
    Find(EntityArgs),
    /// Read the record a session uid points at
    FindUid {
        /// Session uid
        uid: String,
    },
    /// Read the record a device flow user code points at
    FindUserCode {
        /// User code
        code: String,
    },
    /// Delete a record
    Destroy(EntityArgs),
    /// Mark a consumable record as consumed
    Consume(EntityArgs),
    /// Delete every record issued under a grant
    RevokeGrant(GrantArgs),
    /// Show the remaining lifetime of a grant index
    GrantTtl(GrantArgs),
}

#[derive(clap::Args)]
pub struct EntityArgs {
    /// Entity kind (e.g. AccessToken, RefreshToken, Session)
    pub kind: String,
    /// Entity id
    pub id: String,
}

#[derive(clap::Args)]
pub struct GrantArgs {
    /// Grant id
    pub grant_id: String,
}

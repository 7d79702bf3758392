use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cedb",
    about = "CoreEngineDB: a two-document JSON store with guarded writes",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Produce a user record with a salted password hash
    HashPassword(HashPasswordArgs),
    /// Show the most recent activity entries
    Activity(ActivityArgs),
    /// Print the ETag of a file
    Fingerprint(FingerprintArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML server configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address, overriding the config file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Data directory, overriding the config file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Accept the legacy hardcoded admin password
    #[arg(long)]
    pub legacy_admin: bool,
}

#[derive(Args)]
pub struct HashPasswordArgs {
    #[arg(long, short)]
    pub username: String,
    /// Read from standard input when omitted
    #[arg(long, short)]
    pub password: Option<String>,
    #[arg(
        long,
        default_value_t = cedb_auth::DEFAULT_ITERATIONS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub iterations: u32,
}

#[derive(Args)]
pub struct ActivityArgs {
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args)]
pub struct FingerprintArgs {
    pub file: PathBuf,
}

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kvdrop_store::CollisionPolicy;

#[derive(Parser)]
#[command(
    name = "kvdrop",
    about = "kvdrop: blobs stored and served under short content identifiers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server on an in-memory store
    Serve(ServeArgs),
    /// Print the identifier and digest of a file
    Id(IdArgs),
    /// Show identifier collision odds for a number of stored blobs
    Odds(OddsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Public base URL used for access URLs
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<CollisionPolicy>,
    /// Gzip blobs at rest
    #[arg(long)]
    pub compress: bool,
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct IdArgs {
    /// File to hash, `-` for stdin
    pub path: String,
}

#[derive(Args)]
pub struct OddsArgs {
    pub blobs: u64,
}

fn parse_policy(s: &str) -> Result<CollisionPolicy, String> {
    s.parse()
}

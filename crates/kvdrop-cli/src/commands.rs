use std::fs::File;
use std::io::{self, Read};

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use kvdrop_crypto::{blobs_for_probability, collision_probability, ContentHasher, IDENTIFIER_SPACE};
use kvdrop_server::{KvdropServer, ServerConfig};
use kvdrop_types::{Digest, Identifier};

use crate::cli::*;

const READ_CHUNK: usize = 64 * 1024;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Id(args) => cmd_id(args, cli.format),
        Command::Odds(args) => cmd_odds(args, cli.format),
    }
}

/// Configuration file values with command-line overrides applied.
fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(base_url) = &args.base_url {
        config.public_base_url = Some(base_url.clone());
    }
    if let Some(policy) = args.policy {
        config.collision_policy = policy;
    }
    if args.compress {
        config.storage.compress = true;
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    config.validate()?;
    debug!(?config, "effective server configuration");
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    println!(
        "{} kvdrop on {}",
        "▶".green().bold(),
        config.bind_addr.to_string().bold()
    );
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(KvdropServer::in_memory(config).serve())?;
    info!("server stopped");
    Ok(())
}

/// Hash `reader` in fixed-size chunks.
fn digest_reader(mut reader: impl Read) -> io::Result<Digest> {
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

fn cmd_id(args: IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let digest = if args.path == "-" {
        digest_reader(io::stdin().lock()).context("reading stdin")?
    } else {
        let file = File::open(&args.path).with_context(|| format!("opening {}", args.path))?;
        digest_reader(file).with_context(|| format!("reading {}", args.path))?
    };
    let id = digest.identifier();
    debug!(path = %args.path, %id, %digest, "hashed input");
    match format {
        OutputFormat::Text => println!(
            "{}  {}",
            id.to_string().yellow().bold(),
            digest.to_hex().dimmed()
        ),
        OutputFormat::Json => println!("{}", id_json(&id, &digest)),
    }
    Ok(())
}

fn id_json(id: &Identifier, digest: &Digest) -> serde_json::Value {
    json!({ "resourceId": id.as_str(), "resourceShasum": digest.to_hex() })
}

fn cmd_odds(args: OddsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let p = collision_probability(args.blobs);
    match format {
        OutputFormat::Text => {
            println!("Identifier space: {} values", IDENTIFIER_SPACE.to_string().bold());
            println!(
                "Collision probability for {} blobs: {}",
                args.blobs.to_string().bold(),
                format!("{:.4}%", p * 100.0).yellow()
            );
            println!("  1% odds at {} blobs", blobs_for_probability(0.01).to_string().cyan());
            println!("  50% odds at {} blobs", blobs_for_probability(0.5).to_string().cyan());
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "blobs": args.blobs,
                "identifierSpace": IDENTIFIER_SPACE,
                "probability": p,
            })
        ),
    }
    Ok(())
}

use std::io::BufRead;

use anyhow::{bail, Context};
use cedb_audit::{AuditEntry, AuditLog};
use cedb_server::{DocServer, ServerConfig};
use cedb_store::Fingerprint;
use chrono::SecondsFormat;
use colored::Colorize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::HashPassword(args) => cmd_hash_password(args, &cli.format),
        Command::Activity(args) => cmd_activity(args, &cli.format),
        Command::Fingerprint(args) => cmd_fingerprint(args, &cli.format),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.legacy_admin {
        config.legacy_admin_fallback = true;
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    if config.legacy_admin_fallback {
        tracing::warn!("legacy admin password fallback is enabled");
    }
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(DocServer::new(config).serve())?;
    Ok(())
}

fn cmd_hash_password(args: HashPasswordArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => read_password_line(std::io::stdin().lock())?,
    };
    let record = cedb_auth::hash_password(&args.username, &password, args.iterations);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        OutputFormat::Text => {
            println!(
                "{} Add this entry to {} in json/config.json:",
                "✓".green().bold(),
                "auth.users".cyan()
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}

fn read_password_line(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password.to_string())
}

fn cmd_activity(args: ActivityArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let log = AuditLog::in_data_dir(&args.data_dir);
    let entries = log
        .try_tail(args.limit)
        .with_context(|| format!("failed to read {}", log.path().display()))?;
    match format {
        OutputFormat::Json => {
            for entry in &entries {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No activity recorded.");
            }
            for entry in &entries {
                println!("{}", render_entry(entry));
            }
        }
    }
    Ok(())
}

fn render_entry(entry: &AuditEntry) -> String {
    let status = entry.status.to_string();
    let status = if entry.success { status.green() } else { status.red() };
    let actor = if entry.actor.is_empty() { "-".dimmed() } else { entry.actor.as_str().cyan() };
    let mut line = format!(
        "{} {} {:<7} {} {}",
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        status,
        entry.method,
        entry.path.as_str().bold(),
        actor,
    );
    if !entry.reason.is_empty() {
        line.push_str(&format!(" {}", entry.reason.as_str().yellow()));
    }
    line
}

fn cmd_fingerprint(args: FingerprintArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let fingerprint = Fingerprint::of(&bytes);
    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "file": args.file,
                "etag": fingerprint.to_hex(),
                "size": bytes.len(),
            });
            println!("{report}");
        }
        OutputFormat::Text => println!("{fingerprint}  {}", args.file.display()),
    }
    Ok(())
}

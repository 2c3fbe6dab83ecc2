use std::path::Path;

use anyhow::Context;
use attest_sdk::{Attest, ContentHash, PrincipalId, SdkError, Verdict};
use attest_server::{AttestServer, ServerConfig};
use chrono::Utc;
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Demo(args) => cmd_demo(config, args, &cli.format).await,
        Command::Sweep(args) => cmd_sweep(config, args, &cli.format).await,
        Command::Config(args) => cmd_config(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    debug!(path = ?path, "loading configuration");
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

async fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.data_dir {
        config.attest.data_dir = Some(dir);
    }
    if let Some(secs) = args.sweep_interval {
        config.sweep_interval_secs = secs;
    }

    let server = AttestServer::new(config)?;
    println!(
        "{} Attest server on {} (writer: {})",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.attest().writer().to_string().cyan()
    );
    match &server.config().attest.data_dir {
        Some(dir) => println!("  Data: {}", dir.display()),
        None => println!("  Records: {}", "in memory".yellow()),
    }
    server.serve().await?;
    Ok(())
}

async fn cmd_demo(config: ServerConfig, args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut attest_config = config.attest;
    attest_config.data_dir = None;
    let attest = Attest::open(attest_config)?;
    let owner = PrincipalId::new("demo-owner")?;
    let text = matches!(format, OutputFormat::Text);

    let upload = attest.upload(owner.clone(), args.content.into_bytes())?;
    if text {
        println!("{} Uploaded record {}", "✓".green().bold(), upload.id.to_string().yellow());
        println!("  Hash: {}", upload.content_hash.to_hex().dimmed());
        if let Some(deadline) = upload.expires_at {
            println!("  Expires: {}", deadline.to_rfc3339());
        }
    }

    let outcome = attest.commit(upload.id, &owner).await?;
    if text {
        println!("{} Committed at {}", "✓".green().bold(), outcome.ledger_ref.to_string().cyan());
    }

    let second = attest.commit(upload.id, &owner).await;
    if text {
        match &second {
            Err(SdkError::AlreadyCommitted(_)) => {
                println!("  Second commit: {}", "already committed".yellow())
            }
            other => println!("  Second commit: {}", format!("{other:?}").red()),
        }
    }

    let verified = attest.verify(upload.id, &owner).await?;
    if text {
        println!("  Verify: {}", paint(verified.verdict));
    }

    attest.log_access(upload.id, &owner, PrincipalId::new("auditor-a")?).await?;
    let report = attest
        .log_access(upload.id, &owner, PrincipalId::new("auditor-b")?)
        .await?;
    if text {
        println!("{} Access history", "✓".green().bold());
        for entry in &report.history {
            println!(
                "  {} {} at {}",
                entry.logged_in.to_string().cyan(),
                entry.accessor.to_string().bold(),
                entry.timestamp.to_rfc3339()
            );
        }
    }

    let tampered = if args.tamper {
        let node = attest
            .ledger_node()
            .context("demo requires the in-process ledger")?;
        node.tamper_document(&upload.content_hash, ContentHash::from_digest([0xAB; 32]))?;
        let result = attest.verify(upload.id, &owner).await?;
        if text {
            println!("  Verify after ledger tamper: {}", paint(result.verdict));
        }
        Some(result.verdict)
    } else {
        None
    };

    attest.delete(upload.id, &owner).await?;
    let after_delete = attest.verify(upload.id, &owner).await;
    let surviving = attest.ledger_history(&upload.content_hash).await?;
    if text {
        println!("{} Deleted local record", "✓".green().bold());
        match after_delete {
            Err(SdkError::NotFound(_)) => println!("  Verify: {}", "not found".yellow()),
            other => println!("  Verify: {}", format!("{other:?}").red()),
        }
        println!(
            "  Ledger still holds {} access entries",
            surviving.len().to_string().bold()
        );
        return Ok(());
    }

    let summary = json!({
        "upload": upload,
        "commit": outcome,
        "second_commit_rejected": matches!(second, Err(SdkError::AlreadyCommitted(_))),
        "verify": verified,
        "access": report,
        "tampered_verdict": tampered,
        "deleted_verify_not_found": matches!(after_delete, Err(SdkError::NotFound(_))),
        "ledger_history_after_delete": surviving,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_sweep(mut config: ServerConfig, args: SweepArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if let Some(dir) = args.data_dir {
        config.attest.data_dir = Some(dir);
    }
    if config.attest.data_dir.is_none() {
        anyhow::bail!("sweep needs a data directory (--data-dir or data_dir in the config file)");
    }

    let attest = Attest::open(config.attest)?;
    let report = attest.sweep(Utc::now()).await?;
    info!(reaped = report.reaped, failed = report.failed, "manual sweep finished");
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "examined": report.examined,
                "reaped": report.reaped,
                "skipped": report.skipped,
                "failed": report.failed,
            })
        ),
        OutputFormat::Text => println!(
            "{} Sweep: {} examined, {} reaped, {} skipped, {} failed",
            "✓".green(),
            report.examined,
            report.reaped.to_string().bold(),
            report.skipped,
            report.failed
        ),
    }
    Ok(())
}

fn cmd_config(config: ServerConfig, args: ConfigArgs) -> anyhow::Result<()> {
    let mut shown = if args.defaults {
        ServerConfig::default()
    } else {
        config
    };
    if shown.attest.writer_key.is_some() {
        shown.attest.writer_key = Some("[REDACTED]".into());
    }
    print!("{}", shown.to_toml_string()?);
    Ok(())
}

fn paint(verdict: Verdict) -> colored::ColoredString {
    match verdict {
        Verdict::Verified => verdict.to_string().green().bold(),
        Verdict::LocalTamperDetected | Verdict::LedgerMismatch => verdict.to_string().red().bold(),
    }
}

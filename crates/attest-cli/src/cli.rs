use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "attest",
    about = "Attest: content-addressed records committed to an append-only ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server and the expiry sweep scheduler
    Serve(ServeArgs),
    /// Run the record lifecycle against an in-memory ledger
    Demo(DemoArgs),
    /// Delete expired uncommitted records in a data directory once
    Sweep(SweepArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Directory for records and the ledger journal (needs writer_key in the config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Seconds between expiry sweeps (0 disables)
    #[arg(long)]
    pub sweep_interval: Option<u64>,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Content to upload
    #[arg(default_value = "quarterly report v1")]
    pub content: String,
    /// Also tamper with the ledger record to show a mismatch
    #[arg(long)]
    pub tamper: bool,
}

#[derive(Args)]
pub struct SweepArgs {
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the loaded file
    #[arg(long)]
    pub defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["attest", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(args.data_dir.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["attest", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_demo_defaults() {
        let cli = Cli::try_parse_from(["attest", "demo"]).unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.content, "quarterly report v1");
            assert!(!args.tamper);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_demo_tamper() {
        let cli = Cli::try_parse_from(["attest", "demo", "hello", "--tamper"]).unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.content, "hello");
            assert!(args.tamper);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_sweep() {
        let cli = Cli::try_parse_from(["attest", "sweep", "--data-dir", "/tmp/a"]).unwrap();
        if let Command::Sweep(args) = cli.command {
            assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/a")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_config() {
        let cli = Cli::try_parse_from(["attest", "config", "-c", "attest.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("attest.toml")));
        assert!(matches!(cli.command, Command::Config(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["attest", "--verbose", "demo"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["attest", "--format", "json", "demo"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}

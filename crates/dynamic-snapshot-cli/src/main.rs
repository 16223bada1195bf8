mod generator;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dynamic_snapshot_config::SnapshotConfig;
use dynamic_snapshot_engine::{DynamicSnapshot, Outcome, SnapshotError, SnapshotId};
use generator::{GenerateError, Generator};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Debug, Parser)]
#[command(
    name = "dynamic-snapshot",
    version,
    about = "Snapshot testing for output with values that change between runs."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a snapshot test scaffold.
    ///
    /// `generate UserEmails` or `generate acceptance UserEmails`.
    Generate {
        /// Suite name, or the snapshot name when it is the only argument.
        #[arg(required = true)]
        suite: String,
        /// Name of the snapshot.
        name: Option<String>,
        /// Directory the `Snapshot/` tree is created in.
        #[arg(long, default_value = "tests/support")]
        support_dir: PathBuf,
    },
    /// Record data as the snapshot, replacing a stored one that differs.
    Record(SnapshotArgs),
    /// Check data against the stored snapshot, recording it if none exists.
    Check(SnapshotArgs),
}

#[derive(Debug, Args)]
struct SnapshotArgs {
    /// Snapshot id, such as `acceptance/UserEmails`.
    id: String,
    /// Read the data from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Config file to use instead of ./dynamic-snapshot.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Plain substitution, added to those from the config file.
    #[arg(long = "substitute", value_name = "KEY=VALUE", value_parser = parse_substitution)]
    substitutions: Vec<(String, String)>,
    /// Strict (whole word) substitution, added to those from the config file.
    #[arg(long = "strict", value_name = "KEY=VALUE", value_parser = parse_substitution)]
    strict_substitutions: Vec<(String, String)>,
}

fn parse_substitution(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Generate {
            suite,
            name,
            support_dir,
        } => generate(suite, name, support_dir),
        Command::Record(args) => snapshot(args, true),
        Command::Check(args) => snapshot(args, false),
    }
}

fn generate(suite: String, name: Option<String>, support_dir: PathBuf) -> Result<i32> {
    let (suite, name) = match name {
        Some(name) => (Some(suite), name),
        None => (None, suite),
    };

    let generated = Generator::new(support_dir).produce(suite.as_deref(), &name)?;
    println!("{}", generated.path.display());

    match generated.create_file() {
        Ok(()) => {
            println!(
                "DynamicSnapshot {} was created in {}",
                generated.id,
                generated.path.display()
            );
            Ok(0)
        }
        Err(e @ GenerateError::AlreadyExists(_)) => {
            eprintln!("{e}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SnapshotConfig> {
    match path {
        Some(path) => SnapshotConfig::load_from_path(path)?
            .with_context(|| format!("Config file not found: {}", path.display())),
        None => Ok(SnapshotConfig::load()?),
    }
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input from {}", path.display())),
        None => io::read_to_string(io::stdin()).context("Failed to read input from stdin"),
    }
}

fn snapshot(args: SnapshotArgs, refresh: bool) -> Result<i32> {
    let config = load_config(args.config.as_ref())?;
    let data = read_input(args.input.as_ref())?;
    let id = SnapshotId::new(&args.id)?;
    log::info!("Using snapshot directory {}", config.snapshot_dir.display());

    let store = config.open_store()?;
    let mut snapshot =
        DynamicSnapshot::new(id, store, move || Ok::<_, anyhow::Error>(data.clone()));
    config.apply(&mut snapshot)?;
    snapshot.set_substitutions(args.substitutions)?;
    snapshot.set_strict_substitutions(args.strict_substitutions)?;
    if refresh {
        snapshot.should_refresh_snapshot(true);
    }

    match snapshot.assert_snapshot() {
        Ok(Outcome::Captured) => {
            println!("Recorded snapshot {}", snapshot.id());
            Ok(0)
        }
        Ok(Outcome::Matched) => {
            println!("Snapshot {} matches", snapshot.id());
            Ok(0)
        }
        Err(SnapshotError::Mismatch(mismatch)) => {
            eprintln!("{mismatch}");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

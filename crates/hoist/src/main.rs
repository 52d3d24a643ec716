use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use hoist::{Config, FsResolver, bundle};

/// Bundle JavaScript modules into a single scope-hoisted program
#[derive(Debug, Parser)]
#[command(name = "hoist", version, about)]
struct Cli {
    /// Entry modules, bundled in the given order
    #[arg(required = true)]
    entries: Vec<PathBuf>,

    /// Write the bundle to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file layered over the discovered ones
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Entries are path specifiers relative to the working directory
fn entry_specifier(path: &Path) -> String {
    let text = path.to_string_lossy();
    if path.is_absolute() || text.starts_with("./") || text.starts_with("../") {
        text.into_owned()
    } else {
        format!("./{text}")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    debug!("Using configuration {config:?}");
    let resolver = FsResolver::from_config(&config)?;

    let specifiers: Vec<String> = cli
        .entries
        .iter()
        .map(PathBuf::as_path)
        .map(entry_specifier)
        .collect();
    let entries: Vec<&str> = specifiers.iter().map(String::as_str).collect();
    let output = bundle(&entries, resolver, &config)?;

    match &cli.output {
        Some(path) => fs::write(path, &output)
            .with_context(|| format!("Failed to write bundle to {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(output.as_bytes())
            .context("Failed to write bundle to stdout")?,
    }
    Ok(())
}

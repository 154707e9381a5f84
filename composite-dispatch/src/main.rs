//! Composite Dispatch Generator Binary
//!
//! Run with: `make-composite-dispatch [OPTIONS] <MODULE>...`

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use composite_dispatch::{Config, Coordinate, Generator, SymbolLoader};

#[derive(Parser)]
#[command(name = "make-composite-dispatch")]
#[command(about = "Generates the GIMP compositing dispatch table from implementation modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Modules to merge, lowest priority first
    #[arg(value_name = "MODULE")]
    modules: Vec<PathBuf>,

    /// Directory receiving the generated files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Configuration file path (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Prefix in front of every implementation symbol
    #[arg(long, global = true)]
    symbol_prefix: Option<String>,

    /// Program used to list module symbols
    #[arg(long, global = true)]
    nm: Option<String>,

    /// Read modules as symbol listings instead of running nm
    #[arg(long, global = true)]
    listing: bool,

    /// Compare against existing files instead of writing them
    #[arg(long)]
    check: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration
    Config,
    /// Print the merged table as JSON
    Table {
        /// Modules to merge, lowest priority first
        #[arg(value_name = "MODULE", required = true)]
        modules: Vec<PathBuf>,
    },
}

/// One populated cell in the `table` dump.
#[derive(Serialize)]
struct TableEntry<'a> {
    coordinate: String,
    #[serde(flatten)]
    cell: Coordinate,
    implementation: &'a str,
    module: &'a str,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Some(Commands::Config) => {
            print!("{}", Config::default().to_toml());
            return Ok(());
        }
        Some(Commands::Table { modules }) => {
            return print_table(&cli, modules);
        }
        None => {}
    }

    if cli.modules.is_empty() {
        anyhow::bail!("at least one module is required");
    }

    let generator = build_generator(&cli)?;
    let generation = generator
        .generate(&cli.modules)
        .context("Failed to generate dispatch table")?;

    if cli.check {
        let stale = generation.stale_files(&cli.output_dir, generator.config());
        for path in &stale {
            println!("{}", path.display());
        }
        if !stale.is_empty() {
            info!("{} generated files are out of date", stale.len());
            std::process::exit(1);
        }
        info!("Generated files are up to date");
        return Ok(());
    }

    generation
        .write_to(&cli.output_dir, generator.config())
        .with_context(|| format!("Failed to write into {}", cli.output_dir.display()))?;

    Ok(())
}

fn build_generator(cli: &Cli) -> Result<Generator> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    // Override with CLI options
    if let Some(prefix) = &cli.symbol_prefix {
        config.symbol_prefix = prefix.clone();
    }
    if let Some(program) = &cli.nm {
        config.nm.program = program.clone();
    }

    let loader = if cli.listing {
        SymbolLoader::Listing {
            strip_leading_underscore: config.nm.strip_leading_underscore,
        }
    } else {
        SymbolLoader::Nm(config.nm.clone())
    };

    Ok(Generator::with_loader(config, loader))
}

fn print_table(cli: &Cli, modules: &[PathBuf]) -> Result<()> {
    let generator = build_generator(cli)?;
    let generation = generator
        .generate(modules)
        .context("Failed to build dispatch table")?;

    let entries: Vec<TableEntry<'_>> = generation
        .master
        .iter()
        .map(|(coord, selection)| TableEntry {
            coordinate: coord.to_string(),
            cell: coord,
            implementation: &selection.implementation,
            module: generation.modules[selection.module].id.ident(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

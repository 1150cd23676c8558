//! CLI binary: folds the address-dump ingestion, known-names persistence,
//! and campaign recipes into one executable, per spec §9's "External native
//! library + script glue" redesign note — no separate C-ABI library, no
//! Python orchestration scripts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use collider::address_dump::{self, Segment};
use collider::config::{FileConfig, ResolvedConfig};
use collider::known_names::KnownNames;
use collider::recipe::{builtin_recipes, RecipeDefaults};
use collider::{Campaign, CancellationToken, Target};

#[derive(Parser)]
#[command(name = "collider", about = "Brute-force Adler-32/SHA-256 collision search for stripped-binary symbol recovery")]
struct Cli {
    /// Optional TOML file overriding the built-in defaults (overridden in
    /// turn by any flag given below).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a built-in recipe, or an ad-hoc JSON part list, against an
    /// address dump and merge any confirmed names into the known-names file.
    Run {
        #[arg(long)]
        addresses: Option<PathBuf>,
        #[arg(long)]
        known: Option<PathBuf>,
        /// Name of a built-in recipe ("ctor", "dtor"). Mutually exclusive
        /// with `--parts`.
        #[arg(long)]
        recipe: Option<String>,
        /// Ad-hoc parts as a JSON array of arrays of strings, one inner
        /// array per position. Mutually exclusive with `--recipe`.
        #[arg(long)]
        parts: Option<PathBuf>,
        #[arg(long)]
        num_threads: Option<usize>,
        #[arg(long)]
        batch_size: Option<u64>,
        #[arg(long)]
        lookup_size: Option<u64>,
    },
    /// Parse an address dump and print per-segment record counts, without
    /// running a search.
    Inspect {
        #[arg(long)]
        addresses: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] collider::config::ConfigError),
    #[error(transparent)]
    Engine(#[from] collider::EngineError),
    #[error(transparent)]
    KnownNames(#[from] collider::known_names::CollaboratorError),
    #[error(transparent)]
    AddressDump(#[from] collider::address_dump::CollaboratorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no such recipe {0:?}; known recipes: {1}")]
    UnknownRecipe(String, String),
    #[error("recipe {0:?} has nothing to search yet (no matching known names)")]
    RecipeHasNoWork(String),
    #[error("specify exactly one of --recipe or --parts")]
    AmbiguousPartsSource,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = run_cli(cli);
    if let Err(e) = &result {
        error!("{e}");
    }
    exit_code_for(&result)
}

/// 0 on success, non-zero on any `CliError` (malformed input, oversize
/// lookup, engine failure) — spec §6's "Exit behavior of wrapper tools".
fn exit_code_for(result: &Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn resolved_config(cli_config: &Option<PathBuf>) -> Result<ResolvedConfig, CliError> {
    let mut resolved = ResolvedConfig::default();
    if let Some(path) = cli_config {
        let file = FileConfig::load(path)?;
        resolved = resolved.with_file(&file);
    }
    Ok(resolved)
}

fn run_cli(cli: Cli) -> Result<(), CliError> {
    let mut config = resolved_config(&cli.config)?;

    match cli.command {
        Command::Inspect { addresses } => {
            if let Some(addresses) = addresses {
                config.address_dump_path = addresses;
            }
            inspect(&config)
        }
        Command::Run { addresses, known, recipe, parts, num_threads, batch_size, lookup_size } => {
            if let Some(addresses) = addresses {
                config.address_dump_path = addresses;
            }
            if let Some(known) = known {
                config.known_names_path = known;
            }
            if let Some(n) = num_threads {
                config.num_threads = n;
            }
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            if let Some(n) = lookup_size {
                config.lookup_size = n;
            }
            run_search(&config, recipe, parts)
        }
    }
}

fn inspect(config: &ResolvedConfig) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&config.address_dump_path)?;
    let records = address_dump::parse(&json)?;

    let code = records.iter().filter(|r| r.segment == Segment::Code).count();
    let rdata = records.iter().filter(|r| r.segment == Segment::ReadOnlyData).count();
    let data = records.iter().filter(|r| r.segment == Segment::ReadWriteData).count();

    println!("{} address records", records.len());
    println!("  code (0001):            {code}");
    println!("  read-only data (0002):  {rdata}");
    println!("  read-write data (0003): {data}");
    Ok(())
}

fn run_search(config: &ResolvedConfig, recipe_name: Option<String>, parts_path: Option<PathBuf>) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&config.address_dump_path)?;
    let records = address_dump::parse(&json)?;
    let mut known = KnownNames::load(&config.known_names_path)?;

    let defaults = RecipeDefaults {
        num_threads: config.num_threads,
        batch_size: config.batch_size,
        lookup_size: config.lookup_size,
    };

    let campaign = match (recipe_name, parts_path) {
        (Some(name), None) => {
            let recipes = builtin_recipes();
            let recipe = recipes
                .iter()
                .find(|r| r.name() == name)
                .ok_or_else(|| {
                    let known_names = recipes.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ");
                    CliError::UnknownRecipe(name.clone(), known_names)
                })?;
            recipe
                .build(&records, &known, defaults)
                .ok_or(CliError::RecipeHasNoWork(name))??
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            let raw_parts: Vec<Vec<String>> = serde_json::from_str(&text)?;
            let parts = raw_parts
                .into_iter()
                .map(|part| part.into_iter().map(String::into_bytes).collect())
                .collect();
            let targets = known.filter_unknown(&records.iter().map(|r| r.target).collect::<Vec<Target>>());
            Campaign::new(targets, parts, defaults.num_threads, defaults.batch_size, defaults.lookup_size)?
        }
        _ => return Err(CliError::AmbiguousPartsSource),
    };

    info!(targets = campaign.targets().len(), parts = campaign.parts().len(), "starting campaign");

    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("interrupt received, stopping at next batch boundary");
            cancellation.cancel();
        }) {
            error!("failed to install Ctrl+C handler: {e}");
        }
    }

    let outcome = collider::run(&campaign, &cancellation)?;
    for result in &outcome.results {
        println!("{}", String::from_utf8_lossy(result));
    }
    info!(confirmed = outcome.results.len(), cancelled = outcome.cancelled, "campaign finished");

    known.merge_confirmed(&outcome.results);
    known.save(&config.known_names_path)?;

    Ok(())
}

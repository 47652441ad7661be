//! `pybin` command-line front end

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pybin_core::{AppConfig, DerivationCache, DeriveError, Snippet};
use pybin_store::ContentHash;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Exit code for unknown snippets or strategies
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_FAILURE: u8 = 1;

fn cli() -> Command {
    Command::new("pybin")
        .version(pybin_core::VERSION)
        .about("Python snippet store with cached formatter output")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Store root directory (overrides config)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("save")
                .about("Store a snippet and print its address")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Python source file"),
                )
                .arg(Arg::new("name").long("name").help("Display name (defaults to file name)"))
                .arg(Arg::new("owner").long("owner").help("Owning user"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the snippet record as JSON"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a snippet, optionally formatted")
                .arg(Arg::new("address").required(true).help("Content address (hex)"))
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .short('s')
                        .help("Formatter strategy to apply"),
                ),
        )
        .subcommand(Command::new("strategies").about("List registered formatter strategies"))
        .subcommand(Command::new("check").about("Build the registry and run startup health checks"))
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(root) = matches.get_one::<PathBuf>("root") {
        config = config.with_store_root(root);
    }
    Ok(config)
}

async fn save(cache: &DerivationCache, args: &ArgMatches) -> Result<()> {
    let file = args
        .get_one::<PathBuf>("file")
        .context("missing source file")?;
    let code = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let name = match args.get_one::<String>("name") {
        Some(name) => name.clone(),
        None => file
            .file_name()
            .map_or_else(|| "snippet".to_string(), |n| n.to_string_lossy().into_owned()),
    };
    let owner = args.get_one::<String>("owner").map(String::as_str);

    let snippet = Snippet::create(cache, &name, owner, &code).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&snippet)?);
    } else {
        println!("{}", snippet.address());
        println!("sha256: {}", snippet.digests.sha256);
    }
    Ok(())
}

async fn show(cache: &DerivationCache, args: &ArgMatches) -> Result<()> {
    let raw = args.get_one::<String>("address").context("missing address")?;
    let address = ContentHash::from_str(raw).with_context(|| format!("invalid address '{raw}'"))?;
    let strategy = args.get_one::<String>("strategy").map(String::as_str);

    let bytes = cache.derive(&address, strategy).await?;
    std::io::stdout().lock().write_all(&bytes)?;
    tracing::debug!(stats = ?cache.stats(), "done");
    Ok(())
}

fn strategies(cache: &DerivationCache) {
    for strategy in cache.registry().iter() {
        println!("{:<16} {}", strategy.name(), strategy.mode());
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let cache = DerivationCache::open(&config)
        .await
        .context("starting pybin")?;

    match matches.subcommand() {
        Some(("save", args)) => save(&cache, args).await,
        Some(("show", args)) => show(&cache, args).await,
        Some(("strategies", _)) => {
            strategies(&cache);
            Ok(())
        }
        Some(("check", _)) => {
            println!(
                "ok: {} strategies healthy ({})",
                cache.registry().len(),
                cache.strategy_names().into_iter().collect::<Vec<_>>().join(", ")
            );
            Ok(())
        }
        _ => unreachable!("subcommand is required"),
    }
}

/// Process exit status for a failed run
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DeriveError>() {
        Some(e) if e.is_not_found() => EXIT_NOT_FOUND,
        _ => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let status = exit_status(&err);
            if status == EXIT_NOT_FOUND {
                eprintln!("not found: {err}");
            } else {
                eprintln!("Error: {err:?}");
            }
            ExitCode::from(status)
        }
    }
}

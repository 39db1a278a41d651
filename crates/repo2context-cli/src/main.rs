#![deny(unsafe_code)]

//! repo2context CLI: pack a repository into one Markdown context document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use repo2context_config::{AppConfig, CONFIG_FILE_NAME};
use repo2context_core::build_info;
use repo2context_core::{ApiKey, ContextEngine, OutputTarget, Polarity, RunStatus};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for fatal errors and invalid arguments or configuration.
const EXIT_FATAL: u8 = 2;

/// repo2context: assemble a repository into a token-budgeted Markdown document.
#[derive(Parser)]
#[command(name = "repo2context", version, about, long_about = None)]
struct Cli {
    /// Repository root to scan.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output file or directory (`-` for stdout). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: `<PATH>/repo2context.toml` if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra ignore file; may be repeated.
    #[arg(long = "rules", value_name = "FILE")]
    rules: Vec<PathBuf>,

    /// Token budget for the whole document.
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Model whose tokenizer counts tokens.
    #[arg(long)]
    model: Option<String>,

    /// Only include files with these extensions (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "EXT")]
    only: Vec<String>,

    /// Exclude paths matching a gitignore-style pattern; may be repeated.
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Re-include paths matching a pattern; may be repeated.
    #[arg(long, value_name = "PATTERN")]
    include: Vec<String>,

    /// Skip files that do not fit instead of truncating them.
    #[arg(long)]
    no_truncate: bool,

    /// Summarize files that do not fit using the configured provider.
    #[arg(long)]
    summary: bool,

    /// Do not read the root `.gitignore`.
    #[arg(long)]
    no_gitignore: bool,

    /// List ignored entries in the file tree.
    #[arg(long)]
    show_ignored: bool,

    /// Add a generation timestamp to the document.
    #[arg(long)]
    timestamp: bool,

    /// Print the resolved configuration and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let (cli, matches) = parse_cli();

    match run(cli, &matches).await {
        Ok(status) => ExitCode::from(status.exit_code() as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Parse arguments with the build metadata in `--version`.
fn parse_cli() -> (Cli, ArgMatches) {
    let version: &'static str = Box::leak(build_info::version_string().into_boxed_str());
    let matches = Cli::command().version(version).get_matches();
    match Cli::from_arg_matches(&matches) {
        Ok(cli) => (cli, matches),
        Err(e) => e.exit(),
    }
}

async fn run(cli: Cli, matches: &ArgMatches) -> Result<RunStatus> {
    let mut config = load_config(cli.config.as_deref(), &cli.path).await?;
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("invalid configuration after applying command-line flags")?;

    init_tracing(cli.verbose, &config.logging.level);

    if cli.print_config {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
        return Ok(RunStatus::Complete);
    }

    let api_key = if config.summary.enabled {
        let var = config.summary.api_key_env();
        let key = ApiKey::from_env(var);
        if key.is_none() {
            debug!(var, "No summary API key in environment");
        }
        key
    } else {
        None
    };

    let target = OutputTarget::from_path(config.output.path.as_deref());
    info!(root = %cli.path.display(), "Assembling repository context");

    let output = ContextEngine::new(&cli.path, config)
        .with_overrides(ordered_overrides(matches))
        .with_api_key(api_key)
        .run()
        .await?;

    target.write(&output.markdown)?;

    for diagnostic in &output.diagnostics {
        warn!("{diagnostic}");
    }

    Ok(output.status())
}

/// `--config` if given, else `<root>/repo2context.toml` when present, else
/// defaults.
async fn load_config(explicit: Option<&Path>, root: &Path) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let candidate = root.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        AppConfig::load(&candidate)
            .await
            .with_context(|| format!("failed to load config {}", candidate.display()))
    } else {
        Ok(AppConfig::default())
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(ref output) = cli.output {
        config.output.path = Some(output.clone());
    }
    config.filter.ignore_files.extend(cli.rules.iter().cloned());
    if let Some(max_tokens) = cli.max_tokens {
        config.budget.max_tokens = max_tokens;
    }
    if let Some(ref model) = cli.model {
        config.budget.model = model.clone();
    }
    if !cli.only.is_empty() {
        config.filter.only_extensions = cli.only.clone();
    }
    if cli.no_truncate {
        config.budget.truncate = false;
    }
    if cli.summary {
        config.summary.enabled = true;
    }
    if cli.no_gitignore {
        config.filter.respect_gitignore = false;
    }
    if cli.show_ignored {
        config.filter.show_ignored = true;
    }
    if cli.timestamp {
        config.output.timestamp = true;
    }
}

/// `--exclude` and `--include` values in the order they appeared on the
/// command line, so a later flag overrides an earlier one.
fn ordered_overrides(matches: &ArgMatches) -> Vec<(String, Polarity)> {
    let mut overrides: Vec<(usize, String, Polarity)> = Vec::new();
    for (id, polarity) in [("exclude", Polarity::Exclude), ("include", Polarity::Include)] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            overrides.extend(
                indices
                    .zip(values)
                    .map(|(index, value)| (index, value.clone(), polarity)),
            );
        }
    }
    overrides.sort_by_key(|(index, _, _)| *index);
    overrides
        .into_iter()
        .map(|(_, pattern, polarity)| (pattern, polarity))
        .collect()
}

/// Logs go to stderr so stdout stays clean for the document.
fn init_tracing(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reporecon::analyze::Analyzer;
use reporecon::config::Config;
use reporecon::github::normalize_url;
use reporecon::keyring;
use reporecon::server::{self, AppState};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "reporecon",
    about = "Architectural analysis of GitHub repositories from their README",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one repository and print the result as JSON
    Analyze(AnalyzeArgs),

    /// Serve the analysis API over HTTP
    Serve(ServeArgs),

    /// Store the Gemini API key
    Setup(SetupArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Repository URL, e.g. https://github.com/owner/repo
    url: String,

    /// Character budget for the README sent to the model
    #[arg(long)]
    max_chars: Option<usize>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on (defaults to the configured bind address)
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args, Debug)]
struct SetupArgs {
    /// Gemini API key
    #[arg(long)]
    api_key: String,

    /// Write the key to the config file instead of the system keychain
    #[arg(long)]
    config_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Serve(args) => run_serve(args).await,
        Commands::Setup(args) => run_setup(args),
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = Config::load();
    if let Some(max_chars) = args.max_chars {
        config.max_readme_chars = max_chars;
    }
    let analyzer = Analyzer::from_config(&config)?;

    let result = analyzer
        .analyze(&normalize_url(&args.url))
        .await
        .with_context(|| format!("Analysis of {} failed", args.url.trim()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = Config::load();
    let bind = args.bind.unwrap_or_else(|| config.bind.clone());
    let analyzer = Analyzer::from_config(&config)?;

    let state = Arc::new(AppState {
        analyzer: Arc::new(analyzer),
        request_timeout: config.request_timeout(),
    });
    server::serve(&bind, state)
        .await
        .with_context(|| format!("Failed to serve on {}", bind))
}

fn run_setup(args: SetupArgs) -> Result<()> {
    let key = args.api_key.trim();
    if key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    if args.config_file {
        // file values only, so environment overrides are not persisted
        let mut config = Config::config_path()
            .map(|path| Config::load_from(&path))
            .unwrap_or_default();
        config.api_key = Some(key.to_string());
        let path = config.save()?;
        log::info!("Saved API key to {}", path.display());
        return Ok(());
    }

    keyring::set_api_key(key)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to store API key in the system keychain (try --config-file)")?;
    log::info!("Saved API key to the system keychain");
    Ok(())
}

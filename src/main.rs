use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use usesgraph::config::{default_home, get_store_path, load_config, save_config, UsesGraphConfig};
use usesgraph::fetch::{DefaultFetcher, GithubFetcher};
use usesgraph::history::HistoryTracker;
use usesgraph::resolution::TraversalContext;
use usesgraph::scanner::{ScanReport, Scanner};
use usesgraph::store::{ArtifactStore, SqliteStore};

/// Resolve and cache the actions and reusable workflows CI pipelines depend on.
#[derive(Parser)]
#[command(
    name = "usesgraph",
    about = "Resolve and cache the `uses:` dependencies of CI workflows"
)]
struct Cli {
    /// Directory holding the configuration and the store
    #[arg(long, global = true)]
    home: Option<String>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration and create the store
    Init,
    /// Resolve the workflows of repositories checked out locally
    ScanLocal {
        /// Repository roots
        #[arg(required = true)]
        paths: Vec<String>,
        /// Only scan these workflow files (name or glob, repeatable)
        #[arg(short, long = "workflow")]
        workflows: Vec<String>,
    },
    /// Resolve the workflows of a remote repository
    ScanRepo {
        /// Repository as owner/repo
        repo: String,
        /// Git ref to scan (default: the repository's default branch)
        #[arg(long = "ref")]
        git_ref: Option<String>,
        /// Only scan these workflow files (name or glob, repeatable)
        #[arg(short, long = "workflow")]
        workflows: Vec<String>,
    },
    /// Show store statistics
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Print a stored workflow or action
    Show {
        /// Object key (canonical path)
        key: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// List sources already fully scanned
    History,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> usesgraph::errors::Result<()> {
    let home = cli.home.map(PathBuf::from).unwrap_or_else(default_home);
    let config = load_config(&home)?;

    match cli.command {
        Commands::Init => {
            save_config(&home, &config)?;
            SqliteStore::initialize(&get_store_path(&home))?;
            println!("Initialized usesgraph at {}", home.display());
        }
        Commands::ScanLocal { paths, workflows } => {
            let store = SqliteStore::initialize(&get_store_path(&home))?;
            let fetcher = DefaultFetcher::new(github_fetcher(&config));
            let scanner = Scanner::new(&store, &fetcher, config);
            let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
            let report = scanner.scan_local(&TraversalContext::new(), &paths, &workflows)?;
            print_report(&report);
        }
        Commands::ScanRepo {
            repo,
            git_ref,
            workflows,
        } => {
            let store = SqliteStore::initialize(&get_store_path(&home))?;
            let fetcher = DefaultFetcher::new(github_fetcher(&config));
            let scanner = Scanner::new(&store, &fetcher, config);
            let report = scanner.scan_repo(
                &TraversalContext::new(),
                fetcher.github(),
                &repo,
                git_ref.as_deref(),
                &workflows,
            )?;
            print_report(&report);
        }
        Commands::Status { json } => {
            let store = SqliteStore::open(&get_store_path(&home))?;
            let stats = store.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("usesgraph status");
                println!("  Objects:    {}", stats.object_count);
                println!("    Workflows: {}", stats.workflow_count);
                println!("    Actions:   {}", stats.action_count);
                println!("    Public:    {}", stats.public_count);
                println!("  Pointers:   {}", stats.ref_pointer_count);
                println!("  Scanned:    {}", stats.scanned_sources);
                println!("  Resolved:   {}", stats.resolved_references);
            }
        }
        Commands::Show { key, json } => {
            let store = SqliteStore::open(&get_store_path(&home))?;
            match store.get_object(&key)? {
                Some(object) if json => {
                    println!("{}", serde_json::to_string_pretty(&object)?);
                }
                Some(object) => {
                    println!("{} ({})", object.key, object.metadata.kind.as_str());
                    println!("  url:        {}", object.metadata.url);
                    println!("  visibility: {}", object.metadata.visibility.as_str());
                    println!("  provenance: {}", object.metadata.provenance);
                    println!("  sha256:     {}", object.metadata.content_hash);
                    println!();
                    println!("{}", object.contents);
                }
                None => println!("No object stored under '{}'", key),
            }
        }
        Commands::History => {
            let store = SqliteStore::open(&get_store_path(&home))?;
            for source in HistoryTracker::new(&store).scanned()? {
                println!("{}", source);
            }
        }
    }
    Ok(())
}

fn github_fetcher(config: &UsesGraphConfig) -> GithubFetcher {
    let token = config.token_from_env();
    if token.is_none() {
        warn!(
            variable = %config.token_env,
            "no API token set; requests are unauthenticated and heavily rate limited"
        );
    }
    GithubFetcher::new(config, token)
}

fn print_report(report: &ScanReport) {
    println!(
        "Scanned {} repositories ({} skipped), {} workflows ({} skipped): {} fetched, {} duplicates, {} unsupported in {}ms",
        report.repositories,
        report.repositories_skipped,
        report.workflows,
        report.workflows_skipped,
        report.references.fetched,
        report.references.duplicates,
        report.references.unsupported,
        report.duration_ms
    );
}

//! Incidex CLI: ingredient identity resolution and fact reports.
//!
//! Usage:
//!   incidex resolve --kb ingredients.json <name>...
//!   incidex split "<ingredient list>"
//!   incidex report <name> [--cache-dir path] [--with-epa]

use clap::{Parser, Subcommand};
use incidex::{Aggregator, EpaScilSource, FactCache, FileCache, KnowledgeBase, Matcher};
use incidex::source::DEFAULT_MAX_AGE;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "incidex",
    version,
    about = "Ingredient identity resolution and citation-backed fact reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more ingredient names against a knowledge base
    Resolve {
        /// Path to the knowledge base JSON file
        #[arg(long)]
        kb: PathBuf,
        /// Names to resolve
        #[arg(required = true)]
        names: Vec<String>,
        /// Disable fuzzy matching (exact hits only)
        #[arg(long)]
        exact_only: bool,
    },
    /// Split a combined ingredient-list string into tokens
    Split {
        /// The list text, e.g. "Water, Glycerin; Parfum"
        text: String,
    },
    /// Build a merged, citation-backed fact report for one ingredient
    Report {
        /// Ingredient name to report on
        name: String,
        /// Cache directory (defaults to the platform data dir)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Cache entry lifetime in seconds
        #[arg(long, default_value_t = DEFAULT_MAX_AGE.as_secs())]
        max_age_secs: u64,
        /// Per-source timeout override in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Also consult the EPA Safer Chemical Ingredients List
        #[arg(long)]
        with_epa: bool,
    },
}

fn cmd_resolve(kb_path: &PathBuf, names: &[String], exact_only: bool) -> i32 {
    let kb = match KnowledgeBase::load(kb_path) {
        Ok(kb) => Arc::new(kb),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let matcher = if exact_only {
        Matcher::exact_only(kb)
    } else {
        Matcher::new(kb)
    };

    let results: Vec<_> = names.iter().map(|name| matcher.fuzzy_lookup(name)).collect();
    print_json(&results)
}

fn cmd_split(text: &str) -> i32 {
    print_json(&incidex::split_list(text))
}

async fn cmd_report(
    name: &str,
    cache_dir: Option<&PathBuf>,
    max_age_secs: u64,
    timeout_secs: Option<u64>,
    with_epa: bool,
) -> i32 {
    let max_age = Duration::from_secs(max_age_secs);
    let cache: Arc<dyn FactCache> = match cache_dir {
        Some(dir) => Arc::new(FileCache::new(dir, max_age)),
        None => Arc::new(FileCache::with_default_dir()),
    };

    let mut aggregator = Aggregator::default_stack(Arc::clone(&cache));
    if with_epa {
        aggregator.register(Arc::new(EpaScilSource::new(cache)));
    }
    if let Some(secs) = timeout_secs {
        aggregator = aggregator.with_timeout(Duration::from_secs(secs));
    }

    let report = aggregator.aggregate(name).await;
    print_json(&report)
}

fn print_json(value: &impl serde::Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match &cli.command {
        Commands::Resolve {
            kb,
            names,
            exact_only,
        } => cmd_resolve(kb, names, *exact_only),
        Commands::Split { text } => cmd_split(text),
        Commands::Report {
            name,
            cache_dir,
            max_age_secs,
            timeout_secs,
            with_epa,
        } => {
            cmd_report(
                name,
                cache_dir.as_ref(),
                *max_age_secs,
                *timeout_secs,
                *with_epa,
            )
            .await
        }
    };
    std::process::exit(code);
}

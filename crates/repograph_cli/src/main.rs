//! Repograph CLI - crawl GitHub contributions into Gephi graphs.

mod commands;
mod config;
mod lock;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "repograph")]
#[command(version)]
#[command(about = "Crawl GitHub contributors and repositories into Gephi graphs")]
#[command(
    long_about = "Repograph walks GitHub's REST and GraphQL APIs to collect which users \
contribute to which repositories. Fetches are resumable and wait out rate limits; \
the collected data is turned into a bipartite user/repository graph in Gephi's CSV \
import format, which can be pruned by node degree."
)]
#[command(after_long_help = r#"EXAMPLES
    List public repositories, then fetch their contributors:
        $ repograph rest repositories --limit 5000
        $ repograph rest contributors
        $ repograph rest graph

    Search users with their contributed repositories over GraphQL:
        $ repograph graphql fetch --limit 1000
        $ repograph graphql tables
        $ repograph graphql graph

    Keep users with 5+ repositories and repositories with 3+ contributors:
        $ repograph clean --source results/graphql/gephi \
            --min-repositories-per-user 5 --min-contributors-per-repository 3

    Show the degree distribution of a graph:
        $ repograph degrees --source results/graphql/gephi --plot

    Generate shell completions:
        $ repograph completions bash > ~/.local/share/bash-completion/completions/repograph

CONFIGURATION
    Repograph reads configuration from:
      1. ~/.config/repograph/config.toml (or $XDG_CONFIG_HOME/repograph/config.toml)
      2. ./repograph.toml
      3. Environment variables (REPOGRAPH_* prefix, e.g., REPOGRAPH_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    REPOGRAPH_GITHUB_LOGIN    GitHub account name
    REPOGRAPH_GITHUB_TOKEN    GitHub personal access token
    REPOGRAPH_RESULTS_DIR     Results directory (default: results)
    RUST_LOG                  Log filter when output is not a terminal
"#)]
struct Cli {
    /// Results directory (default from config or "results")
    #[arg(short = 'd', long, global = true, env = "REPOGRAPH_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl through the REST API (repository listing, then contributors)
    Rest {
        #[command(subcommand)]
        action: RestAction,
    },
    /// Crawl through the GraphQL API (user search with contributed repositories)
    Graphql {
        #[command(subcommand)]
        action: GraphqlAction,
    },
    /// Remove low-degree nodes from a graph
    ///
    /// Users with fewer repositories and repositories with fewer contributors
    /// than the thresholds are removed, along with their edges. Nodes left
    /// without edges are removed too. Writes clean_nodes.csv and clean_edges.csv.
    Clean {
        /// Directory holding nodes.csv and edges.csv
        #[arg(short, long)]
        source: PathBuf,

        /// Output directory (default: the source directory)
        #[arg(short = 'o', long)]
        destination: Option<PathBuf>,

        /// Minimum repositories per user (default from config or 10)
        #[arg(short = 'u', long)]
        min_repositories_per_user: Option<usize>,

        /// Minimum contributors per repository (default from config or 10)
        #[arg(short = 'r', long)]
        min_contributors_per_repository: Option<usize>,
    },
    /// Show degree distributions of a graph
    Degrees {
        /// Directory holding nodes.csv and edges.csv
        #[arg(short, long)]
        source: PathBuf,

        /// Read clean_nodes.csv and clean_edges.csv instead
        #[arg(short, long)]
        cleaned: bool,

        /// Draw log-scaled histograms
        #[arg(short, long)]
        plot: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show current GitHub rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by all fetch commands.
#[derive(Debug, Clone, clap::Args)]
struct CommonFetchOptions {
    /// Stop after about this many records (a page may overshoot)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Give up after this many consecutive failed requests (default: retry forever)
    #[arg(short = 'f', long)]
    max_failures: Option<u32>,

    /// Pause requests while the remaining quota is at or below this (default from config or 100)
    #[arg(short = 't', long)]
    quota_threshold: Option<usize>,

    /// Cap outgoing requests per second
    #[arg(short = 'R', long)]
    requests_per_second: Option<u32>,
}

#[derive(Subcommand)]
enum RestAction {
    /// List public repositories into rest/repositories.csv
    Repositories {
        /// Start after this repository id instead of the recorded cursor
        #[arg(short, long)]
        since: Option<u64>,

        #[command(flatten)]
        fetch_opts: CommonFetchOptions,
    },
    /// Fetch contributors of every listed repository
    ///
    /// Reads rest/repositories.csv and appends to rest/users.csv and
    /// rest/contributions.csv. --limit counts repositories.
    Contributors {
        /// Start after this repository id instead of the recorded cursor
        #[arg(short, long)]
        since: Option<u64>,

        /// Contributors requested per repository, at most 100 (default from config or 30)
        #[arg(short = 'p', long)]
        per_page: Option<u32>,

        #[command(flatten)]
        fetch_opts: CommonFetchOptions,
    },
    /// Build rest/gephi/nodes.csv and edges.csv
    Graph,
}

#[derive(Subcommand)]
enum GraphqlAction {
    /// Search users and the repositories they contributed to
    ///
    /// Appends raw user records to graphql/graphql_data.txt and refreshes
    /// graphql/data.json. --limit counts users.
    Fetch {
        /// Start after this search cursor instead of the recorded one
        #[arg(short, long)]
        after: Option<String>,

        /// Users per request, at most 100 (default from config or 20)
        #[arg(short, long)]
        users_per_query: Option<u32>,

        /// Repositories per user, at most 100 (default from config or 20)
        #[arg(short = 'r', long)]
        repositories_per_user: Option<u32>,

        /// User search string (default from config or "type:user")
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Record one cursor per page instead of one per user
        #[arg(long)]
        per_page_cursors: bool,

        #[command(flatten)]
        fetch_opts: CommonFetchOptions,
    },
    /// Convert graphql/data.json into users, repositories and contributions CSVs
    Tables,
    /// Build graphql/gephi/nodes.csv and edges.csv
    Graph,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("repograph=info,repograph_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let mut config = config::Config::load();

    let cli = Cli::parse();
    if let Some(dir) = cli.results_dir {
        config.fetch.results_dir = dir;
    }

    match cli.command {
        Commands::Rest { action } => commands::rest::handle_rest(action, &config).await?,
        Commands::Graphql { action } => commands::graphql::handle_graphql(action, &config).await?,
        Commands::Clean {
            source,
            destination,
            min_repositories_per_user,
            min_contributors_per_repository,
        } => {
            let mut thresholds = config.clean.thresholds();
            if let Some(min) = min_repositories_per_user {
                thresholds.min_repositories_per_user = min;
            }
            if let Some(min) = min_contributors_per_repository {
                thresholds.min_contributors_per_repository = min;
            }
            let destination = destination.unwrap_or_else(|| source.clone());
            commands::clean::handle_clean(&source, &destination, thresholds)?;
        }
        Commands::Degrees {
            source,
            cleaned,
            plot,
            output,
        } => commands::degrees::handle_degrees(&source, cleaned, plot, output)?,
        Commands::Limits { output } => commands::limits::handle_limits(output, &config).await?,
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
        Commands::Man { output } => commands::meta::handle_man(output)?,
    }

    Ok(())
}

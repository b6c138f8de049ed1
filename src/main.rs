//! Starwatch main entry point
//!
//! This is the command-line interface for the Starwatch rank tracker.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use starwatch::client::{RateAwareClient, Sleeper, TokioSleeper};
use starwatch::config::{load_config_with_hash, Config};
use starwatch::diff::{genre_movement, Distance, GenreMovement, DEFAULT_WINDOW_SIZE};
use starwatch::orchestrator::{BatchSettings, Orchestrator, RunSummary};
use starwatch::server::{self, AppState};
use starwatch::storage::{open_storage, SqliteStorage};
use starwatch::ProcessingBudget;
use tracing_subscriber::EnvFilter;

/// Starwatch: a Rising Stars rank tracker
///
/// Starwatch scrapes fiction pages and Rising Stars listings politely,
/// stores metric history and rank snapshots, and shows how fictions move
/// through the ranked lists.
#[derive(Parser, Debug)]
#[command(name = "starwatch")]
#[command(version = "1.0.0")]
#[command(about = "A Rising Stars rank tracker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the invocation server
    Serve,

    /// Scrape one fiction page and print the extracted record
    Fiction {
        /// Fiction id on the site
        id: u64,
    },

    /// Refresh the fictions due for an update
    Fictions {
        /// Maximum number of fictions to refresh
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Capture Rising Stars listings
    RisingStars {
        /// Capture only this genre, even if it is fresh
        #[arg(long)]
        genre: Option<String>,
    },

    /// Show rank movement of a genre between its two latest capture days
    Movement {
        /// Genre slug
        genre: String,

        /// Fiction to centre the view on
        #[arg(long)]
        follow: Option<u64>,

        /// Number of rows in a focused view
        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        size: usize,
    },

    /// Show statistics from the database and exit
    Stats,

    /// Validate config and show what would be scraped
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Serve => {
            let state = AppState::from_config(config, config_hash)?;
            server::serve(state).await?;
        }
        Command::Fiction { id } => handle_fiction(&config, &config_hash, id).await?,
        Command::Fictions { limit } => handle_fictions(&config, &config_hash, limit).await?,
        Command::RisingStars { genre } => {
            handle_rising_stars(&config, &config_hash, genre.as_deref()).await?
        }
        Command::Movement {
            genre,
            follow,
            size,
        } => handle_movement(&config, &genre, follow, size)?,
        Command::Stats => handle_stats(&config)?,
        Command::Check => handle_check(&config, &config_hash),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("starwatch=info,warn"),
            1 => EnvFilter::new("starwatch=debug,info"),
            2 => EnvFilter::new("starwatch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Everything a one-shot batch command needs
struct Batch {
    client: RateAwareClient,
    storage: SqliteStorage,
    sleeper: Arc<dyn Sleeper>,
    settings: BatchSettings,
    budget: ProcessingBudget,
}

impl Batch {
    fn open(config: &Config, config_hash: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        Ok(Self {
            client: RateAwareClient::from_config(config, sleeper.clone())?,
            storage: open_storage(&config.storage)?,
            sleeper,
            settings: BatchSettings::from_config(config, config_hash),
            budget: ProcessingBudget::new(config.budget.max_execution(), config.budget.buffer()),
        })
    }

    fn orchestrator(&mut self) -> Orchestrator<'_, RateAwareClient, SqliteStorage> {
        Orchestrator::new(
            &self.client,
            &mut self.storage,
            self.sleeper.clone(),
            self.settings.clone(),
        )
    }
}

/// Handles `fiction <id>`: scrapes one fiction and prints it as JSON
async fn handle_fiction(
    config: &Config,
    config_hash: &str,
    id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut batch = Batch::open(config, config_hash)?;
    let budget = batch.budget;
    let record = batch.orchestrator().scrape_fiction(id, &budget).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Handles `fictions`: refreshes due fictions
async fn handle_fictions(
    config: &Config,
    config_hash: &str,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut batch = Batch::open(config, config_hash)?;
    let budget = batch.budget;
    let summary = batch.orchestrator().run_fictions(&budget, limit).await?;

    print_summary("Fiction refresh", &summary);
    Ok(())
}

/// Handles `rising-stars`: captures due listings, or one named genre
async fn handle_rising_stars(
    config: &Config,
    config_hash: &str,
    genre: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut batch = Batch::open(config, config_hash)?;
    let budget = batch.budget;
    let summary = batch.orchestrator().run_rising_stars(&budget, genre).await?;

    print_summary("Rising Stars capture", &summary);
    Ok(())
}

fn print_summary(title: &str, summary: &RunSummary) {
    println!("=== {} ===\n", title);
    println!("  Processed: {} / {}", summary.processed_count, summary.total_count);
    println!("  Saved rows: {}", summary.saved_count);
    println!("  Failed: {}", summary.failed_count);
    println!("  Remaining: {}", summary.remaining_count);
    println!("  Time: {}ms", summary.execution_time_ms);
}

/// Handles `movement <genre>`: prints the movement view
fn handle_movement(
    config: &Config,
    genre: &str,
    follow: Option<u64>,
    size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.rising_stars.genres.iter().any(|g| g == genre) {
        return Err(starwatch::StarwatchError::UnknownGenre(genre.to_string()).into());
    }

    let storage = open_storage(&config.storage)?;
    let view = genre_movement(
        &storage,
        genre,
        follow,
        size.max(1),
        config.rising_stars.top_list_size,
    )?;

    print_movement(&view, follow);
    Ok(())
}

fn print_movement(view: &GenreMovement, follow: Option<u64>) {
    println!(
        "=== {} ({} vs {}) ===\n",
        view.genre,
        view.current_day.as_deref().unwrap_or("no data"),
        view.previous_day.as_deref().unwrap_or("first day")
    );

    for record in &view.movements {
        let position = record
            .current_position
            .map(|p| format!("#{:<3}", p))
            .unwrap_or_else(|| " -- ".to_string());
        let change = if record.is_new() {
            "new".to_string()
        } else if record.is_dropped() {
            "dropped".to_string()
        } else {
            match record.delta() {
                Some(0) | None => "=".to_string(),
                Some(d) if d > 0 => format!("+{}", d),
                Some(d) => d.to_string(),
            }
        };
        let marker = if Some(record.fiction_id) == follow { " <" } else { "" };
        println!("  {} {:>8}  {:<8}{}", position, record.fiction_id, change, marker);
    }

    if view.movements.len() < view.total {
        println!("\n  ({} of {} rows shown)", view.movements.len(), view.total);
    }

    match view.distance {
        Some(Distance::OnList { position }) => {
            println!("\nOn the main list at #{}", position)
        }
        Some(Distance::Estimated {
            estimated_position,
            places_to_top,
            anchor_fiction_id,
        }) => println!(
            "\nEstimated main list position #{} ({} places to the top, anchored on {})",
            estimated_position, places_to_top, anchor_fiction_id
        ),
        Some(Distance::Unknown) => println!("\nMain list position unknown"),
        None => {}
    }
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use starwatch::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(&config.storage)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles `check`: shows the validated configuration
fn handle_check(config: &Config, config_hash: &str) {
    println!("=== Starwatch Configuration Check ===\n");

    println!("Site: {}", config.site.base_url);
    println!("Config hash: {}", config_hash);

    println!("\nUser Agent:");
    println!(
        "  {}",
        starwatch::client::user_agent_string(&config.user_agent)
    );
    println!("  Accept-Language: {}", config.user_agent.accept_language);

    println!("\nScraper:");
    println!("  Request delay: {}ms", config.scraper.request_delay_ms);
    println!("  Rate limit cooldown: {}ms", config.scraper.rate_limit_cooldown_ms);
    println!(
        "  Slice sizes: {} fictions, {} genres",
        config.scraper.fiction_slice_size, config.scraper.genre_slice_size
    );
    println!("  Batch limit: {}", config.scraper.batch_limit);

    println!("\nBudget:");
    println!("  Max execution: {}ms", config.budget.max_execution_ms);
    println!("  Buffer: {}ms", config.budget.buffer_ms);

    println!("\nFreshness:");
    println!("  Fiction detail: {}h", config.freshness.fiction_hours);
    println!("  Rank snapshots: {}min", config.freshness.rank_minutes);
    println!("  Retry after failure: {}min", config.freshness.retry_minutes);

    println!("\nGenres ({}):", config.rising_stars.genres.len());
    for genre in &config.rising_stars.genres {
        println!("  - {}", genre);
    }

    println!("\nStorage: {}", config.storage.database_path);
    println!("Server: {}", config.server.addr);

    println!("\n✓ Configuration is valid");
}

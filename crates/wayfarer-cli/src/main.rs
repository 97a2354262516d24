mod activity_cmds;
mod config;
mod generate_cmd;
mod import_cmd;
mod itinerary_cmds;
mod serve_cmd;

use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use wayfarer_core::itinerary::ItineraryFilter;
use wayfarer_core::token::generate_token;
use wayfarer_db::pool;

use config::WayfarerConfig;

#[derive(Parser)]
#[command(name = "wayfarer", about = "Budget-aware trip itinerary planner")]
struct Cli {
    /// Database URL (overrides WAYFARER_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a wayfarer config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/wayfarer")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the wayfarer database (requires config file or env vars)
    DbInit,
    /// Preview a generated schedule (no database required)
    Generate {
        /// Trip destination
        destination: String,
        /// First day of the trip (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the trip (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Total trip budget
        #[arg(long)]
        budget: f64,
        /// Seed for a reproducible schedule
        #[arg(long)]
        seed: Option<u64>,
        /// Print the drafts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Issue a bearer token for a user
    Token {
        /// User ID the token identifies
        user_id: Uuid,
    },
    /// Import itineraries from a legacy JSON export
    Import {
        /// Path to the export file
        file: String,
    },
    /// Itinerary management
    Itinerary {
        #[command(subcommand)]
        command: ItineraryCommands,
    },
    /// Activity management
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Search criteria for `itinerary list`. All given criteria must match.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Destination contains this text (case-insensitive)
    #[arg(long)]
    destination: Option<String>,
    /// Trip ends on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Trip starts on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Budget of at least this amount
    #[arg(long)]
    min_budget: Option<f64>,
    /// Budget of at most this amount
    #[arg(long)]
    max_budget: Option<f64>,
}

impl From<FilterArgs> for ItineraryFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            destination: args.destination,
            from: args.from,
            to: args.to,
            min_budget: args.min_budget,
            max_budget: args.max_budget,
        }
    }
}

#[derive(Subcommand)]
pub enum ItineraryCommands {
    /// List a user's own and public itineraries (public only without --user)
    List {
        #[arg(long)]
        user: Option<Uuid>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show trip counts and total budget for a user's own itineraries
    Stats {
        #[arg(long)]
        user: Uuid,
    },
    /// Show an itinerary with its activities and budget summary
    Show {
        id: Uuid,
        /// Viewing user; needed for private itineraries
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Create an itinerary
    Create {
        /// Owning user
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        destination: String,
        /// First day of the trip (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the trip (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        budget: f64,
        /// Preference tag (repeatable)
        #[arg(long)]
        preference: Vec<String>,
        /// List the itinerary publicly
        #[arg(long)]
        public: bool,
        #[arg(long)]
        notes: Option<String>,
        /// Fill the itinerary with a generated schedule
        #[arg(long)]
        plan: bool,
        /// Seed for a reproducible schedule (with --plan)
        #[arg(long, requires = "plan")]
        seed: Option<u64>,
    },
    /// Replace an itinerary's activities with a freshly generated schedule
    Regenerate {
        id: Uuid,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Delete an itinerary and its activities
    Delete {
        id: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Show estimated cost against budget
    Budget {
        id: Uuid,
        #[arg(long)]
        user: Option<Uuid>,
    },
}

#[derive(Subcommand)]
pub enum ActivityCommands {
    /// List an itinerary's activities in day order
    List { itinerary_id: Uuid },
    /// Replace an itinerary's activities with drafts from a JSON file
    Replace {
        itinerary_id: Uuid,
        #[arg(long)]
        user: Uuid,
        /// JSON array of drafts, or an object with an `activities` array
        file: String,
    },
    /// Delete one activity
    Delete {
        activity_id: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Delete every activity of an itinerary
    Clear {
        itinerary_id: Uuid,
        #[arg(long)]
        user: Uuid,
    },
}

/// Execute the `wayfarer init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
        server: None,
        generation: None,
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    println!();
    println!("Next: run `wayfarer db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `wayfarer db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &WayfarerConfig) -> anyhow::Result<()> {
    println!("Initializing wayfarer database...");

    pool::ensure_database_exists(&resolved.db_config).await?;

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let stats = pool::store_stats(&db_pool).await?;
    println!("Database ready.");
    println!(
        "  itineraries: {} ({} public)",
        stats.itineraries, stats.public_itineraries
    );
    println!("  activities:  {}", stats.activities);

    db_pool.close().await;

    println!("wayfarer db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cli_db_url = cli.database_url.as_deref();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Generate {
            destination,
            start,
            end,
            budget,
            seed,
            json,
        } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let args = generate_cmd::GenerateArgs {
                destination: &destination,
                start_date: start,
                end_date: end,
                budget,
                seed,
                json,
            };
            generate_cmd::run_generate(&resolved.planner(), &args)?;
        }
        Commands::Token { user_id } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let tokens = resolved.require_token_config()?;
            println!("{}", generate_token(tokens, user_id));
        }
        Commands::Import { file } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = import_cmd::run_import(&db_pool, &file).await;
            db_pool.close().await;
            result?;
        }
        Commands::Itinerary { command } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                itinerary_cmds::run_itinerary_command(command, &db_pool, &resolved.planner()).await;
            db_pool.close().await;
            result?;
        }
        Commands::Activity { command } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = activity_cmds::run_activity_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = WayfarerConfig::resolve(cli_db_url)?;
            let tokens = resolved.require_token_config()?.clone();
            let bind = bind.unwrap_or_else(|| resolved.server.bind.clone());
            let port = port.unwrap_or(resolved.server.port);
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState::new(db_pool.clone(), tokens, resolved.planner());
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

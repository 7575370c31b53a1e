//! `moviedb` - command-line front end for the movie store.
//!
//! Opens the SQLite connection pool (failing fast if the database cannot be
//! reached within the connect timeout), builds the [`Models`] registry and
//! runs one subcommand against it. Successful results are printed as JSON.
//!
//! Exit status: `0` success, `1` storage failure, `2` validation failure,
//! `3` not found, `4` edit conflict.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use movies::config;
use movies::{Database, Models, PoolConfig, QueryTimeouts, Runtime, SqliteMovieRepository};

mod commands;

use commands::{CommandError, Envelope, MovieInput, MoviePatch};

/// Top-level CLI arguments.
#[derive(Parser)]
#[command(name = "moviedb", version, about = "Versioned movie record store")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "MOVIEDB_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Maximum open (in-use + idle) connections.
    #[arg(long, default_value_t = config::DEFAULT_MAX_OPEN_CONNS)]
    db_max_open_conns: u32,

    /// Maximum idle connections.
    #[arg(long, default_value_t = config::DEFAULT_MAX_IDLE_CONNS)]
    db_max_idle_conns: u32,

    /// Idle lifetime before a connection is recycled, e.g. `15m` or `1h 30m`.
    #[arg(long, default_value = "15m", value_parser = humantime::parse_duration)]
    db_max_idle_time: Duration,

    /// Budget for opening the pool and pinging the database.
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    db_connect_timeout: Duration,

    /// Deadline for reads.
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
    read_timeout: Duration,

    /// Deadline for inserts, updates and deletes.
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
    write_timeout: Duration,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the database is reachable.
    Ping,
    /// Create a movie.
    Insert {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i32,
        /// Minutes.
        #[arg(long)]
        runtime: i32,
        /// Repeat for each genre.
        #[arg(long = "genre", required = true)]
        genres: Vec<String>,
    },
    /// Print a movie.
    Show { id: i64 },
    /// Change a movie. Omitted fields are left as they are.
    Update {
        id: i64,
        /// Fail with a conflict unless the stored version equals this.
        #[arg(long)]
        expected_version: Option<i32>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        runtime: Option<i32>,
        /// Replaces the whole genre list. Repeat for each genre.
        #[arg(long = "genre")]
        genres: Vec<String>,
    },
    /// Delete a movie.
    Delete { id: i64 },
}

impl Cli {
    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_open_conns: self.db_max_open_conns,
            max_idle_conns: self.db_max_idle_conns,
            max_idle_time: self.db_max_idle_time,
            connect_timeout: self.db_connect_timeout,
        }
    }

    fn timeouts(&self) -> QueryTimeouts {
        QueryTimeouts {
            read: self.read_timeout,
            write: self.write_timeout,
        }
    }
}

fn print_movie(movie: &movies::Movie) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&Envelope { movie })?;
    println!("{json}");
    Ok(())
}

async fn run(
    models: &Models<SqliteMovieRepository>,
    command: Commands,
) -> anyhow::Result<Result<(), CommandError>> {
    let outcome = match command {
        Commands::Ping => {
            println!("ok");
            Ok(())
        }
        Commands::Insert {
            title,
            year,
            runtime,
            genres,
        } => {
            let input = MovieInput {
                title,
                year,
                runtime: Runtime(runtime),
                genres,
            };
            match commands::insert_movie(models, input).await {
                Ok(movie) => print_movie(&movie).map(Ok)?,
                Err(e) => Err(e),
            }
        }
        Commands::Show { id } => match commands::show_movie(models, id).await {
            Ok(movie) => print_movie(&movie).map(Ok)?,
            Err(e) => Err(e),
        },
        Commands::Update {
            id,
            expected_version,
            title,
            year,
            runtime,
            genres,
        } => {
            let patch = MoviePatch {
                title,
                year,
                runtime: runtime.map(Runtime),
                genres: (!genres.is_empty()).then_some(genres),
            };
            match commands::update_movie(models, id, expected_version, patch).await {
                Ok(movie) => print_movie(&movie).map(Ok)?,
                Err(e) => Err(e),
            }
        }
        Commands::Delete { id } => match commands::delete_movie(models, id).await {
            Ok(()) => {
                println!(r#"{{"message": "movie successfully deleted"}}"#);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing with span durations
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = cli.db_path.clone().unwrap_or_else(config::get_db_path);
    tracing::debug!("Using database: {}", db_path.display());

    let db = Database::connect(&db_path, &cli.pool_config())
        .await
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let models = Models::new(&db, cli.timeouts());

    let outcome = run(&models, cli.command).await;
    db.close().await;

    match outcome? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

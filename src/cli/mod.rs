use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::identity::{LocalStorage, OwnerId};
use crate::reminder::LocalClock;
use crate::store::{self, Namespace, SqliteStore};

pub mod commands;

use self::commands::{AddArgs, DoneArgs, ListArgs, MoveArgs, RemindArgs, RemoveArgs};

const LOG_FILE: &str = "todosync.log";

#[derive(Parser, Debug)]
#[command(
    name = "todosync",
    version,
    about = "Terminal to-do list with drag reordering and reminders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over TODOSYNC_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over TODOSYNC_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive list (default)
    Tui,
    /// Append an item
    Add(AddArgs),
    /// Print the list in display order
    List(ListArgs),
    /// Mark an item done (or not done with --undo)
    Done(DoneArgs),
    /// Delete an item
    Rm(RemoveArgs),
    /// Move an item to another position
    Mv(MoveArgs),
    /// Store or clear a reminder time on an item
    Remind(RemindArgs),
}

enum LogSink {
    Stderr,
    File(PathBuf),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    // The local offset can only be read while this is the only thread.
    let clock = LocalClock::detect();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    let sink = match command {
        Commands::Tui => LogSink::File(paths.log_dir.join(LOG_FILE)),
        _ => LogSink::Stderr,
    };
    init_tracing(&cli.log_level, sink)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = Arc::new(loader.load_or_init()?);
    let store = store::init(&config.store.database_path, &config.store)?;
    let owner = OwnerId::load_or_create(&LocalStorage::open(&paths.state_dir))
        .context("resolving local owner")?;
    let ns = Namespace::for_owner(&owner);
    tracing::debug!(namespace = %ns, "item collection resolved");

    let open = |store: SqliteStore, ns: Namespace| commands::open_list(store, ns, &config);
    let output = match command {
        Commands::Tui => {
            let mut app = App::new(config.clone(), store, ns, clock)?;
            return commands::run_tui(&mut app);
        }
        Commands::Add(args) => commands::add_item(&mut open(store, ns)?, args)?,
        Commands::List(args) => commands::list_items(&open(store, ns)?, &args, &clock)?,
        Commands::Done(args) => commands::mark_done(&mut open(store, ns)?, args)?,
        Commands::Rm(args) => commands::remove_item(&mut open(store, ns)?, args)?,
        Commands::Mv(args) => commands::move_item(&mut open(store, ns)?, args)?,
        Commands::Remind(args) => commands::remind(&mut open(store, ns)?, args, &clock)?,
    };
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str, sink: LogSink) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| -> Result<()> {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match sink {
            LogSink::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogSink::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}

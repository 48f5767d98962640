// Command-line interface: argument definitions and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::api::Habitica;
use crate::cache::HttpCache;
use crate::commands::{self, Direction};
use crate::config::{self, Config};
use crate::cron::{self, Cron};
use crate::error::{HabitsError, Result};
use crate::models::TaskKind;
use crate::ui::{self, Palette};

/// Mini Habitica client
#[derive(Parser, Debug)]
#[command(name = "habits", version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file [default: <config dir>/habits/config.toml]
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// No spinner while waiting for Habitica
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Bypass the on-disk HTTP cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Never color output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score tasks up or down
    Score {
        #[arg(value_enum)]
        direction: Direction,
        #[command(flatten)]
        args: ScoreArgs,
    },

    /// Check-off or +1 a task
    Up(ScoreArgs),

    /// Uncheck or -1 a task
    Down(ScoreArgs),

    /// List tasks grouped by type
    Tasks {
        /// Only list tasks of this type
        #[arg(short = 't', long = "type", value_enum)]
        kind: Option<TaskKind>,

        /// Show task ids
        #[arg(long)]
        ids: bool,
    },

    /// Show health, experience, mana and gold
    Stats,

    /// View current task progress
    Status {
        /// Show every task, not just aliased ones
        #[arg(short = 'A', long = "all")]
        all: bool,
    },

    /// Start new Habitica day
    Cron {
        /// Run cron even if it does not look necessary
        #[arg(short, long)]
        force: bool,
    },

    /// Show current quest progress
    Quest,

    /// Write a config file with your API credentials
    Init,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Print the raw API response
    #[arg(short = 'J', long)]
    pub show_json: bool,

    /// Do not start a new day first
    #[arg(long)]
    pub no_cron: bool,

    /// Task aliases or ids
    #[arg(required = true, value_name = "TASK")]
    pub tasks: Vec<String>,
}

/// Everything a command needs once the config is loaded.
struct Session {
    config: Config,
    api: Habitica,
    cron: Cron,
    palette: Palette,
}

impl Session {
    fn open(cli: &Cli, path: &Path) -> Result<Self> {
        let config = Config::load(path)?;
        let cache_root = config::cache_dir();
        let mut api = Habitica::new(&config.auth)?
            .with_spinner(!cli.quiet && io::stderr().is_terminal());
        if !cli.no_cache {
            api = api.with_cache(HttpCache::new(cache_root.join("http")));
        }
        let marker = cron::marker_path(&cache_root, &config.auth.api_user);
        let cron = Cron::new(marker, config.cron.day_start);
        let palette = Palette::new(!cli.no_color && io::stdout().is_terminal());
        Ok(Session {
            config,
            api,
            cron,
            palette,
        })
    }
}

/// Run the selected command, writing its output to stdout.
pub fn run(cli: Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Commands::Init = cli.command {
        return init(&path, &mut out);
    }

    let session = Session::open(&cli, &path)?;
    debug!(command = ?cli.command, "dispatching");
    match cli.command {
        Commands::Score { direction, args } => score(&session, direction, &args, &mut out),
        Commands::Up(args) => score(&session, Direction::Up, &args, &mut out),
        Commands::Down(args) => score(&session, Direction::Down, &args, &mut out),
        Commands::Tasks { kind, ids } => commands::list_tasks(&session.api, kind, ids, &mut out),
        Commands::Stats => commands::stats(&session.api, &mut out),
        Commands::Status { all } => commands::status(
            &session.api,
            &session.config.alias,
            all,
            session.palette,
            &mut out,
        ),
        Commands::Cron { force: true } => session.cron.run(&session.api, &mut out),
        Commands::Cron { force: false } => {
            if !session.cron.run_if_needed(&session.api, &mut out)? {
                writeln!(out, "Cron not needed")?;
            }
            Ok(())
        }
        Commands::Quest => commands::quest(&session.api, &mut out),
        Commands::Init => unreachable!("init returns before a session is opened"),
    }
}

fn score<W: Write>(session: &Session, direction: Direction, args: &ScoreArgs, out: &mut W) -> Result<()> {
    // resolve first so a typo never triggers cron or a request
    let tasks = commands::resolve_tasks(&args.tasks, &session.config.alias)?;
    if !args.no_cron {
        session.cron.run_if_needed(&session.api, out)?;
    }
    commands::score(&session.api, &tasks, direction, args.show_json, out)
}

/// Prompt for credentials and write them to `path`.
fn init<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    if path.exists() && !ui::confirm_overwrite(path).map_err(setup_error)? {
        writeln!(out, "Keeping {}", path.display())?;
        return Ok(());
    }
    let (api_user, api_key) = ui::prompt_credentials().map_err(setup_error)?;
    if api_user.is_empty() || api_key.is_empty() {
        return Err(HabitsError::config("user ID and API token are both required"));
    }
    Config::new(api_user, api_key)
        .save(path)
        .map_err(setup_error)?;
    writeln!(out, "Wrote {}", path.display())?;
    Ok(())
}

fn setup_error(e: anyhow::Error) -> HabitsError {
    HabitsError::config(format!("{e:#}"))
}

pub mod activity;
pub mod auth;
pub mod entry;
pub mod export;
pub mod output;
pub mod pomodoro;
pub mod range;
pub mod stats;
pub mod tag;
pub mod timer;

use std::{path::PathBuf, sync::Arc};

use activity::{process_activity_command, ActivityCommand};
use anyhow::Result;
use clap::{Parser, Subcommand};
use entry::{process_entry_command, EntryCommand};
use export::{process_export_command, ExportCommand};
use pomodoro::{process_pomodoro_command, PomodoroCommand};
use stats::{process_stats_command, StatsCommand};
use tag::{process_tag_command, TagCommand};
use timer::{process_start_command, process_status_command, process_stop_command, StatusCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    api::{transport::ReqwestTransport, ApiClient},
    config::Config,
    fs::state_file::StateFile,
    query::repository::Repository,
    session::{
        guards::{require_auth, GuardError},
        AuthStore,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "timeflow", version, long_about = None)]
#[command(about = "Track time on activities, run pomodoro cycles and review your stats", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        env = "TIMEFLOW_API_URL",
        help = "Base URL of the time tracking API"
    )]
    api_url: Option<String>,
    #[arg(
        long,
        global = true,
        env = "TIMEFLOW_DIR",
        help = "Application directory. By default uses $XDG_STATE_HOME/timeflow or $HOME/.local/state/timeflow"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to stderr")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides RUST_LOG")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create an account")]
    Register(auth::RegisterCommand),
    #[command(about = "Log in and remember the session")]
    Login(auth::LoginCommand),
    #[command(about = "Forget the session")]
    Logout,
    #[command(about = "Show the logged in user")]
    Whoami,
    #[command(about = "Manage activities", subcommand)]
    Activity(ActivityCommand),
    #[command(about = "Start tracking an activity. A running timer is stopped first")]
    Start {
        #[arg(help = "Activity name or id")]
        activity: String,
    },
    #[command(about = "Stop the running timer")]
    Stop(timer::StopCommand),
    #[command(about = "Show the running timer")]
    Status(StatusCommand),
    #[command(about = "List, add, annotate and delete time entries", subcommand)]
    Entry(EntryCommand),
    #[command(about = "Manage tags", subcommand)]
    Tag(TagCommand),
    #[command(about = "Totals, streaks and a heatmap for a date range")]
    Stats(StatsCommand),
    #[command(about = "Export time entries as CSV")]
    Export(ExportCommand),
    #[command(about = "Work/break cycles", subcommand)]
    Pomodoro(PomodoroCommand),
}

impl Commands {
    /// Account commands check their own guards and the pomodoro runs offline.
    fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Commands::Register(_)
                | Commands::Login(_)
                | Commands::Logout
                | Commands::Whoami
                | Commands::Pomodoro(_)
        )
    }
}

/// Everything a command needs. Built once per invocation.
pub struct Context {
    pub config: Config,
    pub auth: Arc<AuthStore>,
    pub repository: Repository,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub async fn new(config: Config) -> Result<Self> {
        let auth = Arc::new(AuthStore::persistent(StateFile::new(config.session_path())).await?);
        let transport = ReqwestTransport::new(&config.api_url, config.request_timeout)?;
        let api = ApiClient::new(Box::new(transport), auth.clone());
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let repository = Repository::new(api, clock.clone(), config.cache_stale_after);
        Ok(Self {
            config,
            auth,
            repository,
            clock,
        })
    }

    /// Fails with a readable message when nobody is logged in.
    pub fn require_auth(&self) -> Result<(), GuardError> {
        require_auth(&self.auth.snapshot()).map(|_| ())
    }
}

pub async fn run_cli() -> Result<()> {
    run(Args::parse()).await
}

pub async fn run(args: Args) -> Result<()> {
    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(args.log_filter.unwrap_or(LevelFilter::DEBUG))
    } else {
        args.log_filter
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let config = Config::resolve(app_dir, args.api_url)?;
    let context = Context::new(config).await?;

    if args.commands.requires_auth() {
        context.require_auth()?;
    }

    match args.commands {
        Commands::Register(command) => auth::process_register_command(&context, command).await,
        Commands::Login(command) => auth::process_login_command(&context, command).await,
        Commands::Logout => auth::process_logout_command(&context).await,
        Commands::Whoami => auth::process_whoami_command(&context).await,
        Commands::Activity(command) => process_activity_command(&context, command).await,
        Commands::Start { activity } => process_start_command(&context, &activity).await,
        Commands::Stop(command) => process_stop_command(&context, command).await,
        Commands::Status(command) => process_status_command(&context, command).await,
        Commands::Entry(command) => process_entry_command(&context, command).await,
        Commands::Tag(command) => process_tag_command(&context, command).await,
        Commands::Stats(command) => process_stats_command(&context, command).await,
        Commands::Export(command) => process_export_command(&context, command).await,
        Commands::Pomodoro(command) => process_pomodoro_command(&context, command).await,
    }
}

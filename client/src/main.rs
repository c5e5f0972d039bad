//! Command line client for the todo backend.
//!
//! Drives the same stores a UI would: `register` and `login` dispatch the
//! session actions, `tasks` mounts the `MyTodos` view and prints every
//! render until the fetch settles.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use taskboard::session::{SessionAction, SessionState};
use taskboard::{App, ClientConfig, History};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How long shutdown waits for effects still in flight
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Taskboard CLI - todo-list client
#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Client for the todo-list backend", long_about = None)]
struct Cli {
    /// Backend base URL (overrides TASKBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides TASKBOARD_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        /// Display name
        #[arg(short, long)]
        username: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Log in, optionally continuing to the task list
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Show this user's tasks after a successful login
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Show a user's tasks
    Tasks {
        /// Display name of the user
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("invalid configuration")?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout_secs(secs)?;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(taskboard::config::DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let history = Arc::new(History::new());
    let app = App::connect(&config, Arc::clone(&history) as Arc<dyn taskboard::Navigator>)
        .context("failed to build HTTP client")?;

    let ok = match cli.command {
        Commands::Register {
            username,
            email,
            password,
        } => {
            let state = app
                .settle_session(SessionAction::Register {
                    username,
                    email,
                    password,
                })
                .await?;
            if state.errors.is_empty() {
                println!("Registered {} (id {})", state.user_name, state.id);
            }
            report_errors(&state)
        },

        Commands::Login {
            email,
            password,
            username,
        } => {
            let state = app.settle_session(SessionAction::Login { email, password }).await?;
            let ok = report_errors(&state);
            if ok {
                println!("Logged in (id {})", state.id);
                if let Some(route) = history.current() {
                    println!("-> {route}");
                }
                if let Some(user_name) = username {
                    show_tasks(&app, user_name).await?
                } else {
                    true
                }
            } else {
                false
            }
        },

        Commands::Tasks { user } => show_tasks(&app, user).await?,
    };

    app.shutdown(SHUTDOWN_TIMEOUT).await?;

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Print field errors; returns true if there were none
fn report_errors(state: &SessionState) -> bool {
    for (field, message) in state.errors.iter() {
        eprintln!("{field}: {message}");
    }
    state.errors.is_empty()
}

/// Mount `MyTodos` for `user_name` and print renders until the fetch settles
async fn show_tasks(app: &App, user_name: String) -> anyhow::Result<bool> {
    app.session().send(SessionAction::SetUsername { user_name }).await?;

    let view = app.my_todos();
    view.mount().await?;

    let state = view
        .run_until(
            |frame| {
                println!("{}", "-".repeat(40));
                print!("{frame}");
            },
            |state| !state.loading,
        )
        .await;

    if state.tasks.is_empty() && state.error.is_none() {
        println!("No tasks.");
    }

    view.unmount().await?;
    Ok(state.error.is_none())
}

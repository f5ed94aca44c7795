//! # todo
//!
//! Command-line client for the shared to-do list.
//!
//! Loads settings, initializes logging, connects to the hosted backend and
//! runs one command through the session manager and task synchronizer.
//! `todo watch` stays attached to the push channel and reprints the list on
//! every refetch until Ctrl-C.

#![deny(unsafe_code)]

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use todo_auth::{SessionManager, SessionStatus};
use todo_backend::{RestBackend, RestConfig};
use todo_core::{Category, TaskId};
use todo_settings::TodoSettings;
use todo_sync::{LiveUpdates, TaskSynchronizer};

use crate::render::render_snapshot;

/// Shared to-do list client.
#[derive(Parser, Debug)]
#[command(name = "todo", about = "Shared to-do list client", version)]
struct Cli {
    /// Settings file (defaults to ~/.todo/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level filter. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Account email for signup, signin and resend.
    #[arg(long, env = "TODO_EMAIL", global = true)]
    email: Option<String>,

    /// Account password for signup and signin.
    #[arg(long, env = "TODO_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Register a new account.
    Signup,
    /// Sign in with email and password.
    Signin,
    /// End the current session.
    Signout,
    /// Re-send the sign-up confirmation email.
    Resend,
    /// Show the signed-in account.
    Whoami,
    /// Print the task list grouped by category.
    List,
    /// Add a task to a category.
    Add {
        /// Category label or its letter (A, B, C).
        #[arg(value_parser = parse_category)]
        category: Category,
        /// Task text.
        content: String,
    },
    /// Flip completion of one of your tasks.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Delete one of your incomplete tasks.
    Delete {
        /// Task id.
        id: String,
    },
    /// Move a task to another task's position in the same category.
    Move {
        /// Task being moved.
        #[arg(value_name = "ACTIVE_ID")]
        active: String,
        /// Task whose position it takes.
        #[arg(value_name = "OVER_ID")]
        over: String,
    },
    /// Print the list on every change until Ctrl-C.
    Watch,
}

impl Cli {
    fn email(&self) -> Result<&str> {
        self.email
            .as_deref()
            .ok_or_else(|| anyhow!("--email is required (or set TODO_EMAIL)"))
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| anyhow!("--password is required (or set TODO_PASSWORD)"))?;
        Ok((self.email()?, password))
    }
}

/// Accept a stored label (`專案A`) or the bare letter (`a`, `B`).
fn parse_category(value: &str) -> Result<Category, String> {
    if let Ok(category) = value.parse::<Category>() {
        return Ok(category);
    }
    let index = match value.trim().to_ascii_uppercase().as_str() {
        "A" => 0,
        "B" => 1,
        "C" => 2,
        _ => {
            let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
            return Err(format!(
                "unknown category '{value}' (expected one of {} or A/B/C)",
                labels.join(", ")
            ));
        }
    };
    Ok(Category::ALL[index])
}

fn load_settings(path: Option<&Path>) -> Result<TodoSettings> {
    match path {
        Some(path) => todo_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => todo_settings::load_settings().context("Failed to load settings"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = load_settings(args.settings.as_deref())?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    todo_core::logging::init_subscriber(&level);

    let backend = RestBackend::new(RestConfig::from_settings(&settings))
        .context("Failed to create backend client")?;
    let session = Arc::new(SessionManager::start(Arc::new(backend.clone())));
    let _ = session.ready().await;
    let sync = Arc::new(TaskSynchronizer::new(
        Arc::new(backend.clone()),
        session.clone(),
    ));

    let result = run(&args, &settings, &backend, &session, &sync).await;
    session.shutdown();
    result
}

async fn run(
    args: &Cli,
    settings: &TodoSettings,
    backend: &RestBackend,
    session: &SessionManager,
    sync: &Arc<TaskSynchronizer>,
) -> Result<()> {
    match &args.command {
        Command::Signup => {
            let (email, password) = args.credentials()?;
            let outcome = session
                .sign_up(email, password)
                .await
                .context("Sign-up failed")?;
            if outcome.confirmation_required() {
                println!("Check {email} for a confirmation link, then run `todo signin`.");
            } else {
                println!("Signed up and signed in as {email}");
            }
        }
        Command::Signin => {
            let (email, password) = args.credentials()?;
            let signed_in = session
                .sign_in(email, password)
                .await
                .context("Sign-in failed")?;
            println!("Signed in as {}", signed_in.user.email);
            if !signed_in.user.is_email_confirmed() {
                println!("Your email is not confirmed yet.");
            }
        }
        Command::Signout => {
            session.sign_out().await.context("Sign-out failed")?;
            println!("Signed out");
        }
        Command::Resend => {
            let email = args.email()?;
            session
                .resend_confirmation_email(email)
                .await
                .context("Failed to resend confirmation email")?;
            println!("Confirmation email sent to {email}");
        }
        Command::Whoami => match (session.status(), session.identity()) {
            (SessionStatus::Authenticated { confirmed }, Some(identity)) => {
                println!("{} ({})", identity.email, identity.id);
                if !confirmed {
                    println!("email not confirmed");
                }
            }
            _ => println!("Not signed in"),
        },
        Command::List => {
            let _ = sync.fetch_all().await.context("Failed to load tasks")?;
            print!("{}", render_snapshot(&sync.snapshot(), session.identity().as_ref()));
        }
        Command::Add { category, content } => {
            // The next sort order is computed from the local list.
            let _ = sync.fetch_all().await.context("Failed to load tasks")?;
            let task = sync
                .add(content, *category)
                .await
                .context("Failed to add task")?;
            println!("Added {} to {}", task.id, task.category);
        }
        Command::Toggle { id } => {
            let id = TaskId::from(id.as_str());
            let _ = sync.fetch_all().await.context("Failed to load tasks")?;
            sync.toggle(&id).await.context("Failed to toggle task")?;
            if let Some(task) = sync.snapshot().tasks.get(&id) {
                let state = if task.completed { "done" } else { "open" };
                println!("{} is now {state}", task.id);
            }
        }
        Command::Delete { id } => {
            let id = TaskId::from(id.as_str());
            let _ = sync.fetch_all().await.context("Failed to load tasks")?;
            sync.delete(&id).await.context("Failed to delete task")?;
            println!("Deleted {id}");
        }
        Command::Move { active, over } => {
            let _ = sync.fetch_all().await.context("Failed to load tasks")?;
            let moved = sync
                .move_task(&TaskId::from(active.as_str()), &TaskId::from(over.as_str()))
                .await
                .context("Failed to reorder tasks")?;
            if moved {
                print!("{}", render_snapshot(&sync.snapshot(), session.identity().as_ref()));
            } else {
                println!("Nothing to move");
            }
        }
        Command::Watch => watch(settings, backend, session, sync).await?,
    }
    Ok(())
}

async fn watch(
    settings: &TodoSettings,
    backend: &RestBackend,
    session: &SessionManager,
    sync: &Arc<TaskSynchronizer>,
) -> Result<()> {
    let mut updates = sync.subscribe();
    let live = LiveUpdates::mount(sync.clone(), backend, &settings.backend.channel)
        .await
        .context("Failed to subscribe to task changes")?;
    tracing::info!(channel = %settings.backend.channel, "watching for changes");

    print!("{}", render_snapshot(&sync.snapshot(), session.identity().as_ref()));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if !snapshot.loading {
                    println!();
                    print!("{}", render_snapshot(&snapshot, session.identity().as_ref()));
                }
            }
        }
    }

    live.stop();
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

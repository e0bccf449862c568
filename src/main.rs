mod app;
mod clock;
mod config;
mod domain;
mod error;
mod input;
mod logging;
mod notifications;
mod persistence;
mod scheduler;
#[cfg(test)]
mod test_utils;
mod ticker;

use anyhow::{Context, Result};
use app::{format_local, App, Command, PomodoroAction};
use chrono::Utc;
use clap::{Parser, Subcommand};
use clock::{Clock, SystemClock};
use config::{load_config, Config};
use input::{parse_line, parse_task_id, parse_when, Line};
use notifications::{DesktopNotifier, SystemSound};
use persistence::{
    alarms_file, config_file, ensure_data_dir, init_local_data_dir, tasks_file, AlarmFile,
    JsonTaskStore,
};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "focusbell")]
#[command(about = "Pomodoro timer and task reminders with desktop notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .focusbell directory in the current directory
    Init,
    /// Add a task
    Add {
        text: String,
        /// Reminder time (RFC 3339, "YYYY-MM-DD HH:MM", or +10m)
        #[arg(long)]
        at: Option<String>,
    },
    /// Set or move a task's reminder
    Remind { id: String, when: String },
    /// Remove a task's reminder
    Unremind { id: String },
    /// Toggle a task's completion
    Done { id: String },
    /// Delete a task and its reminder
    Delete { id: String },
    /// List all tasks
    List,
    /// List pending reminders, soonest first
    Reminders,
    /// Run the scheduler: fires reminders and drives the pomodoro cycle
    Run {
        /// Start a work phase immediately
        #[arg(long)]
        pomodoro: bool,
        #[arg(long)]
        work_minutes: Option<u32>,
        #[arg(long)]
        break_minutes: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        let data_dir = init_local_data_dir()?;
        println!("Initialized focusbell directory: {}", data_dir.display());
        println!();
        println!("focusbell will now use this local directory for tasks and reminders.");
        return Ok(());
    }

    let data_dir = ensure_data_dir()?;
    let mut config = load_config(config_file(&data_dir))?;
    logging::init_logging(&config.log_level);
    info!(dir = %data_dir.display(), "using data directory");

    let now = SystemClock.now();
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Add { text, at } => {
            let reminder = at.map(|when| parse_when(&when, now)).transpose()?;
            let mut app = build_app(&data_dir, &config);
            execute(&mut app, Command::AddTask { text, reminder }).await
        }
        Commands::Remind { id, when } => {
            let command = Command::SetReminder {
                task_id: parse_task_id(&id)?,
                at: parse_when(&when, now)?,
            };
            execute(&mut build_app(&data_dir, &config), command).await
        }
        Commands::Unremind { id } => {
            let command = Command::ClearReminder {
                task_id: parse_task_id(&id)?,
            };
            execute(&mut build_app(&data_dir, &config), command).await
        }
        Commands::Done { id } => {
            let command = Command::ToggleComplete {
                task_id: parse_task_id(&id)?,
            };
            execute(&mut build_app(&data_dir, &config), command).await
        }
        Commands::Delete { id } => {
            let command = Command::DeleteTask {
                task_id: parse_task_id(&id)?,
            };
            execute(&mut build_app(&data_dir, &config), command).await
        }
        Commands::List => {
            let tasks = build_app(&data_dir, &config).tasks().await?;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                let mark = if task.completed { "x" } else { " " };
                match task.reminder {
                    Some(at) => println!(
                        "[{}] {} {} (reminder {})",
                        mark,
                        task.id,
                        task.text,
                        format_local(at)
                    ),
                    None => println!("[{}] {} {}", mark, task.id, task.text),
                }
            }
            Ok(())
        }
        Commands::Reminders => {
            let app = build_app(&data_dir, &config);
            let tasks = app.tasks().await?;
            let agenda = domain::reminder_agenda(&tasks);
            if agenda.is_empty() {
                println!("No reminders set.");
            }
            for task in agenda {
                let Some(at) = task.reminder else {
                    continue;
                };
                let armed = app.reminders().scheduled_at(task.id).await?.is_some();
                let state = if task.is_reminder_expired(now) {
                    "expired"
                } else if armed {
                    "upcoming"
                } else {
                    // `run` re-registers it on startup
                    "not armed"
                };
                println!("{} {:<9} {} {}", format_local(at), state, task.id, task.text);
            }
            Ok(())
        }
        Commands::Run {
            pomodoro,
            work_minutes,
            break_minutes,
        } => {
            if let Some(minutes) = work_minutes {
                config.work_minutes = minutes;
            }
            if let Some(minutes) = break_minutes {
                config.break_minutes = minutes;
            }
            config.validate()?;
            run(build_app(&data_dir, &config), &config, pomodoro).await
        }
    }
}

fn build_app(data_dir: &Path, config: &Config) -> App {
    App::new(
        Arc::new(SystemClock),
        Arc::new(JsonTaskStore::new(tasks_file(data_dir))),
        Box::new(AlarmFile::new(alarms_file(data_dir))),
        Arc::new(DesktopNotifier::default()),
        Arc::new(SystemSound),
        config,
    )
}

/// Run a single command and print its reply
async fn execute(app: &mut App, command: Command) -> Result<()> {
    let reply = app.handle(command).await?;
    if !reply.is_empty() {
        println!("{}", reply);
    }
    Ok(())
}

async fn run(mut app: App, config: &Config, pomodoro: bool) -> Result<()> {
    app.startup()
        .await
        .context("Failed to re-register reminders")?;
    if pomodoro {
        app.pomodoro_action(PomodoroAction::Start);
    }
    println!("{}", app.status_report());
    println!("Type 'help' for commands, 'quit' or Ctrl-C to stop.");

    let (tx, rx) = mpsc::channel(32);
    // Blocking stdin reads cannot be cancelled, so they stay off the runtime.
    std::thread::spawn(move || read_commands(tx));

    app.run(rx, ticker::tick_duration(config.tick_ms)).await
}

/// Forward parsed stdin lines to the app until `quit` or the app stops
fn read_commands(tx: mpsc::Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to read stdin");
                break;
            }
        };

        match parse_line(&line, Utc::now()) {
            Ok(Line::Empty) => {}
            Ok(Line::Help) => println!("{}", input::HELP),
            Ok(Line::Quit) => return,
            Ok(Line::Command(command)) => {
                if tx.blocking_send(command).is_err() {
                    return;
                }
            }
            Err(err) => println!("Error: {:#}", err),
        }
    }

    // Without stdin the loop keeps running until Ctrl-C.
    info!("stdin closed; press Ctrl-C to stop");
    while !tx.is_closed() {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

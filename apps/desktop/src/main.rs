mod commands;
mod config;
mod terminal;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{DevUserOutcome, DocEngineClient, Router};
use shared::domain::StepDecision;
use storage::{PersistedStore, SqliteStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{parse_command, Command, HELP},
    config::load_settings,
    terminal::{status_badge, TerminalView},
};

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the document approval service")]
struct Args {
    /// Backend base URL, e.g. http://127.0.0.1:8000/api
    #[arg(long)]
    server_url: Option<String>,
    /// Local store location: a sqlite URL or a plain file path.
    #[arg(long)]
    data_url: Option<String>,
    /// Open the client on this location instead of the stored one.
    #[arg(long)]
    start_path: Option<String>,
    #[arg(long, default_value = "client.toml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = load_settings(&args.config).with_overrides(args.server_url, args.data_url);
    info!(
        server_url = %settings.server_url,
        data_url = %settings.data_url,
        "desktop: starting"
    );

    let store: Arc<dyn PersistedStore> = Arc::new(
        SqliteStore::new(&settings.data_url)
            .await
            .with_context(|| format!("failed to open local store '{}'", settings.data_url))?,
    );
    let router = match args.start_path {
        Some(path) => Router::with_initial_location(path),
        None => Router::new(),
    };
    let client = DocEngineClient::connect(
        &settings.server_url,
        router,
        store,
        Arc::new(TerminalView),
    )?;
    client.install_routes().await;
    let dispatcher = client.router().spawn_dispatch_loop();
    client.router().start().await;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                eprintln!("{error}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(error) = run_command(&client, command).await {
            eprintln!("error: {error}");
        }
    }

    dispatcher.abort();
    info!("desktop: exiting");
    Ok(())
}

async fn run_command(client: &DocEngineClient, command: Command) -> Result<()> {
    debug!(command = command.name(), "desktop: command");
    match command {
        Command::Go(path) => client.router().navigate(path, false).await,
        Command::Back => client.router().back().await,
        Command::Forward => client.router().forward().await,
        Command::Reload => client.router().reload().await,
        Command::Login { email, password } => {
            client.login(&email, &password).await?;
            println!("Signed in as {email}");
        }
        Command::Logout => client.logout().await?,
        Command::Create { title } => {
            let document = client.create_document(&title).await?;
            println!("Document created: {} ({})", document.title, document.id);
        }
        Command::Decide {
            decision,
            document_id,
            step_id,
            approver_id,
        } => {
            let outcome = match decision {
                StepDecision::Approve => {
                    client
                        .approve_step(&document_id, &step_id, &approver_id)
                        .await?
                }
                StepDecision::Reject => {
                    client
                        .reject_step(&document_id, &step_id, &approver_id)
                        .await?
                }
            };
            let verb = match decision {
                StepDecision::Approve => "approved",
                StepDecision::Reject => "rejected",
            };
            match outcome.document {
                Some(document) => println!(
                    "Step {step_id} {verb}: {} is now {}",
                    document.title,
                    status_badge(document.status)
                ),
                None => println!("Step {step_id} {verb}"),
            }
            client.router().reload().await;
        }
        Command::TestUser { email, password } => {
            match client.create_test_user(&email, &password).await? {
                DevUserOutcome::Created(user) => {
                    let email = user.email.unwrap_or(email);
                    println!("Test user created: {email}. Sign in with: login {email} {password}");
                }
                DevUserOutcome::MaybeExists => {
                    println!("User may already exist. Try signing in: login {email} {password}");
                }
            }
        }
        Command::Health => {
            let health = client.health().await?;
            println!("{}", health.0);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

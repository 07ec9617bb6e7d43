//! # Till Terminal Status
//!
//! Opens the local ledgers and prints the sync backlog. The UI links the
//! library directly; this binary is for support staff at the counter.
//!
//! ```text
//! till-terminal [--config <path>] [--print-config]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};

use till_terminal::commands::{config, device, kitchen, queue, ticket};
use till_terminal::error::ApiError;
use till_terminal::state::ConfigState;
use till_terminal::{bootstrap, init_tracing, Terminal};

const USAGE: &str = "usage: till-terminal [--config <path>] [--print-config]";

struct Args {
    config_path: Option<PathBuf>,
    print_config: bool,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        config_path: None,
        print_config: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config_path = Some(PathBuf::from(path));
            }
            "--print-config" => args.print_config = true,
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config_state = match ConfigState::load(args.config_path) {
        Ok(config_state) => config_state,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        return match toml::to_string_pretty(&config::get_config(&config_state)) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to render configuration");
                ExitCode::FAILURE
            }
        };
    }

    info!("Starting Till terminal");
    let terminal = match bootstrap(config_state).await {
        Ok(terminal) => terminal,
        Err(e) => {
            error!(error = %e, "Failed to open the terminal database");
            return ExitCode::FAILURE;
        }
    };

    let outcome = report(&terminal).await;
    terminal.db.inner().close().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Status report failed");
            ExitCode::FAILURE
        }
    }
}

async fn report(terminal: &Terminal) -> Result<(), ApiError> {
    let db = &terminal.db;
    println!("Till terminal status at {}", Utc::now().to_rfc3339());

    match device::get_active_device(db).await? {
        Some(profile) => println!(
            "device   {} ({:?}) sync {}",
            profile.name, profile.role, profile.sync.status
        ),
        None => println!("device   not registered"),
    }

    let stats = ticket::get_ticket_sync_stats(db).await?;
    println!(
        "tickets  pending {} / syncing {} / synced {} / failed {}",
        stats.pending, stats.syncing, stats.synced, stats.failed
    );

    let retryable = ticket::list_retryable_tickets(db, &terminal.config).await?;
    let stale = ticket::list_stale_tickets(db, &terminal.config).await?;
    println!("         retryable {} / stale {}", retryable.len(), stale.len());

    let tokens = queue::get_active_queue_tokens(db).await?;
    println!("queue    {} active", tokens.len());
    for token in &tokens {
        println!("         #{} {} ({})", token.token_number, token.status, token.ticket_number);
    }

    let kitchen_tickets = kitchen::get_active_kitchen_tickets(db).await?;
    println!("kitchen  {} active", kitchen_tickets.len());
    for kt in &kitchen_tickets {
        println!("         {} {}", kt.ticket_number, kt.status);
    }

    Ok(())
}

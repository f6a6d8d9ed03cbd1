//! Invigilation duty notifier - CLI entry point.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use invigil_notify::models::{DateRange, SingleSendOutcome};
use invigil_notify::services::{DutyNotifier, HttpMailGateway, SenderIdentity};
use invigil_notify::storage::{ConfigService, Database};

/// Exam invigilation duty notifier.
#[derive(Debug, Parser)]
#[command(name = "invigil-notify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mail gateway endpoint override.
    #[arg(long, env = "INVIGIL_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Mail gateway bearer token override.
    #[arg(long, env = "INVIGIL_GATEWAY_TOKEN")]
    gateway_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Notify every invigilator with pending duties in the window.
    Bulk {
        /// Window start date (inclusive), e.g. 2025-10-01.
        #[arg(long)]
        from: NaiveDate,
        /// Window end date (inclusive).
        #[arg(long)]
        to: NaiveDate,
    },
    /// Notify one invigilator located by EID or HTNO.
    Single {
        /// External identifier value (EID or HTNO).
        id_value: String,
        /// Window start date (inclusive).
        #[arg(long)]
        from: NaiveDate,
        /// Window end date (inclusive).
        #[arg(long)]
        to: NaiveDate,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_service = ConfigService::new()?;
    let mut mailer = config_service.get_config().mailer.clone();
    if let Some(url) = cli.gateway_url {
        mailer.gateway_url = url;
    }
    if let Some(token) = cli.gateway_token {
        mailer.api_token = Some(token);
    }

    let database = Arc::new(Database::new()?);
    let transport = Arc::new(HttpMailGateway::new(
        mailer.gateway_url.clone(),
        mailer.api_token.clone(),
    ));
    let notifier = DutyNotifier::new(
        database,
        transport,
        SenderIdentity {
            address: mailer.from_address.clone(),
            display_name: mailer.from_name.clone(),
        },
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Bulk { from, to } => {
                let outcome = notifier.send_bulk(DateRange::new(from, to)).await?;
                println!(
                    "selected {} assignment(s), notified {} recipient(s), {} failure(s), flags {}",
                    outcome.assignments_selected,
                    outcome.recipients_notified,
                    outcome.failures,
                    if outcome.flags_committed {
                        "committed"
                    } else {
                        "left pending"
                    }
                );
            }
            Commands::Single { id_value, from, to } => {
                let outcome = notifier
                    .send_single(&id_value, DateRange::new(from, to))
                    .await?;
                match outcome {
                    SingleSendOutcome::Sent { recipient_name } => {
                        println!("Mail sent to {}", recipient_name);
                    }
                    SingleSendOutcome::UnknownIdentifier => {
                        println!("Invalid EID / HTNO");
                    }
                    SingleSendOutcome::NoDuties => {
                        println!("No invigilation duties found");
                    }
                    SingleSendOutcome::MissingContact => {
                        println!("Mail ID not found");
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

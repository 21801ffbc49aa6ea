mod commands;
mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use crossbeam_channel::Sender;
use search_core::{
    RecordStore, SearchError, SearchSession, SessionOptions, SpeechRecognizer,
    UnsupportedRecognizer,
};
use shared::{
    contact::{dial_uri, whatsapp_uri},
    domain::{DonorId, DonorPatch},
    error::DomainError,
};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{Command, HELP},
    config::Settings,
    render::{ChannelSurface, SurfaceEvent},
};

#[derive(Parser, Debug)]
#[command(about = "Live blood donor search")]
struct Args {
    #[arg(long, default_value = "directory.toml")]
    config: PathBuf,
    #[arg(long)]
    database_url: Option<String>,
    /// Print snapshots and advisories as JSON lines.
    #[arg(long)]
    json: bool,
}

/// A terminal has no microphone: the transcript is whatever the user typed
/// after `voice`.
struct TypedTranscript(String);

#[async_trait]
impl SpeechRecognizer for TypedTranscript {
    async fn recognize(&self) -> Result<String, SearchError> {
        Ok(self.0.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = config::load_settings(&args.config);
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let database_url = config::normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await?;
    storage.health_check().await?;

    let (events, event_rx) = crossbeam_channel::unbounded();
    let printer = render::spawn_printer(event_rx, args.json)?;

    let store: Arc<dyn RecordStore> = Arc::new(storage.clone());
    let mut session = SearchSession::start(
        store,
        Arc::new(ChannelSurface::new(events.clone())),
        SessionOptions {
            empty_predicate_policy: settings.empty_predicate_policy,
            live_updates: true,
        },
    );
    info!(
        session_id = %session.id(),
        database_url = %database_url,
        voice_input = settings.voice_input,
        "directory: ready"
    );
    say(&events, "Type 'help' for commands.");

    let outcome = run_commands(&mut session, &storage, &settings, &events).await;

    session.end().await;
    drop(events);
    if printer.join().is_err() {
        warn!("directory: printer thread panicked");
    }
    outcome
}

async fn run_commands(
    session: &mut SearchSession,
    storage: &Storage,
    settings: &Settings,
    events: &Sender<SurfaceEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                say(events, format!("{err:#}"));
                continue;
            }
        };

        match command {
            Command::Group(category) => {
                session.filters_mut().set_category(category);
            }
            Command::Text(text) => {
                session.filters_mut().set_free_text(&text);
            }
            Command::ClearText => {
                session.filters_mut().clear_free_text();
            }
            Command::Clear => {
                session.filters_mut().clear();
            }
            Command::Voice(transcript) => {
                let heard = if settings.voice_input {
                    session
                        .filters_mut()
                        .voice_search(&TypedTranscript(transcript.clone()))
                        .await
                } else {
                    session.filters_mut().voice_search(&UnsupportedRecognizer).await
                };
                if heard.is_none() && settings.voice_input {
                    say(events, format!("No single blood group heard in \"{transcript}\"."));
                }
            }
            Command::Retry => session.retry(),
            Command::Show => {
                let _ = events.send(SurfaceEvent::Snapshot(session.snapshot()));
            }
            Command::Contact(donor_id) => {
                if let Err(err) = show_contact(storage, donor_id, events).await {
                    warn!(donor_id = donor_id.0, error = %err, "directory: contact lookup failed");
                    say(events, format!("{err:#}"));
                }
            }
            Command::Availability {
                donor_id,
                available,
            } => {
                if let Err(err) = set_availability(storage, donor_id, available, events).await {
                    warn!(donor_id = donor_id.0, error = %err, "directory: availability update failed");
                    say(events, format!("{err:#}"));
                }
            }
            Command::Help => say(events, HELP),
            Command::Quit => break,
        }
    }
    Ok(())
}

async fn show_contact(storage: &Storage, donor_id: DonorId, events: &Sender<SurfaceEvent>) -> Result<()> {
    let donor = storage
        .get_donor(donor_id)
        .await?
        .ok_or(DomainError::DonorNotFound(donor_id.0))?;
    let whatsapp = whatsapp_uri(&donor).context("failed to build WhatsApp link")?;
    say(
        events,
        format!(
            "{} ({})\n  call: {}\n  message: {}",
            donor.name,
            donor.blood_group,
            dial_uri(&donor.phone),
            whatsapp
        ),
    );
    Ok(())
}

async fn set_availability(
    storage: &Storage,
    donor_id: DonorId,
    available: bool,
    events: &Sender<SurfaceEvent>,
) -> Result<()> {
    let donor = storage
        .update_donor(donor_id, &DonorPatch::availability(available))
        .await?
        .ok_or(DomainError::DonorNotFound(donor_id.0))?;
    let state = if donor.is_available { "available" } else { "unavailable" };
    say(events, format!("{} is now {state}.", donor.name));
    Ok(())
}

fn say(events: &Sender<SurfaceEvent>, text: impl Into<String>) {
    let _ = events.send(SurfaceEvent::Message(text.into()));
}

//! Presentation surface that hands snapshots to a printer thread.

use std::{fmt::Write as _, sync::Arc, thread};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use search_core::{Advisory, PresentationSurface, ResultSnapshot};
use shared::domain::Donor;

pub enum SurfaceEvent {
    Snapshot(Arc<ResultSnapshot>),
    Advisory(Advisory),
    Message(String),
}

pub struct ChannelSurface {
    events: Sender<SurfaceEvent>,
}

impl ChannelSurface {
    pub fn new(events: Sender<SurfaceEvent>) -> Self {
        Self { events }
    }
}

impl PresentationSurface for ChannelSurface {
    fn render(&self, snapshot: Arc<ResultSnapshot>) {
        let _ = self.events.send(SurfaceEvent::Snapshot(snapshot));
    }

    fn advise(&self, advisory: Advisory) {
        let _ = self.events.send(SurfaceEvent::Advisory(advisory));
    }
}

/// Prints events until every sender is dropped.
pub fn spawn_printer(events: Receiver<SurfaceEvent>, json: bool) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("directory-printer".into())
        .spawn(move || {
            for event in events.iter() {
                println!("{}", format_event(&event, json));
            }
        })
        .context("failed to start printer thread")
}

pub fn format_event(event: &SurfaceEvent, json: bool) -> String {
    if json {
        let encoded = match event {
            SurfaceEvent::Snapshot(snapshot) => serde_json::to_string(&**snapshot),
            SurfaceEvent::Advisory(advisory) => serde_json::to_string(advisory),
            SurfaceEvent::Message(text) => {
                serde_json::to_string(&serde_json::json!({ "type": "message", "text": text }))
            }
        };
        return encoded.unwrap_or_else(|err| format!("{{\"type\":\"error\",\"text\":\"{err}\"}}"));
    }
    match event {
        SurfaceEvent::Snapshot(snapshot) => format_snapshot(snapshot),
        SurfaceEvent::Advisory(advisory) => format!("! {advisory}"),
        SurfaceEvent::Message(text) => text.clone(),
    }
}

pub fn format_snapshot(snapshot: &ResultSnapshot) -> String {
    let mut out = snapshot.headline();
    for donor in &snapshot.records {
        out.push('\n');
        out.push_str(&donor_line(donor));
    }
    out
}

fn donor_line(donor: &Donor) -> String {
    let mut line = format!(
        "  #{} {} [{}] {}, {} | {} | {}",
        donor.id, donor.name, donor.blood_group, donor.gender, donor.age, donor.location, donor.phone
    );
    if let Some(date) = donor.last_donation_date {
        let _ = write!(line, " | last donated {date}");
    }
    line
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;

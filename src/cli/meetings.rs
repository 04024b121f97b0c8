//! CLI handler for listing today's meetings.
//!
//! Fetches exactly like the service does, then prints one line per meeting
//! with the signals it raises at this moment. No lights are touched.

use crate::app::{self, Service};
use crate::poller::{MeetingStatus, PollContext};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

pub async fn handle_meetings_command(config_path: Option<&Path>) -> Result<()> {
    let config = app::load_config(config_path)?;
    let service = Service::from_config(&config)?;

    let now = Utc::now();
    let context = service.fetch_context(now).await?;
    print!("{}", render_meetings(&context, now));
    Ok(())
}

fn render_status(status: &MeetingStatus<'_>) -> String {
    let meeting = status.meeting;
    format!(
        "{} - {}  {:<24} {}",
        meeting.start().format("%I:%M %p"),
        meeting.end().format("%I:%M %p"),
        status.signals.to_string(),
        meeting.subject()
    )
}

pub fn render_meetings(context: &PollContext, now: DateTime<Utc>) -> String {
    if context.is_empty() {
        return "No meetings today.\n".to_string();
    }

    let local_now = now.with_timezone(&context.reference_zone());
    let mut out = format!(
        "Meetings for {} ({}), as of {}:\n",
        local_now.format("%A %Y-%m-%d"),
        context.reference_zone().name(),
        local_now.format("%I:%M %p")
    );
    for status in context.statuses(&now) {
        out.push_str("  ");
        out.push_str(&render_status(&status));
        out.push('\n');
    }
    out.push_str(&format!("Lights: {}\n", context.evaluate(&now)));
    out
}

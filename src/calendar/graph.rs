//! Microsoft Graph calendar view client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CalendarSource, DayWindow, FetchError};
use crate::config::CalendarConfig;
use crate::meeting::RawMeeting;

#[derive(Debug, Deserialize)]
struct CalendarViewResponse {
    value: Vec<RawMeeting>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

pub struct GraphCalendarClient {
    client: Client,
    endpoint: String,
}

impl GraphCalendarClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.endpoint.clone())
    }
}

#[async_trait]
impl CalendarSource for GraphCalendarClient {
    async fn fetch_day(&self, window: &DayWindow, token: &str) -> Result<Vec<RawMeeting>, FetchError> {
        let url = format!("{}/me/calendarview", self.endpoint);
        debug!(
            "Fetching calendar view {} .. {} from {}",
            window.start, window.end, url
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(
                "Prefer",
                format!("outlook.timezone=\"{}\"", window.zone.name()),
            )
            .query(&[
                ("startDateTime", window.start.to_rfc3339()),
                ("endDateTime", window.end.to_rfc3339()),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(FetchError::Transport)?;
        if !status.is_success() {
            return Err(FetchError::Status { status, body });
        }

        let view: CalendarViewResponse = serde_json::from_str(&body).map_err(FetchError::Decode)?;
        if view.next_link.is_some() {
            warn!("Calendar returned more than one page; only the first page is used");
        }

        info!("Fetched {} meeting(s) for today", view.value.len());
        Ok(view.value)
    }
}

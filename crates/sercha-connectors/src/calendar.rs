//! Calendar adapter (Calendar-shaped REST API)
//!
//! Single global change log per calendar, addressed by a page token
//! ([`PageTokenCursor`]). Recurring-event instances carry their series
//! master as a parent URI.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sercha_core::connector::{
    Capabilities, ChangeKind, Connector, ConnectorError, RawDocument, RawDocumentChange,
    SyncOutcome, SyncStreams,
};
use sercha_core::domain::SyncState;
use sercha_cursor::PageTokenCursor;

use crate::http::ProviderClient;

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_id: String,
}

impl CalendarConfig {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConnectorError> {
        let calendar_id = value
            .get("calendar_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectorError::InvalidInput("calendar_id is required".to_string()))?
            .to_string();
        Ok(Self { calendar_id })
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    items: Vec<Event>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
    #[serde(rename = "nextSyncToken", default)]
    next_sync_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(rename = "recurringEventId", default)]
    recurring_event_id: Option<String>,
}

pub struct CalendarConnector {
    source_id: String,
    client: ProviderClient,
    config: CalendarConfig,
}

impl CalendarConnector {
    #[must_use]
    pub fn new(source_id: impl Into<String>, client: ProviderClient, config: CalendarConfig) -> Self {
        Self {
            source_id: source_id.into(),
            client,
            config,
        }
    }
}

fn event_document(calendar_id: &str, event: &Event) -> RawDocument {
    let mut metadata = HashMap::new();
    metadata.insert("status".to_string(), event.status.clone());

    RawDocument {
        source_id: String::new(),
        uri: format!("cal://{calendar_id}/events/{}", event.id),
        mime_type: "application/vnd.sercha.calendar-event+json".to_string(),
        content: event.description.clone().unwrap_or_default().into_bytes(),
        parent_uri: event
            .recurring_event_id
            .as_ref()
            .map(|parent| format!("cal://{calendar_id}/events/{parent}")),
        metadata,
        title: event.summary.clone(),
    }
}

#[async_trait]
impl Connector for CalendarConnector {
    fn connector_type(&self) -> &str {
        "calendar"
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_incremental: true,
            supports_watch: false,
            supports_hierarchy: true,
            supports_binary: false,
            requires_auth: true,
            supports_validation: true,
            supports_cursor_return: true,
            supports_partial_sync: false,
            supports_rate_limiting: true,
            supports_pagination: true,
        }
    }

    async fn validate(&self, ctx: CancellationToken) -> Result<(), ConnectorError> {
        let _: serde_json::Value = self
            .client
            .get_json(&ctx, &format!("/calendars/{}", self.config.calendar_id), &[])
            .await?;
        Ok(())
    }

    async fn full_sync(&self, ctx: CancellationToken) -> Result<SyncStreams<RawDocument>, ConnectorError> {
        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);
        let client = self.client.clone();
        let calendar_id = self.config.calendar_id.clone();

        tokio::spawn(async move {
            let mut page_token: Option<String> = None;
            let mut sync_token = None;

            loop {
                if ctx.is_cancelled() {
                    let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::Cancelled)).await;
                    return;
                }

                let mut params = vec![("maxResults", "250".to_string()), ("singleEvents", "false".to_string())];
                if let Some(token) = &page_token {
                    params.push(("pageToken", token.clone()));
                }

                let list: EventList = match client
                    .get_json(&ctx, &format!("/calendars/{calendar_id}/events"), &params)
                    .await
                {
                    Ok(list) => list,
                    Err(e) => {
                        let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                        return;
                    }
                };

                for event in &list.items {
                    if event.status == "cancelled" {
                        continue;
                    }
                    if doc_tx.send(event_document(&calendar_id, event)).await.is_err() {
                        return;
                    }
                }

                if list.next_sync_token.is_some() {
                    sync_token = list.next_sync_token;
                }
                page_token = list.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }

            let cursor = PageTokenCursor {
                version: sercha_cursor::PAGE_TOKEN_CURSOR_VERSION,
                page_token: sync_token,
            }
            .encode();
            let _ = term_tx.send(SyncOutcome::Complete { cursor }).await;
        });

        Ok(SyncStreams::new(doc_rx, term_rx))
    }

    async fn incremental_sync(
        &self,
        ctx: CancellationToken,
        prior: SyncState,
    ) -> Result<SyncStreams<RawDocumentChange>, ConnectorError> {
        let prior_cursor = PageTokenCursor::decode(&prior.cursor)
            .map_err(|e| ConnectorError::InvalidCursor(e.to_string()))?;
        let Some(start_sync_token) = prior_cursor.page_token else {
            return Err(ConnectorError::SyncTokenExpired);
        };

        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);
        let client = self.client.clone();
        let calendar_id = self.config.calendar_id.clone();

        tokio::spawn(async move {
            let mut page_token: Option<String> = None;
            let mut sync_token = start_sync_token.clone();

            loop {
                if ctx.is_cancelled() {
                    let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::Cancelled)).await;
                    return;
                }

                let mut params = vec![("syncToken", start_sync_token.clone())];
                if let Some(token) = &page_token {
                    params = vec![("pageToken", token.clone())];
                }

                let list: EventList = match client
                    .get_json(&ctx, &format!("/calendars/{calendar_id}/events"), &params)
                    .await
                {
                    Ok(list) => list,
                    Err(ConnectorError::Forbidden(_)) => {
                        let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::SyncTokenExpired)).await;
                        return;
                    }
                    Err(e) => {
                        let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                        return;
                    }
                };

                for event in &list.items {
                    let change = if event.status == "cancelled" {
                        RawDocumentChange {
                            kind: ChangeKind::Deleted,
                            document: RawDocument {
                                uri: format!("cal://{calendar_id}/events/{}", event.id),
                                ..RawDocument::default()
                            },
                        }
                    } else {
                        RawDocumentChange {
                            kind: ChangeKind::Updated,
                            document: event_document(&calendar_id, event),
                        }
                    };
                    if doc_tx.send(change).await.is_err() {
                        return;
                    }
                }

                if list.next_sync_token.is_some() {
                    sync_token = list.next_sync_token.clone().unwrap();
                }
                page_token = list.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }

            let cursor = PageTokenCursor {
                version: sercha_cursor::PAGE_TOKEN_CURSOR_VERSION,
                page_token: Some(sync_token),
            }
            .encode();
            let _ = term_tx.send(SyncOutcome::Complete { cursor }).await;
        });

        Ok(SyncStreams::new(doc_rx, term_rx))
    }

    async fn get_account_identifier(&self, access_token: &str) -> Result<String, ConnectorError> {
        #[derive(Deserialize)]
        struct Calendar {
            id: String,
        }
        let calendar: Calendar = self
            .client
            .get_json_with_token(access_token, &format!("/calendars/{}", self.config.calendar_id))
            .await?;
        Ok(calendar.id)
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_requires_calendar_id() {
        assert!(CalendarConfig::from_json(&serde_json::json!({})).is_err());
        let config = CalendarConfig::from_json(&serde_json::json!({ "calendar_id": "primary" })).unwrap();
        assert_eq!(config.calendar_id, "primary");
    }

    #[test]
    fn recurring_instance_carries_series_parent() {
        let event = Event {
            id: "inst1".to_string(),
            summary: "Standup".to_string(),
            description: None,
            status: "confirmed".to_string(),
            recurring_event_id: Some("series1".to_string()),
        };
        let doc = event_document("primary", &event);
        assert_eq!(doc.parent_uri.as_deref(), Some("cal://primary/events/series1"));
    }
}

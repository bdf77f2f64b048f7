//! Mail adapter (Gmail-shaped REST API)
//!
//! Single global change log per mailbox, addressed by an opaque history
//! id ([`HistoryIdCursor`]). Full sync lists messages directly; an
//! incremental sync replays the history feed from the stored id and
//! falls back to a full sync when the provider reports the id expired.

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
use sercha_cursor::HistoryIdCursor;

use crate::http::ProviderClient;

/// Mailbox labels this adapter is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailScope {
    Inbox,
    Sent,
    All,
}

impl MailScope {
    fn parse(value: &str) -> Result<Self, ConnectorError> {
        match value {
            "inbox" => Ok(Self::Inbox),
            "sent" => Ok(Self::Sent),
            "all" => Ok(Self::All),
            other => Err(ConnectorError::InvalidInput(format!("unknown mail scope: {other}"))),
        }
    }

    fn label_query(self) -> &'static str {
        match self {
            Self::Inbox => "in:inbox",
            Self::Sent => "in:sent",
            Self::All => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub scope: MailScope,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self { scope: MailScope::All }
    }
}

impl MailConfig {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConnectorError> {
        let mut config = Self::default();
        if let Some(scope) = value.get("scope").and_then(|v| v.as_str()) {
            config.scope = MailScope::parse(scope)?;
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
    snippet: String,
    #[serde(rename = "historyId")]
    history_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryList {
    #[serde(default)]
    history: Vec<HistoryRecord>,
    #[serde(rename = "historyId")]
    history_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(rename = "messagesAdded", default)]
    messages_added: Vec<HistoryMessageWrapper>,
    #[serde(rename = "messagesDeleted", default)]
    messages_deleted: Vec<HistoryMessageWrapper>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessageWrapper {
    message: MessageRef,
}

pub struct MailConnector {
    source_id: String,
    client: ProviderClient,
    config: MailConfig,
}

impl MailConnector {
    #[must_use]
    pub fn new(source_id: impl Into<String>, client: ProviderClient, config: MailConfig) -> Self {
        Self {
            source_id: source_id.into(),
            client,
            config,
        }
    }
}

#[async_trait]
impl Connector for MailConnector {
    fn connector_type(&self) -> &str {
        "mail"
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
        let _: serde_json::Value = self.client.get_json(&ctx, "/users/me/profile", &[]).await?;
        Ok(())
    }

    async fn full_sync(&self, ctx: CancellationToken) -> Result<SyncStreams<RawDocument>, ConnectorError> {
        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);

        let client = self.client.clone();
        let query = self.config.scope.label_query().to_string();

        tokio::spawn(async move {
            let mut page_token: Option<String> = None;
            let mut last_history_id = String::new();

            loop {
                if ctx.is_cancelled() {
                    let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::Cancelled)).await;
                    return;
                }

                let mut params = vec![("maxResults", "100".to_string())];
                if !query.is_empty() {
                    params.push(("q", query.clone()));
                }
                if let Some(token) = &page_token {
                    params.push(("pageToken", token.clone()));
                }

                let list: MessageList = match client.get_json(&ctx, "/users/me/messages", &params).await {
                    Ok(list) => list,
                    Err(e) => {
                        let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                        return;
                    }
                };

                for reference in list.messages {
                    let message: Message = match client
                        .get_json(&ctx, &format!("/users/me/messages/{}", reference.id), &[])
                        .await
                    {
                        Ok(message) => message,
                        Err(e) if e.is_skippable() => continue,
                        Err(e) => {
                            let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                            return;
                        }
                    };
                    last_history_id = message.history_id.clone();
                    let mut metadata = HashMap::new();
                    metadata.insert("thread_id".to_string(), message.thread_id.clone());
                    let doc = RawDocument {
                        source_id: String::new(),
                        uri: format!("mail://messages/{}", message.id),
                        mime_type: "message/rfc822".to_string(),
                        content: message.snippet.into_bytes(),
                        parent_uri: Some(format!("mail://threads/{}", message.thread_id)),
                        metadata,
                        title: format!("message {}", message.id),
                    };
                    if doc_tx.send(doc).await.is_err() {
                        return;
                    }
                }

                page_token = list.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }

            let cursor = HistoryIdCursor {
                version: sercha_cursor::HISTORY_ID_CURSOR_VERSION,
                history_id: (!last_history_id.is_empty()).then_some(last_history_id),
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
        let prior_cursor = HistoryIdCursor::decode(&prior.cursor)
            .map_err(|e| ConnectorError::InvalidCursor(e.to_string()))?;
        let Some(start_history_id) = prior_cursor.history_id else {
            return Err(ConnectorError::HistoryIdExpired);
        };

        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);
        let client = self.client.clone();

        tokio::spawn(async move {
            if ctx.is_cancelled() {
                let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::Cancelled)).await;
                return;
            }

            let params = vec![("startHistoryId", start_history_id.clone())];
            let list: HistoryList = match client.get_json(&ctx, "/users/me/history", &params).await {
                Ok(list) => list,
                Err(ConnectorError::NotFound) => {
                    let _ = term_tx.send(SyncOutcome::Failed(ConnectorError::HistoryIdExpired)).await;
                    return;
                }
                Err(e) => {
                    let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                    return;
                }
            };
            let last_history_id = list.history_id.clone();

            for record in list.history {
                for added in record.messages_added {
                    let message: Message = match client
                        .get_json(&ctx, &format!("/users/me/messages/{}", added.message.id), &[])
                        .await
                    {
                        Ok(message) => message,
                        Err(e) if e.is_skippable() => continue,
                        Err(e) => {
                            let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                            return;
                        }
                    };
                    let change = RawDocumentChange {
                        kind: ChangeKind::Updated,
                        document: RawDocument {
                            source_id: String::new(),
                            uri: format!("mail://messages/{}", message.id),
                            mime_type: "message/rfc822".to_string(),
                            content: message.snippet.clone().into_bytes(),
                            parent_uri: Some(format!("mail://threads/{}", message.thread_id)),
                            metadata: HashMap::from([(
                                "thread_id".to_string(),
                                message.thread_id.clone(),
                            )]),
                            title: format!("message {}", message.id),
                        },
                    };
                    if doc_tx.send(change).await.is_err() {
                        return;
                    }
                }
                for deleted in record.messages_deleted {
                    let change = RawDocumentChange {
                        kind: ChangeKind::Deleted,
                        document: RawDocument {
                            uri: format!("mail://messages/{}", deleted.message.id),
                            ..RawDocument::default()
                        },
                    };
                    if doc_tx.send(change).await.is_err() {
                        return;
                    }
                }
            }

            let cursor = HistoryIdCursor {
                version: sercha_cursor::HISTORY_ID_CURSOR_VERSION,
                history_id: Some(last_history_id),
            }
            .encode();
            let _ = term_tx.send(SyncOutcome::Complete { cursor }).await;
        });

        Ok(SyncStreams::new(doc_rx, term_rx))
    }

    async fn get_account_identifier(&self, access_token: &str) -> Result<String, ConnectorError> {
        #[derive(Deserialize)]
        struct Profile {
            #[serde(rename = "emailAddress")]
            email_address: String,
        }
        let profile: Profile = self
            .client
            .get_json_with_token(access_token, "/users/me/profile")
            .await?;
        Ok(profile.email_address)
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_known_values() {
        assert!(matches!(MailScope::parse("inbox"), Ok(MailScope::Inbox)));
        assert!(MailScope::parse("drafts").is_err());
    }

    #[test]
    fn config_defaults_to_all_mail() {
        let config = MailConfig::from_json(&serde_json::json!({})).unwrap();
        assert_eq!(config.scope, MailScope::All);
    }
}

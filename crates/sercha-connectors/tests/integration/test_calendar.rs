use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sercha_connectors::calendar::{CalendarConfig, CalendarConnector};
use sercha_core::connector::{Connector, RawDocument, SyncOutcome};

use crate::common::test_client;

async fn drain(mut streams: sercha_core::connector::SyncStreams<RawDocument>) -> (Vec<RawDocument>, SyncOutcome) {
    let mut docs = Vec::new();
    loop {
        tokio::select! {
            Some(doc) = streams.documents.recv() => docs.push(doc),
            Some(outcome) = streams.terminal.recv() => return (docs, outcome),
            else => panic!("terminal channel closed with no outcome"),
        }
    }
}

#[tokio::test]
async fn full_sync_skips_cancelled_events_and_links_recurring_instances() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "id": "evt1",
                    "summary": "Weekly Sync",
                    "status": "confirmed",
                    "recurringEventId": "series1"
                },
                {
                    "id": "evt2",
                    "summary": "Cancelled Meeting",
                    "status": "cancelled"
                }
            ],
            "nextSyncToken": "sync-token-1"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let connector = CalendarConnector::new(
        "src-1",
        client,
        CalendarConfig {
            calendar_id: "primary".to_string(),
        },
    );

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].uri, "cal://primary/events/evt1");
    assert_eq!(docs[0].parent_uri.as_deref(), Some("cal://primary/events/series1"));
    match outcome {
        SyncOutcome::Complete { cursor } => assert!(!cursor.is_empty()),
        SyncOutcome::Failed(e) => panic!("unexpected failure: {e}"),
    }
}

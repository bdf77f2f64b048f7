use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sercha_connectors::mail::{MailConfig, MailConnector};
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
async fn full_sync_fetches_each_listed_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{"id": "m1", "threadId": "t1"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "m1",
            "threadId": "t1",
            "snippet": "hello there",
            "historyId": "1000"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let connector = MailConnector::new("src-1", client, MailConfig::default());

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].uri, "mail://messages/m1");
    assert_eq!(docs[0].parent_uri.as_deref(), Some("mail://threads/t1"));
    match outcome {
        SyncOutcome::Complete { cursor } => assert!(!cursor.is_empty()),
        SyncOutcome::Failed(e) => panic!("unexpected failure: {e}"),
    }
}

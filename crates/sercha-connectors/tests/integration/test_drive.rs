use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sercha_connectors::drive::{DriveConfig, DriveConnector};
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
async fn full_sync_exports_google_docs_as_plain_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "doc1",
                "name": "Quarterly Plan",
                "mimeType": "application/vnd.google-apps.document",
                "trashed": false
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/doc1/export"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"plan contents".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "startPageToken": "page-1"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let connector = DriveConnector::new("src-1", client, DriveConfig::default());

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].uri, "drive://files/doc1");
    assert_eq!(docs[0].mime_type, "text/plain");
    assert_eq!(docs[0].content, b"plan contents");
    match outcome {
        SyncOutcome::Complete { cursor } => assert!(!cursor.is_empty()),
        SyncOutcome::Failed(e) => panic!("unexpected failure: {e}"),
    }
}

#[tokio::test]
async fn trashed_file_is_skipped_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "doc1",
                "name": "Old Draft",
                "mimeType": "text/plain",
                "trashed": true,
                "size": "12"
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "startPageToken": "page-1"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let connector = DriveConnector::new("src-1", client, DriveConfig::default());

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, _outcome) = drain(streams).await;

    assert!(docs.is_empty());
}

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sercha_connectors::codehost::{CodeHostConfig, CodeHostConnector, ContentFamily};
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
async fn full_sync_emits_files_and_skips_oversized_blobs() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived": false,
            "fork": false,
            "default_branch": "main"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/git/trees/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "tree-sha-1",
            "tree": [
                {
                    "path": "README.md",
                    "type": "blob",
                    "size": 20,
                    "url": format!("{}/repos/acme/widgets/git/blobs/readme", server.uri())
                },
                {
                    "path": "huge.bin",
                    "type": "blob",
                    "size": 5_000_000,
                    "url": format!("{}/repos/acme/widgets/git/blobs/huge", server.uri())
                }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/git/blobs/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": base64_of("hello world"),
            "encoding": "base64"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let config = CodeHostConfig {
        repositories: vec!["acme/widgets".to_string()],
        content: vec![ContentFamily::Files],
        include_archived: false,
        include_forks: false,
        max_blob_bytes: 1024,
    };
    let connector = CodeHostConnector::new("src-1", client, config);

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].uri, "gh://acme/widgets/blob/main/README.md");
    assert!(matches!(outcome, SyncOutcome::Complete { .. }));
}

#[tokio::test]
async fn archived_repository_is_skipped_when_not_included() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/archived"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived": true,
            "fork": false,
            "default_branch": "main"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let config = CodeHostConfig {
        repositories: vec!["acme/archived".to_string()],
        content: vec![ContentFamily::Files],
        include_archived: false,
        include_forks: false,
        max_blob_bytes: 1024,
    };
    let connector = CodeHostConnector::new("src-1", client, config);

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert!(docs.is_empty());
    assert!(matches!(outcome, SyncOutcome::Complete { .. }));
}

#[tokio::test]
async fn full_sync_emits_wiki_pages_and_tracks_commit_sha() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived": false,
            "fork": false,
            "default_branch": "main"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/wiki"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "commit_sha": "wiki-sha-1",
            "pages": [
                { "title": "Home", "body": "# Welcome" }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let config = CodeHostConfig {
        repositories: vec!["acme/widgets".to_string()],
        content: vec![ContentFamily::Wikis],
        include_archived: false,
        include_forks: false,
        max_blob_bytes: 1024,
    };
    let connector = CodeHostConnector::new("src-1", client, config);

    let streams = connector.full_sync(CancellationToken::new()).await.unwrap();
    let (docs, outcome) = drain(streams).await;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].uri, "gh://acme/widgets/wiki/Home");
    assert!(matches!(outcome, SyncOutcome::Complete { .. }));
}

fn base64_of(s: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(s.as_bytes())
}

//! Code-host adapter (GitHub-shaped REST API)
//!
//! Container: repository. Cursor shape: per-repository map
//! ([`RepoMapCursor`]), since the provider exposes many independent
//! top-level containers rather than one global change log.

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
use sercha_cursor::{RepoMapCursor, RepoProgress};

use crate::http::ProviderClient;

/// Content families this adapter can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFamily {
    Files,
    Issues,
    PullRequests,
    Wikis,
}

impl ContentFamily {
    fn parse(value: &str) -> Result<Self, ConnectorError> {
        match value {
            "files" => Ok(Self::Files),
            "issues" => Ok(Self::Issues),
            "pull_requests" => Ok(Self::PullRequests),
            "wikis" => Ok(Self::Wikis),
            other => Err(ConnectorError::InvalidInput(format!(
                "unknown code-host content type: {other}"
            ))),
        }
    }
}

/// Adapter-level configuration, parsed from `Source::configuration`.
#[derive(Debug, Clone)]
pub struct CodeHostConfig {
    /// `owner/name` pairs to sync; discovery is scoped to this list
    /// rather than the whole authenticated account.
    pub repositories: Vec<String>,
    pub content: Vec<ContentFamily>,
    pub include_archived: bool,
    pub include_forks: bool,
    /// Code blobs larger than this are skipped silently (spec: 1 MiB).
    pub max_blob_bytes: u64,
}

impl Default for CodeHostConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            content: vec![ContentFamily::Files, ContentFamily::Issues, ContentFamily::PullRequests],
            include_archived: false,
            include_forks: false,
            max_blob_bytes: 1024 * 1024,
        }
    }
}

impl CodeHostConfig {
    /// Parses configuration from the source's JSON configuration blob.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConnectorError> {
        let mut config = Self::default();

        if let Some(repos) = value.get("repositories").and_then(|v| v.as_array()) {
            config.repositories = repos
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        if let Some(content) = value.get("content").and_then(|v| v.as_array()) {
            config.content = content
                .iter()
                .filter_map(|v| v.as_str())
                .map(ContentFamily::parse)
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Some(archived) = value.get("include_archived").and_then(|v| v.as_bool()) {
            config.include_archived = archived;
        }
        if let Some(forks) = value.get("include_forks").and_then(|v| v.as_bool()) {
            config.include_forks = forks;
        }
        if let Some(max_bytes) = value.get("max_blob_bytes").and_then(|v| v.as_u64()) {
            config.max_blob_bytes = max_bytes;
        }

        Ok(config)
    }

    fn wants(&self, family: ContentFamily) -> bool {
        self.content.contains(&family)
    }
}

#[derive(Debug, Deserialize)]
struct RepoMeta {
    archived: bool,
    fork: bool,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    sha: String,
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: Option<u64>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct WikiResponse {
    commit_sha: String,
    pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// A connector instance bound to one source, implementing the
/// code-host adapter.
pub struct CodeHostConnector {
    source_id: String,
    client: ProviderClient,
    config: CodeHostConfig,
}

impl CodeHostConnector {
    #[must_use]
    pub fn new(source_id: impl Into<String>, client: ProviderClient, config: CodeHostConfig) -> Self {
        Self {
            source_id: source_id.into(),
            client,
            config,
        }
    }
}

#[async_trait]
impl Connector for CodeHostConnector {
    fn connector_type(&self) -> &str {
        "code_host"
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_incremental: true,
            supports_watch: false,
            supports_hierarchy: false,
            supports_binary: true,
            requires_auth: true,
            supports_validation: true,
            supports_cursor_return: true,
            supports_partial_sync: true,
            supports_rate_limiting: true,
            supports_pagination: true,
        }
    }

    async fn validate(&self, ctx: CancellationToken) -> Result<(), ConnectorError> {
        let _: serde_json::Value = self.client.get_json(&ctx, "/user", &[]).await?;
        Ok(())
    }

    async fn full_sync(&self, ctx: CancellationToken) -> Result<SyncStreams<RawDocument>, ConnectorError> {
        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);

        let repos = self.config.repositories.clone();
        let connector = self.clone_parts();

        tokio::spawn(async move {
            let mut progress = HashMap::new();

            for repo in repos {
                if ctx.is_cancelled() {
                    break;
                }
                match run_full_repo(&connector, &ctx, &repo, &doc_tx).await {
                    Ok(repo_progress) => {
                        progress.insert(repo, repo_progress);
                    }
                    Err(e) if e.is_skippable() => {
                        tracing::warn!(repo, error = %e, "repository skipped");
                    }
                    Err(e) => {
                        let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                        return;
                    }
                }
            }

            let cursor = RepoMapCursor {
                version: sercha_cursor::REPO_MAP_CURSOR_VERSION,
                repos: progress,
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
        let prior_cursor = RepoMapCursor::decode(&prior.cursor).map_err(|e| {
            ConnectorError::InvalidCursor(e.to_string())
        })?;

        let (doc_tx, doc_rx) = mpsc::channel(64);
        let (term_tx, term_rx) = mpsc::channel(1);

        let repos = self.config.repositories.clone();
        let connector = self.clone_parts();

        tokio::spawn(async move {
            let mut progress = prior_cursor.repos.clone();

            for repo in repos {
                if ctx.is_cancelled() {
                    break;
                }
                let prior_repo = prior_cursor.repos.get(&repo).cloned().unwrap_or_default();
                match run_incremental_repo(&connector, &ctx, &repo, &prior_repo, &doc_tx).await {
                    Ok(repo_progress) => {
                        progress.insert(repo, repo_progress);
                    }
                    Err(e) if e.is_skippable() => {
                        tracing::warn!(repo, error = %e, "repository skipped");
                    }
                    Err(e) => {
                        let _ = term_tx.send(SyncOutcome::Failed(e)).await;
                        return;
                    }
                }
            }

            let cursor = RepoMapCursor {
                version: sercha_cursor::REPO_MAP_CURSOR_VERSION,
                repos: progress,
            }
            .encode();
            let _ = term_tx.send(SyncOutcome::Complete { cursor }).await;
        });

        Ok(SyncStreams::new(doc_rx, term_rx))
    }

    async fn get_account_identifier(&self, access_token: &str) -> Result<String, ConnectorError> {
        #[derive(Deserialize)]
        struct Me {
            login: String,
        }
        let me: Me = self.client.get_json_with_token(access_token, "/user").await?;
        Ok(me.login)
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// The pieces of `CodeHostConnector` that need to move into the spawned
/// discovery task. `ProviderClient` and `CodeHostConfig` hold no
/// per-connector mutable state, so cloning them is cheap and sidesteps
/// threading a borrow of `self` through a `'static` task.
#[derive(Clone)]
struct ConnectorParts {
    client: ProviderClient,
    config: CodeHostConfig,
}

impl CodeHostConnector {
    fn clone_parts(&self) -> ConnectorParts {
        ConnectorParts {
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}

async fn run_full_repo(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
    doc_tx: &mpsc::Sender<RawDocument>,
) -> Result<RepoProgress, ConnectorError> {
    let meta = parts_repo_meta(parts, ctx, repo).await?;
    if (meta.archived && !parts.config.include_archived) || (meta.fork && !parts.config.include_forks) {
        return Err(ConnectorError::Forbidden(format!(
            "{repo} excluded by archived/fork policy"
        )));
    }

    let mut progress = RepoProgress::default();

    if parts.config.wants(ContentFamily::Files) {
        let (tree_sha, files) = parts_discover_files(parts, ctx, repo, &meta.default_branch).await?;
        for entry in &files {
            if let Some(bytes) = parts_fetch_blob(parts, ctx, repo, entry).await? {
                let doc = RawDocument {
                    source_id: String::new(),
                    uri: format!("gh://{repo}/blob/{}/{}", meta.default_branch, entry.path),
                    mime_type: "application/octet-stream".to_string(),
                    content: bytes,
                    parent_uri: None,
                    metadata: HashMap::new(),
                    title: entry.path.clone(),
                };
                if doc_tx.send(doc).await.is_err() {
                    return Err(ConnectorError::Cancelled);
                }
            }
        }
        progress.files_tree_sha = Some(tree_sha);
    }

    if parts.config.wants(ContentFamily::Issues) || parts.config.wants(ContentFamily::PullRequests) {
        let issues = parts_discover_issues(parts, ctx, repo, None).await?;
        let mut latest_seen = progress.issues_since.clone();
        for issue in &issues {
            let is_pr = issue.pull_request.is_some();
            if is_pr && !parts.config.wants(ContentFamily::PullRequests) {
                continue;
            }
            if !is_pr && !parts.config.wants(ContentFamily::Issues) {
                continue;
            }
            let doc = parts_issue_document(repo, issue);
            if doc_tx.send(doc).await.is_err() {
                return Err(ConnectorError::Cancelled);
            }
            latest_seen = Some(issue.updated_at.clone());
        }
        progress.issues_since = latest_seen;
    }

    if parts.config.wants(ContentFamily::Wikis) {
        let wiki = parts_discover_wikis(parts, ctx, repo).await?;
        for page in &wiki.pages {
            let doc = parts_wiki_document(repo, page);
            if doc_tx.send(doc).await.is_err() {
                return Err(ConnectorError::Cancelled);
            }
        }
        progress.wiki_commit_sha = Some(wiki.commit_sha);
    }

    Ok(progress)
}

async fn run_incremental_repo(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
    prior: &RepoProgress,
    doc_tx: &mpsc::Sender<RawDocumentChange>,
) -> Result<RepoProgress, ConnectorError> {
    let meta = parts_repo_meta(parts, ctx, repo).await?;
    let mut progress = prior.clone();

    if parts.config.wants(ContentFamily::Files) {
        let (tree_sha, files) = parts_discover_files(parts, ctx, repo, &meta.default_branch).await?;
        if prior.files_tree_sha.as_deref() != Some(tree_sha.as_str()) {
            for entry in &files {
                if let Some(bytes) = parts_fetch_blob(parts, ctx, repo, entry).await? {
                    let change = RawDocumentChange {
                        kind: ChangeKind::Updated,
                        document: RawDocument {
                            source_id: String::new(),
                            uri: format!("gh://{repo}/blob/{}/{}", meta.default_branch, entry.path),
                            mime_type: "application/octet-stream".to_string(),
                            content: bytes,
                            parent_uri: None,
                            metadata: HashMap::new(),
                            title: entry.path.clone(),
                        },
                    };
                    if doc_tx.send(change).await.is_err() {
                        return Err(ConnectorError::Cancelled);
                    }
                }
            }
        }
        progress.files_tree_sha = Some(tree_sha);
    }

    if parts.config.wants(ContentFamily::Issues) || parts.config.wants(ContentFamily::PullRequests) {
        let issues = parts_discover_issues(parts, ctx, repo, prior.issues_since).await?;
        let mut latest_seen = prior.issues_since.clone();
        for issue in &issues {
            let is_pr = issue.pull_request.is_some();
            if is_pr && !parts.config.wants(ContentFamily::PullRequests) {
                continue;
            }
            if !is_pr && !parts.config.wants(ContentFamily::Issues) {
                continue;
            }
            let change = RawDocumentChange {
                kind: ChangeKind::Updated,
                document: parts_issue_document(repo, issue),
            };
            if doc_tx.send(change).await.is_err() {
                return Err(ConnectorError::Cancelled);
            }
            latest_seen = Some(issue.updated_at.clone());
        }
        progress.issues_since = latest_seen;
    }

    if parts.config.wants(ContentFamily::Wikis) {
        let wiki = parts_discover_wikis(parts, ctx, repo).await?;
        if prior.wiki_commit_sha.as_deref() != Some(wiki.commit_sha.as_str()) {
            for page in &wiki.pages {
                let change = RawDocumentChange {
                    kind: ChangeKind::Updated,
                    document: parts_wiki_document(repo, page),
                };
                if doc_tx.send(change).await.is_err() {
                    return Err(ConnectorError::Cancelled);
                }
            }
        }
        progress.wiki_commit_sha = Some(wiki.commit_sha);
    }

    Ok(progress)
}

async fn parts_repo_meta(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
) -> Result<RepoMeta, ConnectorError> {
    parts.client.get_json(ctx, &format!("/repos/{repo}"), &[]).await
}

async fn parts_discover_files(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
    branch: &str,
) -> Result<(String, Vec<TreeEntry>), ConnectorError> {
    let response: TreeResponse = parts
        .client
        .get_json(
            ctx,
            &format!("/repos/{repo}/git/trees/{branch}"),
            &[("recursive", "1".to_string())],
        )
        .await?;
    let files = response
        .tree
        .into_iter()
        .filter(|e| e.entry_type == "blob")
        .collect();
    Ok((response.sha, files))
}

async fn parts_fetch_blob(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
    entry: &TreeEntry,
) -> Result<Option<Vec<u8>>, ConnectorError> {
    if entry.size.unwrap_or(0) > parts.config.max_blob_bytes {
        return Ok(None);
    }
    match parts.client.get_json::<BlobResponse>(ctx, &entry.url, &[]).await {
        Ok(blob) if blob.encoding == "base64" => {
            use base64::Engine;
            let cleaned: String = blob.content.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(cleaned)
                .map(Some)
                .map_err(|e| ConnectorError::decode(format!("{repo}:{}", entry.path), e))
        }
        Ok(_) => Err(ConnectorError::decode(
            format!("{repo}:{}", entry.path),
            anyhow::anyhow!("unsupported blob encoding"),
        )),
        Err(e) if e.is_skippable() => Ok(None),
        Err(e) => Err(e),
    }
}

async fn parts_discover_issues(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
    since: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<Vec<Issue>, ConnectorError> {
    let mut query = vec![("state", "all".to_string()), ("per_page", "100".to_string())];
    if let Some(since) = since {
        query.push(("since", since.to_rfc3339()));
    }
    parts.client.get_json(ctx, &format!("/repos/{repo}/issues"), &query).await
}

async fn parts_discover_wikis(
    parts: &ConnectorParts,
    ctx: &CancellationToken,
    repo: &str,
) -> Result<WikiResponse, ConnectorError> {
    parts.client.get_json(ctx, &format!("/repos/{repo}/wiki"), &[]).await
}

fn parts_wiki_document(repo: &str, page: &WikiPage) -> RawDocument {
    RawDocument {
        source_id: String::new(),
        uri: format!("gh://{repo}/wiki/{}", page.title),
        mime_type: "text/markdown".to_string(),
        content: page.body.clone().into_bytes(),
        parent_uri: None,
        metadata: HashMap::new(),
        title: page.title.clone(),
    }
}

fn parts_issue_document(repo: &str, issue: &Issue) -> RawDocument {
    let is_pr = issue.pull_request.is_some();
    let uri = if is_pr {
        format!("gh://{repo}/pull/{}", issue.number)
    } else {
        format!("gh://{repo}/issues/{}", issue.number)
    };
    let mut metadata = HashMap::new();
    metadata.insert("state".to_string(), issue.state.clone());
    metadata.insert("number".to_string(), issue.number.to_string());

    RawDocument {
        source_id: String::new(),
        uri,
        mime_type: if is_pr {
            "application/vnd.sercha.pull-request+json".to_string()
        } else {
            "application/vnd.sercha.issue+json".to_string()
        },
        content: issue.body.clone().unwrap_or_default().into_bytes(),
        parent_uri: None,
        metadata,
        title: issue.title.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_family_rejects_unknown_values() {
        assert!(ContentFamily::parse("issues").is_ok());
        assert!(ContentFamily::parse("spreadsheets").is_err());
    }

    #[test]
    fn config_from_json_parses_explicit_fields() {
        let value = serde_json::json!({
            "repositories": ["a/b", "c/d"],
            "content": ["files", "issues"],
            "include_archived": true,
            "max_blob_bytes": 2048,
        });
        let config = CodeHostConfig::from_json(&value).unwrap();
        assert_eq!(config.repositories, vec!["a/b", "c/d"]);
        assert!(config.wants(ContentFamily::Files));
        assert!(!config.wants(ContentFamily::PullRequests));
        assert!(config.include_archived);
        assert_eq!(config.max_blob_bytes, 2048);
    }

    #[test]
    fn config_from_json_rejects_unknown_content_type() {
        let value = serde_json::json!({ "content": ["spreadsheets"] });
        assert!(CodeHostConfig::from_json(&value).is_err());
    }

    #[test]
    fn config_from_json_parses_wikis() {
        let value = serde_json::json!({ "content": ["wikis"] });
        let config = CodeHostConfig::from_json(&value).unwrap();
        assert!(config.wants(ContentFamily::Wikis));
        assert!(!config.wants(ContentFamily::Files));
    }

    #[test]
    fn wiki_document_uses_the_wiki_uri_scheme() {
        let page = WikiPage {
            title: "Home".to_string(),
            body: "# Welcome".to_string(),
        };
        let doc = parts_wiki_document("acme/widgets", &page);
        assert_eq!(doc.uri, "gh://acme/widgets/wiki/Home");
        assert_eq!(doc.mime_type, "text/markdown");
        assert_eq!(doc.content, b"# Welcome");
    }
}

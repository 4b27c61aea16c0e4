use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use shiplog_core::change_request::sort_newest_first;
use shiplog_core::{ChangeRequestSummary, RepoRef};
use tracing::debug;

use super::{FetchError, RepositoryClient};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
/// The search API stops at 1000 results.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
    title: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    user: Option<SearchUser>,
    #[serde(default)]
    pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Queries merged pull requests through the GitHub issue search API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// API root, e.g. "https://api.github.com" or a GitHub Enterprise URL.
    base_url: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shiplog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transient(format!("HTTP client init: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search_page(
        &self,
        query: &str,
        credential: &str,
        page: usize,
    ) -> Result<Vec<SearchItem>, FetchError> {
        let resp = self
            .client
            .get(format!("{}/search/issues", self.base_url))
            .query(&[
                ("q", query.to_string()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ])
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {credential}"))
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| FetchError::Transient(format!("HTTP request failed: {e}")))?;

        let resp = check_status(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transient(format!("read body: {e}")))?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::MalformedResponse(format!("search response: {e}")))?;
        Ok(parsed.items)
    }
}

/// Build the search query. The `merged:>=` qualifier drops sub-second
/// precision, so callers still filter on the exact timestamp.
fn search_query(repo: &RepoRef, since: Option<DateTime<Utc>>) -> String {
    let mut query = format!("is:pr is:merged repo:{}/{}", repo.owner, repo.name);
    if let Some(since) = since {
        query.push_str(&format!(" merged:>={}", since.format("%Y-%m-%dT%H:%M:%SZ")));
    }
    query
}

/// Map a non-success response onto the failure classes.
async fn check_status(resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let rate_limit_exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let message = resp
        .json::<ApiMessage>()
        .await
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let detail = format!("GitHub API error {}: {message}", status.as_u16());

    Err(match status {
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized(detail),
        StatusCode::FORBIDDEN if rate_limit_exhausted => FetchError::RateLimited(detail),
        StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
            FetchError::RateLimited(detail)
        }
        StatusCode::FORBIDDEN => FetchError::Unauthorized(detail),
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT => FetchError::Transient(detail),
        s if s.is_server_error() => FetchError::Transient(detail),
        _ => FetchError::InvalidInput(detail),
    })
}

fn to_summary(item: SearchItem) -> Option<ChangeRequestSummary> {
    let merged_at = item.pull_request.and_then(|pr| pr.merged_at)?;
    Some(ChangeRequestSummary {
        number: item.number,
        title: item.title,
        merged_at,
        url: item.html_url,
        author: item.user.map(|u| u.login),
    })
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_merged_since(
        &self,
        owner: &str,
        name: &str,
        credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChangeRequestSummary>, FetchError> {
        let repo =
            RepoRef::new(owner, name).map_err(|e| FetchError::InvalidInput(e.to_string()))?;
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(FetchError::InvalidInput(format!(
                "no credential configured for {repo}"
            )));
        }

        let query = search_query(&repo, since);
        debug!("github: searching {query}");

        let mut merged = Vec::new();
        for page in 1..=MAX_PAGES {
            let items = self.search_page(&query, credential, page).await?;
            let short_page = items.len() < PER_PAGE;
            merged.extend(
                items
                    .into_iter()
                    .filter_map(to_summary)
                    .filter(|c| since.map_or(true, |s| c.merged_at >= s)),
            );
            if short_page {
                break;
            }
        }

        sort_newest_first(&mut merged);
        debug!("github: {repo} has {} merged change requests", merged.len());
        Ok(merged)
    }
}

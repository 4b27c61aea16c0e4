use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shiplog_core::change_request::sort_newest_first;
use shiplog_core::ChangeRequestSummary;

use super::{FetchError, RepositoryClient};

type Response = Result<Vec<ChangeRequestSummary>, FetchError>;

/// One recorded `fetch_merged_since` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub repository: String,
    pub credential: String,
    pub since: Option<DateTime<Utc>>,
}

/// A mock repository client for testing. Responses are queued per
/// `owner/name`; once a queue is empty the repository reports nothing new.
#[derive(Default)]
pub struct MockRepositoryClient {
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    calls: Mutex<Vec<FetchCall>>,
    call_count: AtomicU64,
}

impl MockRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for `full_name` ("owner/name").
    pub fn push_ok(&self, full_name: &str, changes: Vec<ChangeRequestSummary>) {
        self.push(full_name, Ok(changes));
    }

    /// Queue a failure for `full_name`.
    pub fn push_err(&self, full_name: &str, err: FetchError) {
        self.push(full_name, Err(err));
    }

    fn push(&self, full_name: &str, response: Response) {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(full_name.to_string())
                .or_default()
                .push_back(response);
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RepositoryClient for MockRepositoryClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_merged_since(
        &self,
        owner: &str,
        name: &str,
        credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChangeRequestSummary>, FetchError> {
        let repository = format!("{owner}/{name}");
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(FetchCall {
                repository: repository.clone(),
                credential: credential.to_string(),
                since,
            });
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut r| r.get_mut(&repository).and_then(VecDeque::pop_front));
        let mut changes = match next {
            Some(response) => response?,
            None => Vec::new(),
        };
        changes.retain(|c| since.map_or(true, |s| c.merged_at >= s));
        sort_newest_first(&mut changes);
        Ok(changes)
    }
}

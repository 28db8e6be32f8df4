//! Cursor pagination engine.
//!
//! [`Paginator::fetch_all`] walks a [`PageSource`] from the first page until
//! one of these holds, checked in this order after every page:
//!
//! 1. upstream returned no next cursor ([`StoppedReason::Exhausted`]);
//! 2. the caller's item limit is reached ([`StoppedReason::CallerLimitReached`]);
//! 3. the page ceiling is reached ([`StoppedReason::SafetyLimitReached`]).
//!
//! A failed page stops the walk with [`StoppedReason::UpstreamError`] and
//! keeps everything gathered so far. A rate-limited page is retried exactly
//! once after the upstream retry-after hint (bounded by `max_backoff`).
//!
//! Items are passed through in upstream order. Duplicates from a
//! misbehaving cursor are not removed.

use crate::client::{RateLimitInfo, UpstreamClient, UpstreamRequest};
use crate::error::RequestError;
use async_trait::async_trait;
use chrono::Utc;
use outbound_core::PaginationConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause used when a 429 carries no retry-after hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Opaque position in an upstream list.
///
/// Only the engine creates cursors, and only from a page response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page returned by a [`PageSource`].
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Raw next-cursor token; `None` on the last page.
    pub next_cursor: Option<String>,
    pub rate_limit: RateLimitInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor,
            rate_limit: RateLimitInfo::default(),
        }
    }
}

/// Something that can fetch one page of a cursor-paginated list.
#[async_trait]
pub trait PageSource<T: Send>: Send + Sync {
    /// Fetch the page at `cursor` (`None` is the first page).
    async fn fetch_page(&self, cursor: Option<&Cursor>, page_size: u32)
    -> Result<Page<T>, RequestError>;

    /// Short label for logs.
    fn label(&self) -> String {
        "list".to_string()
    }
}

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedReason {
    Exhausted,
    SafetyLimitReached,
    CallerLimitReached,
    UpstreamError,
}

impl fmt::Display for StoppedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoppedReason::Exhausted => "exhausted",
            StoppedReason::SafetyLimitReached => "safety_limit_reached",
            StoppedReason::CallerLimitReached => "caller_limit_reached",
            StoppedReason::UpstreamError => "upstream_error",
        };
        f.write_str(s)
    }
}

/// Outcome of [`Paginator::fetch_all`].
#[derive(Debug)]
pub struct PaginationResult<T> {
    /// Items in upstream order.
    pub items: Vec<T>,
    /// True when the walk ended because upstream had nothing more or the
    /// caller's own limit was met.
    pub is_complete: bool,
    pub total_fetched: usize,
    pub pages_fetched: u32,
    pub stopped_reason: StoppedReason,
    /// The failure that ended the walk, for `UpstreamError`.
    pub error: Option<RequestError>,
}

impl<T> PaginationResult<T> {
    fn finish(
        items: Vec<T>,
        pages_fetched: u32,
        stopped_reason: StoppedReason,
        error: Option<RequestError>,
    ) -> Self {
        let is_complete = matches!(
            stopped_reason,
            StoppedReason::Exhausted | StoppedReason::CallerLimitReached
        );
        Self {
            total_fetched: items.len(),
            items,
            is_complete,
            pages_fetched,
            stopped_reason,
            error,
        }
    }
}

/// Progress snapshot passed to the progress callback after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub pages: u32,
    pub fetched: usize,
    /// Upper bound on what the walk will collect.
    pub ceiling: usize,
}

type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Limits for a single walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    pub page_size: u32,
    pub max_page_size: u32,
    pub max_pages: u32,
    pub max_items: usize,
    pub max_backoff: Duration,
}

impl PaginationParams {
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            page_size: config.page_size.clamp(1, config.max_page_size.max(1)),
            max_page_size: config.max_page_size.max(1),
            max_pages: config.max_pages.max(1),
            max_items: config.max_items,
            max_backoff: Duration::from_secs(config.max_backoff_seconds),
        }
    }

    /// Override the page size, clamped to the configured maximum.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, self.max_page_size);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

/// Drives a [`PageSource`] to completion.
#[derive(Clone)]
pub struct Paginator {
    params: PaginationParams,
    progress: Option<ProgressFn>,
    cancel: CancellationToken,
}

impl Paginator {
    pub fn new(params: PaginationParams) -> Self {
        Self {
            params,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Register a progress observer. It runs inline after every page, so it
    /// must return quickly.
    pub fn with_progress(mut self, progress: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Walk every page of `source`.
    pub async fn fetch_all<T, S>(&self, source: &S) -> PaginationResult<T>
    where
        T: Send,
        S: PageSource<T> + ?Sized,
    {
        let label = source.label();
        let max_items = self.params.max_items;
        let mut items: Vec<T> = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut pages = 0u32;

        if max_items == 0 {
            return PaginationResult::finish(items, 0, StoppedReason::CallerLimitReached, None);
        }

        loop {
            let remaining = max_items - items.len();
            let page_size = self
                .params
                .page_size
                .min(u32::try_from(remaining).unwrap_or(u32::MAX));

            let page = match self.fetch_with_retry(source, cursor.as_ref(), page_size).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(
                        list = %label,
                        page = pages + 1,
                        fetched = items.len(),
                        error = %error,
                        "pagination stopped by upstream error; keeping partial results"
                    );
                    return PaginationResult::finish(
                        items,
                        pages,
                        StoppedReason::UpstreamError,
                        Some(error),
                    );
                }
            };

            pages += 1;
            let received = page.items.len();
            items.extend(page.items);
            let overflow = items.len() > max_items;
            items.truncate(max_items);
            self.report(&label, pages, items.len(), received);

            let next = page.next_cursor.filter(|c| !c.is_empty());
            let Some(next) = next else {
                let reason = if overflow {
                    StoppedReason::CallerLimitReached
                } else {
                    StoppedReason::Exhausted
                };
                return PaginationResult::finish(items, pages, reason, None);
            };
            if items.len() >= max_items {
                return PaginationResult::finish(
                    items,
                    pages,
                    StoppedReason::CallerLimitReached,
                    None,
                );
            }
            if pages >= self.params.max_pages {
                warn!(
                    list = %label,
                    pages,
                    fetched = items.len(),
                    "pagination safety ceiling reached"
                );
                return PaginationResult::finish(
                    items,
                    pages,
                    StoppedReason::SafetyLimitReached,
                    None,
                );
            }

            if let Some(wait) = page.rate_limit.wait_hint(Utc::now()) {
                let wait = wait.min(self.params.max_backoff);
                debug!(list = %label, wait_ms = wait.as_millis() as u64, "quota spent, waiting for reset");
                if let Err(error) = self.pause(wait).await {
                    return PaginationResult::finish(
                        items,
                        pages,
                        StoppedReason::UpstreamError,
                        Some(error),
                    );
                }
            }

            cursor = Some(Cursor(next));
        }
    }

    async fn fetch_with_retry<T, S>(
        &self,
        source: &S,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<Page<T>, RequestError>
    where
        T: Send,
        S: PageSource<T> + ?Sized,
    {
        match source.fetch_page(cursor, page_size).await {
            Err(RequestError::RateLimited { retry_after, .. }) => {
                let wait = retry_after
                    .unwrap_or(DEFAULT_RETRY_AFTER)
                    .min(self.params.max_backoff);
                warn!(
                    list = %source.label(),
                    wait_ms = wait.as_millis() as u64,
                    "rate limited; retrying page once"
                );
                self.pause(wait).await?;
                source.fetch_page(cursor, page_size).await
            }
            other => other,
        }
    }

    async fn pause(&self, wait: Duration) -> Result<(), RequestError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RequestError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    fn report(&self, label: &str, pages: u32, fetched: usize, received: usize) {
        info!(
            list = %label,
            page = pages,
            received,
            fetched,
            ceiling = self.params.max_items,
            "fetched {} of at most {}",
            fetched,
            self.params.max_items
        );
        if let Some(progress) = &self.progress {
            progress(Progress {
                pages,
                fetched,
                ceiling: self.params.max_items,
            });
        }
    }
}

/// A cursor-paginated upstream list endpoint.
///
/// Upstream returns `{"items": [...], "next_starting_after": "<cursor>"}` and
/// accepts `limit` and `starting_after` query parameters.
#[derive(Debug, Clone)]
pub struct ListEndpoint {
    client: UpstreamClient,
    path: String,
    items_field: String,
    cursor_field: String,
    cursor_param: String,
    limit_param: String,
    extra_query: Vec<(String, String)>,
}

impl ListEndpoint {
    pub fn new(client: UpstreamClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            items_field: "items".to_string(),
            cursor_field: "next_starting_after".to_string(),
            cursor_param: "starting_after".to_string(),
            limit_param: "limit".to_string(),
            extra_query: Vec::new(),
        }
    }

    /// Add a fixed query parameter sent with every page request.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra_query.push((key.into(), value.to_string()));
        self
    }
}

#[async_trait]
impl<T> PageSource<T> for ListEndpoint
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<Page<T>, RequestError> {
        let mut request = UpstreamRequest::get(&self.path).query(&self.limit_param, page_size);
        if let Some(cursor) = cursor {
            request = request.query(&self.cursor_param, cursor.as_str());
        }
        for (key, value) in &self.extra_query {
            request = request.query(key, value);
        }

        let response = self.client.send(request).await?;
        let raw_items = match &response.body {
            Value::Array(_) => response.body.clone(),
            body => body.get(&self.items_field).cloned().unwrap_or(Value::Array(Vec::new())),
        };
        let items: Vec<T> = serde_json::from_value(raw_items).map_err(|e| {
            RequestError::Decode(format!("{}: invalid list items: {e}", self.path))
        })?;
        let next_cursor = response
            .body
            .get(&self.cursor_field)
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Page {
            items,
            next_cursor,
            rate_limit: response.rate_limit,
        })
    }

    fn label(&self) -> String {
        self.path.clone()
    }
}

//! # outbound-upstream
//!
//! Talks to the upstream email-marketing REST API.
//!
//! - [`client::UpstreamClient`] issues bearer-authenticated requests, parses
//!   rate-limit headers and classifies failures into [`RequestError`].
//! - [`pagination::Paginator`] walks a cursor-paginated list endpoint to
//!   completion, bounded by caller and safety limits, keeping partial results
//!   when a page fails.
//!
//! The client never sleeps or retries on its own. The only automatic retry
//! in the system is the single rate-limit retry inside the paginator.

pub mod client;
pub mod error;
pub mod pagination;

pub use client::{ApiKey, ParsedResponse, RateLimitInfo, UpstreamClient, UpstreamRequest};
pub use error::RequestError;
pub use pagination::{
    Cursor, ListEndpoint, Page, PageSource, PaginationParams, PaginationResult, Paginator,
    Progress, StoppedReason,
};

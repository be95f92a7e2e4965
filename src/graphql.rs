// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! GitHub GraphQL implementation of [`SearchApi`].
//!
//! Requests go through an authenticated [`Octocrab`] client with its own retry
//! layer disabled; retries and rate-limit waits are owned by the fetcher.
//! Response interpretation is a pure function ([`interpret_response`]) so the
//! status/header/body mapping is testable without a network.

use chrono::{DateTime, Utc};
use octocrab::{Octocrab, service::middleware::retry::RetryConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    api::{ApiFailure, PageRequest, PullRequestNode, RateLimitSnapshot, SearchApi, SearchPage},
    config::Credential,
    error::Error,
};

const SEARCH_QUERY: &str = r"
query($searchQuery: String!, $cursor: String, $first: Int!, $reviewer: String!) {
  rateLimit { remaining resetAt }
  search(query: $searchQuery, type: ISSUE, first: $first, after: $cursor) {
    issueCount
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        id
        number
        createdAt
        author { login }
        reviews(first: 100, author: $reviewer) { nodes { submittedAt } }
      }
    }
  }
}
";

/// Longest slice of an error body echoed into failure messages.
const MAX_ERROR_BODY: usize = 200;

/// Rate-limit related response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq,)]
pub struct RateLimitHeaders
{
    /// `x-ratelimit-remaining`.
    pub remaining:   Option<u32,>,
    /// `x-ratelimit-reset`, seconds since the Unix epoch.
    pub reset:       Option<i64,>,
    /// `retry-after`, seconds.
    pub retry_after: Option<u64,>,
}

impl RateLimitHeaders
{
    fn reset_at(&self, now: DateTime<Utc,>,) -> Option<DateTime<Utc,>,>
    {
        self.retry_after
            .and_then(|secs| i64::try_from(secs,).ok(),)
            .map(|secs| now + chrono::Duration::seconds(secs,),)
            .or_else(|| self.reset.and_then(|epoch| DateTime::from_timestamp(epoch, 0,),),)
    }
}

#[derive(Debug, Deserialize,)]
struct GraphqlResponse
{
    #[serde(default)]
    data:   Option<SearchData,>,
    #[serde(default)]
    errors: Vec<GraphqlError,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct SearchData
{
    #[serde(default)]
    rate_limit: Option<RateLimitField,>,
    search:     Option<SearchResult,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct RateLimitField
{
    remaining: u32,
    reset_at:  Option<DateTime<Utc,>,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct SearchResult
{
    #[serde(default)]
    issue_count: u64,
    page_info:   PageInfo,
    #[serde(default)]
    nodes:       Vec<Value,>,
}

#[derive(Debug, Deserialize,)]
#[serde(rename_all = "camelCase")]
struct PageInfo
{
    has_next_page: bool,
    end_cursor:    Option<String,>,
}

#[derive(Debug, Deserialize,)]
struct GraphqlError
{
    #[serde(rename = "type", default)]
    kind:    Option<String,>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize,)]
struct RestError
{
    #[serde(default)]
    message: String,
}

/// Search client speaking to `POST /graphql`.
#[derive(Debug, Clone,)]
pub struct GraphqlSearchClient
{
    octocrab: Octocrab,
}

impl GraphqlSearchClient
{
    /// Creates a client for api.github.com.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the HTTP client cannot be built.
    pub fn new(credential: &Credential,) -> Result<Self, Error,>
    {
        Self::connect(None, credential,)
    }

    /// Creates a client for a custom API root (GitHub Enterprise, mock
    /// servers).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the URI is invalid or the HTTP client
    /// cannot be built.
    pub fn with_base_uri(base_uri: &str, credential: &Credential,) -> Result<Self, Error,>
    {
        Self::connect(Some(base_uri,), credential,)
    }

    fn connect(base_uri: Option<&str,>, credential: &Credential,) -> Result<Self, Error,>
    {
        let mut builder = Octocrab::builder();
        if let Some(uri,) = base_uri {
            builder = builder.base_uri(uri,).map_err(|e| Error::Client {
                message: format!("invalid base uri '{uri}': {e}"),
            },)?;
        }

        let octocrab = builder
            .personal_token(credential.expose().to_owned(),)
            .add_retry_config(RetryConfig::None,)
            .build()
            .map_err(|e| Error::Client {
                message: e.to_string(),
            },)?;

        Ok(Self {
            octocrab,
        },)
    }
}

impl SearchApi for GraphqlSearchClient
{
    async fn search_page(&self, request: &PageRequest,) -> Result<SearchPage, ApiFailure,>
    {
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": {
                "searchQuery": request.query,
                "cursor": request.cursor,
                "first": request.page_size,
                "reviewer": request.reviewer,
            },
        });

        debug!(query = %request.query, cursor = ?request.cursor, "requesting search page");

        let response = self.octocrab._post("/graphql", Some(&body,),).await.map_err(|e| {
            ApiFailure::Transient {
                status: None, message: format!("request failed: {e}"),
            }
        },)?;

        let status = response.status().as_u16();
        let headers = {
            let header = |name: &str| {
                response
                    .headers()
                    .get(name,)
                    .and_then(|value| value.to_str().ok(),)
                    .map(|value| value.trim().to_owned(),)
            };
            RateLimitHeaders {
                remaining:   header("x-ratelimit-remaining",).and_then(|v| v.parse().ok(),),
                reset:       header("x-ratelimit-reset",).and_then(|v| v.parse().ok(),),
                retry_after: header("retry-after",).and_then(|v| v.parse().ok(),),
            }
        };

        let text = self.octocrab.body_to_string(response,).await.map_err(|e| {
            ApiFailure::Transient {
                status: Some(status,), message: format!("failed to read response body: {e}"),
            }
        },)?;

        interpret_response(status, &headers, &text, Utc::now(),)
    }
}

/// Maps a raw HTTP exchange onto a page or a classified failure.
///
/// * 2xx: decoded; GraphQL `RATE_LIMITED` errors become
///   [`ApiFailure::RateLimited`], any other GraphQL error is fatal. A body
///   that is not JSON is transient, JSON of the wrong shape is fatal, and
///   single nodes that fail to decode land in [`SearchPage::malformed`].
/// * 429, or 403 with exhausted quota / `retry-after` / a rate-limit message:
///   rate limited.
/// * 408 and 5xx: transient.
/// * Any other status: fatal.
///
/// # Errors
///
/// Returns the classified [`ApiFailure`] for every non-successful exchange.
pub fn interpret_response(
    status: u16,
    headers: &RateLimitHeaders,
    body: &str,
    now: DateTime<Utc,>,
) -> Result<SearchPage, ApiFailure,>
{
    match status {
        200..=299 => decode_page(status, headers, body, now,),
        429 => Err(ApiFailure::RateLimited {
            status: Some(status,), reset_at: headers.reset_at(now,),
        },),
        403 if headers.remaining == Some(0,)
            || headers.retry_after.is_some()
            || body.to_ascii_lowercase().contains("rate limit",) =>
        {
            Err(ApiFailure::RateLimited {
                status: Some(status,), reset_at: headers.reset_at(now,),
            },)
        }
        408 | 500..=599 => Err(ApiFailure::Transient {
            status: Some(status,), message: error_message(body,),
        },),
        _ => Err(ApiFailure::Fatal {
            status: Some(status,), message: error_message(body,),
        },),
    }
}

fn decode_page(
    status: u16,
    headers: &RateLimitHeaders,
    body: &str,
    now: DateTime<Utc,>,
) -> Result<SearchPage, ApiFailure,>
{
    let raw: Value = serde_json::from_str(body,).map_err(|e| ApiFailure::Transient {
        status: Some(status,), message: format!("undecodable GraphQL response: {e}"),
    },)?;
    let response: GraphqlResponse = serde_json::from_value(raw,).map_err(|e| ApiFailure::Fatal {
        status: Some(status,), message: format!("unexpected GraphQL response shape: {e}"),
    },)?;

    let body_rate_limit =
        response.data.as_ref().and_then(|data| data.rate_limit.as_ref(),).map(|field| {
            RateLimitSnapshot {
                remaining: field.remaining, reset_at: field.reset_at,
            }
        },);

    if !response.errors.is_empty() {
        let rate_limited =
            response.errors.iter().any(|error| error.kind.as_deref() == Some("RATE_LIMITED"),);
        if rate_limited {
            return Err(ApiFailure::RateLimited {
                status:   Some(status,),
                reset_at: headers
                    .reset_at(now,)
                    .or_else(|| body_rate_limit.and_then(|snapshot| snapshot.reset_at,),),
            },);
        }
        let message = response
            .errors
            .iter()
            .map(|error| match error.kind.as_deref() {
                Some(kind,) => format!("{kind}: {}", error.message),
                None => error.message.clone(),
            },)
            .collect::<Vec<_,>>()
            .join("; ",);
        return Err(ApiFailure::Fatal {
            status: Some(status,), message,
        },);
    }

    let search = response.data.and_then(|data| data.search,).ok_or_else(|| {
        ApiFailure::Fatal {
            status: Some(status,), message: "GraphQL response carried no search data".to_owned(),
        }
    },)?;

    let header_rate_limit = headers.remaining.map(|remaining| RateLimitSnapshot {
        remaining,
        reset_at: headers.reset.and_then(|epoch| DateTime::from_timestamp(epoch, 0,),),
    },);

    let mut nodes = Vec::with_capacity(search.nodes.len(),);
    let mut malformed = Vec::new();
    for value in search.nodes.into_iter().filter(|value| !value.is_null(),) {
        let id = value.get("id",).and_then(Value::as_str,).unwrap_or("?",).to_owned();
        match serde_json::from_value::<PullRequestNode,>(value,) {
            Ok(node,) => nodes.push(node,),
            Err(e,) => malformed.push(format!("node {id}: {e}"),),
        }
    }

    Ok(SearchPage {
        nodes,
        has_next: search.page_info.has_next_page,
        end_cursor: search.page_info.end_cursor,
        issue_count: search.issue_count,
        rate_limit: body_rate_limit.or(header_rate_limit,),
        malformed,
    },)
}

fn error_message(body: &str,) -> String
{
    let message = serde_json::from_str::<RestError,>(body,)
        .ok()
        .map(|error| error.message,)
        .filter(|message| !message.is_empty(),)
        .unwrap_or_else(|| body.trim().to_owned(),);
    if message.chars().count() > MAX_ERROR_BODY {
        let truncated: String = message.chars().take(MAX_ERROR_BODY,).collect();
        format!("{truncated}…")
    } else if message.is_empty() {
        "empty response body".to_owned()
    } else {
        message
    }
}

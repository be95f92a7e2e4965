// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Remote search API boundary.
//!
//! [`SearchApi`] is the seam between the fetcher and the network. The
//! production implementation lives in [`crate::graphql`]; tests substitute a
//! scripted fake. Wire types mirror the GitHub GraphQL `search` response for
//! pull requests, with every field optional. Nodes are decoded one by one; a
//! node that does not fit the wire type is kept on the page as a
//! [`SearchPage::malformed`] entry, which the fetcher reports as a
//! classification error instead of retrying the page.

use std::{fmt, future::Future};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::target::Target;

/// Number of items requested per search page (GitHub maximum).
pub const PAGE_SIZE: u32 = 100;

/// GitHub issue search never returns more than this many results per query.
pub const SEARCH_RESULT_CAP: u64 = 1000;

/// Which side of a pull request the search is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash,)]
pub enum SearchRole
{
    /// Pull requests opened by the user.
    Authored,
    /// Pull requests on which the user submitted a review.
    Reviewed,
}

impl fmt::Display for SearchRole
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        match self {
            Self::Authored => f.write_str("authored",),
            Self::Reviewed => f.write_str("reviewed",),
        }
    }
}

/// A single page request issued against the search API.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PageRequest
{
    /// GitHub issue search expression.
    pub query:     String,
    /// Login used to filter the review connection.
    pub reviewer:  String,
    /// Continuation cursor from the previous page.
    pub cursor:    Option<String,>,
    /// Maximum items per page.
    pub page_size: u32,
}

impl PageRequest
{
    /// Builds the first-page request for a target and role.
    ///
    /// `exclude_own` adds `-author:{username}` to reviewed searches as a
    /// server-side prefilter.
    pub fn first(target: &Target, role: SearchRole, exclude_own: bool,) -> Self
    {
        Self {
            query:     search_query(target, role, exclude_own,),
            reviewer:  target.username.clone(),
            cursor:    None,
            page_size: PAGE_SIZE,
        }
    }

    /// Returns the request for the page following `cursor`.
    pub fn after(&self, cursor: String,) -> Self
    {
        Self {
            cursor: Some(cursor,), ..self.clone()
        }
    }
}

/// Builds the issue-search expression for a target and role.
pub fn search_query(target: &Target, role: SearchRole, exclude_own: bool,) -> String
{
    let Target {
        username,
        owner,
        repo,
    } = target;
    match role {
        SearchRole::Authored => format!("repo:{owner}/{repo} is:pr author:{username}"),
        SearchRole::Reviewed if exclude_own => {
            format!("repo:{owner}/{repo} is:pr reviewed-by:{username} -author:{username}")
        }
        SearchRole::Reviewed => format!("repo:{owner}/{repo} is:pr reviewed-by:{username}"),
    }
}

/// Remaining quota and reset time reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct RateLimitSnapshot
{
    /// Requests (or points) left in the current window.
    pub remaining: u32,
    /// When the window resets.
    pub reset_at:  Option<DateTime<Utc,>,>,
}

/// One decoded page of search results.
#[derive(Debug, Clone, Default,)]
pub struct SearchPage
{
    /// Pull-request nodes on this page.
    pub nodes:       Vec<PullRequestNode,>,
    /// Whether another page follows.
    pub has_next:    bool,
    /// Cursor of the last item on this page.
    pub end_cursor:  Option<String,>,
    /// Total number of matches reported by search.
    pub issue_count: u64,
    /// Quota information reported alongside the page.
    pub rate_limit:  Option<RateLimitSnapshot,>,
    /// Decode errors of nodes that did not match [`PullRequestNode`].
    pub malformed:   Vec<String,>,
}

/// Classified failure of a single page request.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum ApiFailure
{
    /// The API asked the caller to slow down.
    RateLimited
    {
        /// HTTP status carried by the signal.
        status:   Option<u16,>,
        /// When the caller may try again, if the API said so.
        reset_at: Option<DateTime<Utc,>,>,
    },
    /// Network or server hiccup worth retrying with backoff.
    Transient
    {
        /// HTTP status, when a response was received.
        status:  Option<u16,>,
        /// Description of the failure.
        message: String,
    },
    /// Failure that retrying cannot fix (bad credentials, unknown target).
    Fatal
    {
        /// HTTP status, when a response was received.
        status:  Option<u16,>,
        /// Description of the failure.
        message: String,
    },
}

/// Paged access to pull-request search results.
pub trait SearchApi: Send + Sync
{
    /// Fetches a single page.
    fn search_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<SearchPage, ApiFailure,>,> + Send;
}

/// GraphQL node returned for each search edge.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq,)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode
{
    /// Global node identifier.
    #[serde(default)]
    pub id:         Option<String,>,
    /// Pull request number within its repository.
    #[serde(default)]
    pub number:     Option<u64,>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc,>,>,
    /// Author, absent for deleted accounts.
    #[serde(default)]
    pub author:     Option<Actor,>,
    /// Reviews submitted by the searched user.
    #[serde(default)]
    pub reviews:    Option<ReviewConnection,>,
}

/// Minimal actor projection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq,)]
pub struct Actor
{
    /// Login of the actor.
    pub login: String,
}

/// Connection of reviews filtered by author.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq,)]
pub struct ReviewConnection
{
    /// Review nodes in chronological order.
    #[serde(default)]
    pub nodes: Vec<Option<ReviewNode,>,>,
}

/// Single review projection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq,)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNode
{
    /// Submission time; absent for pending reviews.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc,>,>,
}

impl PullRequestNode
{
    /// Earliest submitted review timestamp visible on this node.
    pub fn first_review_at(&self,) -> Option<DateTime<Utc,>,>
    {
        self.reviews
            .as_ref()?
            .nodes
            .iter()
            .flatten()
            .filter_map(|review| review.submitted_at,)
            .min()
    }
}

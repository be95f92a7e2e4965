// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Paged retrieval of authored and reviewed pull requests.
//!
//! [`ContributionFetcher`] drives a [`SearchApi`] page by page. Each page is
//! retried on its own: transient failures back off according to the
//! [`RetryPolicy`], rate-limit signals park on the shared [`RateLimitGate`],
//! and fatal failures end the stream immediately. Pages are produced lazily
//! so callers can fold events as they arrive.

use std::sync::Arc;

use futures::{Stream, TryStreamExt, stream};
use tracing::{debug, warn};

use crate::{
    api::{ApiFailure, PageRequest, PullRequestNode, SEARCH_RESULT_CAP, SearchApi, SearchPage, SearchRole},
    clock::Clock,
    error::Error,
    event::{ContributionEvent, ContributionKind},
    rate_limit::RateLimitGate,
    retry::RetryPolicy,
    target::Target,
};

/// Fetches contribution events for targets through a search API.
#[derive(Debug,)]
pub struct ContributionFetcher<A, C,>
{
    api:    A,
    clock:  C,
    policy: RetryPolicy,
    gate:   Arc<RateLimitGate,>,
}

impl<A: SearchApi, C: Clock,> ContributionFetcher<A, C,>
{
    /// Creates a fetcher.
    ///
    /// `gate` must be shared by every fetcher using the same credential.
    pub fn new(api: A, clock: C, policy: RetryPolicy, gate: Arc<RateLimitGate,>,) -> Self
    {
        Self {
            api,
            clock,
            policy,
            gate,
        }
    }

    /// Retry policy applied to every page.
    pub fn policy(&self,) -> &RetryPolicy
    {
        &self.policy
    }

    /// Lazy stream of search pages for `target` in `role`.
    ///
    /// The stream follows `endCursor` while `hasNextPage` holds. A cursor
    /// that is missing or does not advance ends the stream with
    /// [`Error::Fetch`].
    pub fn pages<'a,>(
        &'a self,
        target: &Target,
        role: SearchRole,
    ) -> impl Stream<Item = Result<SearchPage, Error,>,> + Send + 'a
    {
        self.pages_from(PageRequest::first(target, role, false,),)
    }

    /// Lazy stream of contribution events for `target` in `role`.
    ///
    /// # Errors
    ///
    /// Items are [`Error::Fetch`] when a page cannot be retrieved and
    /// [`Error::Classification`] when a node is malformed.
    pub fn events<'a,>(
        &'a self,
        target: &'a Target,
        role: SearchRole,
    ) -> impl Stream<Item = Result<ContributionEvent, Error,>,> + Send + 'a
    {
        self.search(target, role, false,)
    }

    /// Like [`Self::events`], with the reviewed search prefiltered to drop
    /// the user's own pull requests when `exclude_own` is set.
    pub fn search<'a,>(
        &'a self,
        target: &'a Target,
        role: SearchRole,
        exclude_own: bool,
    ) -> impl Stream<Item = Result<ContributionEvent, Error,>,> + Send + 'a
    {
        let kind = ContributionKind::from(role,);
        self.pages_from(PageRequest::first(target, role, exclude_own,),)
            .map_ok(move |page| stream::iter(node_events(kind, page, target,),),)
            .try_flatten()
    }

    /// Collects both roles for `target` as `(authored, reviewed)`.
    ///
    /// Neither vector is ordered or deduplicated.
    ///
    /// # Errors
    ///
    /// Returns the first page or classification failure encountered.
    pub async fn fetch(
        &self,
        target: &Target,
        exclude_hint: bool,
    ) -> Result<(Vec<ContributionEvent,>, Vec<ContributionEvent,>,), Error,>
    {
        let authored = self.search(target, SearchRole::Authored, exclude_hint,).try_collect().await?;
        let reviewed = self.search(target, SearchRole::Reviewed, exclude_hint,).try_collect().await?;
        Ok((authored, reviewed,),)
    }

    fn pages_from(
        &self,
        first: PageRequest,
    ) -> impl Stream<Item = Result<SearchPage, Error,>,> + Send + '_
    {
        stream::try_unfold(Some(first,), move |pending| async move {
            let Some(request,) = pending
            else {
                return Ok(None,);
            };
            let page = self.fetch_page(&request,).await?;
            debug!(
                query = %request.query,
                nodes = page.nodes.len(),
                has_next = page.has_next,
                "fetched search page"
            );
            if request.cursor.is_none() && page.issue_count > SEARCH_RESULT_CAP {
                warn!(
                    query = %request.query,
                    issue_count = page.issue_count,
                    cap = SEARCH_RESULT_CAP,
                    "search results truncated by the API"
                );
            }

            let next = if page.has_next {
                match page.end_cursor.as_deref() {
                    Some(cursor,) if !cursor.is_empty() && request.cursor.as_deref() != Some(cursor,) => {
                        Some(request.after(cursor.to_owned(),),)
                    }
                    _ => {
                        return Err(Error::fetch(
                            None,
                            format!("pagination cursor did not advance for `{}`", request.query),
                        ),);
                    }
                }
            } else {
                None
            };
            Ok(Some((page, next,),),)
        },)
    }

    async fn fetch_page(&self, request: &PageRequest,) -> Result<SearchPage, Error,>
    {
        let mut failures = 0u32;
        let mut rate_limit_waits = 0u32;
        loop {
            self.gate.acquire(&self.clock,).await;
            match self.api.search_page(request,).await {
                Ok(page,) => {
                    if let Some(snapshot,) = page.rate_limit {
                        self.gate.observe(snapshot,).await;
                    }
                    return Ok(page,);
                }
                Err(ApiFailure::RateLimited {
                    status,
                    reset_at,
                },) => {
                    rate_limit_waits += 1;
                    if rate_limit_waits > self.policy.max_rate_limit_waits {
                        return Err(Error::fetch(
                            status,
                            format!(
                                "rate limit persisted after {} waits for `{}`",
                                self.policy.max_rate_limit_waits, request.query
                            ),
                        ),);
                    }
                    match reset_at {
                        Some(reset_at,) if reset_at > self.clock.now() => {
                            warn!(query = %request.query, %reset_at, "rate limited, parking until reset");
                            self.gate.exhaust(reset_at,).await;
                        }
                        _ => {
                            let delay = self.policy.delay_for(rate_limit_waits,);
                            warn!(
                                query = %request.query,
                                delay_ms = delay.as_millis() as u64,
                                "rate limited without reset hint, backing off"
                            );
                            self.clock.sleep(delay,).await;
                        }
                    }
                }
                Err(ApiFailure::Transient {
                    status,
                    message,
                },) => {
                    failures += 1;
                    if failures >= self.policy.max_attempts {
                        return Err(Error::fetch(
                            status,
                            format!("{message} (gave up after {failures} attempts)"),
                        ),);
                    }
                    let delay = self.policy.delay_for(failures,);
                    warn!(
                        query = %request.query,
                        attempt = failures,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "transient failure, retrying"
                    );
                    self.clock.sleep(delay,).await;
                }
                Err(ApiFailure::Fatal {
                    status,
                    message,
                },) => return Err(Error::fetch(status, message,),),
            }
        }
    }
}

fn node_events(
    kind: ContributionKind,
    page: SearchPage,
    target: &Target,
) -> Vec<Result<ContributionEvent, Error,>,>
{
    let SearchPage {
        nodes,
        malformed,
        ..
    } = page;
    let rejected = malformed.into_iter().map(|message| {
        Err::<ContributionEvent, _,>(Error::classification(format!(
            "{kind:?} pull request in {}: {message}",
            target.repo_id()
        ),),)
    },);

    rejected
        .chain(nodes.iter().filter_map(|node| node_event(kind, node, target,),),)
        .collect()
}

fn node_event(
    kind: ContributionKind,
    node: &PullRequestNode,
    target: &Target,
) -> Option<Result<ContributionEvent, Error,>,>
{
    match ContributionEvent::from_node(kind, node, target,) {
        Ok(Some(event,),) => Some(Ok(event,),),
        Ok(None,) => {
            debug!(
                target_id = %target,
                id = node.id.as_deref().unwrap_or("?"),
                "skipping pull request authored by someone else"
            );
            None
        }
        Err(error,) => Some(Err(error,),),
    }
}

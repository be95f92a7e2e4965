// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Test doubles for the clock and the search API.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    api::{Actor, ApiFailure, PageRequest, PullRequestNode, ReviewConnection, ReviewNode, SearchApi, SearchPage},
    clock::Clock,
};

/// Virtual clock: `sleep` returns immediately and advances `now`.
#[derive(Debug, Clone,)]
pub struct FakeClock
{
    inner: Arc<Mutex<FakeClockState,>,>,
}

#[derive(Debug,)]
struct FakeClockState
{
    now:    DateTime<Utc,>,
    sleeps: Vec<Duration,>,
}

impl FakeClock
{
    pub fn new(now: DateTime<Utc,>,) -> Self
    {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now, sleeps: Vec::new(),
            },),),
        }
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self,) -> Vec<Duration,>
    {
        self.inner.lock().unwrap().sleeps.clone()
    }
}

impl Clock for FakeClock
{
    fn now(&self,) -> DateTime<Utc,>
    {
        self.inner.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration,)
    {
        let mut state = self.inner.lock().unwrap();
        state.sleeps.push(duration,);
        state.now += chrono::Duration::from_std(duration,).unwrap();
    }
}

/// Search API answering from per-query scripts.
///
/// Each query owns a queue of responses consumed in order. Requests are
/// recorded so tests can assert on cursors and retry counts.
#[derive(Debug, Clone, Default,)]
pub struct ScriptedApi
{
    scripts:  Arc<Mutex<HashMap<String, VecDeque<Result<SearchPage, ApiFailure,>,>,>,>,>,
    requests: Arc<Mutex<Vec<PageRequest,>,>,>,
}

impl ScriptedApi
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Appends a response for `query`.
    pub fn push(&self, query: &str, response: Result<SearchPage, ApiFailure,>,) -> &Self
    {
        self.scripts
            .lock()
            .unwrap()
            .entry(query.to_owned(),)
            .or_default()
            .push_back(response,);
        self
    }

    pub fn requests(&self,) -> Vec<PageRequest,>
    {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, query: &str,) -> Vec<PageRequest,>
    {
        self.requests().into_iter().filter(|request| request.query == query,).collect()
    }
}

impl SearchApi for ScriptedApi
{
    async fn search_page(&self, request: &PageRequest,) -> Result<SearchPage, ApiFailure,>
    {
        self.requests.lock().unwrap().push(request.clone(),);
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.query,)
            .and_then(VecDeque::pop_front,);
        next.unwrap_or_else(|| {
            Err(ApiFailure::Fatal {
                status:  Some(422,),
                message: format!("no scripted response for {}", request.query),
            },)
        },)
    }
}

pub fn at(year: i32, month: u32, day: u32,) -> DateTime<Utc,>
{
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0,).unwrap()
}

pub fn authored_node(id: &str, author: &str, created_at: DateTime<Utc,>,) -> PullRequestNode
{
    PullRequestNode {
        id:         Some(id.to_owned(),),
        number:     None,
        created_at: Some(created_at,),
        author:     Some(Actor {
            login: author.to_owned(),
        },),
        reviews:    None,
    }
}

pub fn reviewed_node(
    id: &str,
    created_at: DateTime<Utc,>,
    reviews: &[DateTime<Utc,>],
) -> PullRequestNode
{
    PullRequestNode {
        id:         Some(id.to_owned(),),
        number:     None,
        created_at: Some(created_at,),
        author:     Some(Actor {
            login: "someone-else".to_owned(),
        },),
        reviews:    Some(ReviewConnection {
            nodes: reviews
                .iter()
                .map(|submitted| {
                    Some(ReviewNode {
                        submitted_at: Some(*submitted,),
                    },)
                },)
                .collect(),
        },),
    }
}

pub fn page(nodes: Vec<PullRequestNode,>, next_cursor: Option<&str,>,) -> SearchPage
{
    SearchPage {
        issue_count: nodes.len() as u64,
        nodes,
        has_next: next_cursor.is_some(),
        end_cursor: next_cursor.map(str::to_owned,),
        rate_limit: None,
        malformed: Vec::new(),
    }
}

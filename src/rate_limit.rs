// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Shared rate-limit gate for a single credential.
//!
//! Every request made with a credential passes through the same gate. The
//! gate remembers the last quota snapshot reported by the API, reserves one
//! unit per request, and parks callers once the quota is exhausted until the
//! advertised reset. Decisions are taken under an async mutex so concurrent
//! targets cannot overspend the remaining quota.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    api::RateLimitSnapshot,
    clock::{self, Clock},
};

/// Extra wait applied after a reset to absorb clock skew with the API.
const RESET_GRACE: Duration = Duration::from_secs(1,);

#[derive(Debug, Default,)]
struct QuotaState
{
    remaining: Option<u32,>,
    reset_at:  Option<DateTime<Utc,>,>,
}

impl QuotaState
{
    /// Reserves one request or returns how long to wait first.
    fn reserve(&mut self, now: DateTime<Utc,>,) -> Option<Duration,>
    {
        match (self.remaining, self.reset_at,) {
            (Some(0,), Some(reset_at,),) if reset_at > now => {
                Some(clock::until(now, reset_at,) + RESET_GRACE,)
            }
            (Some(0,), _,) => {
                // Window rolled over (or no reset was advertised); the next
                // response will report fresh numbers.
                self.remaining = None;
                self.reset_at = None;
                None
            }
            (Some(left,), _,) => {
                self.remaining = Some(left - 1,);
                None
            }
            (None, _,) => None,
        }
    }
}

/// Quota gate shared by every fetch that uses the same credential.
#[derive(Debug, Default,)]
pub struct RateLimitGate
{
    state: Mutex<QuotaState,>,
}

impl RateLimitGate
{
    /// Creates a gate with no quota information.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Waits until a request may be issued, then reserves it.
    pub async fn acquire<C: Clock,>(&self, clock: &C,)
    {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                state.reserve(clock.now(),)
            };
            match wait {
                None => return,
                Some(duration,) => {
                    warn!(wait_secs = duration.as_secs(), "rate limit exhausted, waiting for reset");
                    clock.sleep(duration,).await;
                }
            }
        }
    }

    /// Records a quota snapshot reported by the API.
    pub async fn observe(&self, snapshot: RateLimitSnapshot,)
    {
        let mut state = self.state.lock().await;
        debug!(remaining = snapshot.remaining, reset_at = ?snapshot.reset_at, "rate limit snapshot");
        state.remaining = Some(snapshot.remaining,);
        if snapshot.reset_at.is_some() {
            state.reset_at = snapshot.reset_at;
        }
    }

    /// Marks the quota as exhausted until `reset_at`.
    ///
    /// Called when the API rejected a request outright, so that every target
    /// sharing the credential parks until the reset.
    pub async fn exhaust(&self, reset_at: DateTime<Utc,>,)
    {
        let mut state = self.state.lock().await;
        state.remaining = Some(0,);
        state.reset_at = Some(state.reset_at.map_or(reset_at, |known| known.max(reset_at,),),);
    }

    /// Remaining quota as last observed, minus reservations.
    pub async fn remaining(&self,) -> Option<u32,>
    {
        self.state.lock().await.remaining
    }
}

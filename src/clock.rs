// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Time source used for backoff and rate-limit waits.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};

/// Wall clock plus an async sleep.
///
/// Injected into the fetcher so that retry schedules can be exercised with a
/// virtual clock in tests.
pub trait Clock: Send + Sync
{
    /// Current UTC time.
    fn now(&self,) -> DateTime<Utc,>;

    /// Suspends the caller for `duration`.
    fn sleep(&self, duration: Duration,) -> impl Future<Output = (),> + Send;
}

/// Real clock backed by the system time and the tokio timer.
#[derive(Debug, Clone, Copy, Default,)]
pub struct TokioClock;

impl Clock for TokioClock
{
    fn now(&self,) -> DateTime<Utc,>
    {
        Utc::now()
    }

    fn sleep(&self, duration: Duration,) -> impl Future<Output = (),> + Send
    {
        tokio::time::sleep(duration,)
    }
}

/// Time left until `instant`, or zero when it already passed.
pub fn until(now: DateTime<Utc,>, instant: DateTime<Utc,>,) -> Duration
{
    (instant - now).to_std().unwrap_or(Duration::ZERO,)
}

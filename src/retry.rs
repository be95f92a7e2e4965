// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Retry policy with capped exponential backoff for API calls.
//!
//! The policy is a plain value injected into the fetcher. It decides how many
//! times a page is retried after transient failures, how long to wait between
//! attempts, and how many rate-limit stalls a single page may absorb.

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hasher},
    time::Duration,
};

use serde::Deserialize;

use crate::error::Error;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone, PartialEq, Deserialize,)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy
{
    /// Maximum number of attempts per page for transient failures
    /// (default: 4).
    pub max_attempts:         u32,
    /// Delay before the first retry in milliseconds (default: 1000).
    pub initial_delay_ms:     u64,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_factor:       f64,
    /// Upper bound for a single backoff delay in milliseconds
    /// (default: 60000).
    pub max_delay_ms:         u64,
    /// Fraction of each delay that may be shaved off at random, in `[0, 1]`
    /// (default: 0.1).
    pub jitter:               f64,
    /// Rate-limit signals tolerated per page before giving up (default: 5).
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy
{
    fn default() -> Self
    {
        Self {
            max_attempts:         4,
            initial_delay_ms:     1000,
            backoff_factor:       2.0,
            max_delay_ms:         60_000,
            jitter:               0.1,
            max_rate_limit_waits: 5,
        }
    }
}

impl RetryPolicy
{
    /// Policy without delays or jitter, handy for tests and dry runs.
    pub fn immediate(max_attempts: u32, max_rate_limit_waits: u32,) -> Self
    {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            backoff_factor: 1.0,
            max_delay_ms: 0,
            jitter: 0.0,
            max_rate_limit_waits,
        }
    }

    /// Checks the policy invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `max_attempts` or
    /// `max_rate_limit_waits` is zero, the backoff factor is below one, or
    /// the jitter is outside `[0, 1]`.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        if self.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1",),);
        }
        if self.max_rate_limit_waits == 0 {
            return Err(Error::config("retry.max_rate_limit_waits must be at least 1",),);
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::config("retry.backoff_factor must be a finite number >= 1",),);
        }
        if !(0.0..=1.0).contains(&self.jitter,) {
            return Err(Error::config("retry.jitter must be between 0 and 1",),);
        }
        Ok((),)
    }

    /// Deterministic backoff for the given 1-based retry number, before
    /// jitter.
    ///
    /// The delay doubles (by `backoff_factor`) per retry and never exceeds
    /// `max_delay_ms`.
    pub fn base_delay(&self, retry: u32,) -> Duration
    {
        let exponent = retry.saturating_sub(1,).min(i32::MAX as u32,) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_factor.powi(exponent,);
        let capped = raw.min(self.max_delay_ms as f64,);
        Duration::from_millis(capped.max(0.0,) as u64,)
    }

    /// Backoff for the given 1-based retry number with jitter applied.
    pub fn delay_for(&self, retry: u32,) -> Duration
    {
        self.jittered(self.base_delay(retry,), jitter_sample(),)
    }

    /// Applies jitter using `sample` in `[0, 1)`.
    pub fn jittered(&self, delay: Duration, sample: f64,) -> Duration
    {
        delay.mul_f64((1.0 - self.jitter * sample.clamp(0.0, 1.0,)).max(0.0,),)
    }
}

/// Uniform-ish sample in `[0, 1)` drawn from the process hash seed.
fn jitter_sample() -> f64
{
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(0x9e37_79b9_7f4a_7c15,);
    (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
}

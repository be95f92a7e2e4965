// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Concurrent per-target processing.
//!
//! Every target becomes a [`TargetTask`] that fetches, classifies and
//! aggregates on its own. Tasks run with bounded concurrency and share nothing
//! except the fetcher (and through it the rate-limit gate). Failures are
//! collected per target; one failing target never stops its siblings.

use std::{pin::pin, time::Duration};

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

use crate::{
    api::{SearchApi, SearchRole},
    classifier::EventClassifier,
    clock::Clock,
    config::{DEFAULT_CONCURRENCY, RunConfig},
    dataset::HistogramDataset,
    error::Error,
    fetcher::ContributionFetcher,
    target::Target,
};

/// Failure reason reported for targets cut off by the run deadline.
pub const TIMED_OUT_REASON: &str = "run timed out";

/// Knobs controlling a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct PipelineOptions
{
    /// Drop reviews of the user's own pull requests.
    pub exclude_authored_from_reviewed: bool,
    /// Maximum number of targets in flight.
    pub concurrency:                    usize,
    /// Deadline for the whole run.
    pub timeout:                        Option<Duration,>,
}

impl Default for PipelineOptions
{
    fn default() -> Self
    {
        Self {
            exclude_authored_from_reviewed: false,
            concurrency:                    DEFAULT_CONCURRENCY,
            timeout:                        None,
        }
    }
}

impl From<&RunConfig,> for PipelineOptions
{
    fn from(config: &RunConfig,) -> Self
    {
        Self {
            exclude_authored_from_reviewed: config.exclude_authored_from_reviewed,
            concurrency:                    config.concurrency,
            timeout:                        config.timeout,
        }
    }
}

/// Target that could not produce a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct TargetFailure
{
    /// Target that failed.
    pub target: Target,
    /// Human readable reason.
    pub reason: String,
}

/// Result of one target, passed to the run observer.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum TargetOutcome
{
    /// Dataset produced.
    Completed(HistogramDataset,),
    /// Target failed or timed out.
    Failed(TargetFailure,),
}

/// Datasets and failures of a run, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct RunReport
{
    /// Datasets of targets that completed.
    pub datasets: Vec<HistogramDataset,>,
    /// Targets that failed.
    pub failures: Vec<TargetFailure,>,
}

impl RunReport
{
    /// Returns `true` when every target produced a dataset.
    pub fn is_success(&self,) -> bool
    {
        self.failures.is_empty()
    }
}

/// One unit of work: a target and its position in the input.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct TargetTask
{
    /// Position of the target in the input list.
    pub index:  usize,
    /// Target to process.
    pub target: Target,
}

impl TargetTask
{
    /// Fetches, classifies and aggregates this target.
    ///
    /// Events are folded into the classifier as pages arrive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] or [`Error::Classification`].
    pub async fn run<A: SearchApi, C: Clock,>(
        &self,
        fetcher: &ContributionFetcher<A, C,>,
        exclude_authored_from_reviewed: bool,
    ) -> Result<HistogramDataset, Error,>
    {
        let mut classifier = EventClassifier::new(exclude_authored_from_reviewed,);
        for role in [SearchRole::Authored, SearchRole::Reviewed] {
            let mut events = pin!(fetcher.search(&self.target, role, exclude_authored_from_reviewed,));
            while let Some(event,) = events.try_next().await? {
                classifier.record(event,);
            }
        }

        let dataset = HistogramDataset::from_classified(self.target.clone(), &classifier.finish(),);
        info!(
            target_id = %self.target,
            authored = dataset.total_authored,
            reviewed = dataset.total_reviewed,
            months = dataset.buckets.len(),
            "target aggregated"
        );
        Ok(dataset,)
    }
}

/// Runs targets through fetch, classification and aggregation.
#[derive(Debug,)]
pub struct Pipeline<A, C,>
{
    fetcher: ContributionFetcher<A, C,>,
    options: PipelineOptions,
}

impl<A: SearchApi, C: Clock,> Pipeline<A, C,>
{
    /// Creates a pipeline around a fetcher.
    pub fn new(fetcher: ContributionFetcher<A, C,>, options: PipelineOptions,) -> Self
    {
        Self {
            fetcher,
            options,
        }
    }

    /// Options in effect.
    pub fn options(&self,) -> &PipelineOptions
    {
        &self.options
    }

    /// Processes every target and collects the report.
    pub async fn run(&self, targets: &[Target],) -> RunReport
    {
        self.run_observed(targets, |_| {},).await
    }

    /// Like [`Self::run`], calling `observer` once per finished target.
    ///
    /// Targets still running at the deadline are reported as failures with
    /// [`TIMED_OUT_REASON`] after every completed target has been observed.
    pub async fn run_observed<F,>(&self, targets: &[Target], mut observer: F,) -> RunReport
    where
        F: FnMut(&TargetOutcome,),
    {
        let tasks: Vec<TargetTask,> = targets
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, target,)| TargetTask {
                index,
                target,
            },)
            .collect();
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout,);
        let exclude = self.options.exclude_authored_from_reviewed;
        let fetcher = &self.fetcher;
        info!(
            targets = tasks.len(),
            concurrency = self.options.concurrency,
            exclude_authored_from_reviewed = exclude,
            "starting run"
        );

        let mut outcomes: Vec<Option<TargetOutcome,>,> = tasks.iter().map(|_| None,).collect();
        {
            let mut finished = stream::iter(&tasks,)
                .map(|task| async move { (task.index, task.run(fetcher, exclude,).await,) },)
                .buffer_unordered(self.options.concurrency.max(1,),);

            loop {
                let next = match deadline {
                    Some(deadline,) => match timeout_at(deadline, finished.next(),).await {
                        Ok(next,) => next,
                        Err(_,) => {
                            warn!("run deadline reached, abandoning unfinished targets");
                            break;
                        }
                    },
                    None => finished.next().await,
                };
                let Some((index, result,),) = next
                else {
                    break;
                };

                let outcome = match result {
                    Ok(dataset,) => TargetOutcome::Completed(dataset,),
                    Err(error,) => {
                        warn!(target_id = %tasks[index].target, %error, "target failed");
                        TargetOutcome::Failed(TargetFailure {
                            target: tasks[index].target.clone(),
                            reason: error.to_string(),
                        },)
                    }
                };
                observer(&outcome,);
                outcomes[index] = Some(outcome,);
            }
        }

        let mut report = RunReport::default();
        for (task, outcome,) in tasks.iter().zip(outcomes,) {
            let outcome = match outcome {
                Some(outcome,) => outcome,
                None => {
                    let timed_out = TargetOutcome::Failed(TargetFailure {
                        target: task.target.clone(),
                        reason: TIMED_OUT_REASON.to_owned(),
                    },);
                    observer(&timed_out,);
                    timed_out
                }
            };
            match outcome {
                TargetOutcome::Completed(dataset,) => report.datasets.push(dataset,),
                TargetOutcome::Failed(failure,) => report.failures.push(failure,),
            }
        }

        info!(
            datasets = report.datasets.len(),
            failures = report.failures.len(),
            "run finished"
        );
        report
    }
}

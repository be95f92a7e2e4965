//! Pull-request contribution histograms.
//!
//! The library turns a list of `username@owner/repo` targets into monthly
//! authored/reviewed series. Targets are parsed eagerly, pull requests are
//! paged out of the GitHub GraphQL search API under a shared rate-limit gate,
//! events are deduplicated and classified, and finally folded into
//! gap-filled UTC months. Each target yields a [`HistogramDataset`] that an
//! external renderer turns into a chart.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use prgraph::{
//!     ContributionFetcher, Credential, GraphqlSearchClient, Pipeline, PipelineOptions,
//!     RateLimitGate, RetryPolicy, TokioClock, parse_targets,
//! };
//!
//! # async fn example() -> Result<(), prgraph::Error> {
//! let targets = parse_targets("peterxcli@apache/ozone, octocat,github/docs",)?;
//! let credential = Credential::new(std::env::var("GITHUB_TOKEN",).unwrap_or_default(),)?;
//! let fetcher = ContributionFetcher::new(
//!     GraphqlSearchClient::new(&credential,)?,
//!     TokioClock,
//!     RetryPolicy::default(),
//!     Arc::new(RateLimitGate::new(),),
//! );
//! let report = Pipeline::new(fetcher, PipelineOptions::default(),).run(&targets,).await;
//! println!("{} datasets, {} failures", report.datasets.len(), report.failures.len());
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod api;
mod classifier;
mod clock;
mod config;
mod dataset;
mod error;
mod event;
mod fetcher;
mod graphql;
mod pipeline;
mod rate_limit;
mod retry;
mod target;
#[cfg(test)]
mod testing;

pub use aggregator::{MonthBucket, MonthlyAggregator};
pub use api::{
    Actor, ApiFailure, PAGE_SIZE, PageRequest, PullRequestNode, RateLimitSnapshot, ReviewConnection,
    ReviewNode, SEARCH_RESULT_CAP, SearchApi, SearchPage, SearchRole, search_query,
};
pub use classifier::{ClassifiedEvents, EventClassifier, classify};
pub use clock::{Clock, TokioClock};
pub use config::{
    ConfigDocument, ConfigOverrides, Credential, DEFAULT_CONCURRENCY, RunConfig, TargetsInput,
    load_config,
};
pub use dataset::HistogramDataset;
pub use error::{Error, FetchStatus, io_error};
pub use event::{ContributionEvent, ContributionKind, PrId, YearMonth};
pub use fetcher::ContributionFetcher;
pub use graphql::{GraphqlSearchClient, RateLimitHeaders, interpret_response};
pub use pipeline::{
    Pipeline, PipelineOptions, RunReport, TIMED_OUT_REASON, TargetFailure, TargetOutcome, TargetTask,
};
pub use rate_limit::RateLimitGate;
pub use retry::RetryPolicy;
pub use target::{RepoId, Target, parse_targets};

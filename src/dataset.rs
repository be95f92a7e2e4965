// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-target histogram handed to renderers.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    aggregator::{MonthBucket, MonthlyAggregator},
    classifier::ClassifiedEvents,
    error::{self, Error},
    target::Target,
};

/// Monthly authored/reviewed series for one target.
///
/// Totals always equal the sums over `buckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct HistogramDataset
{
    /// User and repository the series belongs to.
    pub target:         Target,
    /// Gap-filled monthly buckets in chronological order.
    pub buckets:        Vec<MonthBucket,>,
    /// Number of distinct authored pull requests.
    pub total_authored: u64,
    /// Number of distinct reviewed pull requests.
    pub total_reviewed: u64,
}

impl HistogramDataset
{
    /// Builds a dataset and derives totals from `buckets`.
    pub fn new(target: Target, buckets: Vec<MonthBucket,>,) -> Self
    {
        let total_authored = buckets.iter().map(|b| u64::from(b.authored_count,),).sum();
        let total_reviewed = buckets.iter().map(|b| u64::from(b.reviewed_count,),).sum();
        Self {
            target,
            buckets,
            total_authored,
            total_reviewed,
        }
    }

    /// Aggregates classified events into a dataset.
    pub fn from_classified(target: Target, events: &ClassifiedEvents,) -> Self
    {
        Self::new(target, MonthlyAggregator::aggregate(events,),)
    }

    /// Returns `true` when the target had no activity.
    pub fn is_empty(&self,) -> bool
    {
        self.buckets.is_empty()
    }

    /// Output file name for this dataset with the given extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use prgraph::{HistogramDataset, Target};
    ///
    /// let dataset = HistogramDataset::new(Target::new("peterxcli", "apache", "ozone",), Vec::new(),);
    /// assert_eq!(dataset.file_name("svg"), "peterxcli-apache-ozone-contribution-graph.svg");
    /// ```
    pub fn file_name(&self, extension: &str,) -> String
    {
        let Target {
            username,
            owner,
            repo,
        } = &self.target;
        format!("{username}-{owner}-{repo}-contribution-graph.{extension}")
    }

    /// Writes the dataset as JSON into `directory` and returns the file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory or file cannot be written and
    /// [`Error::Serialize`] when encoding fails.
    pub fn write_json(&self, directory: &Path, pretty: bool,) -> Result<PathBuf, Error,>
    {
        fs::create_dir_all(directory,).map_err(|source| error::io_error(directory, source,),)?;
        let path = directory.join(self.file_name("json",),);
        let mut contents =
            if pretty { serde_json::to_string_pretty(self,)? } else { serde_json::to_string(self,)? };
        contents.push('\n',);
        fs::write(&path, contents,).map_err(|source| error::io_error(&path, source,),)?;
        Ok(path,)
    }
}

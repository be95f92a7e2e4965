// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Run configuration.
//!
//! Settings come from an optional YAML document and from command-line
//! overrides. The YAML document keeps every value optional so that a file can
//! carry only the targets while flags supply the rest. [`RunConfig::resolve`]
//! merges both sources, parses the targets eagerly and validates the result
//! before any request is made.

use std::{fmt, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::{self, Error},
    retry::RetryPolicy,
    target::{Target, parse_targets},
};

/// Number of targets processed concurrently when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// API credential. `Debug` output never contains the secret.
#[derive(Clone,)]
pub struct Credential(String,);

impl Credential
{
    /// Wraps a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the token is empty or blank.
    pub fn new(token: impl Into<String,>,) -> Result<Self, Error,>
    {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(Error::config("GitHub token must not be empty",),);
        }
        Ok(Self(trimmed.to_owned(),),)
    }

    /// Returns the raw token for request signing.
    pub fn expose(&self,) -> &str
    {
        &self.0
    }
}

impl fmt::Debug for Credential
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str("Credential(***)",)
    }
}

/// Targets as written in YAML: one raw string or a list of entries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq,)]
#[serde(untagged)]
pub enum TargetsInput
{
    /// Space/comma separated string, as accepted on the command line.
    Raw(String,),
    /// One entry per list item.
    List(Vec<String,>,),
}

impl TargetsInput
{
    fn into_raw(self,) -> String
    {
        match self {
            Self::Raw(raw,) => raw,
            Self::List(entries,) => entries.join(" ",),
        }
    }
}

/// YAML configuration document.
///
/// # Examples
///
/// ```
/// use prgraph::ConfigDocument;
///
/// let yaml = r#"
/// targets:
///   - octocat@github/docs
///   - peterxcli@apache/ozone
/// exclude_authored_from_reviewed: true
/// "#;
/// let document: ConfigDocument = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(document.exclude_authored_from_reviewed, Some(true));
/// ```
#[derive(Debug, Clone, Default, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument
{
    /// Targets to process.
    #[serde(default)]
    pub targets: Option<TargetsInput,>,

    /// Drop pull requests the user authored from the reviewed series.
    #[serde(
        default,
        alias = "exclude-authored-from-reviewed",
        alias = "excludeAuthoredFromReviewed"
    )]
    pub exclude_authored_from_reviewed: Option<bool,>,

    /// Number of targets processed concurrently.
    #[serde(default, deserialize_with = "deserialize_optional_concurrency")]
    pub concurrency: Option<usize,>,

    /// Deadline for the whole run in seconds.
    #[serde(default, alias = "timeout", deserialize_with = "deserialize_optional_timeout")]
    pub timeout_secs: Option<u64,>,

    /// Retry and backoff settings.
    #[serde(default)]
    pub retry: Option<RetryPolicy,>,
}

/// Loads a configuration document from disk.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`]
/// when the YAML is invalid.
pub fn load_config(path: &Path,) -> Result<ConfigDocument, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    Ok(serde_yaml::from_str(&contents,)?,)
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default,)]
pub struct ConfigOverrides
{
    /// Raw targets string.
    pub targets:                        Option<String,>,
    /// Token from `--token` or `GITHUB_TOKEN`.
    pub token:                          Option<String,>,
    /// `--exclude-authored-from-reviewed`.
    pub exclude_authored_from_reviewed: bool,
    /// `--concurrency`.
    pub concurrency:                    Option<usize,>,
    /// `--timeout`.
    pub timeout_secs:                   Option<u64,>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone,)]
pub struct RunConfig
{
    /// Parsed targets, in input order.
    pub targets:                        Vec<Target,>,
    /// Credential authorizing every request.
    pub credential:                     Credential,
    /// Drop authored pull requests from the reviewed series.
    pub exclude_authored_from_reviewed: bool,
    /// Number of targets processed concurrently.
    pub concurrency:                    usize,
    /// Deadline for the whole run.
    pub timeout:                        Option<Duration,>,
    /// Retry and backoff settings.
    pub retry:                          RetryPolicy,
}

impl RunConfig
{
    /// Merges the YAML document with command-line overrides.
    ///
    /// Command-line values win. The exclusion flag is enabled when either
    /// source enables it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when targets are missing or malformed, the
    /// credential is missing, or a numeric setting is out of range.
    pub fn resolve(document: ConfigDocument, overrides: ConfigOverrides,) -> Result<Self, Error,>
    {
        let raw_targets = overrides
            .targets
            .or_else(|| document.targets.map(TargetsInput::into_raw,),)
            .ok_or_else(|| Error::config("no targets configured (use --targets or a config file)",),)?;
        let targets = parse_targets(&raw_targets,)?;

        let token = overrides.token.ok_or_else(|| {
            Error::config("missing GitHub token (use --token or GITHUB_TOKEN)",)
        },)?;
        let credential = Credential::new(token,)?;

        let concurrency =
            overrides.concurrency.or(document.concurrency,).unwrap_or(DEFAULT_CONCURRENCY,);
        if concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1",),);
        }

        let timeout_secs = overrides.timeout_secs.or(document.timeout_secs,);
        if timeout_secs == Some(0,) {
            return Err(Error::config("timeout must be greater than zero seconds",),);
        }

        let retry = document.retry.unwrap_or_default();
        retry.validate()?;

        Ok(Self {
            targets,
            credential,
            exclude_authored_from_reviewed: overrides.exclude_authored_from_reviewed
                || document.exclude_authored_from_reviewed.unwrap_or(false,),
            concurrency,
            timeout: timeout_secs.map(Duration::from_secs,),
            retry,
        },)
    }
}

fn deserialize_optional_concurrency<'de, D,>(deserializer: D,) -> Result<Option<usize,>, D::Error,>
where
    D: serde::Deserializer<'de,>,
{
    let value: Option<usize,> = Option::deserialize(deserializer,)?;
    if value == Some(0,) {
        return Err(serde::de::Error::custom("concurrency must be at least 1",),);
    }
    Ok(value,)
}

fn deserialize_optional_timeout<'de, D,>(deserializer: D,) -> Result<Option<u64,>, D::Error,>
where
    D: serde::Deserializer<'de,>,
{
    let value: Option<u64,> = Option::deserialize(deserializer,)?;
    if value == Some(0,) {
        return Err(serde::de::Error::custom("timeout_secs must be greater than zero",),);
    }
    Ok(value,)
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Parsing of the raw `targets` configuration string.
//!
//! Two entry grammars are accepted and may be mixed freely:
//!
//! * `username@owner/repo`
//! * `username,owner/repo` (legacy form kept for older workflow files)
//!
//! Entries are separated by whitespace and/or commas. Parsing is eager: a
//! single malformed entry rejects the whole input so that mistyped targets are
//! never dropped silently.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

static LOGIN_PATTERN: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._\-\[\]]+$",).expect("valid login pattern",),);
static REPO_SEGMENT_PATTERN: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$",).expect("valid repository pattern",),);

/// Repository coordinates on GitHub.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,)]
pub struct RepoId
{
    /// Account owning the repository (e.g. "apache").
    pub owner: String,
    /// Repository name (e.g. "ozone").
    pub repo:  String,
}

impl fmt::Display for RepoId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A `(username, owner, repo)` triple whose activity is histogrammed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,)]
pub struct Target
{
    /// GitHub login whose pull-request activity is collected.
    pub username: String,
    /// Account owning the repository.
    pub owner:    String,
    /// Repository name.
    pub repo:     String,
}

impl Target
{
    /// Creates a target from already validated parts.
    pub fn new(
        username: impl Into<String,>,
        owner: impl Into<String,>,
        repo: impl Into<String,>,
    ) -> Self
    {
        Self {
            username: username.into(), owner: owner.into(), repo: repo.into(),
        }
    }

    /// Returns the repository half of the target.
    pub fn repo_id(&self,) -> RepoId
    {
        RepoId {
            owner: self.owner.clone(), repo: self.repo.clone(),
        }
    }
}

impl fmt::Display for Target
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}@{}/{}", self.username, self.owner, self.repo)
    }
}

/// A token produced by splitting the raw input, with the separator that
/// preceded it.
#[derive(Debug, Clone, Copy,)]
struct Token<'input,>
{
    text:        &'input str,
    after_comma: bool,
}

/// Splits on runs of whitespace and commas, remembering whether each run
/// contained a comma.
fn tokenize(input: &str,) -> Vec<Token<'_,>,>
{
    let mut tokens = Vec::new();
    let mut start: Option<usize,> = None;
    let mut comma_seen = false;

    for (index, ch,) in input.char_indices() {
        let separator = ch == ',' || ch.is_whitespace();
        match (separator, start,) {
            (true, Some(begin,),) => {
                tokens.push(Token {
                    text: &input[begin..index], after_comma: comma_seen,
                },);
                start = None;
                comma_seen = ch == ',';
            }
            (true, None,) => comma_seen |= ch == ',',
            (false, None,) => start = Some(index,),
            (false, Some(_,),) => {}
        }
    }

    if let Some(begin,) = start {
        tokens.push(Token {
            text: &input[begin..], after_comma: comma_seen,
        },);
    }

    tokens
}

/// Parses the raw targets string into validated targets, preserving input
/// order.
///
/// Duplicate entries are kept; each one is an independent unit of work.
///
/// # Errors
///
/// Returns [`Error::Config`] when the input is empty, when an entry matches
/// neither grammar, or when an owner/repository part is malformed.
///
/// # Examples
///
/// ```
/// use prgraph::{Target, parse_targets};
///
/// let targets = parse_targets("peterxcli@apache/ozone, octocat,github/docs",)?;
/// assert_eq!(targets, vec![
///     Target::new("peterxcli", "apache", "ozone"),
///     Target::new("octocat", "github", "docs"),
/// ]);
/// # Ok::<(), prgraph::Error>(())
/// ```
pub fn parse_targets(raw: &str,) -> Result<Vec<Target,>, Error,>
{
    let tokens = tokenize(raw,);
    if tokens.is_empty() {
        return Err(Error::config("empty targets string",),);
    }

    let mut targets = Vec::with_capacity(tokens.len(),);
    let mut index = 0;

    while index < tokens.len() {
        let token = tokens[index];

        if token.text.contains('@',) {
            targets.push(parse_modern_entry(token.text,)?,);
            index += 1;
            continue;
        }

        if token.text.contains('/',) {
            return Err(Error::config(format!(
                "invalid repository format: {} (expected username@owner/repo)",
                token.text
            ),),);
        }

        let repository = tokens
            .get(index + 1,)
            .filter(|next| next.after_comma && !next.text.contains('@',),)
            .ok_or_else(|| {
                Error::config(format!(
                    "invalid target format: {} (expected username@owner/repo or \
                     username,owner/repo)",
                    token.text
                ),)
            },)?;

        let username = validate_login(token.text, token.text,)?;
        let (owner, repo,) = parse_repository(repository.text,)?;
        targets.push(Target {
            username, owner, repo,
        },);
        index += 2;
    }

    Ok(targets,)
}

fn parse_modern_entry(entry: &str,) -> Result<Target, Error,>
{
    if entry.matches('@',).count() != 1 {
        return Err(Error::config(format!("invalid repository format: {entry}"),),);
    }

    let (username, repository,) = entry
        .split_once('@',)
        .ok_or_else(|| Error::config(format!("invalid target format: {entry}"),),)?;

    if username.is_empty() || repository.is_empty() {
        return Err(Error::config(format!("invalid target format: {entry}"),),);
    }

    let username = validate_login(username, entry,)?;
    let (owner, repo,) = parse_repository(repository,)?;

    Ok(Target {
        username, owner, repo,
    },)
}

fn parse_repository(repository: &str,) -> Result<(String, String,), Error,>
{
    let mut parts = repository.split('/',);
    let (Some(owner,), Some(repo,), None,) = (parts.next(), parts.next(), parts.next(),) else {
        return Err(Error::config(format!("invalid repository format: {repository}"),),);
    };

    if owner.is_empty() || repo.is_empty() {
        return Err(Error::config(format!("invalid repository format: {repository}"),),);
    }

    if !REPO_SEGMENT_PATTERN.is_match(owner,)
        || !REPO_SEGMENT_PATTERN.is_match(repo,)
        || matches!(repo, "." | "..")
    {
        return Err(Error::config(format!(
            "invalid repository format: {repository} (unsupported characters)"
        ),),);
    }

    Ok((owner.to_owned(), repo.to_owned(),),)
}

fn validate_login(login: &str, entry: &str,) -> Result<String, Error,>
{
    if !LOGIN_PATTERN.is_match(login,) {
        return Err(Error::config(format!(
            "invalid target format: {entry} (unsupported characters in username)"
        ),),);
    }
    Ok(login.to_owned(),)
}

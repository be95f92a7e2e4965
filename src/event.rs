// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Contribution events and calendar months.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Serialize, Serializer};

use crate::{
    api::{PullRequestNode, SearchRole},
    error::Error,
    target::{RepoId, Target},
};

/// Role a user played on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind
{
    /// The user opened the pull request.
    Authored,
    /// The user submitted at least one review.
    Reviewed,
}

impl From<SearchRole,> for ContributionKind
{
    fn from(role: SearchRole,) -> Self
    {
        match role {
            SearchRole::Authored => Self::Authored,
            SearchRole::Reviewed => Self::Reviewed,
        }
    }
}

/// Opaque pull-request identifier (GraphQL node id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,)]
#[serde(transparent)]
pub struct PrId(String,);

impl PrId
{
    /// Wraps a raw identifier.
    pub fn new(raw: impl Into<String,>,) -> Self
    {
        Self(raw.into(),)
    }

    /// Returns the raw identifier.
    pub fn as_str(&self,) -> &str
    {
        &self.0
    }
}

impl fmt::Display for PrId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(&self.0,)
    }
}

/// A single authored or reviewed pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct ContributionEvent
{
    /// Role the user played.
    pub kind:       ContributionKind,
    /// Pull request identifier.
    pub pr_id:      PrId,
    /// Pull request number, kept for diagnostics.
    pub number:     Option<u64,>,
    /// Timestamp used for bucketing.
    ///
    /// For authored events this is the pull request creation time. For
    /// reviewed events it is the user's first submitted review, falling back
    /// to creation time when no review timestamp is visible.
    pub created_at: DateTime<Utc,>,
    /// Repository the pull request belongs to.
    pub repo:       RepoId,
}

impl ContributionEvent
{
    /// Builds an event from parts.
    pub fn new(
        kind: ContributionKind,
        pr_id: impl Into<String,>,
        created_at: DateTime<Utc,>,
        repo: RepoId,
    ) -> Self
    {
        Self {
            kind, pr_id: PrId::new(pr_id,), number: None, created_at, repo,
        }
    }

    /// Converts a search node into an event for `target`.
    ///
    /// Returns `Ok(None)` for authored nodes whose author is not the target
    /// user; the search qualifier should already exclude those.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] when the node lacks an identifier or
    /// a creation timestamp.
    pub fn from_node(
        kind: ContributionKind,
        node: &PullRequestNode,
        target: &Target,
    ) -> Result<Option<Self,>, Error,>
    {
        let pr_id = node.id.as_deref().filter(|id| !id.is_empty(),).ok_or_else(|| {
            Error::classification(format!(
                "{kind:?} pull request #{} in {} has no identifier",
                node.number.map_or_else(|| "?".to_owned(), |n| n.to_string(),),
                target.repo_id()
            ),)
        },)?;

        let opened_at = node.created_at.ok_or_else(|| {
            Error::classification(format!("pull request {pr_id} has no creation timestamp"),)
        },)?;

        let created_at = match kind {
            ContributionKind::Authored => {
                let is_author = node
                    .author
                    .as_ref()
                    .is_some_and(|author| author.login.eq_ignore_ascii_case(&target.username,),);
                if !is_author {
                    return Ok(None,);
                }
                opened_at
            }
            ContributionKind::Reviewed => node.first_review_at().unwrap_or(opened_at,),
        };

        Ok(Some(Self {
            kind,
            pr_id: PrId::new(pr_id,),
            number: node.number,
            created_at,
            repo: target.repo_id(),
        },),)
    }

    /// Calendar month of the event in UTC.
    pub fn year_month(&self,) -> YearMonth
    {
        YearMonth::from_datetime(&self.created_at,)
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,)]
pub struct YearMonth
{
    /// Calendar year.
    pub year:  i32,
    /// Month number, `1..=12`.
    pub month: u32,
}

impl YearMonth
{
    /// Creates a month; `None` when `month` is outside `1..=12`.
    pub fn new(year: i32, month: u32,) -> Option<Self,>
    {
        (1..=12).contains(&month,).then_some(Self {
            year, month,
        },)
    }

    /// Month containing `timestamp` in UTC.
    pub fn from_datetime(timestamp: &DateTime<Utc,>,) -> Self
    {
        Self {
            year: timestamp.year(), month: timestamp.month(),
        }
    }

    /// The following calendar month.
    pub fn next(self,) -> Self
    {
        if self.month == 12 {
            Self {
                year: self.year + 1, month: 1,
            }
        } else {
            Self {
                year: self.year, month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth
{
    fn serialize<S,>(&self, serializer: S,) -> Result<S::Ok, S::Error,>
    where
        S: Serializer,
    {
        serializer.collect_str(self,)
    }
}

#[cfg(test)]
mod tests
{
    use chrono::TimeZone;

    use super::*;
    use crate::api::{Actor, ReviewConnection, ReviewNode};

    fn target() -> Target
    {
        Target::new("octocat", "github", "docs",)
    }

    fn at(y: i32, m: u32, d: u32,) -> DateTime<Utc,>
    {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0,).unwrap()
    }

    fn node(author: &str,) -> PullRequestNode
    {
        PullRequestNode {
            id:         Some("PR_1".to_owned(),),
            number:     Some(1,),
            created_at: Some(at(2024, 1, 15,),),
            author:     Some(Actor {
                login: author.to_owned(),
            },),
            reviews:    None,
        }
    }

    #[test]
    fn year_month_rolls_over_december()
    {
        let december = YearMonth::new(2023, 12,).expect("valid month",);
        assert_eq!(december.next(), YearMonth::new(2024, 1).unwrap());
        assert_eq!(YearMonth::new(2024, 1).unwrap().next(), YearMonth::new(2024, 2).unwrap());
    }

    #[test]
    fn year_month_rejects_invalid_months()
    {
        assert!(YearMonth::new(2024, 0,).is_none());
        assert!(YearMonth::new(2024, 13,).is_none());
    }

    #[test]
    fn year_month_displays_and_serializes_zero_padded()
    {
        let month = YearMonth::new(987, 3,).unwrap();
        assert_eq!(month.to_string(), "0987-03");
        assert_eq!(serde_json::to_string(&month,).unwrap(), "\"0987-03\"");
    }

    #[test]
    fn year_month_uses_utc_boundaries()
    {
        let late = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59,).unwrap();
        assert_eq!(YearMonth::from_datetime(&late), YearMonth::new(2024, 1).unwrap());
    }

    #[test]
    fn authored_node_becomes_event()
    {
        let event = ContributionEvent::from_node(ContributionKind::Authored, &node("OctoCat",), &target(),)
            .expect("well formed",)
            .expect("author matches case-insensitively",);
        assert_eq!(event.pr_id.as_str(), "PR_1");
        assert_eq!(event.number, Some(1));
        assert_eq!(event.created_at, at(2024, 1, 15));
        assert_eq!(event.repo.to_string(), "github/docs");
    }

    #[test]
    fn authored_node_from_other_user_is_skipped()
    {
        let result =
            ContributionEvent::from_node(ContributionKind::Authored, &node("someone",), &target(),)
                .expect("well formed",);
        assert!(result.is_none());
    }

    #[test]
    fn reviewed_node_uses_first_review_timestamp()
    {
        let mut reviewed = node("someone",);
        reviewed.reviews = Some(ReviewConnection {
            nodes: vec![
                Some(ReviewNode {
                    submitted_at: Some(at(2024, 3, 2,),),
                },),
                Some(ReviewNode {
                    submitted_at: Some(at(2024, 2, 10,),),
                },),
            ],
        },);

        let event =
            ContributionEvent::from_node(ContributionKind::Reviewed, &reviewed, &target(),)
                .expect("well formed",)
                .expect("reviewed nodes are never skipped",);
        assert_eq!(event.created_at, at(2024, 2, 10));
    }

    #[test]
    fn reviewed_node_without_visible_reviews_falls_back_to_creation()
    {
        let event =
            ContributionEvent::from_node(ContributionKind::Reviewed, &node("someone",), &target(),)
                .expect("well formed",)
                .expect("reviewed nodes are never skipped",);
        assert_eq!(event.created_at, at(2024, 1, 15));
    }

    #[test]
    fn node_without_timestamp_is_a_classification_error()
    {
        let mut broken = node("octocat",);
        broken.created_at = None;
        let error = ContributionEvent::from_node(ContributionKind::Authored, &broken, &target(),)
            .expect_err("missing timestamp",);
        assert!(matches!(error, Error::Classification { .. }));
    }

    #[test]
    fn node_without_id_is_a_classification_error()
    {
        let error = ContributionEvent::from_node(
            ContributionKind::Reviewed,
            &PullRequestNode::default(),
            &target(),
        )
        .expect_err("missing id",);
        assert!(matches!(error, Error::Classification { .. }));
    }
}

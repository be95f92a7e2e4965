// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Deduplication and role exclusion for contribution events.

use std::collections::{BTreeMap, btree_map::Entry};

use crate::event::{ContributionEvent, ContributionKind, PrId};

/// Deduplicated events for one target, each list sorted by pull request id.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ClassifiedEvents
{
    /// At most one event per authored pull request.
    pub authored: Vec<ContributionEvent,>,
    /// At most one event per reviewed pull request.
    pub reviewed: Vec<ContributionEvent,>,
}

impl ClassifiedEvents
{
    /// Returns `true` when neither role has events.
    pub fn is_empty(&self,) -> bool
    {
        self.authored.is_empty() && self.reviewed.is_empty()
    }

    /// Iterates over both roles, authored first.
    pub fn iter(&self,) -> impl Iterator<Item = &ContributionEvent,>
    {
        self.authored.iter().chain(&self.reviewed,)
    }
}

/// Incremental classifier fed one event at a time.
///
/// Duplicates of the same pull request within a role collapse into a single
/// event carrying the earliest timestamp seen, so the outcome does not depend
/// on arrival order.
#[derive(Debug, Default,)]
pub struct EventClassifier
{
    exclude_authored_from_reviewed: bool,
    authored:                       BTreeMap<PrId, ContributionEvent,>,
    reviewed:                       BTreeMap<PrId, ContributionEvent,>,
}

impl EventClassifier
{
    /// Creates an empty classifier.
    pub fn new(exclude_authored_from_reviewed: bool,) -> Self
    {
        Self {
            exclude_authored_from_reviewed,
            ..Self::default()
        }
    }

    /// Records one event.
    pub fn record(&mut self, event: ContributionEvent,)
    {
        let bucket = match event.kind {
            ContributionKind::Authored => &mut self.authored,
            ContributionKind::Reviewed => &mut self.reviewed,
        };
        match bucket.entry(event.pr_id.clone(),) {
            Entry::Vacant(slot,) => {
                slot.insert(event,);
            }
            Entry::Occupied(mut slot,) => {
                if event.created_at < slot.get().created_at {
                    slot.insert(event,);
                }
            }
        }
    }

    /// Number of distinct events recorded so far, before exclusion.
    pub fn len(&self,) -> usize
    {
        self.authored.len() + self.reviewed.len()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self,) -> bool
    {
        self.len() == 0
    }

    /// Applies exclusion and returns the classified events.
    pub fn finish(self,) -> ClassifiedEvents
    {
        let Self {
            exclude_authored_from_reviewed,
            authored,
            mut reviewed,
        } = self;
        if exclude_authored_from_reviewed {
            reviewed.retain(|pr_id, _| !authored.contains_key(pr_id,),);
        }
        ClassifiedEvents {
            authored: authored.into_values().collect(),
            reviewed: reviewed.into_values().collect(),
        }
    }
}

/// Classifies complete event lists in one call.
///
/// Events are filed by their own `kind`; the two arguments only exist for
/// readability at call sites.
pub fn classify(
    authored: impl IntoIterator<Item = ContributionEvent,>,
    reviewed: impl IntoIterator<Item = ContributionEvent,>,
    exclude_authored_from_reviewed: bool,
) -> ClassifiedEvents
{
    let mut classifier = EventClassifier::new(exclude_authored_from_reviewed,);
    authored.into_iter().chain(reviewed,).for_each(|event| classifier.record(event,),);
    classifier.finish()
}

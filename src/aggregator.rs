// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Monthly bucketing of classified events.
//!
//! Buckets cover every calendar month between the earliest and the latest
//! event inclusive. Months without activity are present with zero counts so
//! that renderers can draw a continuous axis.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    classifier::ClassifiedEvents,
    event::{ContributionKind, YearMonth},
};

/// Activity counts for a single calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize,)]
pub struct MonthBucket
{
    /// Month covered by the bucket, serialized as `YYYY-MM`.
    pub year_month:     YearMonth,
    /// Pull requests opened by the user in this month.
    pub authored_count: u32,
    /// Pull requests reviewed by the user in this month.
    pub reviewed_count: u32,
}

impl MonthBucket
{
    /// Empty bucket for `year_month`.
    pub fn empty(year_month: YearMonth,) -> Self
    {
        Self {
            year_month,
            authored_count: 0,
            reviewed_count: 0,
        }
    }
}

/// Stateless fold from events to gap-filled monthly buckets.
#[derive(Debug, Clone, Copy, Default,)]
pub struct MonthlyAggregator;

impl MonthlyAggregator
{
    /// Buckets `events` by UTC calendar month.
    ///
    /// Returns an empty vector when there are no events.
    pub fn aggregate(events: &ClassifiedEvents,) -> Vec<MonthBucket,>
    {
        let mut counts: BTreeMap<YearMonth, MonthBucket,> = BTreeMap::new();
        for event in events.iter() {
            let month = event.year_month();
            let bucket = counts.entry(month,).or_insert_with(|| MonthBucket::empty(month,),);
            match event.kind {
                ContributionKind::Authored => bucket.authored_count += 1,
                ContributionKind::Reviewed => bucket.reviewed_count += 1,
            }
        }

        let (Some(&first,), Some(&last,),) = (counts.keys().next(), counts.keys().next_back(),)
        else {
            return Vec::new();
        };

        let mut buckets = Vec::new();
        let mut month = first;
        loop {
            buckets.push(counts.get(&month,).copied().unwrap_or_else(|| MonthBucket::empty(month,),),);
            if month == last {
                break;
            }
            month = month.next();
        }
        buckets
    }
}

#[cfg(test)]
mod tests
{
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        classifier::{EventClassifier, classify},
        event::ContributionEvent,
        target::RepoId,
        testing::at,
    };

    fn repo() -> RepoId
    {
        RepoId {
            owner: "github".to_owned(), repo: "docs".to_owned(),
        }
    }

    fn event(kind: ContributionKind, id: &str, y: i32, m: u32, d: u32,) -> ContributionEvent
    {
        ContributionEvent::new(kind, id, at(y, m, d,), repo(),)
    }

    fn month(y: i32, m: u32,) -> YearMonth
    {
        YearMonth::new(y, m,).expect("valid month",)
    }

    fn triples(buckets: &[MonthBucket],) -> Vec<(String, u32, u32,),>
    {
        buckets.iter().map(|b| (b.year_month.to_string(), b.authored_count, b.reviewed_count,),).collect()
    }

    #[test]
    fn worked_example_fills_gaps()
    {
        let classified = classify(
            [
                event(ContributionKind::Authored, "1", 2024, 1, 15,),
                event(ContributionKind::Authored, "2", 2024, 3, 2,),
            ],
            [event(ContributionKind::Reviewed, "3", 2024, 2, 10,)],
            false,
        );
        let buckets = MonthlyAggregator::aggregate(&classified,);
        assert_eq!(
            triples(&buckets),
            vec![
                ("2024-01".to_owned(), 1, 0),
                ("2024-02".to_owned(), 0, 1),
                ("2024-03".to_owned(), 1, 0),
            ]
        );
    }

    #[test]
    fn exclusion_keeps_march_authored_only()
    {
        let classified = classify(
            [
                event(ContributionKind::Authored, "1", 2024, 1, 15,),
                event(ContributionKind::Authored, "2", 2024, 3, 2,),
            ],
            [
                event(ContributionKind::Reviewed, "3", 2024, 2, 10,),
                event(ContributionKind::Reviewed, "2", 2024, 3, 4,),
            ],
            true,
        );
        let buckets = MonthlyAggregator::aggregate(&classified,);
        assert_eq!(buckets[2].year_month, month(2024, 3));
        assert_eq!((buckets[2].authored_count, buckets[2].reviewed_count), (1, 0));
    }

    #[test]
    fn no_events_yield_no_buckets()
    {
        assert!(MonthlyAggregator::aggregate(&ClassifiedEvents::default()).is_empty());
    }

    #[test]
    fn span_crosses_year_boundary()
    {
        let classified = classify(
            [event(ContributionKind::Authored, "a", 2023, 11, 30,)],
            [event(ContributionKind::Reviewed, "b", 2024, 2, 1,)],
            false,
        );
        let months: Vec<String,> = MonthlyAggregator::aggregate(&classified,)
            .iter()
            .map(|b| b.year_month.to_string(),)
            .collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn bucket_serializes_with_month_string()
    {
        let json = serde_json::to_value(MonthBucket::empty(month(2024, 5,),),).expect("serializes",);
        assert_eq!(json["year_month"], "2024-05");
        assert_eq!(json["authored_count"], 0);
    }

    fn event_strategy() -> impl Strategy<Value = ContributionEvent,>
    {
        (any::<bool>(), 0u8..16, 0i64..(4 * 365),).prop_map(|(is_review, id, days,)| {
            let kind = if is_review { ContributionKind::Reviewed } else { ContributionKind::Authored };
            ContributionEvent::new(kind, format!("PR_{id}"), at(2022, 1, 1,) + Duration::days(days,), repo(),)
        },)
    }

    fn aggregate(events: Vec<ContributionEvent,>, exclude: bool,) -> Vec<MonthBucket,>
    {
        let mut classifier = EventClassifier::new(exclude,);
        events.into_iter().for_each(|event| classifier.record(event,),);
        MonthlyAggregator::aggregate(&classifier.finish(),)
    }

    proptest! {
        #[test]
        fn aggregation_is_permutation_invariant(
            (events, permuted) in prop::collection::vec(event_strategy(), 0..50)
                .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle())),
            exclude in any::<bool>(),
        ) {
            prop_assert_eq!(aggregate(events, exclude), aggregate(permuted, exclude));
        }

        #[test]
        fn months_are_gapless_and_increasing(
            events in prop::collection::vec(event_strategy(), 1..50),
        ) {
            let first = events.iter().map(ContributionEvent::year_month).min();
            let last = events.iter().map(ContributionEvent::year_month).max();
            let buckets = aggregate(events, false);
            prop_assert_eq!(buckets.first().map(|b| b.year_month), first);
            prop_assert_eq!(buckets.last().map(|b| b.year_month), last);
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].year_month.next(), pair[1].year_month);
            }
        }

        #[test]
        fn totals_match_distinct_events(
            events in prop::collection::vec(event_strategy(), 0..50),
            exclude in any::<bool>(),
        ) {
            let mut classifier = EventClassifier::new(exclude);
            events.into_iter().for_each(|event| classifier.record(event));
            let classified = classifier.finish();
            let buckets = MonthlyAggregator::aggregate(&classified);
            let authored: usize = buckets.iter().map(|b| b.authored_count as usize).sum();
            let reviewed: usize = buckets.iter().map(|b| b.reviewed_count as usize).sum();
            prop_assert_eq!(authored, classified.authored.len());
            prop_assert_eq!(reviewed, classified.reviewed.len());
        }
    }
}

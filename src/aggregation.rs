//! Totals and per-category breakdowns over already loaded records.
//!
//! Everything here is a plain fold; callers re-run it on every request.

use std::{cmp::Ordering, collections::BTreeMap};

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::Serialize;

use crate::{
    calendar::DateRange,
    models::{Categorized, Dated},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTally {
    pub count: usize,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistic {
    pub category: String,
    pub count: usize,
    pub total: BigDecimal,
    /// Share of the grand total, from 0 to 100.
    pub percentage: f64,
}

pub fn total<R: Categorized>(records: &[R]) -> BigDecimal {
    records
        .iter()
        .fold(BigDecimal::zero(), |acc, r| acc + r.amount())
}

pub fn count_by_category<R: Categorized>(records: &[R]) -> BTreeMap<String, CategoryTally> {
    let mut tallies: BTreeMap<String, CategoryTally> = BTreeMap::new();
    for record in records {
        let tally = tallies
            .entry(record.category().to_string())
            .or_insert_with(|| CategoryTally {
                count: 0,
                total: BigDecimal::zero(),
            });
        tally.count += 1;
        tally.total += record.amount();
    }
    tallies
}

/// Categories ordered by total, largest first. Equal totals fall back to
/// the category name so the order is stable.
pub fn statistics_by_category<R: Categorized>(records: &[R]) -> Vec<CategoryStatistic> {
    let grand_total = total(records).to_f64().unwrap_or(0.0);

    let mut stats: Vec<CategoryStatistic> = count_by_category(records)
        .into_iter()
        .map(|(category, tally)| {
            let percentage = if grand_total > 0.0 {
                tally.total.to_f64().unwrap_or(0.0) / grand_total * 100.0
            } else {
                0.0
            };
            CategoryStatistic {
                category,
                count: tally.count,
                total: tally.total,
                percentage,
            }
        })
        .collect();

    stats.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.category.cmp(&b.category),
        other => other,
    });
    stats
}

pub fn within<R: Dated + Clone>(records: &[R], range: &DateRange) -> Vec<R> {
    records
        .iter()
        .filter(|r| range.contains(r.date()))
        .cloned()
        .collect()
}

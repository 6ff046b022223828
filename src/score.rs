use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{StoredEntry, TrendPoint};
use crate::status::days_outstanding;

/// Performance score for one entry: the worse channel's outstanding days, negated.
pub fn score(tech: &str, custom: &str) -> i32 {
    -days_outstanding(tech).max(days_outstanding(custom))
}

/// Mean score per (date, group), sorted by date then group.
///
/// Rows without a date or a score are skipped. An empty `groups` slice keeps
/// every group.
pub fn group_trend(entries: &[StoredEntry], groups: &[String]) -> Vec<TrendPoint> {
    let mut totals: BTreeMap<(NaiveDate, String), (i64, usize)> = BTreeMap::new();

    for entry in entries {
        if !groups.is_empty() && !groups.contains(&entry.group) {
            continue;
        }
        let (Some(date), Some(score)) = (entry.date, entry.score) else {
            continue;
        };

        let total = totals.entry((date, entry.group.clone())).or_insert((0, 0));
        total.0 += i64::from(score);
        total.1 += 1;
    }

    totals
        .into_iter()
        .map(|((date, group), (sum, count))| TrendPoint {
            date,
            group,
            score: sum as f64 / count as f64,
        })
        .collect()
}

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{GroupLastUpdate, GroupOverview, MemberDay, StoredEntry, TrendPoint};
use crate::roster;
use crate::score;

/// Roster-shaped view of one day: every group, every member, their entries that day.
pub fn daily_overview(entries: &[StoredEntry], date: NaiveDate) -> Vec<GroupOverview> {
    roster::GROUPS
        .iter()
        .map(|(group, members)| GroupOverview {
            group: group.to_string(),
            members: members
                .iter()
                .map(|member| MemberDay {
                    member: member.to_string(),
                    entries: entries
                        .iter()
                        .filter(|e| {
                            e.date == Some(date) && e.group == *group && e.member == *member
                        })
                        .cloned()
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

pub fn last_updates(entries: &[StoredEntry]) -> Vec<GroupLastUpdate> {
    roster::groups()
        .map(|group| GroupLastUpdate {
            group: group.to_string(),
            last_date: entries
                .iter()
                .filter(|e| e.group == group)
                .filter_map(|e| e.date)
                .max(),
        })
        .collect()
}

/// Requested groups, or every group present in the log when none are requested.
pub fn selected_groups(entries: &[StoredEntry], requested: &[String]) -> Vec<String> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    entries
        .iter()
        .filter(|e| !e.group.is_empty())
        .map(|e| e.group.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Newest first by date then identifier; undated rows go last.
pub fn detail_rows(
    entries: &[StoredEntry],
    groups: &[String],
    member: Option<&str>,
) -> Vec<StoredEntry> {
    let groups = selected_groups(entries, groups);
    let mut rows: Vec<StoredEntry> = entries
        .iter()
        .filter(|e| groups.contains(&e.group))
        .filter(|e| member.map_or(true, |m| e.member == m))
        .cloned()
        .collect();

    rows.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x).then(b.id.cmp(&a.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.id.cmp(&a.id),
    });
    rows
}

pub fn render_overview(entries: &[StoredEntry], date: NaiveDate) -> String {
    let mut output = String::new();

    if entries.is_empty() {
        let _ = writeln!(output, "No follow-up history recorded yet.");
        return output;
    }
    if !entries.iter().any(|e| e.date == Some(date)) {
        let _ = writeln!(output, "No entries recorded for {date}.");
        return output;
    }

    for overview in daily_overview(entries, date) {
        let _ = writeln!(output, "### {} ({})", overview.group, date);
        for day in overview.members {
            let _ = writeln!(output);
            let _ = writeln!(output, "**{}**", day.member);
            if day.entries.is_empty() {
                let _ = writeln!(output, "(no entry for this day)");
                continue;
            }
            let _ = writeln!(output);
            let _ = writeln!(output, "| Incident | Tech | Customer |");
            let _ = writeln!(output, "|---|---|---|");
            for entry in day.entries {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} |",
                    entry.incident_number, entry.tech_followup, entry.custom_followup
                );
            }
        }
        let _ = writeln!(output);
    }

    output
}

pub fn render_last_updates(entries: &[StoredEntry]) -> String {
    let mut output = String::new();
    for update in last_updates(entries) {
        let last = update
            .last_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let _ = writeln!(output, "- {}: last update {}", update.group, last);
    }
    output
}

pub fn render_detail(rows: &[StoredEntry]) -> String {
    let mut output = String::new();

    if rows.is_empty() {
        let _ = writeln!(output, "No entries match the current filters.");
        return output;
    }

    let _ = writeln!(output, "| Id | Date | Group | Member | Incident | Status (Tech / Customer) |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for row in rows {
        let date = row.date.map(|d| d.to_string()).unwrap_or_default();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | T: {} \\| C: {} |",
            row.id,
            date,
            row.group,
            row.member,
            row.incident_number,
            row.tech_followup,
            row.custom_followup
        );
    }
    output
}

pub fn render_trend(points: &[TrendPoint]) -> String {
    let mut output = String::new();

    if points.is_empty() {
        let _ = writeln!(output, "No dated scores available for the selected groups.");
        return output;
    }

    let _ = writeln!(output, "| Date | Group | Avg score |");
    let _ = writeln!(output, "|---|---|---|");
    for point in points {
        let _ = writeln!(output, "| {} | {} | {:.2} |", point.date, point.group, point.score);
    }
    output
}

/// Writes `date,group,score` rows for plotting elsewhere.
pub fn write_trend_csv<W: std::io::Write>(points: &[TrendPoint], out: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn build_report(date: NaiveDate, groups: &[String], entries: &[StoredEntry]) -> String {
    let selected = selected_groups(entries, groups);
    let trend = score::group_trend(entries, &selected);
    let detail = detail_rows(entries, &selected, None);

    let mut output = String::new();
    let groups_label = if groups.is_empty() {
        "all groups".to_string()
    } else {
        groups.join(", ")
    };

    let _ = writeln!(output, "# Daily Follow-up Report");
    let _ = writeln!(output, "Generated for {groups_label} on {date}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Overview");
    let _ = writeln!(output);
    output.push_str(&render_overview(entries, date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Last Update by Group");
    output.push_str(&render_last_updates(entries));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Trend (lower is worse)");
    output.push_str(&render_trend(&trend));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Entries");
    let recent: Vec<StoredEntry> = detail.into_iter().take(20).collect();
    output.push_str(&render_detail(&recent));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn stored(id: i64, date: Option<NaiveDate>, group: &str, member: &str, tech: &str) -> StoredEntry {
        StoredEntry {
            id: EntryId(id),
            date,
            group: group.to_string(),
            member: member.to_string(),
            incident_number: format!("INC-{id}"),
            tech_followup: tech.to_string(),
            custom_followup: "Normal".to_string(),
            score: Some(score::score(tech, "Normal")),
        }
    }

    fn sample() -> Vec<StoredEntry> {
        vec![
            stored(0, Some(day(3)), "The First Group", "Desiree", "Blank"),
            stored(1, Some(day(4)), "The First Group", "Jessica Dollins", "Normal"),
            stored(2, Some(day(4)), "The Second Group", "Christie Debrah", "No update for 2 days"),
            stored(3, None, "The First Group", "Desiree", "Normal"),
            stored(4, Some(day(4)), "The First Group", "Desiree", "No update for 5 days"),
        ]
    }

    #[test]
    fn overview_follows_roster_for_the_day() {
        let overview = daily_overview(&sample(), day(4));
        assert_eq!(overview.len(), roster::GROUPS.len());
        let first = &overview[0];
        assert_eq!(first.group, "The First Group");
        assert_eq!(first.members[0].member, "Desiree");
        assert_eq!(first.members[0].entries.len(), 1);
        assert_eq!(first.members[0].entries[0].id, EntryId(4));
        assert_eq!(first.members[1].entries.len(), 1);
        assert!(overview[2].members[0].entries.is_empty());
    }

    #[test]
    fn overview_reports_empty_states() {
        assert!(render_overview(&[], day(4)).contains("No follow-up history"));
        assert!(render_overview(&sample(), day(9)).contains("No entries recorded for 2025-11-09"));
        let text = render_overview(&sample(), day(4));
        assert!(text.contains("### The Third Group (2025-11-04)"));
        assert!(text.contains("(no entry for this day)"));
        assert!(text.contains("| INC-4 | No update for 5 days | Normal |"));
    }

    #[test]
    fn last_update_per_group() {
        let updates = last_updates(&sample());
        assert_eq!(updates[0].last_date, Some(day(4)));
        assert_eq!(updates[1].last_date, Some(day(4)));
        assert_eq!(updates[2].last_date, None);
        assert!(render_last_updates(&sample()).contains("The Third Group: last update N/A"));
    }

    #[test]
    fn detail_sorts_newest_first_with_undated_last() {
        let rows = detail_rows(&sample(), &[], None);
        let ids: Vec<i64> = rows.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![4, 2, 1, 0, 3]);

        let desiree = detail_rows(&sample(), &["The First Group".to_string()], Some("Desiree"));
        let ids: Vec<i64> = desiree.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![4, 0, 3]);
    }

    #[test]
    fn selected_groups_default_to_present_groups() {
        let groups = selected_groups(&sample(), &[]);
        assert_eq!(groups, vec!["The First Group", "The Second Group"]);
    }

    #[test]
    fn trend_csv_has_header_and_rows() {
        let points = score::group_trend(&sample(), &[]);
        let mut out = Vec::new();
        write_trend_csv(&points, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,group,score"));
        assert_eq!(lines.next(), Some("2025-11-03,The First Group,-4.0"));
    }

    #[test]
    fn report_contains_all_sections() {
        let report = build_report(day(4), &[], &sample());
        assert!(report.contains("# Daily Follow-up Report"));
        assert!(report.contains("Generated for all groups on 2025-11-04"));
        assert!(report.contains("## Last Update by Group"));
        assert!(report.contains("| 2025-11-04 | The First Group | -2.50 |"));
        assert!(report.contains("T: No update for 2 days \\| C: Normal"));
    }
}

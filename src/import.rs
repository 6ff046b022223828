use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::models::FollowupEntry;
use crate::status::FollowupStatus;
use crate::store::LogStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Deserialize)]
struct CsvRow {
    date: NaiveDate,
    group: String,
    member: String,
    #[serde(default)]
    incident_number: Option<String>,
    #[serde(default)]
    tech_followup: Option<String>,
    #[serde(default)]
    custom_followup: Option<String>,
}

fn status(value: Option<&str>) -> Result<FollowupStatus, String> {
    match value {
        Some(label) if !label.trim().is_empty() => label.parse(),
        _ => Ok(FollowupStatus::default()),
    }
}

/// Creates one entry per CSV row; a `score` column, if present, is ignored.
///
/// Rows that fail to parse or break the roster are skipped. Append failures
/// are counted, never retried.
pub async fn import_csv(store: &dyn LogStore, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(csv_path)?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                summary.skipped += 1;
                continue;
            }
        };

        let statuses = (
            status(row.tech_followup.as_deref()),
            status(row.custom_followup.as_deref()),
        );
        let (tech, custom) = match statuses {
            (Ok(tech), Ok(custom)) => (tech, custom),
            (Err(err), _) | (_, Err(err)) => {
                warn!(line, error = %err, "skipping row with unknown status");
                summary.skipped += 1;
                continue;
            }
        };

        let entry = match FollowupEntry::new(
            row.date,
            &row.group,
            &row.member,
            row.incident_number.as_deref().unwrap_or_default(),
            tech,
            custom,
        ) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(line, error = %err, "skipping row outside the roster");
                summary.skipped += 1;
                continue;
            }
        };

        match store.append(&entry).await {
            Ok(_) => summary.inserted += 1,
            Err(err) => {
                warn!(line, error = %err, "failed to save row, resubmit it manually");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use super::*;
    use crate::store::memory::MemoryLogStore;

    #[tokio::test]
    async fn imports_valid_rows_and_recomputes_score() {
        let path = std::env::temp_dir().join(format!("followup-import-{}.csv", Uuid::new_v4()));
        fs::write(
            &path,
            "date,group,member,incident_number,tech_followup,custom_followup,score\n\
             2025-11-03,The First Group,Desiree,W1,Blank,Normal,0\n\
             2025-11-03,The First Group,Kris Ramsey,W2,Normal,Normal,0\n\
             2025-11-03,The FOURTH Group,Kris Ramsey,,No update for 3 days,,\n\
             2025-11-03,The FOURTH Group,Kris Ramsey,,Sometimes,Normal,\n\
             yesterday,The FOURTH Group,Kris Ramsey,,Normal,Normal,\n",
        )
        .unwrap();

        let store = MemoryLogStore::default();
        let summary = import_csv(&store, &path).await.unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                skipped: 3,
                failed: 0
            }
        );
        let rows = store.load_all().await.unwrap();
        assert_eq!(rows[0].score, Some(-4));
        assert_eq!(rows[1].member, "Kris Ramsey");
        assert_eq!(rows[1].custom_followup, "Normal");
        assert_eq!(rows[1].score, Some(-3));
    }
}

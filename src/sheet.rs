use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{EntryId, FollowupEntry, StoredEntry};
use crate::store::{LogStore, StoreError};

pub const HEADER: [&str; 7] = [
    "date",
    "group",
    "member",
    "incident_number",
    "tech_followup",
    "custom_followup",
    "score",
];

/// Log kept as a single worksheet (a CSV workbook) with a header row.
///
/// Identifiers are zero-based data row positions: identifier `n` lives on
/// sheet row `n + 2`. Deleting a row shifts every row below it, so after one
/// delete a second delete is refused until the log has been reloaded.
pub struct SheetLogStore {
    path: PathBuf,
    positions_stale: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    member: Option<String>,
    #[serde(default)]
    incident_number: Option<String>,
    #[serde(default)]
    tech_followup: Option<String>,
    #[serde(default)]
    custom_followup: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    score: Option<i32>,
}

impl SheetLogStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            positions_stale: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LogStore for SheetLogStore {
    async fn init(&self) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || ensure_sheet(&path)).await??;
        info!(path = %self.path.display(), "follow-up sheet ready");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let path = self.path.clone();
        let entries = tokio::task::spawn_blocking(move || read_entries(&path)).await??;
        self.positions_stale.store(false, Ordering::SeqCst);
        debug!(rows = entries.len(), "loaded follow-up sheet");
        Ok(entries)
    }

    async fn append(&self, entry: &FollowupEntry) -> Result<EntryId, StoreError> {
        let path = self.path.clone();
        let row = vec![
            entry.date.format("%Y-%m-%d").to_string(),
            entry.group.clone(),
            entry.member.clone(),
            entry.incident_number.clone(),
            entry.tech_followup.label().to_string(),
            entry.custom_followup.label().to_string(),
            entry.score().to_string(),
        ];
        tokio::task::spawn_blocking(move || append_row(&path, &row)).await?
    }

    async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
        if self.positions_stale.load(Ordering::SeqCst) {
            return Err(StoreError::StalePositions);
        }
        let path = self.path.clone();
        let removed = tokio::task::spawn_blocking(move || delete_row(&path, id)).await??;
        if removed {
            self.positions_stale.store(true, Ordering::SeqCst);
            debug!(id = %id, sheet_row = id.0 + 2, "deleted sheet row");
        }
        Ok(removed)
    }
}

/// Writes the header row when the sheet is missing or zero bytes long.
fn ensure_sheet(path: &Path) -> Result<(), StoreError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => return Ok(()),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    writer.flush()?;
    Ok(())
}

fn reader(file: File) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file)
}

fn read_entries(path: &Path) -> Result<Vec<StoredEntry>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut entries = Vec::new();
    for (position, result) in reader(file).deserialize::<SheetRow>().enumerate() {
        let row = result?;
        entries.push(StoredEntry {
            id: EntryId(position as i64),
            date: row.date.as_deref().and_then(parse_sheet_date),
            group: row.group.unwrap_or_default(),
            member: row.member.unwrap_or_default(),
            incident_number: row.incident_number.unwrap_or_default(),
            tech_followup: row.tech_followup.unwrap_or_default(),
            custom_followup: row.custom_followup.unwrap_or_default(),
            score: row.score,
        });
    }
    Ok(entries)
}

fn data_row_count(path: &Path) -> Result<usize, StoreError> {
    let mut count = 0;
    for record in reader(File::open(path)?).records() {
        record?;
        count += 1;
    }
    Ok(count)
}

fn append_row(path: &Path, row: &[String]) -> Result<EntryId, StoreError> {
    ensure_sheet(path)?;
    let position = data_row_count(path)?;

    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            file.write_all(b"\n")?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(row)?;
    writer.flush()?;

    Ok(EntryId(position as i64))
}

fn delete_row(path: &Path, id: EntryId) -> Result<bool, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };

    // Untrimmed so the rows that stay are rewritten exactly as read.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let header = reader.headers()?.clone();
    let mut records = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

    let Ok(position) = usize::try_from(id.0) else {
        return Ok(false);
    };
    if position >= records.len() {
        return Ok(false);
    }
    records.remove(position);

    let tmp = path.with_file_name(format!(".{}.tmp", Uuid::new_v4()));
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&tmp)?;
        writer.write_record(&header)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(true)
}

fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .ok()
}

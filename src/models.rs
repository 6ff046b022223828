use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::roster::{self, RosterError};
use crate::score;
use crate::status::FollowupStatus;

/// Backend-assigned handle for a stored row.
///
/// Postgres hands out surrogate keys; the sheet backend uses zero-based data
/// row positions, which shift whenever a row above them is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A new entry, ready to append. The score is derived on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowupEntry {
    pub date: NaiveDate,
    pub group: String,
    pub member: String,
    pub incident_number: String,
    pub tech_followup: FollowupStatus,
    pub custom_followup: FollowupStatus,
    score: i32,
}

impl FollowupEntry {
    pub fn new(
        date: NaiveDate,
        group: &str,
        member: &str,
        incident_number: &str,
        tech_followup: FollowupStatus,
        custom_followup: FollowupStatus,
    ) -> Result<Self, RosterError> {
        roster::validate(group, member)?;
        Ok(Self {
            date,
            group: group.to_string(),
            member: member.to_string(),
            incident_number: incident_number.trim().to_string(),
            tech_followup,
            custom_followup,
            score: score::score(tech_followup.label(), custom_followup.label()),
        })
    }

    pub fn score(&self) -> i32 {
        self.score
    }
}

/// A row as read back from a backend. Missing cells load as empty/None.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEntry {
    pub id: EntryId,
    pub date: Option<NaiveDate>,
    pub group: String,
    pub member: String,
    pub incident_number: String,
    pub tech_followup: String,
    pub custom_followup: String,
    pub score: Option<i32>,
}

impl StoredEntry {
    pub fn from_entry(id: EntryId, entry: &FollowupEntry) -> Self {
        Self {
            id,
            date: Some(entry.date),
            group: entry.group.clone(),
            member: entry.member.clone(),
            incident_number: entry.incident_number.clone(),
            tech_followup: entry.tech_followup.label().to_string(),
            custom_followup: entry.custom_followup.label().to_string(),
            score: Some(entry.score),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemberDay {
    pub member: String,
    pub entries: Vec<StoredEntry>,
}

#[derive(Debug, Clone)]
pub struct GroupOverview {
    pub group: String,
    pub members: Vec<MemberDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLastUpdate {
    pub group: String,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub group: String,
    pub score: f64,
}

use std::fmt;
use std::str::FromStr;

/// Follow-up status vocabulary, in the order it is offered to users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FollowupStatus {
    #[default]
    Normal,
    Blank,
    UpToDate,
    NoUpdateFor2,
    NoUpdateFor3,
    NoUpdateFor4,
    NoUpdateFor5,
}

impl FollowupStatus {
    pub const ALL: [FollowupStatus; 7] = [
        FollowupStatus::Normal,
        FollowupStatus::Blank,
        FollowupStatus::UpToDate,
        FollowupStatus::NoUpdateFor2,
        FollowupStatus::NoUpdateFor3,
        FollowupStatus::NoUpdateFor4,
        FollowupStatus::NoUpdateFor5,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FollowupStatus::Normal => "Normal",
            FollowupStatus::Blank => "Blank",
            FollowupStatus::UpToDate => "Up to date (0 days)",
            FollowupStatus::NoUpdateFor2 => "No update for 2 days",
            FollowupStatus::NoUpdateFor3 => "No update for 3 days",
            FollowupStatus::NoUpdateFor4 => "No update for 4 days",
            FollowupStatus::NoUpdateFor5 => "No update for 5 days",
        }
    }

    pub fn days_outstanding(self) -> i32 {
        days_outstanding(self.label())
    }
}

impl fmt::Display for FollowupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FollowupStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        FollowupStatus::ALL
            .iter()
            .copied()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let options: Vec<&str> = FollowupStatus::ALL.iter().map(|s| s.label()).collect();
                format!("unknown status {value:?}, expected one of: {}", options.join(", "))
            })
    }
}

/// Days since the last update implied by a status label.
///
/// "Blank" counts as 4 days. Anything unrecognised or malformed counts as 0;
/// stored rows may hold arbitrary text and the score must stay defined.
pub fn days_outstanding(status: &str) -> i32 {
    match status {
        "Normal" => 0,
        "Blank" => 4,
        other if other.contains("No update for") => parse_no_update_days(other).unwrap_or(0),
        _ => 0,
    }
}

fn parse_no_update_days(status: &str) -> Option<i32> {
    let (_, after_for) = status.split_once("for")?;
    let (days, _) = after_for.split_once("days")?;
    days.trim().parse::<u8>().ok().map(i32::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_maps_to_expected_days() {
        let expected = [
            ("Normal", 0),
            ("Up to date (0 days)", 0),
            ("No update for 2 days", 2),
            ("No update for 3 days", 3),
            ("No update for 4 days", 4),
            ("No update for 5 days", 5),
            ("Blank", 4),
        ];
        for (label, days) in expected {
            assert_eq!(days_outstanding(label), days, "{label}");
        }
    }

    #[test]
    fn enum_days_match_label_parsing() {
        for status in FollowupStatus::ALL {
            assert_eq!(status.days_outstanding(), days_outstanding(status.label()));
        }
    }

    #[test]
    fn unknown_or_malformed_status_fails_open() {
        assert_eq!(days_outstanding(""), 0);
        assert_eq!(days_outstanding("late"), 0);
        assert_eq!(days_outstanding("No update for many days"), 0);
        assert_eq!(days_outstanding("No update for 7"), 0);
        assert_eq!(days_outstanding("blank"), 0);
        assert_eq!(days_outstanding("No update for -3 days"), 0);
        assert_eq!(days_outstanding("No update for -2147483648 days"), 0);
        assert_eq!(days_outstanding("No update for 300 days"), 0);
    }

    #[test]
    fn unlisted_day_counts_still_parse() {
        assert_eq!(days_outstanding("No update for 9 days"), 9);
    }

    #[test]
    fn parses_labels_case_insensitively() {
        let status: FollowupStatus = "no update for 3 days".parse().unwrap();
        assert_eq!(status, FollowupStatus::NoUpdateFor3);
        assert!("sometimes".parse::<FollowupStatus>().is_err());
        assert_eq!(FollowupStatus::default(), FollowupStatus::Normal);
    }
}

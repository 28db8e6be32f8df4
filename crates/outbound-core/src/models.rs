//! Domain models shared between the upstream client and the MCP layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream status code for an account that is connected and sending.
const ACCOUNT_STATUS_ACTIVE: i64 = 1;

/// One upstream email-sending identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AccountRecord")]
pub struct SendingAccount {
    /// Sender address; unique per upstream workspace.
    pub email: String,
    /// Upstream warmup status code.
    pub warmup_status: i64,
    /// Maximum emails per day from this account.
    pub daily_limit: u32,
    /// Whether upstream reports the account as active.
    pub is_active: bool,
}

/// Account record as returned by `GET /accounts`.
#[derive(Debug, Deserialize)]
struct AccountRecord {
    email: String,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    warmup_status: i64,
    #[serde(default)]
    daily_limit: Option<u32>,
}

impl From<AccountRecord> for SendingAccount {
    fn from(record: AccountRecord) -> Self {
        // Records echoed back from our own serialization carry `is_active`;
        // live upstream records only carry the numeric status.
        let is_active = record
            .is_active
            .unwrap_or(record.status == Some(ACCOUNT_STATUS_ACTIVE));
        Self {
            email: record.email,
            warmup_status: record.warmup_status,
            daily_limit: record.daily_limit.unwrap_or(0),
            is_active,
        }
    }
}

impl SendingAccount {
    /// Case-insensitive address comparison.
    pub fn matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Day of the week used in sending schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[serde(alias = "sun")]
    Sunday,
    #[serde(alias = "mon")]
    Monday,
    #[serde(alias = "tue")]
    Tuesday,
    #[serde(alias = "wed")]
    Wednesday,
    #[serde(alias = "thu")]
    Thursday,
    #[serde(alias = "fri")]
    Friday,
    #[serde(alias = "sat")]
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Monday through Friday.
    pub fn workweek() -> Vec<Weekday> {
        vec![
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
        ]
    }

    /// Parse a day name or its three-letter abbreviation, ignoring case.
    pub fn from_name(name: &str) -> Option<Weekday> {
        let name = name.trim().to_ascii_lowercase();
        Weekday::ALL.into_iter().find(|day| {
            let full = day.to_string();
            name == full || name == full[..3]
        })
    }

    /// Upstream day index: Sunday is 0, Saturday is 6.
    pub fn index(&self) -> u8 {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Sunday => "sunday",
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
        };
        f.write_str(name)
    }
}

/// Daily sending window, both ends in 24-hour `HH:MM`.
///
/// A missing end deserializes as an empty string and is reported by the
/// validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWindow {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// An additional email sent after the first step of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpStep {
    /// Subject line; an empty subject keeps the thread ("Re:").
    #[serde(default)]
    pub subject: String,
    /// Raw body text; line breaks become paragraphs.
    #[serde(default)]
    pub body: String,
    /// Days to wait after the previous step. Signed so that a negative value
    /// reaches the validator.
    #[serde(default = "default_delay_days")]
    pub delay_days: i64,
}

fn default_delay_days() -> i64 {
    3
}

/// Caller-supplied intent for a new campaign, before validation.
///
/// Required string fields default to empty so that a missing field turns
/// into a `MissingRequiredField` validation failure instead of a
/// deserialization error. That keeps every problem in one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub email_list: Vec<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Day names as given. `None` means Monday to Friday; an empty list or
    /// an unknown name is a validation failure.
    #[serde(default)]
    pub days: Option<Vec<String>>,
    #[serde(default)]
    pub send_window: Option<SendWindow>,
    #[serde(default)]
    pub daily_limit: Option<u32>,
    #[serde(default)]
    pub email_gap_minutes: Option<u32>,
    #[serde(default)]
    pub stop_on_reply: Option<bool>,
    #[serde(default)]
    pub open_tracking: Option<bool>,
    #[serde(default)]
    pub link_tracking: Option<bool>,
    #[serde(default)]
    pub follow_ups: Vec<FollowUpStep>,
}

impl CampaignDraft {
    /// Scheduled days, falling back to the workweek when unspecified.
    /// Unknown names are skipped.
    pub fn schedule_days(&self) -> Vec<Weekday> {
        match &self.days {
            Some(days) => {
                let mut days: Vec<Weekday> =
                    days.iter().filter_map(|d| Weekday::from_name(d)).collect();
                days.sort();
                days.dedup();
                days
            }
            None => Weekday::workweek(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_from_upstream_record() {
        let account: SendingAccount = serde_json::from_value(json!({
            "email": "Sales@Acme.io",
            "status": 1,
            "warmup_status": 1,
            "daily_limit": 50
        }))
        .unwrap();
        assert!(account.is_active);
        assert_eq!(account.daily_limit, 50);
        assert!(account.matches("sales@acme.io"));

        let paused: SendingAccount =
            serde_json::from_value(json!({"email": "p@acme.io", "status": 2})).unwrap();
        assert!(!paused.is_active);
        assert_eq!(paused.daily_limit, 0);
    }

    #[test]
    fn test_account_serialization_round_trips_active_flag() {
        let account = SendingAccount {
            email: "a@acme.io".to_string(),
            warmup_status: 0,
            daily_limit: 30,
            is_active: true,
        };
        let value = serde_json::to_value(&account).unwrap();
        let back: SendingAccount = serde_json::from_value(value).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_weekday_aliases() {
        let days: Vec<Weekday> = serde_json::from_value(json!(["mon", "friday", "sun"])).unwrap();
        assert_eq!(days, vec![Weekday::Monday, Weekday::Friday, Weekday::Sunday]);
        assert_eq!(Weekday::Sunday.index(), 0);
        assert_eq!(Weekday::Saturday.index(), 6);
    }

    #[test]
    fn test_weekday_from_name() {
        assert_eq!(Weekday::from_name("Monday"), Some(Weekday::Monday));
        assert_eq!(Weekday::from_name(" THU "), Some(Weekday::Thursday));
        assert_eq!(Weekday::from_name("funday"), None);
        assert_eq!(Weekday::from_name(""), None);
    }

    #[test]
    fn test_draft_keeps_malformed_schedule_for_validation() {
        let draft: CampaignDraft = serde_json::from_value(json!({
            "days": ["funday", "mon"],
            "send_window": {"start": "9:00"}
        }))
        .unwrap();
        assert_eq!(draft.days, Some(vec!["funday".to_string(), "mon".to_string()]));
        let window = draft.send_window.as_ref().unwrap();
        assert_eq!(window.start, "9:00");
        assert!(window.end.is_empty());
        assert_eq!(draft.schedule_days(), vec![Weekday::Monday]);
    }

    #[test]
    fn test_draft_defaults() {
        let draft: CampaignDraft = serde_json::from_value(json!({"name": "Q3"})).unwrap();
        assert_eq!(draft.name, "Q3");
        assert!(draft.subject.is_empty());
        assert!(draft.email_list.is_empty());
        assert_eq!(draft.schedule_days(), Weekday::workweek());
    }

    #[test]
    fn test_schedule_days_sorted_and_deduplicated() {
        let draft = CampaignDraft {
            days: Some(vec!["friday".to_string(), "Mon".to_string(), "fri".to_string()]),
            ..Default::default()
        };
        assert_eq!(draft.schedule_days(), vec![Weekday::Monday, Weekday::Friday]);
    }
}

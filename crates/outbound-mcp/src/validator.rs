//! Field validation for campaign input.
//!
//! All validators are pure and total: they never fail, never touch the
//! network and return either a boolean or a list of structured failures.
//! [`validate_campaign_draft`] runs every check and reports every problem
//! at once, in field declaration order.

use outbound_core::{CampaignDraft, SendingAccount, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// VALIDATION FAILURE TYPES
// =============================================================================

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    InvalidEmailFormat,
    PlaceholderEmailDetected,
    UnknownTimezone,
    InvalidTimeFormat,
    AccountNotEligible,
    MissingRequiredField,
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Field path, e.g. `email_list[1]` or `send_window.start`.
    pub field: String,
    pub reason: FailureReason,
    /// Human-readable explanation with a suggested fix.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason,
            message: message.into(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            field,
            FailureReason::MissingRequiredField,
            format!("'{}' is required and must not be empty", field),
        )
    }

    pub fn invalid_email(field: &str, email: &str) -> Self {
        Self::new(
            field,
            FailureReason::InvalidEmailFormat,
            format!("'{}' is not a valid email address", email),
        )
    }

    pub fn placeholder_email(field: &str, email: &str) -> Self {
        Self::new(
            field,
            FailureReason::PlaceholderEmailDetected,
            format!(
                "'{}' looks like a placeholder; use a real sending account from list_accounts",
                email
            ),
        )
    }

    pub fn account_not_eligible(field: &str, email: &str, known: bool) -> Self {
        let message = if known {
            format!(
                "sending account '{}' exists but is not active; activate it or choose another account",
                email
            )
        } else {
            format!(
                "'{}' is not a sending account in this workspace; connect it first or choose one from list_accounts",
                email
            )
        };
        Self::new(field, FailureReason::AccountNotEligible, message)
    }

    pub fn unknown_timezone(field: &str, timezone: &str) -> Self {
        Self::new(
            field,
            FailureReason::UnknownTimezone,
            format!(
                "timezone '{}' is not supported; use an IANA name such as America/New_York",
                timezone
            ),
        )
    }

    pub fn invalid_time(field: &str, value: &str) -> Self {
        Self::new(
            field,
            FailureReason::InvalidTimeFormat,
            format!("'{}' is not a 24-hour HH:MM time (e.g. 09:30)", value),
        )
    }

    pub fn unknown_day(field: &str, value: &str) -> Self {
        Self::new(
            field,
            FailureReason::InvalidTimeFormat,
            format!("'{}' is not a day of the week (e.g. monday or mon)", value),
        )
    }

    pub fn window_out_of_order(start: &str, end: &str) -> Self {
        Self::new(
            "send_window",
            FailureReason::InvalidTimeFormat,
            format!("send window start {} must be earlier than its end {}", start, end),
        )
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// =============================================================================
// FIELD VALIDATORS
// =============================================================================

/// Timezones accepted for campaign schedules.
pub const SUPPORTED_TIMEZONES: &[&str] = &[
    "UTC",
    "Pacific/Honolulu",
    "America/Anchorage",
    "America/Los_Angeles",
    "America/Phoenix",
    "America/Denver",
    "America/Chicago",
    "America/New_York",
    "America/Detroit",
    "America/Toronto",
    "America/Vancouver",
    "America/Mexico_City",
    "America/Bogota",
    "America/Lima",
    "America/Santiago",
    "America/Sao_Paulo",
    "America/Argentina/Buenos_Aires",
    "America/Halifax",
    "America/St_Johns",
    "Atlantic/Reykjavik",
    "Europe/London",
    "Europe/Dublin",
    "Europe/Lisbon",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Madrid",
    "Europe/Rome",
    "Europe/Amsterdam",
    "Europe/Stockholm",
    "Europe/Warsaw",
    "Europe/Athens",
    "Europe/Helsinki",
    "Europe/Istanbul",
    "Europe/Moscow",
    "Africa/Cairo",
    "Africa/Johannesburg",
    "Africa/Lagos",
    "Asia/Dubai",
    "Asia/Karachi",
    "Asia/Kolkata",
    "Asia/Dhaka",
    "Asia/Bangkok",
    "Asia/Singapore",
    "Asia/Hong_Kong",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Asia/Seoul",
    "Australia/Perth",
    "Australia/Sydney",
    "Pacific/Auckland",
];

/// Domains reserved for documentation or commonly used as stand-ins.
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "domain.com",
    "yourdomain.com",
    "yourcompany.com",
    "email.com",
    "placeholder.com",
];

const PLACEHOLDER_LOCAL_PARTS: &[&str] = &[
    "your-verified-email",
    "your-email",
    "youremail",
    "your.email",
    "verified-email",
    "test",
    "placeholder",
    "sender",
    "name",
    "john.doe",
    "jane.doe",
];

const PLACEHOLDER_LOCAL_PREFIXES: &[&str] = &["your-", "your_", "your."];

/// Syntactic email check: one `@`, a dot-atom local part and a dotted
/// domain whose last label is alphabetic.
pub fn validate_email_format(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if domain.contains('@') {
        return false;
    }
    valid_local_part(local) && valid_domain(domain)
}

fn valid_local_part(local: &str) -> bool {
    const SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-.";
    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c))
}

fn valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Whether an address is a template stand-in rather than a real sender.
///
/// Case-insensitive. Addresses without `@` are never placeholders; format
/// problems are [`validate_email_format`]'s concern.
pub fn is_placeholder_email(email: &str) -> bool {
    let email = email.trim().to_ascii_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    let placeholder_domain = PLACEHOLDER_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")));
    let placeholder_local = PLACEHOLDER_LOCAL_PARTS.contains(&local)
        || local.contains("verified-email")
        || PLACEHOLDER_LOCAL_PREFIXES.iter().any(|p| local.starts_with(p));

    placeholder_domain || placeholder_local
}

/// Whether `timezone` is one of [`SUPPORTED_TIMEZONES`].
pub fn validate_timezone(timezone: &str) -> bool {
    SUPPORTED_TIMEZONES.contains(&timezone)
}

/// Strict 24-hour `HH:MM`: two-digit hour 00-23, two-digit minute 00-59.
pub fn validate_time_format(value: &str) -> bool {
    parse_time(value).is_some()
}

/// Minutes since midnight for a valid `HH:MM` value.
pub(crate) fn parse_time(value: &str) -> Option<u16> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hours = u16::from(bytes[0] - b'0') * 10 + u16::from(bytes[1] - b'0');
    let minutes = u16::from(bytes[3] - b'0') * 10 + u16::from(bytes[4] - b'0');
    (hours <= 23 && minutes <= 59).then_some(hours * 60 + minutes)
}

// =============================================================================
// DRAFT VALIDATION
// =============================================================================

/// Validate a campaign draft against the workspace's sending accounts.
///
/// Returns an empty list if and only if the draft can be promoted to a
/// create request. Each `email_list` entry yields at most one failure:
/// format is checked first, then placeholders, then account eligibility.
pub fn validate_campaign_draft(
    draft: &CampaignDraft,
    accounts: &[SendingAccount],
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    for (field, value) in [
        ("name", &draft.name),
        ("subject", &draft.subject),
        ("body", &draft.body),
    ] {
        if value.trim().is_empty() {
            failures.push(ValidationFailure::missing_field(field));
        }
    }

    if draft.email_list.is_empty() {
        failures.push(ValidationFailure::missing_field("email_list"));
    }
    for (i, email) in draft.email_list.iter().enumerate() {
        let field = format!("email_list[{i}]");
        let email = email.trim();
        if !validate_email_format(email) {
            failures.push(ValidationFailure::invalid_email(&field, email));
        } else if is_placeholder_email(email) {
            failures.push(ValidationFailure::placeholder_email(&field, email));
        } else {
            match accounts.iter().find(|a| a.matches(email)) {
                Some(account) if account.is_active => {}
                found => failures.push(ValidationFailure::account_not_eligible(
                    &field,
                    email,
                    found.is_some(),
                )),
            }
        }
    }

    if let Some(timezone) = &draft.timezone
        && !validate_timezone(timezone)
    {
        failures.push(ValidationFailure::unknown_timezone("timezone", timezone));
    }

    match &draft.days {
        Some(days) if days.is_empty() => failures.push(ValidationFailure::new(
            "days",
            FailureReason::MissingRequiredField,
            "at least one sending day is required; omit 'days' for Monday to Friday",
        )),
        Some(days) => {
            for (i, day) in days.iter().enumerate() {
                if Weekday::from_name(day).is_none() {
                    failures.push(ValidationFailure::unknown_day(&format!("days[{i}]"), day));
                }
            }
        }
        None => {}
    }

    if let Some(window) = &draft.send_window {
        let start = window_time(&mut failures, "send_window.start", &window.start);
        let end = window_time(&mut failures, "send_window.end", &window.end);
        if let (Some(start), Some(end)) = (start, end)
            && start >= end
        {
            failures.push(ValidationFailure::window_out_of_order(&window.start, &window.end));
        }
    }

    for (i, step) in draft.follow_ups.iter().enumerate() {
        if step.body.trim().is_empty() {
            failures.push(ValidationFailure::missing_field(&format!("follow_ups[{i}].body")));
        }
        if step.delay_days < 0 {
            failures.push(ValidationFailure::new(
                format!("follow_ups[{i}].delay_days"),
                FailureReason::InvalidTimeFormat,
                format!("delay must be zero or more days, got {}", step.delay_days),
            ));
        }
    }

    failures
}

/// Parse one end of the send window, recording why it is unusable.
fn window_time(failures: &mut Vec<ValidationFailure>, field: &str, value: &str) -> Option<u16> {
    if value.trim().is_empty() {
        failures.push(ValidationFailure::missing_field(field));
        return None;
    }
    let minutes = parse_time(value);
    if minutes.is_none() {
        failures.push(ValidationFailure::invalid_time(field, value));
    }
    minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbound_core::{FollowUpStep, SendWindow};

    fn account(email: &str, is_active: bool) -> SendingAccount {
        SendingAccount {
            email: email.to_string(),
            warmup_status: 1,
            daily_limit: 50,
            is_active,
        }
    }

    fn valid_draft() -> CampaignDraft {
        CampaignDraft {
            name: "Q3 outreach".to_string(),
            subject: "Quick question".to_string(),
            body: "Hello\nWorld".to_string(),
            email_list: vec!["sales@acme.io".to_string()],
            timezone: Some("America/New_York".to_string()),
            ..Default::default()
        }
    }

    // =========================================================================
    // FIELD VALIDATORS
    // =========================================================================

    #[test]
    fn test_email_format() {
        for ok in ["a@b.io", "first.last+tag@mail.acme.co.uk", "o'neil@acme.com"] {
            assert!(validate_email_format(ok), "{ok}");
        }
        for bad in [
            "",
            "plainaddress",
            "@acme.io",
            "a@",
            "a@acme",
            "a@@acme.io",
            "a@b@acme.io",
            ".a@acme.io",
            "a..b@acme.io",
            "a b@acme.io",
            "a@-acme.io",
            "a@acme.c0m",
        ] {
            assert!(!validate_email_format(bad), "{bad}");
        }
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder_email("your-verified-email@example.com"));
        assert!(is_placeholder_email("YOUR-VERIFIED-EMAIL@EXAMPLE.COM"));
        assert!(is_placeholder_email("fake@example.com"));
        assert!(is_placeholder_email("sales@mail.example.org"));
        assert!(is_placeholder_email("your_name@acme.io"));
        assert!(is_placeholder_email("test@acme.io"));
        assert!(!is_placeholder_email("real.user@company.io"));
        assert!(!is_placeholder_email("sales@examples.com"));
        assert!(!is_placeholder_email("noatsign"));
    }

    #[test]
    fn test_time_format() {
        assert!(validate_time_format("09:30"));
        assert!(validate_time_format("00:00"));
        assert!(validate_time_format("23:59"));
        assert!(!validate_time_format("9:30"));
        assert!(!validate_time_format("24:00"));
        assert!(!validate_time_format("12:60"));
        assert!(!validate_time_format("12-30"));
        assert!(!validate_time_format("12:3a"));
        assert!(!validate_time_format(" 9:30"));
    }

    #[test]
    fn test_timezone() {
        assert!(validate_timezone("America/New_York"));
        assert!(validate_timezone("Europe/London"));
        assert!(!validate_timezone("Mars/Olympus_Mons"));
        assert!(!validate_timezone("america/new_york"));
    }

    // =========================================================================
    // DRAFT VALIDATION
    // =========================================================================

    #[test]
    fn test_valid_draft_has_no_failures() {
        let accounts = [account("Sales@Acme.io", true)];
        assert!(validate_campaign_draft(&valid_draft(), &accounts).is_empty());
    }

    #[test]
    fn test_placeholder_sender_rejected() {
        let draft = CampaignDraft {
            email_list: vec!["fake@example.com".to_string()],
            ..valid_draft()
        };
        let failures = validate_campaign_draft(&draft, &[account("sales@acme.io", true)]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "email_list[0]");
        assert_eq!(failures[0].reason, FailureReason::PlaceholderEmailDetected);
    }

    #[test]
    fn test_one_failure_per_address_in_check_order() {
        let draft = CampaignDraft {
            email_list: vec![
                "not-an-email".to_string(),
                "your-email@example.com".to_string(),
                "paused@acme.io".to_string(),
                "stranger@acme.io".to_string(),
            ],
            ..valid_draft()
        };
        let accounts = [account("paused@acme.io", false)];
        let reasons: Vec<_> = validate_campaign_draft(&draft, &accounts)
            .into_iter()
            .map(|f| f.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                FailureReason::InvalidEmailFormat,
                FailureReason::PlaceholderEmailDetected,
                FailureReason::AccountNotEligible,
                FailureReason::AccountNotEligible,
            ]
        );
    }

    #[test]
    fn test_all_failures_reported_in_field_order() {
        let draft = CampaignDraft {
            name: " ".to_string(),
            subject: String::new(),
            body: String::new(),
            email_list: vec![],
            timezone: Some("Nowhere/Land".to_string()),
            days: Some(vec![]),
            send_window: Some(SendWindow {
                start: "9:00".to_string(),
                end: "17:00".to_string(),
            }),
            follow_ups: vec![FollowUpStep {
                subject: String::new(),
                body: String::new(),
                delay_days: 2,
            }],
            ..Default::default()
        };
        let fields: Vec<_> = validate_campaign_draft(&draft, &[])
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "subject",
                "body",
                "email_list",
                "timezone",
                "days",
                "send_window.start",
                "follow_ups[0].body",
            ]
        );
    }

    #[test]
    fn test_send_window_must_be_ordered() {
        let draft = CampaignDraft {
            send_window: Some(SendWindow {
                start: "17:00".to_string(),
                end: "09:00".to_string(),
            }),
            ..valid_draft()
        };
        let failures = validate_campaign_draft(&draft, &[account("sales@acme.io", true)]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "send_window");
        assert_eq!(failures[0].reason, FailureReason::InvalidTimeFormat);
    }

    #[test]
    fn test_each_unknown_day_is_reported_by_position() {
        let draft = CampaignDraft {
            days: Some(vec!["Mon".to_string(), "funday".to_string(), "someday".to_string()]),
            ..valid_draft()
        };
        let failures = validate_campaign_draft(&draft, &[account("sales@acme.io", true)]);
        let fields: Vec<_> = failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["days[1]", "days[2]"]);
        assert!(failures[0].message.contains("funday"));
        assert_eq!(failures[0].reason, FailureReason::InvalidTimeFormat);
    }

    #[test]
    fn test_window_without_end_reports_missing_end() {
        let draft = CampaignDraft {
            name: String::new(),
            email_list: vec!["fake@example.com".to_string()],
            days: Some(vec!["funday".to_string()]),
            send_window: Some(SendWindow {
                start: "9:00".to_string(),
                end: String::new(),
            }),
            ..valid_draft()
        };
        let failures: Vec<_> = validate_campaign_draft(&draft, &[])
            .into_iter()
            .map(|f| (f.field, f.reason))
            .collect();
        assert_eq!(
            failures,
            vec![
                ("name".to_string(), FailureReason::MissingRequiredField),
                ("email_list[0]".to_string(), FailureReason::PlaceholderEmailDetected),
                ("days[0]".to_string(), FailureReason::InvalidTimeFormat),
                ("send_window.start".to_string(), FailureReason::InvalidTimeFormat),
                ("send_window.end".to_string(), FailureReason::MissingRequiredField),
            ]
        );
    }

    #[test]
    fn test_negative_follow_up_delay_rejected() {
        let draft = CampaignDraft {
            follow_ups: vec![FollowUpStep {
                subject: String::new(),
                body: "Bump".to_string(),
                delay_days: -1,
            }],
            ..valid_draft()
        };
        let failures = validate_campaign_draft(&draft, &[account("sales@acme.io", true)]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "follow_ups[0].delay_days");
    }
}

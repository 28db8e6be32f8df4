//! Validated create request and the upstream body layouts built from it.

use outbound_core::{PayloadShape, SendWindow, Weekday};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Daily sending schedule of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSchedule {
    pub timezone: String,
    /// Sorted, without duplicates, never empty.
    pub days: Vec<Weekday>,
    pub window: SendWindow,
}

/// One email in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceStep {
    pub subject: String,
    pub body_html: String,
    /// Days to wait before the next step is sent.
    pub delay_days: u32,
}

/// Optional sending behavior forwarded as-is when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_gap_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_reply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_tracking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_tracking: Option<bool>,
}

/// A campaign that passed validation and is ready to send upstream.
///
/// Only the preview stage constructs one, and creation consumes it, so a
/// request can never reach upstream without having been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignCreateRequest {
    name: String,
    subject: String,
    body_html: String,
    email_list: Vec<String>,
    campaign_schedule: CampaignSchedule,
    sequences: Vec<SequenceStep>,
    options: CampaignOptions,
}

impl CampaignCreateRequest {
    pub(crate) fn new(
        name: String,
        email_list: Vec<String>,
        campaign_schedule: CampaignSchedule,
        sequences: Vec<SequenceStep>,
        options: CampaignOptions,
    ) -> Self {
        let (subject, body_html) = sequences
            .first()
            .map(|step| (step.subject.clone(), step.body_html.clone()))
            .unwrap_or_default();
        Self {
            name,
            subject,
            body_html,
            email_list,
            campaign_schedule,
            sequences,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    pub fn campaign_schedule(&self) -> &CampaignSchedule {
        &self.campaign_schedule
    }

    pub fn sequences(&self) -> &[SequenceStep] {
        &self.sequences
    }

    /// Render the upstream `POST /campaigns` body in the given layout.
    pub fn to_payload(&self, shape: PayloadShape) -> Value {
        let schedule = match shape {
            PayloadShape::Schedules => self.schedules_layout(),
            PayloadShape::FlatSchedule => self.flat_schedule_layout(),
        };

        let mut payload = Map::new();
        payload.insert("name".into(), json!(self.name));
        payload.insert("campaign_schedule".into(), schedule);
        payload.insert("sequences".into(), self.sequences_layout());
        payload.insert("email_list".into(), json!(self.email_list));

        let options = &self.options;
        let fields = [
            ("daily_limit", options.daily_limit.map(Value::from)),
            ("email_gap", options.email_gap_minutes.map(Value::from)),
            ("stop_on_reply", options.stop_on_reply.map(Value::from)),
            ("open_tracking", options.open_tracking.map(Value::from)),
            ("link_tracking", options.link_tracking.map(Value::from)),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                payload.insert(key.into(), value);
            }
        }

        Value::Object(payload)
    }

    /// `{"schedules": [{..., "days": {"0": false, "1": true, ...}}]}`
    fn schedules_layout(&self) -> Value {
        let schedule = &self.campaign_schedule;
        let days: Map<String, Value> = Weekday::ALL
            .iter()
            .map(|day| (day.index().to_string(), json!(schedule.days.contains(day))))
            .collect();
        json!({
            "schedules": [{
                "name": format!("{} schedule", self.name),
                "timing": {
                    "from": schedule.window.start,
                    "to": schedule.window.end,
                },
                "days": days,
                "timezone": schedule.timezone,
            }]
        })
    }

    /// `{"days": [1, 2, ...], "timing": {...}, "timezone": ...}`
    fn flat_schedule_layout(&self) -> Value {
        let schedule = &self.campaign_schedule;
        let days: Vec<u8> = schedule.days.iter().map(Weekday::index).collect();
        json!({
            "name": format!("{} schedule", self.name),
            "days": days,
            "timing": {
                "from": schedule.window.start,
                "to": schedule.window.end,
            },
            "timezone": schedule.timezone,
        })
    }

    fn sequences_layout(&self) -> Value {
        let steps: Vec<Value> = self
            .sequences
            .iter()
            .map(|step| {
                json!({
                    "type": "email",
                    "delay": step.delay_days,
                    "variants": [{
                        "subject": step.subject,
                        "body": step.body_html,
                    }],
                })
            })
            .collect();
        json!([{ "steps": steps }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: CampaignOptions) -> CampaignCreateRequest {
        CampaignCreateRequest::new(
            "Launch".to_string(),
            vec!["sales@acme.io".to_string()],
            CampaignSchedule {
                timezone: "America/New_York".to_string(),
                days: vec![Weekday::Monday, Weekday::Wednesday],
                window: SendWindow {
                    start: "09:00".to_string(),
                    end: "17:00".to_string(),
                },
            },
            vec![
                SequenceStep {
                    subject: "Hi".to_string(),
                    body_html: "<p>Hello</p>".to_string(),
                    delay_days: 2,
                },
                SequenceStep {
                    subject: String::new(),
                    body_html: "<p>Following up</p>".to_string(),
                    delay_days: 0,
                },
            ],
            options,
        )
    }

    #[test]
    fn test_schedules_layout() {
        let payload = request(CampaignOptions::default()).to_payload(PayloadShape::Schedules);

        let schedule = &payload["campaign_schedule"]["schedules"][0];
        assert_eq!(schedule["timezone"], "America/New_York");
        assert_eq!(schedule["timing"]["from"], "09:00");
        assert_eq!(schedule["days"]["0"], false);
        assert_eq!(schedule["days"]["1"], true);
        assert_eq!(schedule["days"]["2"], false);
        assert_eq!(schedule["days"]["3"], true);
        assert_eq!(schedule["days"].as_object().unwrap().len(), 7);

        let steps = payload["sequences"][0]["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["type"], "email");
        assert_eq!(steps[0]["delay"], 2);
        assert_eq!(steps[0]["variants"][0]["body"], "<p>Hello</p>");
        assert_eq!(payload["email_list"][0], "sales@acme.io");
        assert!(payload.get("daily_limit").is_none());
    }

    #[test]
    fn test_flat_schedule_layout() {
        let payload = request(CampaignOptions::default()).to_payload(PayloadShape::FlatSchedule);
        let schedule = &payload["campaign_schedule"];
        assert_eq!(schedule["days"], json!([1, 3]));
        assert_eq!(schedule["timing"]["to"], "17:00");
        assert!(schedule.get("schedules").is_none());
    }

    #[test]
    fn test_options_are_forwarded_when_set() {
        let payload = request(CampaignOptions {
            daily_limit: Some(40),
            email_gap_minutes: Some(10),
            stop_on_reply: Some(true),
            ..Default::default()
        })
        .to_payload(PayloadShape::Schedules);
        assert_eq!(payload["daily_limit"], 40);
        assert_eq!(payload["email_gap"], 10);
        assert_eq!(payload["stop_on_reply"], true);
        assert!(payload.get("open_tracking").is_none());
    }

    #[test]
    fn test_first_step_is_the_main_email() {
        let request = request(CampaignOptions::default());
        assert_eq!(request.subject(), "Hi");
        assert_eq!(request.body_html(), "<p>Hello</p>");
        assert!(!request.sequences().is_empty());
    }
}

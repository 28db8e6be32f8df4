//! Three-stage campaign creation.
//!
//! 1. [`CampaignWorkflow::prerequisite_check`] enumerates every sending
//!    account and reports which ones are eligible.
//! 2. [`CampaignWorkflow::preview`] validates a draft against those accounts
//!    and builds the [`CampaignCreateRequest`] without touching upstream.
//! 3. [`CampaignWorkflow::create`] sends the request upstream.
//!
//! Stage 3 only accepts a request produced by stage 2, and
//! [`CampaignWorkflow::run`] always re-runs stages 1 and 2 on the input it
//! is given, so stale previews are never submitted.

pub mod body;
pub mod payload;

pub use body::normalize_body;
pub use payload::{CampaignCreateRequest, CampaignOptions, CampaignSchedule, SequenceStep};

use crate::error::ToolError;
use crate::validator::validate_campaign_draft;
use outbound_core::{CampaignConfig, CampaignDraft, PayloadShape, SendWindow, SendingAccount};
use outbound_upstream::{
    ListEndpoint, PaginationParams, Paginator, RequestError, StoppedReason, UpstreamClient,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

/// Stage 1 artifact.
#[derive(Debug, Clone, Serialize)]
pub struct PrerequisiteReport {
    pub accounts: Vec<SendingAccount>,
    pub eligible_accounts: Vec<String>,
    pub is_complete: bool,
    pub total_fetched: usize,
    pub stopped_reason: StoppedReason,
    pub warnings: Vec<String>,
}

/// Stage 2 artifact.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignPreview {
    pub request: CampaignCreateRequest,
    /// Body that stage 3 would send first.
    pub payload: Value,
    pub payload_shape: PayloadShape,
    pub warnings: Vec<String>,
}

/// Stage 3 artifact.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedCampaign {
    pub campaign_id: Option<String>,
    /// Upstream response body.
    pub campaign: Value,
    pub payload_shape: PayloadShape,
    pub warnings: Vec<String>,
}

/// Drives campaign creation for one invocation.
pub struct CampaignWorkflow {
    client: UpstreamClient,
    pagination: PaginationParams,
    config: CampaignConfig,
}

impl CampaignWorkflow {
    pub fn new(client: UpstreamClient, pagination: PaginationParams, config: CampaignConfig) -> Self {
        Self {
            client,
            pagination,
            config,
        }
    }

    /// Stage 1: enumerate sending accounts.
    ///
    /// Any walk that did not exhaust the list is reported as a warning. It
    /// only fails when not a single account could be fetched.
    pub async fn prerequisite_check(&self) -> Result<PrerequisiteReport, ToolError> {
        let endpoint = ListEndpoint::new(self.client.clone(), "/accounts");
        let result = Paginator::new(self.pagination)
            .with_cancellation(self.client.cancellation().clone())
            .fetch_all::<SendingAccount, _>(&endpoint)
            .await;

        let mut warnings = Vec::new();
        if let Some(err) = result.error {
            if result.items.is_empty() {
                return Err(err.into());
            }
            warnings.push(format!(
                "account list is incomplete ({} fetched before an upstream error: {err}); \
                 senders missing from it will be reported as not eligible",
                result.total_fetched
            ));
        } else {
            match result.stopped_reason {
                // Upstream errors always carry `result.error`.
                StoppedReason::Exhausted | StoppedReason::UpstreamError => {}
                StoppedReason::CallerLimitReached => warnings.push(format!(
                    "account list stopped at pagination.max_items ({} accounts); \
                     senders missing from it will be reported as not eligible",
                    result.total_fetched
                )),
                StoppedReason::SafetyLimitReached => warnings.push(format!(
                    "account list stopped at the safety limit after {} accounts; \
                     senders missing from it will be reported as not eligible",
                    result.total_fetched
                )),
            }
        }
        // A capped walk may have missed accounts.
        let is_complete = result.stopped_reason == StoppedReason::Exhausted;

        let eligible_accounts: Vec<String> = result
            .items
            .iter()
            .filter(|a| a.is_active)
            .map(|a| a.email.clone())
            .collect();
        if eligible_accounts.is_empty() {
            warnings.push(
                "no active sending accounts found; connect or activate an account before creating a campaign"
                    .to_string(),
            );
        }

        info!(
            accounts = result.total_fetched,
            eligible = eligible_accounts.len(),
            complete = is_complete,
            "prerequisite check finished"
        );

        Ok(PrerequisiteReport {
            accounts: result.items,
            eligible_accounts,
            is_complete,
            total_fetched: result.total_fetched,
            stopped_reason: result.stopped_reason,
            warnings,
        })
    }

    /// Stage 2: validate and build the create request. Never calls upstream.
    pub fn preview(
        &self,
        draft: &CampaignDraft,
        accounts: &[SendingAccount],
    ) -> Result<CampaignCreateRequest, ToolError> {
        let draft = self.complete(draft);
        let failures = validate_campaign_draft(&draft, accounts);
        if !failures.is_empty() {
            info!(failures = failures.len(), "campaign draft rejected");
            return Err(ToolError::Validation(failures));
        }
        Ok(self.build(draft))
    }

    /// Stage 3: submit a validated request.
    ///
    /// Payload shapes are tried in configured order; the next shape is only
    /// tried when upstream rejects the previous one with a validation error.
    pub async fn create(&self, request: CampaignCreateRequest) -> Result<CreatedCampaign, ToolError> {
        let shapes = &self.config.payload_shapes;
        let mut warnings = Vec::new();
        let mut last_rejection = None;

        for (attempt, shape) in shapes.iter().enumerate() {
            info!(
                campaign = %request.name(),
                shape = shape.as_str(),
                attempt = attempt + 1,
                "creating campaign"
            );
            match self.client.post("/campaigns", request.to_payload(*shape)).await {
                Ok(response) => {
                    let campaign_id = response
                        .body
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    info!(
                        campaign = %request.name(),
                        campaign_id = campaign_id.as_deref().unwrap_or("unknown"),
                        shape = shape.as_str(),
                        "campaign created"
                    );
                    return Ok(CreatedCampaign {
                        campaign_id,
                        campaign: response.body,
                        payload_shape: *shape,
                        warnings,
                    });
                }
                Err(RequestError::Validation {
                    status,
                    body,
                    message,
                }) => {
                    error!(
                        campaign = %request.name(),
                        shape = shape.as_str(),
                        status,
                        upstream_message = %message,
                        "upstream rejected a locally validated campaign; payload contract mismatch"
                    );
                    if attempt + 1 < shapes.len() {
                        warn!(shape = shape.as_str(), "falling back to next payload shape");
                        warnings.push(format!(
                            "payload shape '{}' rejected by upstream: {message}",
                            shape.as_str()
                        ));
                    }
                    last_rejection = Some(ToolError::UpstreamValidation {
                        status,
                        body,
                        upstream_message: message,
                    });
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(last_rejection.unwrap_or_else(|| {
            ToolError::InvalidArguments("no payload shapes are configured".to_string())
        }))
    }

    /// Stage 2 output plus the payload stage 3 would send first.
    pub async fn run_preview(&self, draft: &CampaignDraft) -> Result<CampaignPreview, ToolError> {
        let report = self.prerequisite_check().await?;
        let request = self.preview(draft, &report.accounts)?;
        let payload_shape = self
            .config
            .payload_shapes
            .first()
            .copied()
            .unwrap_or(PayloadShape::Schedules);
        Ok(CampaignPreview {
            payload: request.to_payload(payload_shape),
            request,
            payload_shape,
            warnings: report.warnings,
        })
    }

    /// All three stages in order.
    pub async fn run(&self, draft: &CampaignDraft) -> Result<CreatedCampaign, ToolError> {
        let report = self.prerequisite_check().await?;
        let request = self.preview(draft, &report.accounts)?;
        let mut created = self.create(request).await?;
        let mut warnings = report.warnings;
        warnings.append(&mut created.warnings);
        created.warnings = warnings;
        Ok(created)
    }

    /// Fill configured defaults into the fields the caller left out.
    fn complete(&self, draft: &CampaignDraft) -> CampaignDraft {
        let mut draft = draft.clone();
        if draft.timezone.is_none() {
            draft.timezone = Some(self.config.default_timezone.clone());
        }
        if draft.send_window.is_none() {
            draft.send_window = Some(SendWindow {
                start: self.config.default_window_start.clone(),
                end: self.config.default_window_end.clone(),
            });
        }
        draft
    }

    fn build(&self, draft: CampaignDraft) -> CampaignCreateRequest {
        let days = draft.schedule_days();
        let window = draft.send_window.unwrap_or_else(|| SendWindow {
            start: self.config.default_window_start.clone(),
            end: self.config.default_window_end.clone(),
        });
        let timezone = draft
            .timezone
            .unwrap_or_else(|| self.config.default_timezone.clone());

        // Each step carries the wait before the step after it.
        let mut sequences = vec![SequenceStep {
            subject: draft.subject.trim().to_string(),
            body_html: normalize_body(&draft.body),
            delay_days: 0,
        }];
        for step in &draft.follow_ups {
            if let Some(previous) = sequences.last_mut() {
                previous.delay_days = u32::try_from(step.delay_days.max(0)).unwrap_or(u32::MAX);
            }
            sequences.push(SequenceStep {
                subject: step.subject.trim().to_string(),
                body_html: normalize_body(&step.body),
                delay_days: 0,
            });
        }

        CampaignCreateRequest::new(
            draft.name.trim().to_string(),
            draft.email_list.iter().map(|e| e.trim().to_string()).collect(),
            CampaignSchedule {
                timezone,
                days,
                window,
            },
            sequences,
            CampaignOptions {
                daily_limit: draft.daily_limit,
                email_gap_minutes: draft.email_gap_minutes,
                stop_on_reply: draft.stop_on_reply,
                open_tracking: draft.open_tracking,
                link_tracking: draft.link_tracking,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbound_core::{FollowUpStep, UpstreamConfig, Weekday};
    use outbound_upstream::ApiKey;

    fn workflow() -> CampaignWorkflow {
        let client = UpstreamClient::new(
            UpstreamConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..Default::default()
            },
            ApiKey::new("k").unwrap(),
        )
        .unwrap();
        CampaignWorkflow::new(client, PaginationParams::default(), CampaignConfig::default())
    }

    fn accounts() -> Vec<SendingAccount> {
        vec![SendingAccount {
            email: "sales@acme.io".to_string(),
            warmup_status: 1,
            daily_limit: 50,
            is_active: true,
        }]
    }

    #[test]
    fn test_preview_applies_defaults() {
        let draft = CampaignDraft {
            name: " Launch ".to_string(),
            subject: "Hi".to_string(),
            body: "Hello\nWorld".to_string(),
            email_list: vec!["SALES@acme.io".to_string()],
            ..Default::default()
        };
        let request = workflow().preview(&draft, &accounts()).unwrap();

        assert_eq!(request.name(), "Launch");
        assert_eq!(request.body_html(), "<p>Hello</p><p>World</p>");
        let schedule = request.campaign_schedule();
        assert_eq!(schedule.timezone, "America/Chicago");
        assert_eq!(schedule.days, Weekday::workweek());
        assert_eq!(schedule.window.start, "09:00");
        assert_eq!(schedule.window.end, "17:00");
    }

    #[test]
    fn test_preview_returns_every_failure() {
        let draft = CampaignDraft {
            email_list: vec!["fake@example.com".to_string()],
            timezone: Some("Atlantis/Capital".to_string()),
            ..Default::default()
        };
        match workflow().preview(&draft, &accounts()) {
            Err(ToolError::Validation(failures)) => assert_eq!(failures.len(), 5),
            other => panic!("expected validation failures, got {other:?}"),
        }
    }

    #[test]
    fn test_follow_ups_become_sequence_steps() {
        let draft = CampaignDraft {
            name: "Launch".to_string(),
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            email_list: vec!["sales@acme.io".to_string()],
            follow_ups: vec![
                FollowUpStep {
                    subject: String::new(),
                    body: "Bumping this".to_string(),
                    delay_days: 2,
                },
                FollowUpStep {
                    subject: "Last one".to_string(),
                    body: "Closing the loop".to_string(),
                    delay_days: 4,
                },
            ],
            ..Default::default()
        };
        let request = workflow().preview(&draft, &accounts()).unwrap();
        let delays: Vec<u32> = request.sequences().iter().map(|s| s.delay_days).collect();
        assert_eq!(delays, vec![2, 4, 0]);
        assert_eq!(request.sequences()[1].body_html, "<p>Bumping this</p>");
    }
}

//! Every mutation of the dashboard state is one of these actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Activity, Audience, Campaign, ContentPiece, ContentQueueItem, Experiment, LandingPage,
    LaunchPlan, Lead, MetricsPatch, PhaseType, ProductProfile, Survey, SurveyResponse,
};
use crate::state::PmfState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    AddLead(Lead),
    UpdateLead(Lead),
    DeleteLead { id: String },

    AddLandingPage(LandingPage),
    UpdateLandingPage(LandingPage),
    DeleteLandingPage { id: String },
    DuplicateLandingPage {
        source_id: String,
        new_id: String,
        at: DateTime<Utc>,
    },

    AddExperiment(Experiment),
    UpdateExperiment(Experiment),
    DeleteExperiment { id: String },
    /// draft → running → paused → running ...
    ToggleExperiment { id: String, at: DateTime<Utc> },
    /// Running or paused → completed, picking the best variant as winner.
    CompleteExperiment { id: String, ended_at: DateTime<Utc> },
    /// Add observed traffic to one variant of a running experiment.
    RecordVariantResults {
        experiment_id: String,
        variant_id: String,
        impressions: u64,
        conversions: u64,
    },

    AddSurvey(Survey),
    UpdateSurvey(Survey),
    DeleteSurvey { id: String },
    /// The public survey-response surface writes through this.
    AddSurveyResponse {
        survey_id: String,
        response: SurveyResponse,
    },

    AddAudience(Audience),
    UpdateAudience(Audience),
    DeleteAudience { id: String },

    AddContent(ContentPiece),
    UpdateContent(ContentPiece),
    DeleteContent { id: String },

    AddCampaign(Campaign),
    UpdateCampaign(Campaign),
    DeleteCampaign { id: String },

    SetProductProfile(ProductProfile),

    AddLaunchPlan(LaunchPlan),
    UpdateLaunchPlan(LaunchPlan),
    /// Also deletes every queue item of the plan.
    DeleteLaunchPlan { id: String },

    AddQueueItem(ContentQueueItem),
    UpdateQueueItem(ContentQueueItem),
    DeleteQueueItem { id: String },
    BulkApproveQueue {
        ids: Vec<String>,
        approved_at: DateTime<Utc>,
    },
    MoveContentToPhase { item_id: String, phase: PhaseType },

    UpdateMetrics(MetricsPatch),
    AddActivity(Activity),

    /// Replace the whole state, e.g. when rehydrating from a snapshot.
    LoadState(Box<PmfState>),
    /// Replace the whole state with the built-in demo data.
    ResetState,
}

impl Action {
    pub const TAGS: &'static [&'static str] = &[
        "ADD_LEAD",
        "UPDATE_LEAD",
        "DELETE_LEAD",
        "ADD_LANDING_PAGE",
        "UPDATE_LANDING_PAGE",
        "DELETE_LANDING_PAGE",
        "DUPLICATE_LANDING_PAGE",
        "ADD_EXPERIMENT",
        "UPDATE_EXPERIMENT",
        "DELETE_EXPERIMENT",
        "TOGGLE_EXPERIMENT",
        "COMPLETE_EXPERIMENT",
        "RECORD_VARIANT_RESULTS",
        "ADD_SURVEY",
        "UPDATE_SURVEY",
        "DELETE_SURVEY",
        "ADD_SURVEY_RESPONSE",
        "ADD_AUDIENCE",
        "UPDATE_AUDIENCE",
        "DELETE_AUDIENCE",
        "ADD_CONTENT",
        "UPDATE_CONTENT",
        "DELETE_CONTENT",
        "ADD_CAMPAIGN",
        "UPDATE_CAMPAIGN",
        "DELETE_CAMPAIGN",
        "SET_PRODUCT_PROFILE",
        "ADD_LAUNCH_PLAN",
        "UPDATE_LAUNCH_PLAN",
        "DELETE_LAUNCH_PLAN",
        "ADD_QUEUE_ITEM",
        "UPDATE_QUEUE_ITEM",
        "DELETE_QUEUE_ITEM",
        "BULK_APPROVE_QUEUE",
        "MOVE_CONTENT_TO_PHASE",
        "UPDATE_METRICS",
        "ADD_ACTIVITY",
        "LOAD_STATE",
        "RESET_STATE",
    ];

    pub fn toggle_experiment(id: impl Into<String>) -> Self {
        Action::ToggleExperiment {
            id: id.into(),
            at: Utc::now(),
        }
    }

    pub fn complete_experiment(id: impl Into<String>) -> Self {
        Action::CompleteExperiment {
            id: id.into(),
            ended_at: Utc::now(),
        }
    }

    pub fn duplicate_landing_page(source_id: impl Into<String>) -> Self {
        Action::DuplicateLandingPage {
            source_id: source_id.into(),
            new_id: crate::new_id(),
            at: Utc::now(),
        }
    }

    pub fn bulk_approve<I: Into<String>>(ids: impl IntoIterator<Item = I>) -> Self {
        Action::BulkApproveQueue {
            ids: ids.into_iter().map(Into::into).collect(),
            approved_at: Utc::now(),
        }
    }

    /// Whether the derived metrics must be recomputed after this action.
    pub(crate) fn touches_metrics(&self) -> bool {
        matches!(
            self,
            Action::AddLead(_)
                | Action::UpdateLead(_)
                | Action::DeleteLead { .. }
                | Action::AddSurvey(_)
                | Action::UpdateSurvey(_)
                | Action::DeleteSurvey { .. }
                | Action::AddSurveyResponse { .. }
                | Action::UpdateMetrics(_)
        )
    }

    /// Encode with a format version, for storing or sending actions.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(VersionedAction::from(self.clone()))
    }

    /// Decode an action. Unknown action types are an error, not a silent no-op.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ActionError> {
        if let Some(tag) = json.get("type").and_then(serde_json::Value::as_str) {
            if !Self::TAGS.contains(&tag) {
                return Err(ActionError::Unrecognized(tag.to_string()));
            }
        }
        serde_json::from_value::<VersionedAction>(json.clone())
            .map(Action::from)
            .map_err(ActionError::Malformed)
    }
}

impl tether::Action for Action {
    fn tag(&self) -> &'static str {
        match self {
            Action::AddLead(_) => "ADD_LEAD",
            Action::UpdateLead(_) => "UPDATE_LEAD",
            Action::DeleteLead { .. } => "DELETE_LEAD",
            Action::AddLandingPage(_) => "ADD_LANDING_PAGE",
            Action::UpdateLandingPage(_) => "UPDATE_LANDING_PAGE",
            Action::DeleteLandingPage { .. } => "DELETE_LANDING_PAGE",
            Action::DuplicateLandingPage { .. } => "DUPLICATE_LANDING_PAGE",
            Action::AddExperiment(_) => "ADD_EXPERIMENT",
            Action::UpdateExperiment(_) => "UPDATE_EXPERIMENT",
            Action::DeleteExperiment { .. } => "DELETE_EXPERIMENT",
            Action::ToggleExperiment { .. } => "TOGGLE_EXPERIMENT",
            Action::CompleteExperiment { .. } => "COMPLETE_EXPERIMENT",
            Action::RecordVariantResults { .. } => "RECORD_VARIANT_RESULTS",
            Action::AddSurvey(_) => "ADD_SURVEY",
            Action::UpdateSurvey(_) => "UPDATE_SURVEY",
            Action::DeleteSurvey { .. } => "DELETE_SURVEY",
            Action::AddSurveyResponse { .. } => "ADD_SURVEY_RESPONSE",
            Action::AddAudience(_) => "ADD_AUDIENCE",
            Action::UpdateAudience(_) => "UPDATE_AUDIENCE",
            Action::DeleteAudience { .. } => "DELETE_AUDIENCE",
            Action::AddContent(_) => "ADD_CONTENT",
            Action::UpdateContent(_) => "UPDATE_CONTENT",
            Action::DeleteContent { .. } => "DELETE_CONTENT",
            Action::AddCampaign(_) => "ADD_CAMPAIGN",
            Action::UpdateCampaign(_) => "UPDATE_CAMPAIGN",
            Action::DeleteCampaign { .. } => "DELETE_CAMPAIGN",
            Action::SetProductProfile(_) => "SET_PRODUCT_PROFILE",
            Action::AddLaunchPlan(_) => "ADD_LAUNCH_PLAN",
            Action::UpdateLaunchPlan(_) => "UPDATE_LAUNCH_PLAN",
            Action::DeleteLaunchPlan { .. } => "DELETE_LAUNCH_PLAN",
            Action::AddQueueItem(_) => "ADD_QUEUE_ITEM",
            Action::UpdateQueueItem(_) => "UPDATE_QUEUE_ITEM",
            Action::DeleteQueueItem { .. } => "DELETE_QUEUE_ITEM",
            Action::BulkApproveQueue { .. } => "BULK_APPROVE_QUEUE",
            Action::MoveContentToPhase { .. } => "MOVE_CONTENT_TO_PHASE",
            Action::UpdateMetrics(_) => "UPDATE_METRICS",
            Action::AddActivity(_) => "ADD_ACTIVITY",
            Action::LoadState(_) => "LOAD_STATE",
            Action::ResetState => "RESET_STATE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unrecognized action type `{0}`")]
    Unrecognized(String),
    #[error("malformed action: {0}")]
    Malformed(serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum VersionedAction {
    V1(Action),
}

impl From<Action> for VersionedAction {
    fn from(action: Action) -> Self {
        VersionedAction::V1(action)
    }
}

impl From<VersionedAction> for Action {
    fn from(versioned: VersionedAction) -> Self {
        match versioned {
            VersionedAction::V1(action) => action,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tether::Action as _;

    use super::*;
    use crate::model::LeadSource;

    #[test]
    fn test_json_shape_matches_action_tag() {
        let lead = Lead::new("a@example.com", "A", LeadSource::Website, DateTime::default());
        let action = Action::AddLead(lead);
        let json = action.to_json().unwrap();
        assert_eq!(json["version"], "V1");
        assert_eq!(json["type"], action.tag());
        assert_eq!(json["payload"]["email"], "a@example.com");
        assert_eq!(Action::from_json(&json).unwrap(), action);
    }

    #[test]
    fn test_unit_and_struct_variants_decode() {
        let reset = Action::ResetState;
        assert_eq!(Action::from_json(&reset.to_json().unwrap()).unwrap(), reset);

        let delete = Action::DeleteLead {
            id: "lead-1".to_string(),
        };
        let json = delete.to_json().unwrap();
        assert_eq!(json["payload"]["id"], "lead-1");
        assert_eq!(Action::from_json(&json).unwrap(), delete);
    }

    #[test]
    fn test_unknown_tag_is_reported() {
        let json = serde_json::json!({ "version": "V1", "type": "ADD_LEEAD", "payload": {} });
        assert!(matches!(
            Action::from_json(&json),
            Err(ActionError::Unrecognized(tag)) if tag == "ADD_LEEAD"
        ));
    }

    #[test]
    fn test_malformed_payload_is_reported() {
        let json = serde_json::json!({ "version": "V1", "type": "DELETE_LEAD", "payload": {} });
        assert!(matches!(
            Action::from_json(&json),
            Err(ActionError::Malformed(_))
        ));
    }

    #[test]
    fn test_every_tag_is_listed() {
        let samples = [
            Action::ResetState,
            Action::bulk_approve(["a"]),
            Action::toggle_experiment("e"),
            Action::complete_experiment("e"),
            Action::duplicate_landing_page("p"),
            Action::MoveContentToPhase {
                item_id: "i".to_string(),
                phase: PhaseType::Growth,
            },
            Action::UpdateMetrics(MetricsPatch::default()),
        ];
        for action in samples {
            assert!(Action::TAGS.contains(&action.tag()), "{}", action.tag());
        }
        let mut unique = Action::TAGS.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), Action::TAGS.len());
    }
}

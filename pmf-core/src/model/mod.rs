//! Domain records. Every entity is a plain serde record keyed by an opaque string id;
//! references between entities (`target_id`, `campaign_id`, `plan_id`, `phase_id`) are ids, never ownership.

mod activity;
mod audience;
mod content;
mod experiment;
mod landing_page;
mod launch;
mod lead;
mod metrics;
mod survey;

pub use activity::{ACTIVITY_LOG_CAPACITY, Activity, ActivityKind};
pub use audience::{Audience, AudienceKind, Criterion, CriterionOperator, audience_size};
pub use content::{Campaign, CampaignStatus, ContentKind, ContentPiece, ContentStatus, ProductProfile};
pub use experiment::{Experiment, ExperimentKind, ExperimentStatus, Variant};
pub use landing_page::{LandingPage, PageAnalytics, PageSettings, PageStatus, Section, SectionKind};
pub use launch::{ContentQueueItem, LaunchPhase, LaunchPlan, PhaseType, QueueStatus, QueuedContent};
pub use lead::{Lead, LeadSource, LeadStage};
pub use metrics::{MetricsPatch, PmfMetrics};
pub use survey::{
    Answer, Question, QuestionKind, Survey, SurveyKind, SurveyResponse, SurveyStatus,
    VERY_DISAPPOINTED, nps_score, pmf_score,
};

/// Anything stored in an id-keyed collection of the state.
pub trait Entity: Clone {
    fn id(&self) -> &str;
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_entity!(
    Lead,
    LandingPage,
    Experiment,
    Survey,
    Audience,
    ContentPiece,
    Campaign,
    LaunchPlan,
    ContentQueueItem,
    Activity,
);

/// `numerator / denominator` as a percent; zero when there is nothing to divide by.
pub(crate) fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}

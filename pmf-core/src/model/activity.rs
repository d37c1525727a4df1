use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The activity log keeps only this many entries, newest first.
pub const ACTIVITY_LOG_CAPACITY: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lead,
    LandingPage,
    Experiment,
    Survey,
    Audience,
    Content,
    Launch,
    Metrics,
}

impl Activity {
    pub fn new(kind: ActivityKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Activity {
            id: crate::new_id(),
            kind,
            message: message.into(),
            entity_id: None,
            at,
        }
    }

    pub fn about(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

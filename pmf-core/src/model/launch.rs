use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPlan {
    pub id: String,
    pub name: String,
    pub launch_date: DateTime<Utc>,
    /// Ordered pre-launch → complete.
    pub phases: Vec<LaunchPhase>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPhase {
    pub id: String,
    pub phase: PhaseType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    PreLaunch,
    LaunchDay,
    Growth,
    Complete,
}

impl PhaseType {
    pub const ALL: [PhaseType; 4] = [
        PhaseType::PreLaunch,
        PhaseType::LaunchDay,
        PhaseType::Growth,
        PhaseType::Complete,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PhaseType::PreLaunch => "Pre-launch",
            PhaseType::LaunchDay => "Launch day",
            PhaseType::Growth => "Growth",
            PhaseType::Complete => "Complete",
        }
    }
}

impl LaunchPlan {
    /// A plan with one phase of every type.
    pub fn new(name: impl Into<String>, launch_date: DateTime<Utc>, at: DateTime<Utc>) -> Self {
        LaunchPlan {
            id: crate::new_id(),
            name: name.into(),
            launch_date,
            phases: PhaseType::ALL
                .iter()
                .map(|phase| LaunchPhase {
                    id: crate::new_id(),
                    phase: *phase,
                    name: phase.label().to_string(),
                    starts_at: None,
                })
                .collect(),
            created_at: at,
        }
    }

    pub fn phase(&self, phase: PhaseType) -> Option<&LaunchPhase> {
        self.phases.iter().find(|candidate| candidate.phase == phase)
    }

    pub fn has_phase_id(&self, phase_id: &str) -> bool {
        self.phases.iter().any(|phase| phase.id == phase_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQueueItem {
    pub id: String,
    pub plan_id: String,
    /// One of the plan's phase ids.
    pub phase_id: String,
    pub content: QueuedContent,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedContent {
    pub channel: String,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Approved,
    Published,
    Rejected,
    Failed,
}

impl QueueStatus {
    /// Statuses that bulk approval moves to approved.
    pub fn awaits_approval(&self) -> bool {
        matches!(
            self,
            QueueStatus::Queued | QueueStatus::Rejected | QueueStatus::Failed
        )
    }
}

impl ContentQueueItem {
    pub fn queued(plan: &LaunchPlan, phase: PhaseType, content: QueuedContent) -> Option<Self> {
        let phase = plan.phase(phase)?;
        Some(ContentQueueItem {
            id: crate::new_id(),
            plan_id: plan.id.clone(),
            phase_id: phase.id.clone(),
            content,
            status: QueueStatus::Queued,
            scheduled_for: None,
            approved_at: None,
        })
    }
}

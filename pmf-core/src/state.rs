use im::Vector;
use serde::{Deserialize, Serialize};

use crate::model::{
    Activity, Audience, Campaign, ContentPiece, ContentQueueItem, Entity, Experiment, LandingPage,
    LaunchPlan, Lead, LeadStage, PmfMetrics, ProductProfile, Survey,
};

/// The whole dashboard state. Collections keep insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmfState {
    #[serde(default)]
    pub leads: Vector<Lead>,
    #[serde(default)]
    pub landing_pages: Vector<LandingPage>,
    #[serde(default)]
    pub experiments: Vector<Experiment>,
    #[serde(default)]
    pub surveys: Vector<Survey>,
    #[serde(default)]
    pub audiences: Vector<Audience>,
    #[serde(default)]
    pub content: Vector<ContentPiece>,
    #[serde(default)]
    pub campaigns: Vector<Campaign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_profile: Option<ProductProfile>,
    #[serde(default)]
    pub launch_plans: Vector<LaunchPlan>,
    #[serde(default)]
    pub content_queue: Vector<ContentQueueItem>,
    #[serde(default)]
    pub metrics: PmfMetrics,
    /// Newest first, at most [`crate::model::ACTIVITY_LOG_CAPACITY`] entries.
    #[serde(default)]
    pub activities: Vector<Activity>,
}

impl PmfState {
    pub fn lead(&self, id: &str) -> Option<&Lead> {
        find(&self.leads, id)
    }

    pub fn landing_page(&self, id: &str) -> Option<&LandingPage> {
        find(&self.landing_pages, id)
    }

    pub fn experiment(&self, id: &str) -> Option<&Experiment> {
        find(&self.experiments, id)
    }

    pub fn survey(&self, id: &str) -> Option<&Survey> {
        find(&self.surveys, id)
    }

    pub fn audience(&self, id: &str) -> Option<&Audience> {
        find(&self.audiences, id)
    }

    pub fn content_piece(&self, id: &str) -> Option<&ContentPiece> {
        find(&self.content, id)
    }

    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        find(&self.campaigns, id)
    }

    pub fn launch_plan(&self, id: &str) -> Option<&LaunchPlan> {
        find(&self.launch_plans, id)
    }

    pub fn queue_item(&self, id: &str) -> Option<&ContentQueueItem> {
        find(&self.content_queue, id)
    }

    pub fn leads_in_stage(&self, stage: LeadStage) -> impl Iterator<Item = &Lead> {
        self.leads.iter().filter(move |lead| lead.stage == stage)
    }

    pub fn queue_for_plan<'a>(&'a self, plan_id: &'a str) -> impl Iterator<Item = &'a ContentQueueItem> {
        self.content_queue
            .iter()
            .filter(move |item| item.plan_id == plan_id)
    }

    /// Whether `item` points at a phase that exists on its plan.
    pub fn queue_item_is_placed(&self, item: &ContentQueueItem) -> bool {
        self.launch_plan(&item.plan_id)
            .is_some_and(|plan| plan.has_phase_id(&item.phase_id))
    }

    pub fn recompute_metrics(&mut self) {
        self.metrics.recompute(&self.leads, &self.surveys);
    }
}

pub(crate) fn find<'a, T: Entity>(items: &'a Vector<T>, id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

pub(crate) fn position<T: Entity>(items: &Vector<T>, id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Append `item`. Fails when an entity with the same id is already present.
pub(crate) fn insert<T: Entity>(items: &mut Vector<T>, item: T) -> bool {
    if position(items, item.id()).is_some() {
        return false;
    }
    items.push_back(item);
    true
}

/// Replace the entity with `item`'s id. Fails when there is none.
pub(crate) fn replace<T: Entity>(items: &mut Vector<T>, item: T) -> bool {
    match position(items, item.id()) {
        Some(index) => {
            items.set(index, item);
            true
        }
        None => false,
    }
}

pub(crate) fn remove<T: Entity>(items: &mut Vector<T>, id: &str) -> Option<T> {
    position(items, id).map(|index| items.remove(index))
}

use chrono::{DateTime, Utc};
use tether::{Applied, AppState, Outcome, RemoteCall};

use crate::action::Action;
use crate::model::{
    ACTIVITY_LOG_CAPACITY, Experiment, ExperimentStatus, PhaseType, QueueStatus,
    audience_size,
};
use crate::state::{PmfState, find, insert, position, remove, replace};
use crate::{remote, seed};

impl AppState for PmfState {
    type Action = Action;

    fn apply(mut self, action: &Action) -> Applied<Self> {
        let outcome = self.reduce(action);
        if outcome.is_applied() && action.touches_metrics() {
            self.recompute_metrics();
        }
        Applied {
            state: self,
            outcome,
        }
    }

    fn mirror(&self, action: &Action) -> Option<RemoteCall> {
        remote::mirror(self, action)
    }
}

fn added(inserted: bool) -> Outcome {
    if inserted {
        Outcome::Applied
    } else {
        Outcome::Rejected("an entity with this id already exists")
    }
}

fn updated(replaced: bool) -> Outcome {
    if replaced {
        Outcome::Applied
    } else {
        Outcome::NoMatch
    }
}

fn deleted<T>(removed: Option<T>) -> Outcome {
    updated(removed.is_some())
}

/// A completed experiment must name a winner, so it needs at least one variant.
fn checked_experiment(experiment: &Experiment) -> Result<Experiment, &'static str> {
    if experiment.status == ExperimentStatus::Completed && experiment.variants.is_empty() {
        return Err("a completed experiment needs at least one variant");
    }
    Ok(experiment.clone().normalized())
}

impl PmfState {
    /// Never reads a clock: every timestamp comes from the action.
    fn reduce(&mut self, action: &Action) -> Outcome {
        match action {
            Action::AddLead(lead) => added(insert(&mut self.leads, lead.clone().rescored())),
            Action::UpdateLead(lead) => updated(replace(&mut self.leads, lead.clone().rescored())),
            Action::DeleteLead { id } => deleted(remove(&mut self.leads, id)),

            Action::AddLandingPage(page) => {
                added(insert(&mut self.landing_pages, page.clone().normalized()))
            }
            Action::UpdateLandingPage(page) => {
                updated(replace(&mut self.landing_pages, page.clone().normalized()))
            }
            Action::DeleteLandingPage { id } => deleted(remove(&mut self.landing_pages, id)),
            Action::DuplicateLandingPage {
                source_id,
                new_id,
                at,
            } => {
                let Some(source) = self.landing_page(source_id) else {
                    return Outcome::NoMatch;
                };
                let copy = source.duplicate(new_id.clone(), *at);
                added(insert(&mut self.landing_pages, copy))
            }

            Action::AddExperiment(experiment) => match checked_experiment(experiment) {
                Ok(experiment) => added(insert(&mut self.experiments, experiment)),
                Err(reason) => Outcome::Rejected(reason),
            },
            Action::UpdateExperiment(experiment) => {
                if position(&self.experiments, &experiment.id).is_none() {
                    return Outcome::NoMatch;
                }
                match checked_experiment(experiment) {
                    Ok(experiment) => updated(replace(&mut self.experiments, experiment)),
                    Err(reason) => Outcome::Rejected(reason),
                }
            }
            Action::DeleteExperiment { id } => deleted(remove(&mut self.experiments, id)),
            Action::ToggleExperiment { id, at } => self.toggle_experiment(id, *at),
            Action::CompleteExperiment { id, ended_at } => self.complete_experiment(id, *ended_at),
            Action::RecordVariantResults {
                experiment_id,
                variant_id,
                impressions,
                conversions,
            } => self.record_variant_results(experiment_id, variant_id, *impressions, *conversions),

            Action::AddSurvey(survey) => added(insert(&mut self.surveys, survey.clone())),
            Action::UpdateSurvey(survey) => {
                // responses only ever grow through AddSurveyResponse
                let Some(existing) = find(&self.surveys, &survey.id) else {
                    return Outcome::NoMatch;
                };
                let mut survey = survey.clone();
                survey.responses = existing.responses.clone();
                updated(replace(&mut self.surveys, survey))
            }
            Action::DeleteSurvey { id } => deleted(remove(&mut self.surveys, id)),
            Action::AddSurveyResponse {
                survey_id,
                response,
            } => {
                let Some(index) = position(&self.surveys, survey_id) else {
                    return Outcome::NoMatch;
                };
                let mut survey = self.surveys[index].clone();
                if let Err(reason) = survey.check_response(response) {
                    return Outcome::Rejected(reason);
                }
                survey.responses.push(response.clone());
                self.surveys.set(index, survey);
                Outcome::Applied
            }

            Action::AddAudience(audience) => {
                let mut audience = audience.clone();
                audience.size = audience_size(&audience.criteria, &self.leads);
                added(insert(&mut self.audiences, audience))
            }
            Action::UpdateAudience(audience) => {
                let mut audience = audience.clone();
                audience.size = audience_size(&audience.criteria, &self.leads);
                updated(replace(&mut self.audiences, audience))
            }
            Action::DeleteAudience { id } => deleted(remove(&mut self.audiences, id)),

            Action::AddContent(piece) => added(insert(&mut self.content, piece.clone())),
            Action::UpdateContent(piece) => updated(replace(&mut self.content, piece.clone())),
            Action::DeleteContent { id } => deleted(remove(&mut self.content, id)),

            Action::AddCampaign(campaign) => added(insert(&mut self.campaigns, campaign.clone())),
            Action::UpdateCampaign(campaign) => {
                updated(replace(&mut self.campaigns, campaign.clone()))
            }
            Action::DeleteCampaign { id } => deleted(remove(&mut self.campaigns, id)),

            Action::SetProductProfile(profile) => {
                self.product_profile = Some(profile.clone());
                Outcome::Applied
            }

            Action::AddLaunchPlan(plan) => added(insert(&mut self.launch_plans, plan.clone())),
            Action::UpdateLaunchPlan(plan) => {
                if position(&self.launch_plans, &plan.id).is_none() {
                    return Outcome::NoMatch;
                }
                let orphans_items = self
                    .queue_for_plan(&plan.id)
                    .any(|item| !plan.has_phase_id(&item.phase_id));
                if orphans_items {
                    return Outcome::Rejected("queue items still reference a removed phase");
                }
                updated(replace(&mut self.launch_plans, plan.clone()))
            }
            Action::DeleteLaunchPlan { id } => {
                if remove(&mut self.launch_plans, id).is_none() {
                    return Outcome::NoMatch;
                }
                self.content_queue.retain(|item| item.plan_id != *id);
                Outcome::Applied
            }

            Action::AddQueueItem(item) => {
                if !self.queue_item_is_placed(item) {
                    return Outcome::Rejected("queue item must point at a phase of its launch plan");
                }
                added(insert(&mut self.content_queue, item.clone()))
            }
            Action::UpdateQueueItem(item) => {
                if position(&self.content_queue, &item.id).is_none() {
                    return Outcome::NoMatch;
                }
                if !self.queue_item_is_placed(item) {
                    return Outcome::Rejected("queue item must point at a phase of its launch plan");
                }
                updated(replace(&mut self.content_queue, item.clone()))
            }
            Action::DeleteQueueItem { id } => deleted(remove(&mut self.content_queue, id)),
            Action::BulkApproveQueue { ids, approved_at } => self.bulk_approve(ids, *approved_at),
            Action::MoveContentToPhase { item_id, phase } => self.move_to_phase(item_id, *phase),

            Action::UpdateMetrics(patch) => {
                self.metrics.apply_patch(patch);
                Outcome::Applied
            }
            Action::AddActivity(activity) => {
                self.activities.push_front(activity.clone());
                self.activities.truncate(ACTIVITY_LOG_CAPACITY);
                Outcome::Applied
            }

            Action::LoadState(state) => {
                *self = state.as_ref().clone();
                Outcome::Applied
            }
            Action::ResetState => {
                *self = seed::demo_state();
                Outcome::Applied
            }
        }
    }

    fn toggle_experiment(&mut self, id: &str, at: DateTime<Utc>) -> Outcome {
        let Some(index) = position(&self.experiments, id) else {
            return Outcome::NoMatch;
        };
        let mut experiment = self.experiments[index].clone();
        match experiment.status {
            ExperimentStatus::Draft => {
                experiment.status = ExperimentStatus::Running;
                experiment.start_date = Some(at);
            }
            ExperimentStatus::Running => experiment.status = ExperimentStatus::Paused,
            ExperimentStatus::Paused => experiment.status = ExperimentStatus::Running,
            ExperimentStatus::Completed => {
                return Outcome::Rejected("a completed experiment cannot be restarted");
            }
        }
        self.experiments.set(index, experiment);
        Outcome::Applied
    }

    fn complete_experiment(&mut self, id: &str, ended_at: DateTime<Utc>) -> Outcome {
        let Some(index) = position(&self.experiments, id) else {
            return Outcome::NoMatch;
        };
        let mut experiment = self.experiments[index].clone();
        match experiment.status {
            ExperimentStatus::Running | ExperimentStatus::Paused => {}
            ExperimentStatus::Draft => return Outcome::Rejected("experiment has not started"),
            ExperimentStatus::Completed => return Outcome::Rejected("experiment is already completed"),
        }
        if experiment.variants.is_empty() {
            return Outcome::Rejected("a completed experiment needs at least one variant");
        }
        experiment.status = ExperimentStatus::Completed;
        experiment.end_date = Some(ended_at);
        experiment.winner = None;
        self.experiments.set(index, experiment.normalized());
        Outcome::Applied
    }

    fn record_variant_results(
        &mut self,
        experiment_id: &str,
        variant_id: &str,
        impressions: u64,
        conversions: u64,
    ) -> Outcome {
        let Some(index) = position(&self.experiments, experiment_id) else {
            return Outcome::NoMatch;
        };
        let mut experiment = self.experiments[index].clone();
        if experiment.status != ExperimentStatus::Running {
            return Outcome::Rejected("results are only recorded while an experiment is running");
        }
        let Some(variant) = experiment.variant_mut(variant_id) else {
            return Outcome::NoMatch;
        };
        let impressions = variant.impressions.saturating_add(impressions);
        let conversions = variant.conversions.saturating_add(conversions);
        if conversions > impressions {
            return Outcome::Rejected("conversions cannot exceed impressions");
        }
        variant.impressions = impressions;
        variant.conversions = conversions;
        variant.recompute();
        self.experiments.set(index, experiment);
        Outcome::Applied
    }

    /// Approves every listed item still awaiting approval. Items that are already
    /// approved or published are left alone, so repeating the action changes nothing.
    fn bulk_approve(&mut self, ids: &[String], approved_at: DateTime<Utc>) -> Outcome {
        let mut matched = false;
        for id in ids {
            let Some(index) = position(&self.content_queue, id) else {
                continue;
            };
            matched = true;
            if !self.content_queue[index].status.awaits_approval() {
                continue;
            }
            let mut item = self.content_queue[index].clone();
            item.status = QueueStatus::Approved;
            item.approved_at = Some(approved_at);
            self.content_queue.set(index, item);
        }
        updated(matched)
    }

    fn move_to_phase(&mut self, item_id: &str, phase: PhaseType) -> Outcome {
        let Some(index) = position(&self.content_queue, item_id) else {
            return Outcome::NoMatch;
        };
        let mut item = self.content_queue[index].clone();
        let Some(plan) = self.launch_plan(&item.plan_id) else {
            return Outcome::Rejected("queue item belongs to no launch plan");
        };
        let Some(target) = plan.phase(phase) else {
            return Outcome::Rejected("launch plan has no phase of that type");
        };
        item.phase_id = target.id.clone();
        self.content_queue.set(index, item);
        Outcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::model::{
        Activity, ActivityKind, ContentQueueItem, LaunchPlan, Lead, LeadSource, LeadStage,
        QueuedContent, Variant,
    };

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn apply(state: PmfState, action: Action) -> Applied<PmfState> {
        state.apply(&action)
    }

    #[test]
    fn test_add_lead_overwrites_caller_score() {
        let mut lead = Lead::new("a@x.io", "A", LeadSource::Referral, at(0));
        lead.score = 99;
        let applied = apply(PmfState::default(), Action::AddLead(lead.clone()));
        assert_eq!(applied.outcome, Outcome::Applied);
        assert_eq!(applied.state.lead(&lead.id).unwrap().score, 25);
        assert_eq!(applied.state.metrics.total_leads, 1);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let lead = Lead::new("a@x.io", "A", LeadSource::Website, at(0));
        let state = apply(PmfState::default(), Action::AddLead(lead.clone())).state;
        let applied = apply(state.clone(), Action::AddLead(lead));
        assert!(matches!(applied.outcome, Outcome::Rejected(_)));
        assert_eq!(applied.state, state);
    }

    #[test]
    fn test_toggle_cycle() {
        let experiment = Experiment::new("Headline", ["A", "B"], at(0));
        let id = experiment.id.clone();
        let mut state = apply(PmfState::default(), Action::AddExperiment(experiment)).state;

        let toggle = |state: PmfState| {
            apply(
                state,
                Action::ToggleExperiment {
                    id: id.clone(),
                    at: at(10),
                },
            )
            .state
        };
        state = toggle(state);
        assert_eq!(state.experiment(&id).unwrap().status, ExperimentStatus::Running);
        assert_eq!(state.experiment(&id).unwrap().start_date, Some(at(10)));
        state = toggle(state);
        assert_eq!(state.experiment(&id).unwrap().status, ExperimentStatus::Paused);
        state = toggle(state);
        assert_eq!(state.experiment(&id).unwrap().status, ExperimentStatus::Running);
    }

    #[test]
    fn test_completed_experiment_is_terminal() {
        let experiment = Experiment::new("Headline", ["A", "B"], at(0));
        let id = experiment.id.clone();
        let mut state = PmfState::default();
        for action in [
            Action::AddExperiment(experiment),
            Action::ToggleExperiment {
                id: id.clone(),
                at: at(1),
            },
            Action::CompleteExperiment {
                id: id.clone(),
                ended_at: at(2),
            },
        ] {
            let applied = apply(state, action);
            assert_eq!(applied.outcome, Outcome::Applied);
            state = applied.state;
        }
        let applied = apply(
            state,
            Action::ToggleExperiment {
                id: id.clone(),
                at: at(3),
            },
        );
        assert!(matches!(applied.outcome, Outcome::Rejected(_)));
        assert_eq!(applied.state.experiment(&id).unwrap().end_date, Some(at(2)));
    }

    #[test]
    fn test_completion_picks_best_variant() {
        let mut experiment = Experiment::new("Pricing", ["Low", "High"], at(0));
        experiment.status = ExperimentStatus::Running;
        let low = experiment.variants[0].id.clone();
        let high = experiment.variants[1].id.clone();
        let id = experiment.id.clone();
        let mut state = apply(PmfState::default(), Action::AddExperiment(experiment)).state;

        for (variant_id, impressions, conversions) in [(&low, 100, 5), (&high, 100, 9)] {
            state = apply(
                state,
                Action::RecordVariantResults {
                    experiment_id: id.clone(),
                    variant_id: variant_id.clone(),
                    impressions,
                    conversions,
                },
            )
            .state;
        }
        let state = apply(
            state,
            Action::CompleteExperiment {
                id: id.clone(),
                ended_at: at(5),
            },
        )
        .state;
        let experiment = state.experiment(&id).unwrap();
        assert_eq!(experiment.winner.as_deref(), Some(high.as_str()));
        assert_eq!(experiment.variants[1].conversion_rate, 9.0);
    }

    #[test]
    fn test_update_clears_winner_of_unfinished_experiment() {
        let mut experiment = Experiment::new("Copy", ["A"], at(0));
        experiment.winner = Some(experiment.variants[0].id.clone());
        let id = experiment.id.clone();
        let state = apply(PmfState::default(), Action::AddExperiment(experiment)).state;
        assert_eq!(state.experiment(&id).unwrap().winner, None);
    }

    #[test]
    fn test_results_need_a_running_experiment() {
        let mut experiment = Experiment::new("Copy", ["A"], at(0));
        experiment.variants = vec![Variant::new("v", "A")];
        let id = experiment.id.clone();
        let state = apply(PmfState::default(), Action::AddExperiment(experiment)).state;
        let applied = apply(
            state,
            Action::RecordVariantResults {
                experiment_id: id,
                variant_id: "v".to_string(),
                impressions: 10,
                conversions: 1,
            },
        );
        assert!(matches!(applied.outcome, Outcome::Rejected(_)));
    }

    #[test]
    fn test_activity_log_is_capped() {
        let mut state = PmfState::default();
        for i in 0..(ACTIVITY_LOG_CAPACITY as i64 + 5) {
            let activity = Activity::new(ActivityKind::Lead, format!("event {i}"), at(i));
            state = apply(state, Action::AddActivity(activity)).state;
        }
        assert_eq!(state.activities.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(state.activities[0].message, "event 54");
    }

    #[test]
    fn test_move_content_between_phases() {
        let plan = LaunchPlan::new("Launch", at(100), at(0));
        let item = ContentQueueItem::queued(
            &plan,
            PhaseType::PreLaunch,
            QueuedContent {
                channel: "twitter".to_string(),
                title: "Teaser".to_string(),
                body: "Soon".to_string(),
            },
        )
        .unwrap();
        let growth = plan.phase(PhaseType::Growth).unwrap().id.clone();
        let item_id = item.id.clone();

        let mut state = apply(PmfState::default(), Action::AddLaunchPlan(plan)).state;
        state = apply(state, Action::AddQueueItem(item)).state;
        let applied = apply(
            state,
            Action::MoveContentToPhase {
                item_id: item_id.clone(),
                phase: PhaseType::Growth,
            },
        );
        assert_eq!(applied.outcome, Outcome::Applied);
        assert_eq!(applied.state.queue_item(&item_id).unwrap().phase_id, growth);
    }

    #[test]
    fn test_queue_item_needs_a_known_phase() {
        let plan = LaunchPlan::new("Launch", at(100), at(0));
        let mut item = ContentQueueItem::queued(
            &plan,
            PhaseType::LaunchDay,
            QueuedContent {
                channel: "email".to_string(),
                title: "We're live".to_string(),
                body: String::new(),
            },
        )
        .unwrap();
        item.phase_id = "nowhere".to_string();
        let state = apply(PmfState::default(), Action::AddLaunchPlan(plan)).state;
        let applied = apply(state, Action::AddQueueItem(item));
        assert!(matches!(applied.outcome, Outcome::Rejected(_)));
        assert!(applied.state.content_queue.is_empty());
    }

    #[test]
    fn test_lead_update_recomputes_metrics() {
        let lead = Lead::new("a@x.io", "A", LeadSource::Website, at(0));
        let state = apply(PmfState::default(), Action::AddLead(lead.clone())).state;
        assert_eq!(state.metrics.lead_conversion_rate, 0.0);
        let won = lead.moved_to(LeadStage::Won, at(1));
        let state = apply(state, Action::UpdateLead(won)).state;
        assert_eq!(state.metrics.lead_conversion_rate, 100.0);
    }
}

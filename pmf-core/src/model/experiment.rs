use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::percentage;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hypothesis: String,
    pub status: ExperimentStatus,
    pub kind: ExperimentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub variants: Vec<Variant>,
    /// Percent of traffic per variant, in variant order.
    #[serde(default)]
    pub traffic_split: Vec<u8>,
    /// Set exactly when `status` is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    Ab,
    Multivariate,
    SplitUrl,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub impressions: u64,
    pub conversions: u64,
    /// Derived: conversions / impressions, as a percent.
    pub conversion_rate: f64,
}

impl Variant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Variant {
            id: id.into(),
            name: name.into(),
            impressions: 0,
            conversions: 0,
            conversion_rate: 0.0,
        }
    }

    pub fn recompute(&mut self) {
        self.conversion_rate = percentage(self.conversions, self.impressions);
    }
}

impl Experiment {
    /// A draft A/B test with an even split between `variant_names`.
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        variant_names: impl IntoIterator<Item = N>,
        at: DateTime<Utc>,
    ) -> Self {
        let variants: Vec<Variant> = variant_names
            .into_iter()
            .map(|name| Variant::new(crate::new_id(), name))
            .collect();
        let traffic_split = even_split(variants.len());
        Experiment {
            id: crate::new_id(),
            name: name.into(),
            hypothesis: String::new(),
            status: ExperimentStatus::Draft,
            kind: ExperimentKind::Ab,
            target_id: None,
            variants,
            traffic_split,
            winner: None,
            start_date: None,
            end_date: None,
            created_at: at,
        }
    }

    /// The variant with the highest conversion rate. Ties go to the earlier variant.
    pub fn leading_variant(&self) -> Option<&Variant> {
        self.variants.iter().fold(None, |best: Option<&Variant>, variant| match best {
            Some(best) if best.conversion_rate >= variant.conversion_rate => Some(best),
            _ => Some(variant),
        })
    }

    pub fn variant_mut(&mut self, variant_id: &str) -> Option<&mut Variant> {
        self.variants.iter_mut().find(|variant| variant.id == variant_id)
    }

    /// Recompute every variant's rate and enforce "winner iff completed".
    /// A completed experiment keeps a caller-chosen winner if it names one of its variants.
    pub fn normalized(mut self) -> Self {
        for variant in &mut self.variants {
            variant.recompute();
        }

        if self.status == ExperimentStatus::Completed {
            let winner_is_known = self
                .winner
                .as_deref()
                .is_some_and(|winner| self.variants.iter().any(|variant| variant.id == winner));
            if !winner_is_known {
                self.winner = self.leading_variant().map(|variant| variant.id.clone());
            }
        } else {
            self.winner = None;
        }
        self
    }
}

fn even_split(count: usize) -> Vec<u8> {
    if count == 0 {
        return Vec::new();
    }
    let count_u8 = u8::try_from(count).unwrap_or(u8::MAX);
    let share = 100 / count_u8;
    let mut split = vec![share; count];
    // the first variant absorbs the rounding remainder
    split[0] += 100 - share * count_u8;
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experiment() -> Experiment {
        Experiment::new("Headline", ["Control", "Bold"], DateTime::default())
    }

    #[test]
    fn test_even_split_sums_to_one_hundred() {
        assert_eq!(even_split(3), vec![34, 33, 33]);
        assert_eq!(even_split(2), vec![50, 50]);
        assert!(even_split(0).is_empty());
    }

    #[test]
    fn test_rates_are_recomputed() {
        let mut experiment = experiment();
        experiment.variants[0].impressions = 400;
        experiment.variants[0].conversions = 20;
        experiment.variants[0].conversion_rate = 80.0;
        let experiment = experiment.normalized();
        assert_eq!(experiment.variants[0].conversion_rate, 5.0);
        assert_eq!(experiment.variants[1].conversion_rate, 0.0);
    }

    #[test]
    fn test_leading_variant_prefers_earliest_on_tie() {
        let experiment = experiment();
        assert_eq!(
            experiment.leading_variant().map(|v| v.name.as_str()),
            Some("Control")
        );
    }

    #[test]
    fn test_winner_cleared_unless_completed() {
        let mut experiment = experiment();
        experiment.status = ExperimentStatus::Running;
        experiment.winner = Some(experiment.variants[1].id.clone());
        assert_eq!(experiment.normalized().winner, None);
    }

    #[test]
    fn test_completed_keeps_valid_winner_and_replaces_unknown_one() {
        let mut experiment = experiment();
        experiment.status = ExperimentStatus::Completed;
        let bold = experiment.variants[1].id.clone();
        experiment.winner = Some(bold.clone());
        assert_eq!(experiment.clone().normalized().winner, Some(bold));

        experiment.winner = Some("nope".to_string());
        let control = experiment.variants[0].id.clone();
        assert_eq!(experiment.normalized().winner, Some(control));
    }
}

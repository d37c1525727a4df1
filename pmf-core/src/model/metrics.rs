use serde::{Deserialize, Serialize};

use crate::model::{Lead, LeadStage, Survey, nps_score, percentage, pmf_score};

/// Business metrics. Manual fields are set through [`MetricsPatch`];
/// derived fields are recomputed from leads and surveys whenever either changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmfMetrics {
    // manual
    pub mrr: f64,
    pub churn_rate: f64,
    pub cac: f64,
    pub ltv: f64,
    pub active_users: u64,

    // derived
    pub total_leads: usize,
    pub lead_conversion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmf_score: Option<f64>,
    pub overall_score: u8,
}

/// Merge patch for the manual metrics. `None` leaves a field as it is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cac: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_users: Option<u64>,
}

impl PmfMetrics {
    pub fn apply_patch(&mut self, patch: &MetricsPatch) {
        if let Some(mrr) = patch.mrr {
            self.mrr = mrr;
        }
        if let Some(churn_rate) = patch.churn_rate {
            self.churn_rate = churn_rate;
        }
        if let Some(cac) = patch.cac {
            self.cac = cac;
        }
        if let Some(ltv) = patch.ltv {
            self.ltv = ltv;
        }
        if let Some(active_users) = patch.active_users {
            self.active_users = active_users;
        }
    }

    pub fn recompute<'a>(
        &mut self,
        leads: impl IntoIterator<Item = &'a Lead>,
        surveys: impl IntoIterator<Item = &'a Survey> + Clone,
    ) {
        let (total, won) = leads.into_iter().fold((0usize, 0usize), |(total, won), lead| {
            (total + 1, won + usize::from(lead.stage == LeadStage::Won))
        });
        self.total_leads = total;
        self.lead_conversion_rate = percentage(won as u64, total as u64);
        self.nps_score = nps_score(surveys.clone());
        self.pmf_score = pmf_score(surveys);
        self.overall_score = self.blended_score();
    }

    /// Weighted blend in [0, 100]: PMF 40%, NPS 30%, lead conversion 20%, retention 10%.
    /// Missing survey data counts as zero.
    fn blended_score(&self) -> u8 {
        let pmf = self.pmf_score.unwrap_or(0.0).clamp(0.0, 100.0);
        let nps = self
            .nps_score
            .map(|nps| (f64::from(nps) + 100.0) / 2.0)
            .unwrap_or(0.0);
        let conversion = self.lead_conversion_rate.clamp(0.0, 100.0);
        let retention = (100.0 - self.churn_rate).clamp(0.0, 100.0);

        let blended = pmf * 0.4 + nps * 0.3 + conversion * 0.2 + retention * 0.1;
        blended.round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::model::LeadSource;

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut metrics = PmfMetrics {
            mrr: 1000.0,
            cac: 50.0,
            ..Default::default()
        };
        metrics.apply_patch(&MetricsPatch {
            mrr: Some(1500.0),
            ..Default::default()
        });
        assert_eq!(metrics.mrr, 1500.0);
        assert_eq!(metrics.cac, 50.0);
    }

    #[test]
    fn test_recompute_counts_won_leads() {
        let at = DateTime::default();
        let leads = vec![
            Lead::new("a@x.io", "A", LeadSource::Website, at).moved_to(LeadStage::Won, at),
            Lead::new("b@x.io", "B", LeadSource::Website, at),
            Lead::new("c@x.io", "C", LeadSource::Website, at),
            Lead::new("d@x.io", "D", LeadSource::Website, at).moved_to(LeadStage::Lost, at),
        ];
        let surveys: Vec<Survey> = Vec::new();

        let mut metrics = PmfMetrics::default();
        metrics.recompute(&leads, &surveys);
        assert_eq!(metrics.total_leads, 4);
        assert_eq!(metrics.lead_conversion_rate, 25.0);
        assert_eq!(metrics.nps_score, None);
        assert_eq!(metrics.pmf_score, None);
        // 0.2 * 25 + 0.1 * 100
        assert_eq!(metrics.overall_score, 15);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Lead;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    pub id: String,
    pub name: String,
    pub kind: AudienceKind,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    /// Number of leads matching `criteria` when the audience was last written. Not kept live.
    #[serde(default)]
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceKind {
    Segment,
    Lookalike,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub field: String,
    pub operator: CriterionOperator,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionOperator {
    GreaterThan,
    LessThan,
    Equals,
    Contains,
}

impl Criterion {
    pub fn new(field: impl Into<String>, operator: CriterionOperator, value: impl Into<String>) -> Self {
        Criterion {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Unknown fields match nothing. Ordering operators only apply to numeric fields.
    pub fn matches(&self, lead: &Lead) -> bool {
        match self.field.as_str() {
            "score" => self.matches_number(f64::from(lead.score)),
            "tags" => lead.tags.iter().any(|tag| self.matches_text(tag)),
            "email" => self.matches_text(&lead.email),
            "name" => self.matches_text(&lead.name),
            "company" => lead.company.as_deref().is_some_and(|company| self.matches_text(company)),
            "phone" => lead.phone.as_deref().is_some_and(|phone| self.matches_text(phone)),
            "source" => self.matches_text(lead.source.as_str()),
            "stage" => self.matches_text(lead.stage.as_str()),
            _ => false,
        }
    }

    fn matches_number(&self, actual: f64) -> bool {
        let Ok(expected) = self.value.trim().parse::<f64>() else {
            return false;
        };
        match self.operator {
            CriterionOperator::GreaterThan => actual > expected,
            CriterionOperator::LessThan => actual < expected,
            CriterionOperator::Equals => actual == expected,
            CriterionOperator::Contains => actual.to_string().contains(self.value.trim()),
        }
    }

    fn matches_text(&self, actual: &str) -> bool {
        let actual = actual.to_lowercase();
        let expected = self.value.trim().to_lowercase();
        match self.operator {
            CriterionOperator::Equals => actual == expected,
            CriterionOperator::Contains => actual.contains(&expected),
            CriterionOperator::GreaterThan | CriterionOperator::LessThan => false,
        }
    }
}

/// Leads matching every criterion. No criteria means every lead.
pub fn audience_size<'a>(criteria: &[Criterion], leads: impl IntoIterator<Item = &'a Lead>) -> usize {
    leads
        .into_iter()
        .filter(|lead| criteria.iter().all(|criterion| criterion.matches(lead)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeadSource, LeadStage};

    fn leads() -> Vec<Lead> {
        let at = DateTime::default();
        vec![
            Lead::new("ana@acme.com", "Ana", LeadSource::Referral, at)
                .with_company("Acme")
                .with_tags(["enterprise"]),
            Lead::new("bo@tiny.io", "Bo", LeadSource::Ads, at),
            Lead::new("cy@acme.com", "Cy", LeadSource::Website, at)
                .moved_to(LeadStage::Qualified, at)
                .with_tags(["Enterprise", "beta"]),
        ]
    }

    #[test]
    fn test_score_threshold() {
        let criteria = [Criterion::new("score", CriterionOperator::GreaterThan, "30")];
        // Ana 25+15+5 = 45, Bo 10, Cy 15+20+10 = 45
        assert_eq!(audience_size(&criteria, &leads()), 2);
    }

    #[test]
    fn test_text_matching_is_case_insensitive() {
        let criteria = [Criterion::new("tags", CriterionOperator::Equals, "enterprise")];
        assert_eq!(audience_size(&criteria, &leads()), 2);

        let criteria = [Criterion::new("email", CriterionOperator::Contains, "@ACME")];
        assert_eq!(audience_size(&criteria, &leads()), 2);
    }

    #[test]
    fn test_all_criteria_must_match() {
        let criteria = [
            Criterion::new("email", CriterionOperator::Contains, "acme"),
            Criterion::new("stage", CriterionOperator::Equals, "qualified"),
        ];
        assert_eq!(audience_size(&criteria, &leads()), 1);
    }

    #[test]
    fn test_empty_criteria_match_everyone_and_unknown_fields_nobody() {
        assert_eq!(audience_size(&[], &leads()), 3);
        let criteria = [Criterion::new("favorite_color", CriterionOperator::Equals, "red")];
        assert_eq!(audience_size(&criteria, &leads()), 0);
    }

    #[test]
    fn test_ordering_on_text_field_matches_nothing() {
        let criteria = [Criterion::new("name", CriterionOperator::GreaterThan, "A")];
        assert_eq!(audience_size(&criteria, &leads()), 0);
    }
}

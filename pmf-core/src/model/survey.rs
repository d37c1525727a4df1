use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The answer a PMF survey counts toward the PMF score.
pub const VERY_DISAPPOINTED: &str = "Very disappointed";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub status: SurveyStatus,
    pub kind: SurveyKind,
    pub questions: Vec<Question>,
    /// Append-only.
    #[serde(default)]
    pub responses: Vec<SurveyResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Draft,
    Active,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyKind {
    Pmf,
    Nps,
    Csat,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Nps,
    Rating { min: u8, max: u8 },
    SingleChoice { options: Vec<String> },
    MultipleChoice { options: Vec<String> },
    OpenEnded,
    Scale { min: u8, max: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(i64),
    Text(String),
    Choices(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    /// Keyed by question id.
    pub answers: BTreeMap<String, Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respondent_email: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl Question {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, kind: QuestionKind) -> Self {
        Question {
            id: id.into(),
            prompt: prompt.into(),
            kind,
            required: true,
        }
    }

    fn accepts(&self, answer: &Answer) -> bool {
        match (&self.kind, answer) {
            (QuestionKind::Nps, Answer::Number(n)) => (0..=10).contains(n),
            (QuestionKind::Rating { min, max } | QuestionKind::Scale { min, max }, Answer::Number(n)) => {
                (i64::from(*min)..=i64::from(*max)).contains(n)
            }
            (QuestionKind::SingleChoice { options }, Answer::Text(choice)) => options.contains(choice),
            (QuestionKind::MultipleChoice { options }, Answer::Choices(choices)) => {
                choices.iter().all(|choice| options.contains(choice))
            }
            (QuestionKind::OpenEnded, Answer::Text(_)) => true,
            _ => false,
        }
    }
}

impl Survey {
    /// The standard Sean Ellis PMF survey.
    pub fn pmf(title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Survey {
            id: crate::new_id(),
            title: title.into(),
            status: SurveyStatus::Draft,
            kind: SurveyKind::Pmf,
            questions: vec![
                Question::new(
                    "disappointment",
                    "How would you feel if you could no longer use the product?",
                    QuestionKind::SingleChoice {
                        options: vec![
                            VERY_DISAPPOINTED.to_string(),
                            "Somewhat disappointed".to_string(),
                            "Not disappointed".to_string(),
                        ],
                    },
                ),
                Question::new(
                    "main_benefit",
                    "What is the main benefit you receive?",
                    QuestionKind::OpenEnded,
                ),
            ],
            responses: Vec::new(),
            created_at: at,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    /// Whether `response` may be appended to this survey.
    pub fn check_response(&self, response: &SurveyResponse) -> Result<(), &'static str> {
        if self.status != SurveyStatus::Active {
            return Err("survey is not accepting responses");
        }
        if self.responses.iter().any(|existing| existing.id == response.id) {
            return Err("response id already recorded");
        }
        for (question_id, answer) in &response.answers {
            let Some(question) = self.question(question_id) else {
                return Err("answer references an unknown question");
            };
            if !question.accepts(answer) {
                return Err("answer does not fit its question");
            }
        }
        let missing_required = self
            .questions
            .iter()
            .any(|question| question.required && !response.answers.contains_key(&question.id));
        if missing_required {
            return Err("a required question was not answered");
        }
        Ok(())
    }
}

/// Net Promoter Score over every NPS answer in `surveys`, in [-100, 100]. `None` without answers.
pub fn nps_score<'a>(surveys: impl IntoIterator<Item = &'a Survey>) -> Option<i32> {
    let mut promoters = 0i64;
    let mut detractors = 0i64;
    let mut total = 0i64;

    for survey in surveys {
        for question in survey
            .questions
            .iter()
            .filter(|question| question.kind == QuestionKind::Nps)
        {
            for response in &survey.responses {
                if let Some(Answer::Number(score)) = response.answers.get(&question.id) {
                    total += 1;
                    if *score >= 9 {
                        promoters += 1;
                    } else if *score <= 6 {
                        detractors += 1;
                    }
                }
            }
        }
    }

    if total == 0 {
        return None;
    }
    let nps = ((promoters - detractors) as f64 * 100.0 / total as f64).round();
    Some(nps as i32)
}

/// Percent of PMF-survey respondents who would be "very disappointed" without the product.
pub fn pmf_score<'a>(surveys: impl IntoIterator<Item = &'a Survey>) -> Option<f64> {
    let mut very_disappointed = 0u64;
    let mut total = 0u64;

    for survey in surveys.into_iter().filter(|survey| survey.kind == SurveyKind::Pmf) {
        for question in &survey.questions {
            let QuestionKind::SingleChoice { options } = &question.kind else {
                continue;
            };
            if !options.iter().any(|option| option.eq_ignore_ascii_case(VERY_DISAPPOINTED)) {
                continue;
            }
            for response in &survey.responses {
                if let Some(Answer::Text(choice)) = response.answers.get(&question.id) {
                    total += 1;
                    if choice.eq_ignore_ascii_case(VERY_DISAPPOINTED) {
                        very_disappointed += 1;
                    }
                }
            }
        }
    }

    (total > 0).then(|| crate::model::percentage(very_disappointed, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nps_survey(scores: &[i64]) -> Survey {
        Survey {
            id: "nps".to_string(),
            title: "NPS".to_string(),
            status: SurveyStatus::Active,
            kind: SurveyKind::Nps,
            questions: vec![Question::new("score", "How likely...", QuestionKind::Nps)],
            responses: scores
                .iter()
                .enumerate()
                .map(|(i, score)| SurveyResponse {
                    id: format!("r{i}"),
                    answers: BTreeMap::from([("score".to_string(), Answer::Number(*score))]),
                    respondent_email: None,
                    completed_at: DateTime::default(),
                })
                .collect(),
            created_at: DateTime::default(),
        }
    }

    fn pmf_response(id: &str, choice: &str) -> SurveyResponse {
        SurveyResponse {
            id: id.to_string(),
            answers: BTreeMap::from([
                ("disappointment".to_string(), Answer::Text(choice.to_string())),
                ("main_benefit".to_string(), Answer::Text("speed".to_string())),
            ]),
            respondent_email: Some("r@example.com".to_string()),
            completed_at: DateTime::default(),
        }
    }

    #[test]
    fn test_nps_counts_promoters_minus_detractors() {
        // 2 promoters, 1 passive, 1 detractor
        let survey = nps_survey(&[10, 9, 7, 3]);
        assert_eq!(nps_score([&survey]), Some(25));
    }

    #[test]
    fn test_nps_without_answers_is_none() {
        assert_eq!(nps_score([&nps_survey(&[])]), None);
    }

    #[test]
    fn test_pmf_score_is_share_of_very_disappointed() {
        let mut survey = Survey::pmf("PMF", DateTime::default());
        survey.responses = vec![
            pmf_response("a", VERY_DISAPPOINTED),
            pmf_response("b", "Somewhat disappointed"),
            pmf_response("c", VERY_DISAPPOINTED),
            pmf_response("d", "Not disappointed"),
        ];
        assert_eq!(pmf_score([&survey]), Some(50.0));
    }

    #[test]
    fn test_response_checks() {
        let mut survey = Survey::pmf("PMF", DateTime::default());
        let response = pmf_response("a", VERY_DISAPPOINTED);
        assert_eq!(
            survey.check_response(&response),
            Err("survey is not accepting responses")
        );

        survey.status = SurveyStatus::Active;
        assert_eq!(survey.check_response(&response), Ok(()));

        let off_menu = pmf_response("b", "Thrilled");
        assert_eq!(
            survey.check_response(&off_menu),
            Err("answer does not fit its question")
        );

        let mut partial = pmf_response("c", VERY_DISAPPOINTED);
        partial.answers.remove("main_benefit");
        assert_eq!(
            survey.check_response(&partial),
            Err("a required question was not answered")
        );
    }

    #[test]
    fn test_question_kind_serializes_inline() {
        let question = Question::new("q", "Rate us", QuestionKind::Rating { min: 1, max: 5 });
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["type"], "rating");
        assert_eq!(json["max"], 5);
        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back, question);
    }
}

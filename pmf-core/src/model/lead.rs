use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::lead_score;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub source: LeadSource,
    pub stage: LeadStage,
    /// Always the output of [`lead_score`]; the reducer overwrites whatever a caller puts here.
    pub score: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Lead {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        source: LeadSource,
        at: DateTime<Utc>,
    ) -> Self {
        Lead {
            id: crate::new_id(),
            email: email.into(),
            name: name.into(),
            company: None,
            phone: None,
            source,
            stage: LeadStage::New,
            score: 0,
            tags: Vec::new(),
            notes: String::new(),
            created_at: at,
            updated_at: at,
            last_activity: at,
        }
        .rescored()
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self.rescored()
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self.rescored()
    }

    pub fn with_tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        for tag in tags {
            let tag = tag.into();
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self.rescored()
    }

    /// Move to `stage`, bumping the edit timestamps.
    pub fn moved_to(mut self, stage: LeadStage, at: DateTime<Utc>) -> Self {
        self.stage = stage;
        self.updated_at = at;
        self.last_activity = at;
        self.rescored()
    }

    pub fn rescored(mut self) -> Self {
        self.score = lead_score(&self);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    Referral,
    Social,
    Ads,
    Event,
    ColdOutreach,
    Organic,
    Other,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Website => "website",
            LeadSource::Referral => "referral",
            LeadSource::Social => "social",
            LeadSource::Ads => "ads",
            LeadSource::Event => "event",
            LeadSource::ColdOutreach => "cold_outreach",
            LeadSource::Organic => "organic",
            LeadSource::Other => "other",
        }
    }
}

/// Pipeline position. The happy path runs New → Won; Lost can happen from any stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl LeadStage {
    pub const PIPELINE: [LeadStage; 6] = [
        LeadStage::New,
        LeadStage::Contacted,
        LeadStage::Qualified,
        LeadStage::Proposal,
        LeadStage::Negotiation,
        LeadStage::Won,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStage::New => "new",
            LeadStage::Contacted => "contacted",
            LeadStage::Qualified => "qualified",
            LeadStage::Proposal => "proposal",
            LeadStage::Negotiation => "negotiation",
            LeadStage::Won => "won",
            LeadStage::Lost => "lost",
        }
    }
}

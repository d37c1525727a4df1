//! Lead scoring. A lead's score is a pure function of its source, contact details, stage and tags.

use crate::model::{Lead, LeadSource, LeadStage};

pub const COMPANY_POINTS: u8 = 15;
pub const PHONE_POINTS: u8 = 10;
pub const POINTS_PER_TAG: u8 = 5;
pub const MAX_TAG_POINTS: u8 = 15;
pub const MAX_SCORE: u8 = 100;

pub fn source_points(source: LeadSource) -> u8 {
    match source {
        LeadSource::Referral => 25,
        LeadSource::Event => 20,
        LeadSource::Website | LeadSource::Organic => 15,
        LeadSource::Social | LeadSource::Ads => 10,
        LeadSource::ColdOutreach | LeadSource::Other => 5,
    }
}

/// Non-decreasing along [`LeadStage::PIPELINE`].
pub fn stage_points(stage: LeadStage) -> u8 {
    match stage {
        LeadStage::New => 0,
        LeadStage::Contacted => 10,
        LeadStage::Qualified => 20,
        LeadStage::Proposal => 30,
        LeadStage::Negotiation => 35,
        LeadStage::Won => 40,
        LeadStage::Lost => 0,
    }
}

pub fn lead_score(lead: &Lead) -> u8 {
    let has_company = lead
        .company
        .as_deref()
        .is_some_and(|company| !company.trim().is_empty());
    let has_phone = lead
        .phone
        .as_deref()
        .is_some_and(|phone| !phone.trim().is_empty());

    let tag_points = u32::try_from(lead.tags.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(u32::from(POINTS_PER_TAG))
        .min(u32::from(MAX_TAG_POINTS));

    let total = u32::from(source_points(lead.source))
        + if has_company { u32::from(COMPANY_POINTS) } else { 0 }
        + if has_phone { u32::from(PHONE_POINTS) } else { 0 }
        + u32::from(stage_points(lead.stage))
        + tag_points;

    total.min(u32::from(MAX_SCORE)) as u8
}

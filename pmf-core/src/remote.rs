//! Rows as the remote tables store them, and which actions reach the remote at all.
//!
//! | action                          | remote call                   |
//! |---------------------------------|-------------------------------|
//! | add / update / delete lead      | create / update / delete `leads`     |
//! | add / update / delete content   | create / update / delete `content`   |
//! | add / delete audience           | create / delete `audiences`          |
//! | set product profile             | upsert `product_profiles`            |
//!
//! Every other action stays local.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tether::RemoteCall;

use crate::action::Action;
use crate::model::{Audience, ContentPiece, Criterion, Lead, ProductProfile};
use crate::state::PmfState;

pub const LEADS_TABLE: &str = "leads";
pub const CONTENT_TABLE: &str = "content";
pub const AUDIENCES_TABLE: &str = "audiences";
pub const PRODUCT_PROFILES_TABLE: &str = "product_profiles";

#[derive(Debug, Serialize)]
pub struct LeadRow<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub company: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub source: &'static str,
    pub stage: &'static str,
    pub score: u8,
    pub tags: &'a [String],
    pub notes: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl<'a> From<&'a Lead> for LeadRow<'a> {
    fn from(lead: &'a Lead) -> Self {
        LeadRow {
            id: &lead.id,
            email: &lead.email,
            name: &lead.name,
            company: lead.company.as_deref(),
            phone: lead.phone.as_deref(),
            source: lead.source.as_str(),
            stage: lead.stage.as_str(),
            score: lead.score,
            tags: &lead.tags,
            notes: &lead.notes,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
            last_activity: lead.last_activity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: &'static str,
    pub body: &'a str,
    pub channel: Option<&'a str>,
    pub campaign_id: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a ContentPiece> for ContentRow<'a> {
    fn from(piece: &'a ContentPiece) -> Self {
        ContentRow {
            id: &piece.id,
            title: &piece.title,
            kind: piece.kind.as_str(),
            status: piece.status.as_str(),
            body: &piece.body,
            channel: piece.channel.as_deref(),
            campaign_id: piece.campaign_id.as_deref(),
            created_at: piece.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AudienceRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: crate::model::AudienceKind,
    pub criteria: &'a [Criterion],
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Audience> for AudienceRow<'a> {
    fn from(audience: &'a Audience) -> Self {
        AudienceRow {
            id: &audience.id,
            name: &audience.name,
            kind: audience.kind,
            criteria: &audience.criteria,
            size: audience.size,
            created_at: audience.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductProfileRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub tagline: &'a str,
    pub description: &'a str,
    pub target_audience: &'a str,
    pub value_proposition: &'a str,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ProductProfile> for ProductProfileRow<'a> {
    fn from(profile: &'a ProductProfile) -> Self {
        ProductProfileRow {
            id: &profile.id,
            name: &profile.name,
            tagline: &profile.tagline,
            description: &profile.description,
            target_audience: &profile.target_audience,
            value_proposition: &profile.value_proposition,
            updated_at: profile.updated_at,
        }
    }
}

fn to_row(table: &'static str, row: impl Serialize) -> Option<serde_json::Value> {
    match serde_json::to_value(row) {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Could not encode {table} row: {e}");
            None
        }
    }
}

/// The remote call for an action that was just applied, if that action is mirrored.
/// `state` is the state after the action, so rows carry reducer-computed fields
/// such as the lead score. The payload is the fallback when the entity is not in `state`.
pub fn mirror(state: &PmfState, action: &Action) -> Option<RemoteCall> {
    match action {
        Action::AddLead(lead) => {
            let lead = state.lead(&lead.id).unwrap_or(lead);
            Some(RemoteCall::Create {
                table: LEADS_TABLE,
                row: to_row(LEADS_TABLE, LeadRow::from(lead))?,
            })
        }
        Action::UpdateLead(lead) => {
            let lead = state.lead(&lead.id).unwrap_or(lead);
            Some(RemoteCall::Update {
                table: LEADS_TABLE,
                id: lead.id.clone(),
                row: to_row(LEADS_TABLE, LeadRow::from(lead))?,
            })
        }
        Action::DeleteLead { id } => Some(RemoteCall::Delete {
            table: LEADS_TABLE,
            id: id.clone(),
        }),

        Action::AddContent(piece) => {
            let piece = state.content_piece(&piece.id).unwrap_or(piece);
            Some(RemoteCall::Create {
                table: CONTENT_TABLE,
                row: to_row(CONTENT_TABLE, ContentRow::from(piece))?,
            })
        }
        Action::UpdateContent(piece) => {
            let piece = state.content_piece(&piece.id).unwrap_or(piece);
            Some(RemoteCall::Update {
                table: CONTENT_TABLE,
                id: piece.id.clone(),
                row: to_row(CONTENT_TABLE, ContentRow::from(piece))?,
            })
        }
        Action::DeleteContent { id } => Some(RemoteCall::Delete {
            table: CONTENT_TABLE,
            id: id.clone(),
        }),

        Action::AddAudience(audience) => {
            let audience = state.audience(&audience.id).unwrap_or(audience);
            Some(RemoteCall::Create {
                table: AUDIENCES_TABLE,
                row: to_row(AUDIENCES_TABLE, AudienceRow::from(audience))?,
            })
        }
        Action::DeleteAudience { id } => Some(RemoteCall::Delete {
            table: AUDIENCES_TABLE,
            id: id.clone(),
        }),

        Action::SetProductProfile(profile) => Some(RemoteCall::Upsert {
            table: PRODUCT_PROFILES_TABLE,
            row: to_row(PRODUCT_PROFILES_TABLE, ProductProfileRow::from(profile))?,
        }),

        _ => None,
    }
}

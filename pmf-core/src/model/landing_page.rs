use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingPage {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub status: PageStatus,
    pub template: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub settings: PageSettings,
    #[serde(default)]
    pub analytics: PageAnalytics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Draft,
    Published,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub kind: SectionKind,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: String,
    /// Type-specific content (feature lists, pricing tiers, form fields...).
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hero,
    Features,
    Testimonials,
    Pricing,
    Faq,
    Cta,
    Form,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    pub primary_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    pub collect_emails: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            seo_title: None,
            seo_description: None,
            primary_color: "#4f46e5".to_string(),
            custom_domain: None,
            collect_emails: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalytics {
    pub views: u64,
    pub unique_visitors: u64,
    pub submissions: u64,
    /// Percent of views that submitted. Derived from `views` and `submissions`.
    pub conversion_rate: f64,
    pub bounce_rate: f64,
}

impl LandingPage {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, at: DateTime<Utc>) -> Self {
        LandingPage {
            id: crate::new_id(),
            title: title.into(),
            slug: slug.into(),
            status: PageStatus::Draft,
            template: "default".to_string(),
            sections: Vec::new(),
            settings: PageSettings::default(),
            analytics: PageAnalytics::default(),
            created_at: at,
            updated_at: at,
            published_at: None,
        }
    }

    /// Recompute derived analytics and make `published_at` agree with `status`.
    pub fn normalized(mut self) -> Self {
        self.analytics.conversion_rate =
            crate::model::percentage(self.analytics.submissions, self.analytics.views);
        match self.status {
            PageStatus::Draft => self.published_at = None,
            PageStatus::Published => {
                if self.published_at.is_none() {
                    self.published_at = Some(self.updated_at);
                }
            }
        }
        self
    }

    /// A fresh draft copy: new id, analytics and publish state reset.
    pub fn duplicate(&self, new_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        LandingPage {
            id: new_id.into(),
            title: format!("{} (Copy)", self.title),
            slug: format!("{}-copy", self.slug),
            status: PageStatus::Draft,
            template: self.template.clone(),
            sections: self.sections.clone(),
            settings: self.settings.clone(),
            analytics: PageAnalytics::default(),
            created_at: at,
            updated_at: at,
            published_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> LandingPage {
        LandingPage::new("Waitlist", "waitlist", DateTime::default())
    }

    #[test]
    fn test_publishing_without_timestamp_uses_updated_at() {
        let mut page = page();
        page.status = PageStatus::Published;
        let page = page.normalized();
        assert_eq!(page.published_at, Some(page.updated_at));
    }

    #[test]
    fn test_draft_drops_published_at() {
        let mut page = page();
        page.published_at = Some(DateTime::default());
        assert_eq!(page.normalized().published_at, None);
    }

    #[test]
    fn test_conversion_rate_is_recomputed() {
        let mut page = page();
        page.analytics.views = 200;
        page.analytics.submissions = 30;
        page.analytics.conversion_rate = 99.0;
        assert_eq!(page.normalized().analytics.conversion_rate, 15.0);
    }

    #[test]
    fn test_duplicate_resets_analytics_and_publish_state() {
        let mut original = page();
        original.status = PageStatus::Published;
        original.analytics.views = 10;
        let original = original.normalized();

        let copy = original.duplicate("copy-id", DateTime::default());
        assert_eq!(copy.id, "copy-id");
        assert_eq!(copy.status, PageStatus::Draft);
        assert_eq!(copy.published_at, None);
        assert_eq!(copy.analytics, PageAnalytics::default());
        assert_eq!(copy.slug, "waitlist-copy");
    }
}

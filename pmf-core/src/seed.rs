//! Built-in demo data. Used on first start, when no snapshot can be restored,
//! and by `ResetState`. Ids and timestamps are fixed so the seed is the same every time.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use im::Vector;

use crate::model::{
    Activity, ActivityKind, Answer, Audience, AudienceKind, Campaign, CampaignStatus,
    ContentKind, ContentPiece, ContentQueueItem, ContentStatus, Criterion, CriterionOperator,
    Experiment, ExperimentKind, ExperimentStatus, LandingPage, LaunchPhase, LaunchPlan, Lead,
    LeadSource, LeadStage, PageAnalytics, PageStatus, PhaseType, PmfMetrics, ProductProfile,
    Question, QuestionKind, QueueStatus, QueuedContent, Section, SectionKind, Survey, SurveyKind,
    SurveyResponse, SurveyStatus, VERY_DISAPPOINTED, Variant, audience_size,
};
use crate::state::PmfState;

/// 2024-03-01T09:00:00Z
const SEED_EPOCH: i64 = 1_709_283_600;

fn day(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(SEED_EPOCH, 0).unwrap_or_default() + Duration::days(offset)
}

pub fn demo_state() -> PmfState {
    let leads = demo_leads();
    let surveys = demo_surveys();
    let launch_plan = demo_launch_plan();
    let content_queue = demo_queue(&launch_plan);

    let mut audience = Audience {
        id: "audience-1".to_string(),
        name: "Warm B2B leads".to_string(),
        kind: AudienceKind::Segment,
        criteria: vec![Criterion::new("score", CriterionOperator::GreaterThan, "40")],
        size: 0,
        created_at: day(3),
    };
    audience.size = audience_size(&audience.criteria, &leads);

    let mut state = PmfState {
        leads: leads.into_iter().collect(),
        landing_pages: Vector::unit(demo_landing_page()),
        experiments: Vector::unit(demo_experiment()),
        surveys: surveys.into_iter().collect(),
        audiences: Vector::unit(audience),
        content: demo_content().into_iter().collect(),
        campaigns: Vector::unit(Campaign {
            id: "campaign-1".to_string(),
            name: "Spring launch".to_string(),
            channel: "linkedin".to_string(),
            status: CampaignStatus::Active,
            budget: 2500.0,
            start_date: Some(day(5)),
            end_date: Some(day(35)),
        }),
        product_profile: Some(ProductProfile {
            id: "product-1".to_string(),
            name: "Fieldnote".to_string(),
            tagline: "Customer interviews, searchable".to_string(),
            description: "Record, transcribe and tag customer interviews in one place.".to_string(),
            target_audience: "Product managers at early-stage startups".to_string(),
            value_proposition: "Find the pattern in your customer calls in minutes, not days.".to_string(),
            updated_at: day(0),
        }),
        launch_plans: Vector::unit(launch_plan),
        content_queue: content_queue.into_iter().collect(),
        metrics: PmfMetrics {
            mrr: 4200.0,
            churn_rate: 4.5,
            cac: 120.0,
            ltv: 1450.0,
            active_users: 312,
            ..Default::default()
        },
        activities: Vector::new(),
    };
    state.recompute_metrics();

    for (index, (kind, message, entity_id)) in [
        (ActivityKind::Lead, "New lead from referral: Priya Natarajan", "lead-2"),
        (ActivityKind::Experiment, "Experiment started: Hero headline", "experiment-1"),
        (ActivityKind::Survey, "PMF survey received 5 responses", "survey-1"),
    ]
    .into_iter()
    .enumerate()
    {
        let activity = Activity {
            id: format!("activity-{}", index + 1),
            ..Activity::new(kind, message, day(10 + index as i64)).about(entity_id)
        };
        state.activities.push_front(activity);
    }
    state
}

fn lead(id: &str, email: &str, name: &str, source: LeadSource, created: i64) -> Lead {
    Lead {
        id: id.to_string(),
        ..Lead::new(email, name, source, day(created))
    }
}

fn demo_leads() -> Vec<Lead> {
    vec![
        lead("lead-1", "maria@brightpath.io", "Maria Gomez", LeadSource::Website, 1)
            .with_company("Brightpath")
            .with_tags(["saas"]),
        lead("lead-2", "priya@northwind.dev", "Priya Natarajan", LeadSource::Referral, 2)
            .with_company("Northwind")
            .with_phone("+1 415 555 0101")
            .with_tags(["enterprise", "warm"])
            .moved_to(LeadStage::Qualified, day(6)),
        lead("lead-3", "tom@hollowcraft.com", "Tom Becker", LeadSource::Event, 3)
            .moved_to(LeadStage::Contacted, day(4)),
        lead("lead-4", "lena@quillstack.co", "Lena Fischer", LeadSource::Ads, 4)
            .with_company("Quillstack")
            .with_tags(["smb"])
            .moved_to(LeadStage::Won, day(9)),
        lead("lead-5", "sam@example.org", "Sam Okafor", LeadSource::ColdOutreach, 5)
            .moved_to(LeadStage::Lost, day(8)),
    ]
}

fn demo_landing_page() -> LandingPage {
    let mut page = LandingPage {
        id: "page-1".to_string(),
        status: PageStatus::Published,
        analytics: PageAnalytics {
            views: 1840,
            unique_visitors: 1422,
            submissions: 97,
            conversion_rate: 0.0,
            bounce_rate: 41.2,
        },
        ..LandingPage::new("Fieldnote early access", "early-access", day(0))
    };
    page.sections = vec![
        Section {
            id: "section-hero".to_string(),
            kind: SectionKind::Hero,
            heading: "Stop losing insights in call recordings".to_string(),
            body: "Fieldnote turns customer interviews into a searchable library.".to_string(),
            content: serde_json::json!({ "ctaLabel": "Join the waitlist" }),
        },
        Section {
            id: "section-form".to_string(),
            kind: SectionKind::Form,
            heading: "Get early access".to_string(),
            body: String::new(),
            content: serde_json::json!({ "fields": ["email", "company"] }),
        },
    ];
    page.normalized()
}

fn demo_experiment() -> Experiment {
    let variant = |id: &str, name: &str, impressions: u64, conversions: u64| {
        let mut variant = Variant::new(id, name);
        variant.impressions = impressions;
        variant.conversions = conversions;
        variant
    };
    Experiment {
        id: "experiment-1".to_string(),
        name: "Hero headline".to_string(),
        hypothesis: "Naming the pain converts better than naming the feature.".to_string(),
        status: ExperimentStatus::Running,
        kind: ExperimentKind::Ab,
        target_id: Some("page-1".to_string()),
        variants: vec![
            variant("variant-1a", "Feature headline", 920, 41),
            variant("variant-1b", "Pain headline", 918, 56),
        ],
        traffic_split: vec![50, 50],
        winner: None,
        start_date: Some(day(7)),
        end_date: None,
        created_at: day(6),
    }
    .normalized()
}

fn response(id: &str, answers: &[(&str, Answer)], completed: i64) -> SurveyResponse {
    SurveyResponse {
        id: id.to_string(),
        answers: answers
            .iter()
            .map(|(question, answer)| (question.to_string(), answer.clone()))
            .collect::<BTreeMap<_, _>>(),
        respondent_email: None,
        completed_at: day(completed),
    }
}

fn demo_surveys() -> Vec<Survey> {
    let disappointment = |choice: &str| ("disappointment", Answer::Text(choice.to_string()));
    let benefit = |text: &str| ("main_benefit", Answer::Text(text.to_string()));

    let mut pmf = Survey {
        id: "survey-1".to_string(),
        status: SurveyStatus::Active,
        ..Survey::pmf("Sean Ellis PMF survey", day(2))
    };
    pmf.responses = vec![
        response("response-1", &[disappointment(VERY_DISAPPOINTED), benefit("Search")], 8),
        response("response-2", &[disappointment(VERY_DISAPPOINTED), benefit("Tagging")], 8),
        response("response-3", &[disappointment("Somewhat disappointed"), benefit("Transcripts")], 9),
        response("response-4", &[disappointment("Not disappointed"), benefit("Price")], 9),
        response("response-5", &[disappointment(VERY_DISAPPOINTED), benefit("Search")], 10),
    ];

    let nps = Survey {
        id: "survey-2".to_string(),
        title: "Quarterly NPS".to_string(),
        status: SurveyStatus::Active,
        kind: SurveyKind::Nps,
        questions: vec![Question::new(
            "recommend",
            "How likely are you to recommend Fieldnote to a colleague?",
            QuestionKind::Nps,
        )],
        responses: [10, 9, 9, 7, 4]
            .into_iter()
            .enumerate()
            .map(|(index, score)| {
                response(
                    &format!("response-{}", index + 6),
                    &[("recommend", Answer::Number(score))],
                    11,
                )
            })
            .collect(),
        created_at: day(4),
    };
    vec![pmf, nps]
}

fn demo_content() -> Vec<ContentPiece> {
    vec![
        ContentPiece {
            id: "content-1".to_string(),
            channel: Some("blog".to_string()),
            campaign_id: Some("campaign-1".to_string()),
            status: ContentStatus::Published,
            ..ContentPiece::draft(
                "What 40 customer interviews taught us",
                ContentKind::BlogPost,
                "We talked to forty product managers about how they run discovery...",
                day(5),
            )
        },
        ContentPiece {
            id: "content-2".to_string(),
            channel: Some("linkedin".to_string()),
            campaign_id: Some("campaign-1".to_string()),
            status: ContentStatus::Scheduled,
            ..ContentPiece::draft(
                "Your call recordings are a goldmine",
                ContentKind::SocialPost,
                "Most teams record every customer call and never listen again.",
                day(6),
            )
        },
    ]
}

fn demo_launch_plan() -> LaunchPlan {
    LaunchPlan {
        id: "plan-1".to_string(),
        name: "Public launch".to_string(),
        launch_date: day(30),
        phases: PhaseType::ALL
            .iter()
            .enumerate()
            .map(|(index, phase)| LaunchPhase {
                id: format!("phase-{}", index + 1),
                phase: *phase,
                name: phase.label().to_string(),
                starts_at: Some(day(16 + 7 * index as i64)),
            })
            .collect(),
        created_at: day(1),
    }
}

fn demo_queue(plan: &LaunchPlan) -> Vec<ContentQueueItem> {
    let item = |id: &str, phase: PhaseType, channel: &str, title: &str, status: QueueStatus| {
        ContentQueueItem::queued(
            plan,
            phase,
            QueuedContent {
                channel: channel.to_string(),
                title: title.to_string(),
                body: String::new(),
            },
        )
        .map(|item| ContentQueueItem {
            id: id.to_string(),
            status,
            approved_at: (status == QueueStatus::Approved).then(|| day(12)),
            ..item
        })
    };
    [
        item("queue-1", PhaseType::PreLaunch, "twitter", "Teaser thread", QueueStatus::Approved),
        item("queue-2", PhaseType::LaunchDay, "producthunt", "Product Hunt listing", QueueStatus::Queued),
        item("queue-3", PhaseType::LaunchDay, "email", "Launch announcement", QueueStatus::Queued),
        item("queue-4", PhaseType::Growth, "blog", "Launch retrospective", QueueStatus::Queued),
    ]
    .into_iter()
    .flatten()
    .collect()
}

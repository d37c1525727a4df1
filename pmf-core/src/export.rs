use std::borrow::Cow;

use crate::state::PmfState;

pub const LEADS_CSV_HEADER: &str = "name,email,company,phone,source,stage,score,tags,created_at";

/// One line per lead, in collection order. Tags are joined with `;`.
pub fn leads_csv(state: &PmfState) -> String {
    let mut csv = String::from(LEADS_CSV_HEADER);
    csv.push('\n');
    for lead in &state.leads {
        let score = lead.score.to_string();
        let tags = lead.tags.join(";");
        let created_at = lead.created_at.to_rfc3339();
        let fields = [
            lead.name.as_str(),
            lead.email.as_str(),
            lead.company.as_deref().unwrap_or_default(),
            lead.phone.as_deref().unwrap_or_default(),
            lead.source.as_str(),
            lead.stage.as_str(),
            score.as_str(),
            tags.as_str(),
            created_at.as_str(),
        ];
        let line = fields.map(escape).join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

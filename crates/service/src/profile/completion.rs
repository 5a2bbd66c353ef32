//! Weighted profile completeness. Every role's table sums to 100.

use models::profile;
use serde::Serialize;

struct Field {
    name: &'static str,
    weight: u8,
    required: bool,
    filled: fn(&profile::Model) -> bool,
}

fn has(v: &Option<String>) -> bool { v.as_deref().is_some_and(|s| !s.trim().is_empty()) }

const DEVELOPER_FIELDS: &[Field] = &[
    Field { name: "display_name", weight: 10, required: true, filled: |p| !p.display_name.trim().is_empty() },
    Field { name: "bio", weight: 10, required: true, filled: |p| has(&p.bio) },
    Field { name: "avatar_url", weight: 5, required: false, filled: |p| has(&p.avatar_url) },
    Field { name: "location", weight: 5, required: false, filled: |p| has(&p.location) },
    Field { name: "timezone", weight: 5, required: false, filled: |p| has(&p.timezone) },
    Field { name: "title", weight: 15, required: true, filled: |p| has(&p.title) },
    Field { name: "skills", weight: 20, required: true, filled: |p| !p.skill_list().is_empty() },
    Field { name: "hourly_rate", weight: 10, required: true, filled: |p| p.hourly_rate.is_some() },
    Field { name: "years_experience", weight: 5, required: false, filled: |p| p.years_experience.is_some() },
    Field { name: "availability", weight: 5, required: false, filled: |p| has(&p.availability) },
    Field { name: "github_url", weight: 5, required: false, filled: |p| has(&p.github_url) },
    Field { name: "portfolio_url", weight: 5, required: false, filled: |p| has(&p.portfolio_url) },
];

const CLIENT_FIELDS: &[Field] = &[
    Field { name: "display_name", weight: 15, required: true, filled: |p| !p.display_name.trim().is_empty() },
    Field { name: "bio", weight: 15, required: false, filled: |p| has(&p.bio) },
    Field { name: "avatar_url", weight: 10, required: false, filled: |p| has(&p.avatar_url) },
    Field { name: "location", weight: 10, required: false, filled: |p| has(&p.location) },
    Field { name: "timezone", weight: 5, required: false, filled: |p| has(&p.timezone) },
    Field { name: "website", weight: 5, required: false, filled: |p| has(&p.website) },
    Field { name: "company_name", weight: 20, required: true, filled: |p| has(&p.company_name) },
    Field { name: "company_size", weight: 5, required: false, filled: |p| has(&p.company_size) },
    Field { name: "industry", weight: 10, required: true, filled: |p| has(&p.industry) },
    Field { name: "company_website", weight: 5, required: false, filled: |p| has(&p.company_website) },
];

const ADMIN_FIELDS: &[Field] = &[
    Field { name: "display_name", weight: 30, required: true, filled: |p| !p.display_name.trim().is_empty() },
    Field { name: "bio", weight: 15, required: false, filled: |p| has(&p.bio) },
    Field { name: "avatar_url", weight: 15, required: false, filled: |p| has(&p.avatar_url) },
    Field { name: "location", weight: 10, required: false, filled: |p| has(&p.location) },
    Field { name: "timezone", weight: 10, required: false, filled: |p| has(&p.timezone) },
    Field { name: "department", weight: 20, required: true, filled: |p| has(&p.department) },
];

fn fields_for(profile: &profile::Model) -> &'static [Field] {
    match profile.role.as_str() {
        "developer" => DEVELOPER_FIELDS,
        "admin" => ADMIN_FIELDS,
        _ => CLIENT_FIELDS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub percentage: u8,
    pub completed_fields: Vec<&'static str>,
    pub missing_fields: Vec<&'static str>,
    pub missing_required: Vec<&'static str>,
    pub is_complete: bool,
}

pub fn compute_completion(profile: &profile::Model) -> CompletionReport {
    let mut report = CompletionReport {
        percentage: 0,
        completed_fields: Vec::new(),
        missing_fields: Vec::new(),
        missing_required: Vec::new(),
        is_complete: false,
    };
    let mut score: u32 = 0;
    for f in fields_for(profile) {
        if (f.filled)(profile) {
            score += u32::from(f.weight);
            report.completed_fields.push(f.name);
        } else {
            report.missing_fields.push(f.name);
            if f.required {
                report.missing_required.push(f.name);
            }
        }
    }
    report.percentage = score.min(100) as u8;
    report.is_complete = report.missing_required.is_empty();
    report
}

pub fn validate_required_fields(profile: &profile::Model) -> Vec<&'static str> {
    compute_completion(profile).missing_required
}


#[cfg(test)]
mod tests {
    use super::fixtures::blank;
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn weights_sum_to_one_hundred() {
        for table in [DEVELOPER_FIELDS, CLIENT_FIELDS, ADMIN_FIELDS] {
            assert_eq!(table.iter().map(|f| u32::from(f.weight)).sum::<u32>(), 100);
        }
    }

    #[test]
    fn developer_progress() {
        let mut p = blank("developer");
        let r = compute_completion(&p);
        assert_eq!(r.percentage, 10);
        assert_eq!(r.missing_required, vec!["bio", "title", "skills", "hourly_rate"]);
        assert!(!r.is_complete);

        p.bio = Some("Backend engineer".into());
        p.title = Some("Rust developer".into());
        p.skills = profile::skills_json(&["rust".to_string()]);
        p.hourly_rate = Some(Decimal::from(90));
        let r = compute_completion(&p);
        assert_eq!(r.percentage, 65);
        assert!(r.is_complete);
        assert!(validate_required_fields(&p).is_empty());
    }

    #[test]
    fn client_and_admin_tables() {
        let mut c = blank("client");
        c.company_name = Some("Acme".into());
        c.industry = Some("Retail".into());
        assert_eq!(compute_completion(&c).percentage, 45);
        assert!(compute_completion(&c).is_complete);

        let mut a = blank("admin");
        assert_eq!(validate_required_fields(&a), vec!["department"]);
        a.department = Some("Trust & Safety".into());
        a.bio = Some(" ".into());
        assert_eq!(compute_completion(&a).percentage, 50);
    }
}

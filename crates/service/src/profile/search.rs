//! Profile discovery: filtering, relevance, recommendations and trending.
//!
//! Scoring functions are pure and take `now` explicitly so the ranking is
//! deterministic under test. All scores fall in `0.0..=1.0`.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use models::{profile::{self, Availability}, user::UserRole};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::completion::compute_completion;
use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::repo::Repository;
use common::types::Page;

pub const RELEVANCE_NAME: f64 = 0.30;
pub const RELEVANCE_TITLE: f64 = 0.25;
pub const RELEVANCE_SKILLS: f64 = 0.25;
pub const RELEVANCE_BIO: f64 = 0.10;
pub const RELEVANCE_RATING: f64 = 0.10;

pub const RECOMMEND_SKILLS: f64 = 0.5;
pub const RECOMMEND_RATING: f64 = 0.3;
pub const RECOMMEND_EXPERIENCE: f64 = 0.1;
pub const RECOMMEND_COMPLETION: f64 = 0.1;
pub const EXPERIENCE_CAP_YEARS: f64 = 10.0;

pub const TRENDING_VIEWS: f64 = 0.4;
pub const TRENDING_RECENCY: f64 = 0.3;
pub const TRENDING_RATING: f64 = 0.2;
pub const TRENDING_JOBS: f64 = 0.1;
pub const RECENCY_WINDOW_DAYS: f64 = 30.0;
pub const COMPLETED_JOBS_CAP: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Rating,
    RateAsc,
    RateDesc,
    Experience,
    Newest,
    Trending,
}

/// Query-string shaped search request. `skills` is comma separated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub role: Option<UserRole>,
    pub skills: Option<String>,
    pub min_rate: Option<Decimal>,
    pub max_rate: Option<Decimal>,
    pub location: Option<String>,
    pub availability: Option<Availability>,
    pub min_rating: Option<f64>,
    pub min_experience: Option<i32>,
    pub sort: Option<SortBy>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Normalised filter handed to the repository. Text fields are lower-cased.
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub tenant_id: Uuid,
    pub role: UserRole,
    pub public_only: bool,
    pub text: Option<String>,
    pub skills: Vec<String>,
    pub min_rate: Option<Decimal>,
    pub max_rate: Option<Decimal>,
    pub location: Option<String>,
    pub availability: Option<Availability>,
    pub min_rating: Option<f64>,
    pub min_experience: Option<i32>,
}

fn lower_nonempty(s: &Option<String>) -> Option<String> {
    s.as_deref().map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty())
}

pub fn split_skills(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in raw.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

impl ProfileFilter {
    pub fn from_query(tenant_id: Uuid, q: &SearchQuery) -> Self {
        Self {
            tenant_id,
            role: q.role.unwrap_or(UserRole::Developer),
            public_only: true,
            text: lower_nonempty(&q.q),
            skills: q.skills.as_deref().map(split_skills).unwrap_or_default(),
            min_rate: q.min_rate,
            max_rate: q.max_rate,
            location: lower_nonempty(&q.location),
            availability: q.availability,
            min_rating: q.min_rating,
            min_experience: q.min_experience,
        }
    }

    /// Public developers of a tenant, no further narrowing.
    pub fn developers(tenant_id: Uuid) -> Self {
        Self::from_query(tenant_id, &SearchQuery::default())
    }

    pub fn matches(&self, p: &profile::Model) -> bool {
        if p.tenant_id != self.tenant_id || p.role != self.role.as_str() || (self.public_only && !p.is_public) {
            return false;
        }
        let skills: Vec<String> = p.skill_list().iter().map(|s| s.to_lowercase()).collect();
        if let Some(text) = &self.text {
            let hit = contains_ci(Some(&p.display_name), text)
                || contains_ci(p.title.as_deref(), text)
                || contains_ci(p.bio.as_deref(), text)
                || contains_ci(p.company_name.as_deref(), text)
                || skills.iter().any(|s| s.contains(text.as_str()))
                || text.split_whitespace().any(|t| skills.iter().any(|s| s == t));
            if !hit {
                return false;
            }
        }
        if !self.skills.is_empty() && !self.skills.iter().any(|s| skills.contains(s)) {
            return false;
        }
        if self.min_rate.is_some() || self.max_rate.is_some() {
            let Some(rate) = p.hourly_rate else { return false };
            if self.min_rate.is_some_and(|m| rate < m) || self.max_rate.is_some_and(|m| rate > m) {
                return false;
            }
        }
        if let Some(loc) = &self.location {
            if !contains_ci(p.location.as_deref(), loc) {
                return false;
            }
        }
        if let Some(a) = self.availability {
            if p.availability.as_deref() != Some(a.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if p.rating.map_or(true, |r| r < min) {
                return false;
            }
        }
        if let Some(min) = self.min_experience {
            if p.years_experience.map_or(true, |y| y < min) {
                return false;
            }
        }
        true
    }
}

fn rating_score(p: &profile::Model) -> f64 { (p.rating.unwrap_or(0.0) / 5.0).clamp(0.0, 1.0) }

/// 1.0 for a full-phrase hit, otherwise the share of query tokens found.
fn text_match(field: Option<&str>, query: &str, tokens: &[&str]) -> f64 {
    let Some(field) = field.map(str::to_lowercase) else { return 0.0 };
    if query.is_empty() || tokens.is_empty() {
        return 0.0;
    }
    if field.contains(query) {
        return 1.0;
    }
    tokens.iter().filter(|t| field.contains(**t)).count() as f64 / tokens.len() as f64
}

/// Share of `wanted` skills the profile lists (case-insensitive).
pub fn skill_overlap(p: &profile::Model, wanted: &[String]) -> f64 {
    if wanted.is_empty() {
        return 0.0;
    }
    let have: Vec<String> = p.skill_list().iter().map(|s| s.to_lowercase()).collect();
    wanted.iter().filter(|w| have.contains(&w.to_lowercase())).count() as f64 / wanted.len() as f64
}

pub fn relevance_score(p: &profile::Model, filter: &ProfileFilter) -> f64 {
    let query = filter.text.clone().unwrap_or_default();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let wanted: Vec<String> = if filter.skills.is_empty() {
        tokens.iter().map(|t| t.to_string()).collect()
    } else {
        filter.skills.clone()
    };
    let score = RELEVANCE_NAME * text_match(Some(&p.display_name), &query, &tokens)
        + RELEVANCE_TITLE * text_match(p.title.as_deref(), &query, &tokens)
        + RELEVANCE_SKILLS * skill_overlap(p, &wanted)
        + RELEVANCE_BIO * text_match(p.bio.as_deref(), &query, &tokens)
        + RELEVANCE_RATING * rating_score(p);
    round4(score)
}

pub fn recommendation_score(p: &profile::Model, skills: &[String]) -> f64 {
    let experience = f64::from(p.years_experience.unwrap_or(0).max(0)).min(EXPERIENCE_CAP_YEARS) / EXPERIENCE_CAP_YEARS;
    let completion = f64::from(compute_completion(p).percentage) / 100.0;
    round4(
        RECOMMEND_SKILLS * skill_overlap(p, skills)
            + RECOMMEND_RATING * rating_score(p)
            + RECOMMEND_EXPERIENCE * experience
            + RECOMMEND_COMPLETION * completion,
    )
}

/// `max_views` is the largest view count among the candidates.
pub fn trending_score(p: &profile::Model, max_views: i64, now: DateTime<FixedOffset>) -> f64 {
    let views = if max_views > 0 {
        (p.view_count.max(0) as f64).ln_1p() / (max_views as f64).ln_1p()
    } else {
        0.0
    };
    let age_days = (now - p.updated_at).num_seconds().max(0) as f64 / 86_400.0;
    let recency = (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0);
    let jobs = f64::from(p.completed_jobs.max(0)).min(COMPLETED_JOBS_CAP) / COMPLETED_JOBS_CAP;
    round4(TRENDING_VIEWS * views + TRENDING_RECENCY * recency + TRENDING_RATING * rating_score(p) + TRENDING_JOBS * jobs)
}

fn round4(v: f64) -> f64 { (v * 10_000.0).round() / 10_000.0 }

#[derive(Debug, Clone, Serialize)]
pub struct ScoredProfile {
    pub profile: profile::Model,
    pub score: f64,
}

fn desc_f64(a: f64, b: f64) -> Ordering { b.partial_cmp(&a).unwrap_or(Ordering::Equal) }

fn rate(p: &profile::Model) -> Option<f64> { p.hourly_rate.and_then(|r| r.to_f64()) }

/// `None` values sort last regardless of direction.
fn opt_cmp(a: Option<f64>, b: Option<f64>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if ascending => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => desc_f64(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_results(results: &mut [ScoredProfile], sort: SortBy) {
    results.sort_by(|a, b| {
        let (pa, pb) = (&a.profile, &b.profile);
        let primary = match sort {
            SortBy::Relevance | SortBy::Trending => desc_f64(a.score, b.score),
            SortBy::Rating => opt_cmp(pa.rating, pb.rating, false),
            SortBy::RateAsc => opt_cmp(rate(pa), rate(pb), true),
            SortBy::RateDesc => opt_cmp(rate(pa), rate(pb), false),
            SortBy::Experience => opt_cmp(pa.years_experience.map(f64::from), pb.years_experience.map(f64::from), false),
            SortBy::Newest => pb.created_at.cmp(&pa.created_at),
        };
        primary.then_with(|| pa.id.cmp(&pb.id))
    });
}

pub fn score_all(candidates: Vec<profile::Model>, filter: &ProfileFilter, sort: SortBy, now: DateTime<FixedOffset>) -> Vec<ScoredProfile> {
    let max_views = candidates.iter().map(|p| p.view_count).max().unwrap_or(0);
    let mut scored: Vec<_> = candidates
        .into_iter()
        .map(|p| {
            let score = match sort {
                SortBy::Trending => trending_score(&p, max_views, now),
                _ => relevance_score(&p, filter),
            };
            ScoredProfile { profile: p, score }
        })
        .collect();
    sort_results(&mut scored, sort);
    scored
}

pub struct SearchService {
    repo: Arc<dyn Repository>,
}

impl SearchService {
    pub fn new(repo: Arc<dyn Repository>) -> Self { Self { repo } }

    pub async fn search(&self, actor: &Actor, query: SearchQuery) -> Result<Page<ScoredProfile>, ServiceError> {
        if let (Some(min), Some(max)) = (query.min_rate, query.max_rate) {
            if min > max {
                return Err(ServiceError::Validation("min_rate must not exceed max_rate".into()));
            }
        }
        let filter = ProfileFilter::from_query(actor.tenant_id, &query);
        let candidates = self.repo.search_profiles(&filter).await?;
        debug!(candidates = candidates.len(), "profile_search");
        let sort = query.sort.unwrap_or_default();
        let scored = score_all(candidates, &filter, sort, Utc::now().into());
        let p = Pagination { page: query.page.unwrap_or(1), per_page: query.per_page.unwrap_or(20) };
        Ok(p.paginate(scored))
    }

    /// Developers best matching `skills`; profiles sharing none of them are left out.
    pub async fn recommend(&self, actor: &Actor, skills: &[String], limit: usize) -> Result<Vec<ScoredProfile>, ServiceError> {
        let wanted: Vec<String> = skills.iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect();
        if wanted.is_empty() {
            return Err(ServiceError::Validation("at least one skill is required".into()));
        }
        let mut filter = ProfileFilter::developers(actor.tenant_id);
        filter.skills = wanted.clone();
        let mut scored: Vec<_> = self
            .repo
            .search_profiles(&filter)
            .await?
            .into_iter()
            .filter(|p| p.user_id != actor.user_id)
            .map(|p| {
                let score = recommendation_score(&p, &wanted);
                ScoredProfile { profile: p, score }
            })
            .collect();
        sort_results(&mut scored, SortBy::Relevance);
        scored.truncate(limit.clamp(1, 100));
        Ok(scored)
    }

    pub async fn trending(&self, actor: &Actor, limit: usize) -> Result<Vec<ScoredProfile>, ServiceError> {
        let filter = ProfileFilter::developers(actor.tenant_id);
        let candidates = self.repo.search_profiles(&filter).await?;
        let mut scored = score_all(candidates, &filter, SortBy::Trending, Utc::now().into());
        scored.truncate(limit.clamp(1, 100));
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::completion::fixtures::blank;
    use chrono::Duration;

    fn dev(tenant_id: Uuid, name: &str, skills: &[&str], rating: Option<f64>) -> profile::Model {
        let mut p = blank("developer");
        p.tenant_id = tenant_id;
        p.display_name = name.into();
        p.skills = profile::skills_json(&skills.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        p.rating = rating;
        p
    }

    #[test]
    fn filter_matches_text_skills_and_bounds() {
        let tid = Uuid::new_v4();
        let mut p = dev(tid, "Ada Lovelace", &["Rust", "Postgres"], Some(4.5));
        p.hourly_rate = Some(Decimal::from(80));
        p.location = Some("Berlin, DE".into());

        let q = SearchQuery { q: Some("ada".into()), skills: Some("rust, go".into()), location: Some("berlin".into()), ..Default::default() };
        assert!(ProfileFilter::from_query(tid, &q).matches(&p));

        let pricey = SearchQuery { max_rate: Some(Decimal::from(50)), ..Default::default() };
        assert!(!ProfileFilter::from_query(tid, &pricey).matches(&p));
        let other_tenant = ProfileFilter::from_query(Uuid::new_v4(), &SearchQuery::default());
        assert!(!other_tenant.matches(&p));
        p.is_public = false;
        assert!(!ProfileFilter::from_query(tid, &SearchQuery::default()).matches(&p));
    }

    #[test]
    fn relevance_weights_name_over_bio() {
        let tid = Uuid::new_v4();
        let by_name = dev(tid, "Rust Wizard", &[], None);
        let mut by_bio = dev(tid, "Someone", &[], None);
        by_bio.bio = Some("I write rust".into());
        let filter = ProfileFilter::from_query(tid, &SearchQuery { q: Some("rust".into()), ..Default::default() });
        assert_eq!(relevance_score(&by_name, &filter), 0.30);
        assert_eq!(relevance_score(&by_bio, &filter), 0.10);

        let full = dev(tid, "Rust", &["rust"], Some(5.0));
        assert_eq!(relevance_score(&full, &filter), 0.65);
    }

    #[test]
    fn recommendation_and_trending_scores_are_bounded() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut p = dev(Uuid::new_v4(), "Ada", &["rust", "go"], Some(5.0));
        p.years_experience = Some(25);
        let s = recommendation_score(&p, &["rust".into(), "go".into()]);
        assert!(s > 0.9 && s <= 1.0, "{s}");

        p.view_count = 100;
        p.completed_jobs = 80;
        p.updated_at = now;
        assert_eq!(trending_score(&p, 100, now), 1.0);
        p.updated_at = now - Duration::days(45);
        assert_eq!(trending_score(&p, 100, now), 0.7);
        assert_eq!(trending_score(&p, 0, now), 0.3);
    }

    #[test]
    fn sorts_are_stable_and_put_missing_values_last() {
        let tid = Uuid::new_v4();
        let mut a = dev(tid, "A", &[], Some(3.0));
        a.hourly_rate = Some(Decimal::from(40));
        let mut b = dev(tid, "B", &[], None);
        b.hourly_rate = None;
        let mut c = dev(tid, "C", &[], Some(4.0));
        c.hourly_rate = Some(Decimal::from(20));
        let mk = |v: Vec<&profile::Model>| v.into_iter().map(|p| ScoredProfile { profile: p.clone(), score: 0.5 }).collect::<Vec<_>>();

        let mut r = mk(vec![&a, &b, &c]);
        sort_results(&mut r, SortBy::RateAsc);
        assert_eq!(r.iter().map(|s| s.profile.display_name.as_str()).collect::<Vec<_>>(), ["C", "A", "B"]);
        sort_results(&mut r, SortBy::Rating);
        assert_eq!(r.iter().map(|s| s.profile.display_name.as_str()).collect::<Vec<_>>(), ["C", "A", "B"]);
        sort_results(&mut r, SortBy::RateDesc);
        assert_eq!(r[0].profile.display_name, "A");

        let mut ids = mk(vec![&a, &b, &c]);
        sort_results(&mut ids, SortBy::Relevance);
        let mut expected: Vec<Uuid> = vec![a.id, b.id, c.id];
        expected.sort();
        assert_eq!(ids.iter().map(|s| s.profile.id).collect::<Vec<_>>(), expected);
    }
}

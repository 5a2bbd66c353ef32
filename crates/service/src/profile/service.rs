use std::sync::Arc;

use chrono::Utc;
use models::{profile, user::UserRole};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::completion::{compute_completion, CompletionReport};
use super::domain::{CreateProfileInput, ProfileDetails, UpdateProfileInput};
use super::sanitize::{self, optional_host_url, optional_text, optional_url, required_text};
use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::repo::Repository;
use crate::storage::{StorageService, StoredFile};

pub struct ProfileService {
    repo: Arc<dyn Repository>,
    storage: Arc<StorageService>,
}

fn apply_text(target: &mut Option<String>, field: &str, value: Option<String>, max: usize) -> Result<(), ServiceError> {
    if let Some(v) = value {
        *target = optional_text(field, &v, max)?;
    }
    Ok(())
}

fn apply_url(target: &mut Option<String>, field: &str, value: Option<String>, host: Option<&str>) -> Result<(), ServiceError> {
    if let Some(v) = value {
        *target = match host {
            Some(domain) => optional_host_url(field, &v, domain)?,
            None => optional_url(field, &v)?,
        };
    }
    Ok(())
}

/// Merge role-specific fields into the record; `None` leaves a field untouched.
fn apply_details(p: &mut profile::Model, details: ProfileDetails) -> Result<(), ServiceError> {
    match details {
        ProfileDetails::Developer { title, skills, hourly_rate, years_experience, availability, github_url, linkedin_url, portfolio_url } => {
            apply_text(&mut p.title, "title", title, sanitize::TITLE_MAX)?;
            if let Some(skills) = skills {
                p.skills = profile::skills_json(&sanitize::clean_skills(&skills)?);
            }
            if let Some(rate) = hourly_rate {
                p.hourly_rate = Some(sanitize::hourly_rate(rate)?);
            }
            if let Some(years) = years_experience {
                p.years_experience = Some(sanitize::years_experience(years)?);
            }
            if let Some(a) = availability {
                p.availability = Some(a.as_str().to_string());
            }
            apply_url(&mut p.github_url, "github_url", github_url, Some("github.com"))?;
            apply_url(&mut p.linkedin_url, "linkedin_url", linkedin_url, Some("linkedin.com"))?;
            apply_url(&mut p.portfolio_url, "portfolio_url", portfolio_url, None)?;
        }
        ProfileDetails::Client { company_name, company_size, industry, company_website } => {
            apply_text(&mut p.company_name, "company_name", company_name, sanitize::TEXT_MAX)?;
            apply_text(&mut p.company_size, "company_size", company_size, sanitize::TEXT_MAX)?;
            apply_text(&mut p.industry, "industry", industry, sanitize::TEXT_MAX)?;
            apply_url(&mut p.company_website, "company_website", company_website, None)?;
        }
        ProfileDetails::Admin { department } => {
            apply_text(&mut p.department, "department", department, sanitize::TEXT_MAX)?;
        }
    }
    Ok(())
}

fn check_role(details: &Option<ProfileDetails>, role: UserRole) -> Result<(), ServiceError> {
    match details {
        Some(d) if d.role() != role => Err(ServiceError::Validation(format!(
            "profile details for {} do not match account role {role}",
            d.role()
        ))),
        _ => Ok(()),
    }
}

impl ProfileService {
    pub fn new(repo: Arc<dyn Repository>, storage: Arc<StorageService>) -> Self { Self { repo, storage } }

    fn require_owner_or_admin(actor: &Actor, p: &profile::Model) -> Result<(), ServiceError> {
        if actor.user_id == p.user_id || actor.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("only the owner or an admin can change this profile"))
        }
    }

    async fn load(&self, actor: &Actor, user_id: Uuid) -> Result<profile::Model, ServiceError> {
        let p = self.repo.find_profile_by_user(user_id).await?.ok_or_else(|| ServiceError::not_found("profile"))?;
        actor.ensure_tenant(p.tenant_id, "profile")?;
        Ok(p)
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn create_profile(&self, actor: &Actor, input: CreateProfileInput) -> Result<profile::Model, ServiceError> {
        if self.repo.find_profile_by_user(actor.user_id).await?.is_some() {
            return Err(ServiceError::Validation("Profile already exists".into()));
        }
        check_role(&input.details, actor.role)?;

        let now = Utc::now().into();
        let mut p = profile::Model {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            tenant_id: actor.tenant_id,
            role: actor.role.as_str().to_string(),
            display_name: required_text("display_name", &input.display_name, sanitize::DISPLAY_NAME_MAX)?,
            bio: None,
            avatar_url: None,
            location: None,
            timezone: None,
            website: None,
            is_public: input.is_public.unwrap_or(true),
            title: None,
            skills: profile::skills_json(&[]),
            hourly_rate: None,
            years_experience: None,
            availability: None,
            github_url: None,
            linkedin_url: None,
            portfolio_url: None,
            company_name: None,
            company_size: None,
            industry: None,
            company_website: None,
            department: None,
            rating: None,
            completed_jobs: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        apply_text(&mut p.bio, "bio", input.bio, sanitize::BIO_MAX)?;
        apply_text(&mut p.location, "location", input.location, sanitize::TEXT_MAX)?;
        apply_text(&mut p.timezone, "timezone", input.timezone, sanitize::TEXT_MAX)?;
        apply_url(&mut p.website, "website", input.website, None)?;
        if let Some(details) = input.details {
            apply_details(&mut p, details)?;
        }

        let saved = self.repo.insert_profile(p).await?;
        info!(profile_id = %saved.id, role = %saved.role, "profile_created");
        Ok(saved)
    }

    /// Private profiles are visible to their owner and admins only; everyone else gets 404.
    pub async fn get_profile(&self, actor: &Actor, user_id: Uuid) -> Result<profile::Model, ServiceError> {
        let mut p = self.load(actor, user_id).await?;
        let is_owner = actor.user_id == p.user_id;
        if !(is_owner || actor.is_admin() || p.is_public) {
            return Err(ServiceError::not_found("profile"));
        }
        if !is_owner {
            if let Err(e) = self.repo.increment_view_count(p.id).await {
                warn!(profile_id = %p.id, error = %e, "view_count_update_failed");
            } else {
                p.view_count += 1;
            }
        }
        Ok(p)
    }

    pub async fn get_own_profile(&self, actor: &Actor) -> Result<profile::Model, ServiceError> {
        self.load(actor, actor.user_id).await
    }

    #[instrument(skip(self, patch), fields(actor = %actor.user_id))]
    pub async fn update_profile(&self, actor: &Actor, user_id: Uuid, patch: UpdateProfileInput) -> Result<profile::Model, ServiceError> {
        let mut p = self.load(actor, user_id).await?;
        Self::require_owner_or_admin(actor, &p)?;
        check_role(&patch.details, p.role()?)?;

        if let Some(name) = patch.display_name {
            p.display_name = required_text("display_name", &name, sanitize::DISPLAY_NAME_MAX)?;
        }
        apply_text(&mut p.bio, "bio", patch.bio, sanitize::BIO_MAX)?;
        apply_text(&mut p.location, "location", patch.location, sanitize::TEXT_MAX)?;
        apply_text(&mut p.timezone, "timezone", patch.timezone, sanitize::TEXT_MAX)?;
        apply_url(&mut p.website, "website", patch.website, None)?;
        if let Some(public) = patch.is_public {
            p.is_public = public;
        }
        if let Some(details) = patch.details {
            apply_details(&mut p, details)?;
        }
        p.updated_at = Utc::now().into();
        let saved = self.repo.update_profile(p).await?;
        info!(profile_id = %saved.id, "profile_updated");
        Ok(saved)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_profile(&self, actor: &Actor, user_id: Uuid) -> Result<(), ServiceError> {
        let p = self.load(actor, user_id).await?;
        Self::require_owner_or_admin(actor, &p)?;
        self.repo.delete_profile_by_user(user_id).await?;
        info!(profile_id = %p.id, "profile_deleted");
        Ok(())
    }

    pub async fn completion(&self, actor: &Actor) -> Result<CompletionReport, ServiceError> {
        Ok(compute_completion(&self.get_own_profile(actor).await?))
    }

    #[instrument(skip(self, bytes), fields(actor = %actor.user_id, size = bytes.len()))]
    pub async fn upload_avatar(&self, actor: &Actor, bytes: &[u8], content_type: &str) -> Result<(profile::Model, StoredFile), ServiceError> {
        let mut p = self.get_own_profile(actor).await?;
        let stored = self.storage.store_avatar(actor.user_id, bytes, content_type).await?;
        let previous = p.avatar_url.replace(stored.url.clone());
        p.updated_at = Utc::now().into();
        let saved = self.repo.update_profile(p).await?;
        if let Some(old_key) = previous.as_deref().and_then(|url| self.storage.key_for_url(url)) {
            if let Err(e) = self.storage.remove(&old_key).await {
                warn!(key = %old_key, error = %e, "old_avatar_cleanup_failed");
            }
        }
        Ok((saved, stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalFileStorage;
    use crate::test_support::Marketplace;
    use rust_decimal::Decimal;

    fn service(mp: &Marketplace) -> ProfileService {
        let root = std::env::temp_dir().join(format!("gigboard_profiles_{}", Uuid::new_v4()));
        let backend = Arc::new(LocalFileStorage::new(root, "/files"));
        ProfileService::new(mp.repo.clone(), Arc::new(StorageService::new(backend, 1024)))
    }

    fn dev_input() -> CreateProfileInput {
        CreateProfileInput {
            display_name: " <b>Ada</b>  Lovelace ".into(),
            bio: Some("Systems programmer".into()),
            location: Some("London".into()),
            timezone: None,
            website: Some("https://ada.dev".into()),
            is_public: None,
            details: Some(ProfileDetails::Developer {
                title: Some("Rust engineer".into()),
                skills: Some(vec!["Rust".into(), "rust".into(), "SQL".into()]),
                hourly_rate: Some(Decimal::from(120)),
                years_experience: Some(8),
                availability: None,
                github_url: Some("https://github.com/ada".into()),
                linkedin_url: None,
                portfolio_url: None,
            }),
        }
    }

    #[tokio::test]
    async fn create_sanitizes_and_rejects_duplicates() {
        let mp = Marketplace::new().await;
        let svc = service(&mp);
        let p = svc.create_profile(&mp.developer, dev_input()).await.unwrap();
        assert_eq!(p.display_name, "Ada Lovelace");
        assert_eq!(p.skill_list(), vec!["Rust", "SQL"]);
        assert_eq!(p.role, "developer");

        let err = svc.create_profile(&mp.developer, dev_input()).await.unwrap_err();
        assert_eq!(err.detail(), "Profile already exists");
    }

    #[tokio::test]
    async fn details_must_match_role() {
        let mp = Marketplace::new().await;
        let svc = service(&mp);
        let err = svc.create_profile(&mp.client, dev_input()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let mut bad_url = dev_input();
        bad_url.details = Some(ProfileDetails::Developer {
            title: None,
            skills: None,
            hourly_rate: None,
            years_experience: None,
            availability: None,
            github_url: Some("https://gitlab.com/ada".into()),
            linkedin_url: None,
            portfolio_url: None,
        });
        assert!(svc.create_profile(&mp.developer, bad_url).await.is_err());
    }

    #[tokio::test]
    async fn visibility_and_view_counting() {
        let mp = Marketplace::new().await;
        let svc = service(&mp);
        let mut input = dev_input();
        input.is_public = Some(false);
        svc.create_profile(&mp.developer, input).await.unwrap();

        let hidden = svc.get_profile(&mp.client, mp.developer.user_id).await;
        assert!(matches!(hidden, Err(ServiceError::NotFound(_))));
        let own = svc.get_profile(&mp.developer, mp.developer.user_id).await.unwrap();
        assert_eq!(own.view_count, 0);
        let seen = svc.get_profile(&mp.admin, mp.developer.user_id).await.unwrap();
        assert_eq!(seen.view_count, 1);

        let patch = UpdateProfileInput { is_public: Some(true), bio: Some("".into()), ..Default::default() };
        let updated = svc.update_profile(&mp.developer, mp.developer.user_id, patch).await.unwrap();
        assert!(updated.bio.is_none());
        assert!(svc.get_profile(&mp.client, mp.developer.user_id).await.is_ok());
    }

    #[tokio::test]
    async fn only_owner_or_admin_mutates() {
        let mp = Marketplace::new().await;
        let svc = service(&mp);
        svc.create_profile(&mp.developer, dev_input()).await.unwrap();
        let patch = UpdateProfileInput { display_name: Some("Mallory".into()), ..Default::default() };
        assert!(matches!(
            svc.update_profile(&mp.other_developer, mp.developer.user_id, patch).await,
            Err(ServiceError::Forbidden(_))
        ));
        svc.delete_profile(&mp.admin, mp.developer.user_id).await.unwrap();
        assert!(matches!(svc.get_own_profile(&mp.developer).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn avatar_upload_sets_url_and_completion_rises() {
        let mp = Marketplace::new().await;
        let svc = service(&mp);
        svc.create_profile(&mp.developer, dev_input()).await.unwrap();
        let before = svc.completion(&mp.developer).await.unwrap().percentage;

        let (p, stored) = svc.upload_avatar(&mp.developer, b"\x89PNG....", "image/png").await.unwrap();
        assert!(stored.key.starts_with(&format!("avatars/{}/", mp.developer.user_id)));
        assert_eq!(p.avatar_url.as_deref(), Some(stored.url.as_str()));
        assert_eq!(svc.completion(&mp.developer).await.unwrap().percentage, before + 5);

        let too_big = vec![0u8; 2048];
        assert!(svc.upload_avatar(&mp.developer, &too_big, "image/png").await.is_err());
        assert!(svc.upload_avatar(&mp.developer, b"GIF89a", "text/html").await.is_err());
    }
}

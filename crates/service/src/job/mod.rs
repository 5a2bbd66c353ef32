//! Jobs own budgets: a client posts a job and assigns a developer to it.

use std::sync::Arc;

use chrono::Utc;
use models::{job::{self, JobStatus}, user::UserRole};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::repo::{JobFilter, Repository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDeveloperInput {
    pub developer_id: Uuid,
}

pub struct JobService {
    repo: Arc<dyn Repository>,
}

impl JobService {
    pub fn new(repo: Arc<dyn Repository>) -> Self { Self { repo } }

    #[instrument(skip(self, input), fields(actor = %actor.user_id))]
    pub async fn create_job(&self, actor: &Actor, input: CreateJobInput) -> Result<job::Model, ServiceError> {
        if actor.role != UserRole::Client {
            return Err(ServiceError::forbidden("only clients can post jobs"));
        }
        job::validate_title(&input.title)?;
        let now = Utc::now().into();
        let saved = self
            .repo
            .insert_job(job::Model {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                client_id: actor.user_id,
                developer_id: None,
                title: input.title.trim().to_string(),
                description: input.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
                status: JobStatus::Open.as_str().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(job_id = %saved.id, "job_created");
        Ok(saved)
    }

    pub async fn get_job(&self, actor: &Actor, job_id: Uuid) -> Result<job::Model, ServiceError> {
        let job = self.repo.find_job(job_id).await?.ok_or_else(|| ServiceError::not_found("job"))?;
        actor.ensure_tenant(job.tenant_id, "job")?;
        Ok(job)
    }

    /// Admins see the tenant, clients their postings, developers their assignments.
    pub async fn list_jobs(&self, actor: &Actor) -> Result<Vec<job::Model>, ServiceError> {
        let filter = match actor.role {
            UserRole::Admin => JobFilter::default(),
            UserRole::Client => JobFilter { client_id: Some(actor.user_id), developer_id: None },
            UserRole::Developer => JobFilter { client_id: None, developer_id: Some(actor.user_id) },
        };
        self.repo.list_jobs(actor.tenant_id, &filter).await
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn assign_developer(&self, actor: &Actor, job_id: Uuid, developer_id: Uuid) -> Result<job::Model, ServiceError> {
        let mut job = self.get_job(actor, job_id).await?;
        if !(actor.is_admin() || job.client_id == actor.user_id) {
            return Err(ServiceError::forbidden("only the job's client or an admin can assign developers"));
        }
        let status: JobStatus = job.status.parse()?;
        if matches!(status, JobStatus::Completed | JobStatus::Cancelled) {
            return Err(ServiceError::Validation(format!("Job is {status}")));
        }
        let dev = self
            .repo
            .find_user(developer_id)
            .await?
            .filter(|u| u.tenant_id == actor.tenant_id)
            .ok_or_else(|| ServiceError::not_found("developer"))?;
        if dev.role()? != UserRole::Developer {
            return Err(ServiceError::Validation("Assigned user must be a developer".into()));
        }
        job.developer_id = Some(dev.id);
        job.status = JobStatus::InProgress.as_str().to_string();
        job.updated_at = Utc::now().into();
        let saved = self.repo.update_job(job).await?;
        info!(job_id = %saved.id, developer_id = %dev.id, "developer_assigned");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Marketplace;

    #[tokio::test]
    async fn client_posts_and_assigns() {
        let mp = Marketplace::new().await;
        let svc = JobService::new(mp.repo.clone());
        let job = svc.create_job(&mp.client, CreateJobInput { title: "  Landing page ".into(), description: None }).await.unwrap();
        assert_eq!(job.title, "Landing page");
        assert_eq!(job.status, "open");

        let err = svc.assign_developer(&mp.client, job.id, mp.admin.user_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let assigned = svc.assign_developer(&mp.client, job.id, mp.other_developer.user_id).await.unwrap();
        assert_eq!(assigned.developer_id, Some(mp.other_developer.user_id));
        assert_eq!(assigned.status, "in_progress");

        assert_eq!(svc.list_jobs(&mp.other_developer).await.unwrap().len(), 1);
        assert_eq!(svc.list_jobs(&mp.client).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn developers_cannot_post_or_assign() {
        let mp = Marketplace::new().await;
        let svc = JobService::new(mp.repo.clone());
        assert!(matches!(
            svc.create_job(&mp.developer, CreateJobInput { title: "x".into(), description: None }).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.assign_developer(&mp.developer, mp.job.id, mp.developer.user_id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}

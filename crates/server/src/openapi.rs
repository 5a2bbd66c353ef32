//! OpenAPI document. Request bodies are described by doc-only schema structs so
//! the service crate stays free of `utoipa`.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub version: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub password: String,
    /// `client` or `developer`.
    pub role: String,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub tenant_id: Uuid, pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct CreateJobRequest { pub title: String, pub description: Option<String> }

#[derive(ToSchema)]
pub struct AssignDeveloperRequest { pub developer_id: Uuid }

#[derive(ToSchema)]
pub struct MilestoneRequest {
    pub title: String,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

#[derive(ToSchema)]
pub struct CreateBudgetRequest {
    pub job_id: Uuid,
    /// `FIXED`, `HOURLY`, `MILESTONE` or `HYBRID`.
    pub budget_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub hourly_rate: Option<Decimal>,
    pub estimated_hours: Option<Decimal>,
    pub description: Option<String>,
    pub milestones: Vec<MilestoneRequest>,
}

#[derive(ToSchema)]
pub struct UpdateBudgetRequest {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub estimated_hours: Option<Decimal>,
}

#[derive(ToSchema)]
pub struct StatusRequest { pub status: String }

#[derive(ToSchema)]
pub struct MilestoneStatusRequest { pub status: String, pub notes: Option<String> }

#[derive(ToSchema)]
pub struct ProcessPaymentRequest {
    pub milestone_id: Uuid,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub notes: Option<String>,
}

#[derive(ToSchema)]
pub struct ExchangeRateRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub effective_date: Option<DateTime<FixedOffset>>,
    pub expiry_date: Option<DateTime<FixedOffset>>,
}

#[derive(ToSchema)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub website: Option<String>,
    pub is_public: Option<bool>,
    /// Role specific fields, tagged by `role`.
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::jobs::create,
        crate::routes::jobs::list,
        crate::routes::jobs::get,
        crate::routes::jobs::assign_developer,
        crate::routes::budgets::create,
        crate::routes::budgets::list,
        crate::routes::budgets::get,
        crate::routes::budgets::get_for_job,
        crate::routes::budgets::update,
        crate::routes::budgets::update_status,
        crate::routes::budgets::delete,
        crate::routes::budgets::metrics,
        crate::routes::budgets::add_milestone,
        crate::routes::budgets::update_milestone,
        crate::routes::budgets::delete_milestone,
        crate::routes::budgets::update_milestone_status,
        crate::routes::payments::process,
        crate::routes::payments::list_for_budget,
        crate::routes::payments::update_status,
        crate::routes::currencies::list,
        crate::routes::currencies::validate,
        crate::routes::currencies::convert,
        crate::routes::currencies::list_rates,
        crate::routes::currencies::upsert_rate,
        crate::routes::profiles::create,
        crate::routes::profiles::get_own,
        crate::routes::profiles::completion,
        crate::routes::profiles::upload_avatar,
        crate::routes::profiles::get,
        crate::routes::profiles::update,
        crate::routes::profiles::delete,
        crate::routes::search::profiles,
        crate::routes::search::recommendations,
        crate::routes::search::trending,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            CreateJobRequest,
            AssignDeveloperRequest,
            MilestoneRequest,
            CreateBudgetRequest,
            UpdateBudgetRequest,
            StatusRequest,
            MilestoneStatusRequest,
            ProcessPaymentRequest,
            ExchangeRateRequest,
            ProfileRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "jobs"),
        (name = "budgets"),
        (name = "milestones"),
        (name = "payments"),
        (name = "currencies"),
        (name = "profiles"),
        (name = "search")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/budgets", "/budgets/{id}", "/payments", "/currencies/convert", "/search/profiles"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub website: Option<String>,
    pub is_public: bool,
    // developer
    pub title: Option<String>,
    pub skills: Json,
    pub hourly_rate: Option<Decimal>,
    pub years_experience: Option<i32>,
    pub availability: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    // client
    pub company_name: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub company_website: Option<String>,
    // admin
    pub department: Option<String>,
    // marketplace stats
    pub rating: Option<f64>,
    pub completed_jobs: i32,
    pub view_count: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    PartTime,
    Busy,
    Unavailable,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::PartTime => "part_time",
            Availability::Busy => "busy",
            Availability::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Availability {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Availability::Available),
            "part_time" => Ok(Availability::PartTime),
            "busy" => Ok(Availability::Busy),
            "unavailable" => Ok(Availability::Unavailable),
            other => Err(errors::ModelError::Validation(format!("unknown availability: {other}"))),
        }
    }
}

impl Model {
    /// Skills stored in the JSON column; non-string entries are ignored.
    pub fn skill_list(&self) -> Vec<String> {
        match &self.skills {
            Json::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn role(&self) -> Result<user::UserRole, errors::ModelError> { self.role.parse() }
}

/// Encode a skill list for the JSON column.
pub fn skills_json(skills: &[String]) -> Json {
    Json::Array(skills.iter().cloned().map(Json::String).collect())
}

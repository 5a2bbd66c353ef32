use models::{profile::Availability, user::UserRole};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fields that only make sense for one role. The `role` tag must match the account's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProfileDetails {
    Developer {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        skills: Option<Vec<String>>,
        #[serde(default)]
        hourly_rate: Option<Decimal>,
        #[serde(default)]
        years_experience: Option<i32>,
        #[serde(default)]
        availability: Option<Availability>,
        #[serde(default)]
        github_url: Option<String>,
        #[serde(default)]
        linkedin_url: Option<String>,
        #[serde(default)]
        portfolio_url: Option<String>,
    },
    Client {
        #[serde(default)]
        company_name: Option<String>,
        #[serde(default)]
        company_size: Option<String>,
        #[serde(default)]
        industry: Option<String>,
        #[serde(default)]
        company_website: Option<String>,
    },
    Admin {
        #[serde(default)]
        department: Option<String>,
    },
}

impl ProfileDetails {
    pub fn role(&self) -> UserRole {
        match self {
            ProfileDetails::Developer { .. } => UserRole::Developer,
            ProfileDetails::Client { .. } => UserRole::Client,
            ProfileDetails::Admin { .. } => UserRole::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileInput {
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub details: Option<ProfileDetails>,
}

/// Merge patch: `None` keeps the stored value, an empty string clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub website: Option<String>,
    pub is_public: Option<bool>,
    pub details: Option<ProfileDetails>,
}

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{budget, errors};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "milestone")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub budget_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub percentage: Decimal,
    pub status: String,
    pub due_date: Option<Date>,
    pub position: i32,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Budget }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Budget => Entity::belongs_to(budget::Entity)
                .from(Column::BudgetId)
                .to(budget::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    UnderReview,
    Completed,
    Cancelled,
    OnHold,
}

impl MilestoneStatus {
    pub const ALL: [MilestoneStatus; 6] = [
        MilestoneStatus::Pending,
        MilestoneStatus::InProgress,
        MilestoneStatus::UnderReview,
        MilestoneStatus::Completed,
        MilestoneStatus::Cancelled,
        MilestoneStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "PENDING",
            MilestoneStatus::InProgress => "IN_PROGRESS",
            MilestoneStatus::UnderReview => "UNDER_REVIEW",
            MilestoneStatus::Completed => "COMPLETED",
            MilestoneStatus::Cancelled => "CANCELLED",
            MilestoneStatus::OnHold => "ON_HOLD",
        }
    }

    /// Closed transition table; anything not listed is rejected.
    pub fn allowed_transitions(&self) -> &'static [MilestoneStatus] {
        use MilestoneStatus::*;
        match self {
            Pending => &[InProgress, Cancelled, OnHold],
            InProgress => &[UnderReview, Cancelled, OnHold],
            UnderReview => &[Completed, InProgress, Cancelled],
            Completed => &[UnderReview],
            Cancelled => &[Pending],
            OnHold => &[Pending, Cancelled],
        }
    }

    pub fn can_transition_to(&self, next: MilestoneStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for MilestoneStatus {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MilestoneStatus::Pending),
            "IN_PROGRESS" => Ok(MilestoneStatus::InProgress),
            "UNDER_REVIEW" => Ok(MilestoneStatus::UnderReview),
            "COMPLETED" => Ok(MilestoneStatus::Completed),
            "CANCELLED" => Ok(MilestoneStatus::Cancelled),
            "ON_HOLD" => Ok(MilestoneStatus::OnHold),
            other => Err(errors::ModelError::Validation(format!("unknown milestone status: {other}"))),
        }
    }
}

impl Model {
    pub fn status(&self) -> Result<MilestoneStatus, errors::ModelError> { self.status.parse() }
}

#[cfg(test)]
mod tests {
    use super::MilestoneStatus::{self, *};

    #[test]
    fn transition_table_matches_workflow() {
        let allowed = [
            (Pending, InProgress), (Pending, Cancelled), (Pending, OnHold),
            (InProgress, UnderReview), (InProgress, Cancelled), (InProgress, OnHold),
            (UnderReview, Completed), (UnderReview, InProgress), (UnderReview, Cancelled),
            (Completed, UnderReview),
            (Cancelled, Pending),
            (OnHold, Pending), (OnHold, Cancelled),
        ];
        for from in MilestoneStatus::ALL {
            for to in MilestoneStatus::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for s in MilestoneStatus::ALL {
            assert_eq!(s.as_str().parse::<MilestoneStatus>().unwrap(), s);
        }
        assert!("DONE".parse::<MilestoneStatus>().is_err());
    }
}

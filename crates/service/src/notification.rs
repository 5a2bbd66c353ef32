//! Outbound notifications for budget events.
//!
//! Delivery is best effort: [`dispatch`] logs a failing notifier and returns,
//! so the operation that raised the event is never rolled back.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    BudgetCreated {
        budget_id: Uuid,
        job_id: Uuid,
        recipients: Vec<Uuid>,
    },
    MilestoneStatusChanged {
        milestone_id: Uuid,
        budget_id: Uuid,
        from: String,
        to: String,
        notes: Option<String>,
        recipients: Vec<Uuid>,
    },
    PaymentProcessed {
        payment_id: Uuid,
        milestone_id: Uuid,
        amount: Decimal,
        currency: String,
        recipients: Vec<Uuid>,
    },
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationEvent::BudgetCreated { .. } => "budget_created",
            NotificationEvent::MilestoneStatusChanged { .. } => "milestone_status_changed",
            NotificationEvent::PaymentProcessed { .. } => "payment_processed",
        }
    }

    pub fn recipients(&self) -> &[Uuid] {
        match self {
            NotificationEvent::BudgetCreated { recipients, .. }
            | NotificationEvent::MilestoneStatusChanged { recipients, .. }
            | NotificationEvent::PaymentProcessed { recipients, .. } => recipients,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ServiceError>;
}

/// Writes events to the log; stands in for email/push delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ServiceError> {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(event = event.name(), recipients = event.recipients().len(), %payload, "notification");
        Ok(())
    }
}

pub async fn dispatch(notifier: &dyn Notifier, event: NotificationEvent) {
    if let Err(e) = notifier.notify(&event).await {
        error!(event = event.name(), error = %e, "notification_failed");
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn failing_notifier_is_swallowed() {
        let event = NotificationEvent::BudgetCreated { budget_id: Uuid::new_v4(), job_id: Uuid::new_v4(), recipients: vec![] };
        dispatch(&FailingNotifier, event.clone()).await;
        let rec = RecordingNotifier::default();
        dispatch(&rec, event.clone()).await;
        assert_eq!(rec.events.lock().await.as_slice(), &[event]);
    }

    #[test]
    fn events_serialize_with_tag() {
        let e = NotificationEvent::PaymentProcessed {
            payment_id: Uuid::nil(),
            milestone_id: Uuid::nil(),
            amount: Decimal::new(150000, 2),
            currency: "USD".into(),
            recipients: vec![],
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["event"], "payment_processed");
        assert_eq!(v["amount"], "1500.00");
    }
}

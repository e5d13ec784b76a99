use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vinti4::{OperationType, ValidationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// First verified success for this merchant reference.
    Recorded,
    /// The gateway re-delivered a callback that was already recorded.
    Duplicate,
    /// Not a success; nothing to issue.
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedPayment {
    pub merchant_ref: String,
    pub operation: OperationType,
    pub transaction_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Business-layer sink for validated callbacks. Implementations must make
/// recording idempotent per merchant reference.
#[async_trait]
pub trait OutcomeRecorder: Send + Sync {
    async fn record(&self, outcome: &ValidationOutcome) -> anyhow::Result<RecordStatus>;

    async fn get(&self, merchant_ref: &str) -> Option<RecordedPayment>;
}

/// Process-local recorder for development and tests. Entries are never
/// evicted and are lost on restart; production deployments plug a durable
/// [`OutcomeRecorder`] into `AppState` instead.
#[derive(Clone, Default)]
pub struct InMemoryOutcomeRecorder {
    payments: Arc<RwLock<HashMap<String, RecordedPayment>>>,
}

impl InMemoryOutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeRecorder for InMemoryOutcomeRecorder {
    async fn record(&self, outcome: &ValidationOutcome) -> anyhow::Result<RecordStatus> {
        let ValidationOutcome::Success { operation, details } = outcome else {
            return Ok(RecordStatus::Ignored);
        };

        if details.merchant_ref.is_empty() {
            anyhow::bail!("verified callback carries no merchant reference");
        }

        let mut payments = self.payments.write().await;
        if payments.contains_key(&details.merchant_ref) {
            tracing::info!(
                merchant_ref = %details.merchant_ref,
                "Duplicate callback delivery ignored"
            );
            return Ok(RecordStatus::Duplicate);
        }

        payments.insert(
            details.merchant_ref.clone(),
            RecordedPayment {
                merchant_ref: details.merchant_ref.clone(),
                operation: *operation,
                transaction_id: details.transaction_id.clone(),
                recorded_at: Utc::now(),
            },
        );
        tracing::info!(
            merchant_ref = %details.merchant_ref,
            ?operation,
            "Payment recorded"
        );

        Ok(RecordStatus::Recorded)
    }

    async fn get(&self, merchant_ref: &str) -> Option<RecordedPayment> {
        self.payments.read().await.get(merchant_ref).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vinti4::PaymentDetails;

    fn success(merchant_ref: &str) -> ValidationOutcome {
        ValidationOutcome::Success {
            operation: OperationType::Payment,
            details: PaymentDetails {
                merchant_ref: merchant_ref.to_string(),
                merchant_session: "S1".to_string(),
                transaction_id: Some("98765".to_string()),
                clearing_period: None,
                amount: Some("1000.00".to_string()),
                message_id: None,
                pan: None,
                timestamp: None,
                client_receipt: None,
                reload_code: None,
                token: None,
            },
        }
    }

    #[tokio::test]
    async fn records_each_reference_once() {
        let recorder = InMemoryOutcomeRecorder::new();

        assert_eq!(recorder.record(&success("R1")).await.unwrap(), RecordStatus::Recorded);
        assert_eq!(recorder.record(&success("R1")).await.unwrap(), RecordStatus::Duplicate);
        assert_eq!(recorder.record(&success("R2")).await.unwrap(), RecordStatus::Recorded);

        let stored = recorder.get("R1").await.unwrap();
        assert_eq!(stored.transaction_id.as_deref(), Some("98765"));
    }

    #[tokio::test]
    async fn ignores_non_success_outcomes() {
        let recorder = InMemoryOutcomeRecorder::new();
        assert_eq!(
            recorder.record(&ValidationOutcome::UserCancelled).await.unwrap(),
            RecordStatus::Ignored
        );
        assert_eq!(
            recorder.record(&ValidationOutcome::FingerprintInvalid).await.unwrap(),
            RecordStatus::Ignored
        );
    }

    #[tokio::test]
    async fn concurrent_deliveries_record_once() {
        let recorder = InMemoryOutcomeRecorder::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let recorder = recorder.clone();
                tokio::spawn(async move { recorder.record(&success("R-concurrent")).await.unwrap() })
            })
            .collect();

        let mut recorded = 0;
        for handle in handles {
            if handle.await.unwrap() == RecordStatus::Recorded {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 1);
    }
}

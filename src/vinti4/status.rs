use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::StatusEndpoint;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid response from status API: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

#[derive(Debug, Clone, Serialize)]
struct StatusRequest {
    #[serde(rename = "posID")]
    pos_id: String,
    #[serde(rename = "posAuthCode")]
    pos_auth_code: String,
    #[serde(rename = "merchantRef")]
    merchant_ref: String,
}

/// Response from the gateway's transaction status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub result: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub transaction_success: bool,
    #[serde(default)]
    pub transaction_status_description: String,
}

/// HTTP client for the gateway's transaction status API
#[derive(Clone)]
pub struct StatusClient {
    client: Client,
    endpoint: StatusEndpoint,
    pos_id: String,
    pos_auth_code: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl StatusClient {
    pub fn new(endpoint: StatusEndpoint, pos_id: &str, pos_auth_code: &str) -> Self {
        Self::with_circuit_breaker(endpoint, pos_id, pos_auth_code, 3, 60)
    }

    /// Creates a StatusClient with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        endpoint: StatusEndpoint,
        pos_id: &str,
        pos_auth_code: &str,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        StatusClient {
            client,
            endpoint,
            pos_id: pos_id.to_string(),
            pos_auth_code: pos_auth_code.to_string(),
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    /// Asks the gateway how the transaction for `merchant_ref` ended.
    pub async fn check(&self, merchant_ref: &str) -> Result<TransactionStatus, StatusError> {
        let client = self.client.clone();
        let url = self.endpoint.url.clone();
        let portal_id = self.endpoint.portal_id.clone();
        let portal_password = self.endpoint.portal_password.clone();
        let body = StatusRequest {
            pos_id: self.pos_id.clone(),
            pos_auth_code: self.pos_auth_code.clone(),
            merchant_ref: merchant_ref.to_string(),
        };

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(url)
                    .basic_auth(portal_id, Some(portal_password))
                    .json(&body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(StatusError::InvalidResponse(format!(
                        "status endpoint returned {}",
                        response.status()
                    )));
                }

                let status = response.json::<TransactionStatus>().await?;
                Ok(status)
            })
            .await;

        match result {
            Ok(status) => {
                tracing::info!(
                    merchant_ref,
                    transaction_success = status.transaction_success,
                    "Transaction status retrieved"
                );
                Ok(status)
            }
            Err(FailsafeError::Rejected) => Err(StatusError::CircuitBreakerOpen(
                "status API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => {
                tracing::warn!(merchant_ref, error = %e, "Transaction status check failed");
                Err(e)
            }
        }
    }
}

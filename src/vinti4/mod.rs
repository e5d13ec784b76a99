//! Vinti4 card-payment gateway adapter.
//!
//! Outbound requests are sealed by [`request::RequestBuilder`], rendered as an
//! auto-submitting form by [`form`], and the gateway's callbacks are checked
//! and classified by [`response::ResponseValidator`].

pub mod fingerprint;
pub mod form;
pub mod hasher;
pub mod request;
pub mod response;
pub mod status;

use bigdecimal::BigDecimal;
use std::sync::Arc;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::validation::ValidationError;

pub use request::{CardholderInfo, RequestBuilder, TokenPaymentKind, TransactionCode, TransactionRequest};
pub use response::{OperationType, PaymentDetails, ResponseValidator, TransactionResponse, ValidationOutcome};
pub use status::{StatusClient, StatusError, TransactionStatus};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway configuration missing: {0}")]
    ConfigurationMissing(&'static str),
    #[error("Invalid URL in {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
    #[error("Status check unavailable: {0}")]
    StatusUnavailable(&'static str),
    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Entry point shared by the HTTP handlers and the CLI. Cheap to clone; holds
/// no mutable state.
#[derive(Clone)]
pub struct Vinti4Gateway {
    config: Arc<GatewayConfig>,
    status_client: Option<StatusClient>,
}

impl Vinti4Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        let status_client = config
            .status_endpoint()
            .cloned()
            .map(|endpoint| StatusClient::new(endpoint, config.pos_id(), config.pos_auth_code()));

        Self {
            config: Arc::new(config),
            status_client,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn request(&self, transaction_code: TransactionCode, amount: BigDecimal) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.config, transaction_code, amount)
    }

    pub fn render_form(&self, request: &TransactionRequest) -> String {
        form::render_auto_submit_form(&self.config, request)
    }

    pub fn validate(&self, response: &TransactionResponse) -> ValidationOutcome {
        ResponseValidator::new(&self.config).validate(response)
    }

    /// Circuit breaker state of the status client, if one is configured.
    pub fn status_circuit_state(&self) -> Option<String> {
        self.status_client.as_ref().map(StatusClient::circuit_state)
    }

    pub async fn check_status(&self, merchant_ref: &str) -> Result<TransactionStatus, GatewayError> {
        let client = self
            .status_client
            .as_ref()
            .ok_or(GatewayError::StatusUnavailable("VINTI4_STATUS_URL is not configured"))?;
        Ok(client.check(merchant_ref).await?)
    }
}

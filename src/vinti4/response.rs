use serde::{Deserialize, Serialize};

use super::fingerprint::{error_fingerprint, success_fingerprint};
use super::hasher::fingerprints_match;
use crate::config::GatewayConfig;

/// Markers the gateway places in `merchantResp` when the operation succeeded.
pub const SUCCESS_MARKERS: &[&str] = &["C", "0"];

pub const UNRECOGNIZED_TYPE_MESSAGE: &str = "unrecognized response type";
pub const GENERIC_ERROR_MESSAGE: &str = "The payment could not be completed";

/// Callback payload posted back by the gateway. Every field is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionResponse {
    #[serde(rename = "messageType", default)]
    pub message_type: Option<String>,
    #[serde(rename = "merchantRespCP", alias = "clearingPeriod", default)]
    pub clearing_period: Option<String>,
    #[serde(rename = "merchantRespTid", alias = "transactionID", default)]
    pub transaction_id: Option<String>,
    #[serde(rename = "merchantRespMerchantRef", alias = "merchantRef", default)]
    pub merchant_ref: Option<String>,
    #[serde(
        rename = "merchantRespMerchantSession",
        alias = "merchantSession",
        default
    )]
    pub merchant_session: Option<String>,
    #[serde(rename = "merchantRespPurchaseAmount", alias = "amount", default)]
    pub amount: Option<String>,
    #[serde(rename = "merchantRespMessageID", alias = "messageID", default)]
    pub message_id: Option<String>,
    #[serde(rename = "merchantRespPan", alias = "pan", default)]
    pub pan: Option<String>,
    #[serde(rename = "merchantResp", default)]
    pub merchant_resp: Option<String>,
    #[serde(rename = "merchantRespTimeStamp", alias = "timeStamp", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "merchantRespEntityCode", alias = "entityCode", default)]
    pub entity_code: Option<String>,
    #[serde(
        rename = "merchantRespReferenceNumber",
        alias = "referenceNumber",
        default
    )]
    pub reference_number: Option<String>,
    #[serde(rename = "merchantRespClientReceipt", default)]
    pub client_receipt: Option<String>,
    #[serde(
        rename = "merchantRespAdditionalErrorMessage",
        alias = "additionalErrorMessage",
        default
    )]
    pub additional_error_message: Option<String>,
    #[serde(rename = "merchantRespReloadCode", default)]
    pub reload_code: Option<String>,
    #[serde(rename = "merchantRespErrorCode", alias = "errorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "merchantRespErrorDetail", alias = "errorDetail", default)]
    pub error_detail: Option<String>,
    #[serde(
        rename = "merchantRespErrorDescription",
        alias = "errorDescription",
        default
    )]
    pub error_description: Option<String>,
    #[serde(rename = "merchantRespToken", alias = "token", default)]
    pub token: Option<String>,
    #[serde(rename = "resultFingerPrint", alias = "resultFingerprint", default)]
    pub result_fingerprint: Option<String>,
    #[serde(rename = "UserCancelled", alias = "userCancelled", default)]
    pub user_cancelled: Option<String>,
}

impl TransactionResponse {
    fn is_user_cancelled(&self) -> bool {
        self.user_cancelled.as_deref().map(str::trim) == Some("true")
    }

    fn reports_success(&self) -> bool {
        self.merchant_resp
            .as_deref()
            .map(|marker| SUCCESS_MARKERS.contains(&marker.trim()))
            .unwrap_or(false)
    }

    /// Wire name of the first required success field that is absent or blank.
    fn missing_success_field(&self) -> Option<&'static str> {
        [
            ("messageType", &self.message_type),
            ("merchantRespMerchantRef", &self.merchant_ref),
            ("merchantRespMerchantSession", &self.merchant_session),
            ("merchantRespTid", &self.transaction_id),
            ("merchantRespPurchaseAmount", &self.amount),
            ("merchantRespTimeStamp", &self.timestamp),
        ]
        .into_iter()
        .find(|(_, value)| value.as_deref().map(str::trim).unwrap_or_default().is_empty())
        .map(|(name, _)| name)
    }

    /// Human-readable failure text, most specific first.
    pub fn error_message(&self) -> String {
        [
            &self.additional_error_message,
            &self.error_description,
            &self.error_detail,
        ]
        .into_iter()
        .filter_map(|value| value.as_deref().map(str::trim))
        .find(|value| !value.is_empty())
        .unwrap_or(GENERIC_ERROR_MESSAGE)
        .to_string()
    }
}

/// What a verified success callback confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Payment,
    TokenCreated,
    TokenPayment,
    TokenCancelled,
    Refund,
    ServicePayment,
    Recharge,
}

impl OperationType {
    pub fn from_message_type(message_type: &str) -> Option<Self> {
        match message_type.trim() {
            "8" => Some(Self::Payment),
            "A" => Some(Self::TokenCreated),
            "B" => Some(Self::TokenPayment),
            "C" => Some(Self::TokenCancelled),
            "10" => Some(Self::Refund),
            "P" => Some(Self::ServicePayment),
            "M" => Some(Self::Recharge),
            _ => None,
        }
    }
}

/// Gateway-assigned data carried by a verified success callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub merchant_ref: String,
    pub merchant_session: String,
    pub transaction_id: Option<String>,
    pub clearing_period: Option<String>,
    pub amount: Option<String>,
    pub message_id: Option<String>,
    pub pan: Option<String>,
    pub timestamp: Option<String>,
    pub client_receipt: Option<String>,
    pub reload_code: Option<String>,
    pub token: Option<String>,
}

impl From<&TransactionResponse> for PaymentDetails {
    fn from(response: &TransactionResponse) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            merchant_ref: non_empty(&response.merchant_ref).unwrap_or_default(),
            merchant_session: non_empty(&response.merchant_session).unwrap_or_default(),
            transaction_id: non_empty(&response.transaction_id),
            clearing_period: non_empty(&response.clearing_period),
            amount: non_empty(&response.amount),
            message_id: non_empty(&response.message_id),
            pan: non_empty(&response.pan),
            timestamp: non_empty(&response.timestamp),
            client_receipt: non_empty(&response.client_receipt),
            reload_code: non_empty(&response.reload_code),
            token: non_empty(&response.token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success {
        operation: OperationType,
        details: PaymentDetails,
    },
    UserCancelled,
    FingerprintInvalid,
    GatewayError {
        message: String,
        /// Whether the error callback itself carried a valid fingerprint.
        fingerprint_verified: bool,
    },
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::UserCancelled => "user_cancelled",
            Self::FingerprintInvalid => "fingerprint_invalid",
            Self::GatewayError { .. } => "gateway_error",
        }
    }
}

/// Verifies and classifies gateway callbacks. Holds no state beyond the
/// borrowed configuration, so one instance may serve any number of callbacks.
pub struct ResponseValidator<'a> {
    config: &'a GatewayConfig,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, response: &TransactionResponse) -> ValidationOutcome {
        let merchant_ref = response.merchant_ref.as_deref().unwrap_or_default();

        if response.is_user_cancelled() {
            tracing::info!(merchant_ref, "Payment cancelled by the cardholder");
            return ValidationOutcome::UserCancelled;
        }

        if response.reports_success() {
            return self.validate_success(response, merchant_ref);
        }

        self.validate_error(response, merchant_ref)
    }

    fn validate_success(
        &self,
        response: &TransactionResponse,
        merchant_ref: &str,
    ) -> ValidationOutcome {
        if let Some(missing) = response.missing_success_field() {
            tracing::warn!(merchant_ref, missing, "Success callback missing a required field");
            return ValidationOutcome::FingerprintInvalid;
        }

        let Some(supplied) = response.result_fingerprint.as_deref() else {
            tracing::warn!(merchant_ref, "Success callback without a fingerprint");
            return ValidationOutcome::FingerprintInvalid;
        };

        let expected = success_fingerprint(self.config.pos_auth_code(), response);
        if !fingerprints_match(&expected, supplied.trim()) {
            tracing::warn!(merchant_ref, "Success callback fingerprint mismatch");
            return ValidationOutcome::FingerprintInvalid;
        }

        let message_type = response.message_type.as_deref().unwrap_or_default();
        match OperationType::from_message_type(message_type) {
            Some(operation) => {
                tracing::info!(merchant_ref, ?operation, "Verified success callback");
                ValidationOutcome::Success {
                    operation,
                    details: PaymentDetails::from(response),
                }
            }
            None => {
                tracing::warn!(merchant_ref, message_type, "Unrecognized message type");
                ValidationOutcome::GatewayError {
                    message: UNRECOGNIZED_TYPE_MESSAGE.to_string(),
                    fingerprint_verified: true,
                }
            }
        }
    }

    fn validate_error(&self, response: &TransactionResponse, merchant_ref: &str) -> ValidationOutcome {
        let fingerprint_verified = match response.result_fingerprint.as_deref() {
            Some(supplied) => {
                let expected = error_fingerprint(self.config.pos_auth_code(), response);
                fingerprints_match(&expected, supplied.trim())
            }
            None => false,
        };

        let message = response.error_message();
        if fingerprint_verified {
            tracing::info!(merchant_ref, error = %message, "Gateway reported an error");
        } else {
            tracing::warn!(
                merchant_ref,
                error = %message,
                "Gateway error callback failed fingerprint verification"
            );
        }

        ValidationOutcome::GatewayError {
            message,
            fingerprint_verified,
        }
    }
}

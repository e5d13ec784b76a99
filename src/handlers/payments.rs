use axum::{
    extract::State,
    response::{Html, IntoResponse},
    Form, Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::RecordStatus;
use crate::vinti4::{CardholderInfo, TransactionCode, TransactionResponse, ValidationOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub amount: BigDecimal,
    #[serde(default = "default_operation")]
    pub operation: TransactionCode,
    pub entity_code: Option<String>,
    pub reference_number: Option<String>,
    pub token: Option<String>,
    pub original_transaction_id: Option<String>,
    pub clearing_period: Option<String>,
    pub cardholder: Option<CardholderInfo>,
}

fn default_operation() -> TransactionCode {
    TransactionCode::Purchase
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub merchant_ref: Option<String>,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    pub record: RecordStatus,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub merchant_ref: String,
}

/// Builds and seals a gateway request and returns the page that posts it.
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder = state.gateway.request(payload.operation, payload.amount);

    if let Some(entity_code) = payload.entity_code {
        builder = builder.entity_code(entity_code);
    }
    if let Some(reference_number) = payload.reference_number {
        builder = builder.reference_number(reference_number);
    }
    if let Some(token) = payload.token {
        builder = builder.token(token);
    }
    if let Some(transaction_id) = payload.original_transaction_id {
        builder = builder.original_transaction_id(transaction_id);
    }
    if let Some(clearing_period) = payload.clearing_period {
        builder = builder.clearing_period(clearing_period);
    }
    if let Some(cardholder) = payload.cardholder {
        builder = builder.cardholder(cardholder);
    }

    let request = builder.build()?;
    tracing::info!(
        merchant_ref = request.merchant_ref(),
        transaction_code = request.transaction_code().code(),
        "Checkout form issued"
    );

    Ok(Html(state.gateway.render_form(&request)))
}

/// Gateway callback. Always answers 200 for a classified outcome; only a
/// failure of the recorder itself is an error.
pub async fn callback(
    State(state): State<AppState>,
    Form(payload): Form<TransactionResponse>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.gateway.validate(&payload);
    let record = state
        .recorder
        .record(&outcome)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(
        merchant_ref = payload.merchant_ref.as_deref().unwrap_or_default(),
        outcome = outcome.label(),
        ?record,
        "Callback processed"
    );

    Ok(Json(CallbackAck {
        merchant_ref: payload.merchant_ref,
        outcome,
        record,
    }))
}

pub async fn status(
    State(state): State<AppState>,
    Json(query): Json<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let merchant_ref = query.merchant_ref.trim();
    if merchant_ref.is_empty() {
        return Err(AppError::BadRequest("merchant_ref must not be empty".to_string()));
    }

    let status = state.gateway.check_status(merchant_ref).await?;
    Ok(Json(status))
}

use bigdecimal::BigDecimal;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fingerprint::{request_fingerprint, RequestFingerprintInput};
use super::GatewayError;
use crate::config::GatewayConfig;
use crate::validation::{
    sanitize_string, validate_email, validate_max_len, validate_minor_unit_precision,
    validate_numeric, validate_positive_amount, validate_required, ValidationError,
    ADDRESS_LINE_MAX_LEN, COUNTRY_CODE_LEN, ENTITY_CODE_MAX_LEN, POSTAL_CODE_MAX_LEN,
    REFERENCE_NUMBER_MAX_LEN,
};

pub const FINGERPRINT_VERSION: &str = "1";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_POSTAL_CODE: &str = "0000";

const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const REFERENCE_SUFFIX_LEN: usize = 8;
const SESSION_PREFIX: &str = "S";

/// What a token payment pays for; the gateway uses a distinct code per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPaymentKind {
    Service,
    Recharge,
    Purchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCode {
    Purchase,
    Service,
    Recharge,
    Refund,
    TokenRequest,
    TokenPayment(TokenPaymentKind),
    TokenCancel,
}

impl TransactionCode {
    /// Value of the `transactionCode` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Purchase => "1",
            Self::Service => "2",
            Self::Recharge => "3",
            Self::Refund => "4",
            Self::TokenRequest => "5",
            Self::TokenPayment(TokenPaymentKind::Service) => "2",
            Self::TokenPayment(TokenPaymentKind::Recharge) => "3",
            Self::TokenPayment(TokenPaymentKind::Purchase) => "6",
            Self::TokenCancel => "7",
        }
    }

    fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Purchase => "R",
            Self::Service => "P",
            Self::Recharge => "M",
            Self::Refund => "F",
            Self::TokenRequest => "A",
            Self::TokenPayment(_) => "B",
            Self::TokenCancel => "C",
        }
    }

    fn takes_entity_reference(&self) -> bool {
        matches!(
            self,
            Self::Service
                | Self::Recharge
                | Self::TokenPayment(TokenPaymentKind::Service)
                | Self::TokenPayment(TokenPaymentKind::Recharge)
        )
    }

    fn takes_token(&self) -> bool {
        matches!(self, Self::TokenPayment(_) | Self::TokenCancel)
    }
}

/// 3-D Secure cardholder data. Needed by the card networks' strong
/// authentication, mostly for international cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardholderInfo {
    pub email: Option<String>,
    pub bill_addr_country: Option<String>,
    pub bill_addr_city: Option<String>,
    pub bill_addr_line1: Option<String>,
    pub bill_addr_line2: Option<String>,
    pub bill_addr_line3: Option<String>,
    pub bill_addr_post_code: Option<String>,
}

impl CardholderInfo {
    fn normalized(&self) -> Result<Self, ValidationError> {
        let email = match clean(&self.email) {
            Some(email) => {
                validate_email(&email)?;
                Some(email)
            }
            None => None,
        };

        let bill_addr_country = match clean(&self.bill_addr_country) {
            Some(country) => {
                validate_numeric("bill_addr_country", &country, COUNTRY_CODE_LEN)?;
                Some(country)
            }
            None => None,
        };

        let line = |field: &'static str, value: &Option<String>| -> Result<Option<String>, ValidationError> {
            match clean(value) {
                Some(value) => {
                    validate_max_len(field, &value, ADDRESS_LINE_MAX_LEN)?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        };

        let bill_addr_post_code =
            clean(&self.bill_addr_post_code).unwrap_or_else(|| DEFAULT_POSTAL_CODE.to_string());
        validate_max_len("bill_addr_post_code", &bill_addr_post_code, POSTAL_CODE_MAX_LEN)?;

        Ok(Self {
            email,
            bill_addr_country,
            bill_addr_city: line("bill_addr_city", &self.bill_addr_city)?,
            bill_addr_line1: line("bill_addr_line1", &self.bill_addr_line1)?,
            bill_addr_line2: line("bill_addr_line2", &self.bill_addr_line2)?,
            bill_addr_line3: line("bill_addr_line3", &self.bill_addr_line3)?,
            bill_addr_post_code: Some(bill_addr_post_code),
        })
    }
}

/// A sealed outbound request. Built once by [`RequestBuilder`] and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    transaction_code: TransactionCode,
    pos_id: String,
    merchant_ref: String,
    merchant_session: String,
    amount: BigDecimal,
    currency: String,
    timestamp: String,
    response_url: String,
    language: String,
    entity_code: Option<String>,
    reference_number: Option<String>,
    token: Option<String>,
    original_transaction_id: Option<String>,
    clearing_period: Option<String>,
    cardholder: Option<CardholderInfo>,
    fingerprint: String,
}

impl TransactionRequest {
    pub fn transaction_code(&self) -> TransactionCode {
        self.transaction_code
    }

    pub fn merchant_ref(&self) -> &str {
        &self.merchant_ref
    }

    pub fn merchant_session(&self) -> &str {
        &self.merchant_session
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn entity_code(&self) -> Option<&str> {
        self.entity_code.as_deref()
    }

    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    pub fn cardholder(&self) -> Option<&CardholderInfo> {
        self.cardholder.as_ref()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Ordered `(name, value)` pairs for the auto-submit form. Absent and
    /// empty values are skipped rather than sent as `name=""`.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let cardholder = self.cardholder.as_ref();
        let is_3ds = cardholder.map(|_| "1".to_string());

        let candidates: Vec<(&'static str, Option<String>)> = vec![
            ("transactionCode", Some(self.transaction_code.code().to_string())),
            ("posID", Some(self.pos_id.clone())),
            ("merchantRef", Some(self.merchant_ref.clone())),
            ("merchantSession", Some(self.merchant_session.clone())),
            ("amount", Some(self.amount.to_string())),
            ("currency", Some(self.currency.clone())),
            ("is3DSec", is_3ds),
            ("urlMerchantResponse", Some(self.response_url.clone())),
            ("languageMessages", Some(self.language.clone())),
            ("timeStamp", Some(self.timestamp.clone())),
            ("fingerprintversion", Some(FINGERPRINT_VERSION.to_string())),
            ("entityCode", self.entity_code.clone()),
            ("referenceNumber", self.reference_number.clone()),
            ("token", self.token.clone()),
            ("transactionID", self.original_transaction_id.clone()),
            ("clearingPeriod", self.clearing_period.clone()),
            ("email", cardholder.and_then(|c| c.email.clone())),
            ("billAddrCountry", cardholder.and_then(|c| c.bill_addr_country.clone())),
            ("billAddrCity", cardholder.and_then(|c| c.bill_addr_city.clone())),
            ("billAddrLine1", cardholder.and_then(|c| c.bill_addr_line1.clone())),
            ("billAddrLine2", cardholder.and_then(|c| c.bill_addr_line2.clone())),
            ("billAddrLine3", cardholder.and_then(|c| c.bill_addr_line3.clone())),
            ("billAddrPostCode", cardholder.and_then(|c| c.bill_addr_post_code.clone())),
            ("fingerprint", Some(self.fingerprint.clone())),
        ];

        candidates
            .into_iter()
            .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
            .collect()
    }
}

/// Assembles and seals a [`TransactionRequest`]. Performs no I/O.
pub struct RequestBuilder<'a> {
    config: &'a GatewayConfig,
    transaction_code: TransactionCode,
    amount: BigDecimal,
    timestamp: Option<NaiveDateTime>,
    merchant_ref: Option<String>,
    merchant_session: Option<String>,
    entity_code: Option<String>,
    reference_number: Option<String>,
    token: Option<String>,
    original_transaction_id: Option<String>,
    clearing_period: Option<String>,
    cardholder: Option<CardholderInfo>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a GatewayConfig, transaction_code: TransactionCode, amount: BigDecimal) -> Self {
        Self {
            config,
            transaction_code,
            amount,
            timestamp: None,
            merchant_ref: None,
            merchant_session: None,
            entity_code: None,
            reference_number: None,
            token: None,
            original_transaction_id: None,
            clearing_period: None,
            cardholder: None,
        }
    }

    /// Fixes the request time instead of reading the clock.
    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Overrides the generated references, e.g. when replaying a known request.
    pub fn references(mut self, merchant_ref: impl Into<String>, merchant_session: impl Into<String>) -> Self {
        self.merchant_ref = Some(merchant_ref.into());
        self.merchant_session = Some(merchant_session.into());
        self
    }

    pub fn entity_code(mut self, entity_code: impl Into<String>) -> Self {
        self.entity_code = Some(entity_code.into());
        self
    }

    pub fn reference_number(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = Some(reference_number.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Gateway id of the transaction being refunded.
    pub fn original_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.original_transaction_id = Some(transaction_id.into());
        self
    }

    pub fn clearing_period(mut self, clearing_period: impl Into<String>) -> Self {
        self.clearing_period = Some(clearing_period.into());
        self
    }

    pub fn cardholder(mut self, cardholder: CardholderInfo) -> Self {
        self.cardholder = Some(cardholder);
        self
    }

    pub fn build(self) -> Result<TransactionRequest, GatewayError> {
        let config = self.config;
        validate_required("pos_id", config.pos_id())
            .map_err(|_| GatewayError::ConfigurationMissing("VINTI4_POS_ID"))?;
        validate_required("pos_auth_code", config.pos_auth_code())
            .map_err(|_| GatewayError::ConfigurationMissing("VINTI4_POS_AUTH_CODE"))?;

        validate_positive_amount(&self.amount)?;
        validate_minor_unit_precision(&self.amount)?;

        let code = self.transaction_code;
        let entity_code = clean(&self.entity_code);
        let reference_number = clean(&self.reference_number);
        if code.takes_entity_reference() {
            let entity = entity_code
                .as_deref()
                .ok_or_else(|| ValidationError::new("entity_code", "is required for this operation"))?;
            validate_numeric("entity_code", entity, ENTITY_CODE_MAX_LEN)?;
            let reference = reference_number
                .as_deref()
                .ok_or_else(|| ValidationError::new("reference_number", "is required for this operation"))?;
            validate_numeric("reference_number", reference, REFERENCE_NUMBER_MAX_LEN)?;
        } else if entity_code.is_some() || reference_number.is_some() {
            return Err(ValidationError::new(
                "entity_code",
                "only allowed for service or recharge operations",
            )
            .into());
        }

        let token = clean(&self.token);
        match (code.takes_token(), &token) {
            (true, None) => {
                return Err(ValidationError::new("token", "is required for this operation").into())
            }
            (false, Some(_)) => {
                return Err(ValidationError::new("token", "only allowed for token operations").into())
            }
            _ => {}
        }

        let original_transaction_id = clean(&self.original_transaction_id);
        let clearing_period = clean(&self.clearing_period);
        if code == TransactionCode::Refund {
            validate_required(
                "transaction_id",
                original_transaction_id.as_deref().unwrap_or_default(),
            )?;
            validate_required("clearing_period", clearing_period.as_deref().unwrap_or_default())?;
        }

        let cardholder = self
            .cardholder
            .as_ref()
            .map(CardholderInfo::normalized)
            .transpose()?;

        let now = self.timestamp.unwrap_or_else(|| Local::now().naive_local());
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let merchant_ref = match clean(&self.merchant_ref) {
            Some(merchant_ref) => merchant_ref,
            None => generate_reference(code.reference_prefix(), &now),
        };
        let merchant_session = match clean(&self.merchant_session) {
            Some(merchant_session) => merchant_session,
            None => generate_reference(SESSION_PREFIX, &now),
        };

        // Sealed last: every value above is final from here on.
        let fingerprint = request_fingerprint(
            config.pos_auth_code(),
            &RequestFingerprintInput {
                timestamp: &timestamp,
                amount: &self.amount,
                merchant_ref: &merchant_ref,
                merchant_session: &merchant_session,
                pos_id: config.pos_id(),
                currency: config.currency(),
                transaction_code: code.code(),
                entity_code: entity_code.as_deref(),
                reference_number: reference_number.as_deref(),
            },
        );

        tracing::debug!(
            merchant_ref = %merchant_ref,
            transaction_code = code.code(),
            "Built gateway request"
        );

        Ok(TransactionRequest {
            transaction_code: code,
            pos_id: config.pos_id().to_string(),
            merchant_ref,
            merchant_session,
            amount: self.amount,
            currency: config.currency().to_string(),
            timestamp,
            response_url: config.response_url().to_string(),
            language: config.language().to_string(),
            entity_code,
            reference_number,
            token,
            original_transaction_id,
            clearing_period,
            cardholder,
            fingerprint,
        })
    }
}

/// `<prefix><YYYYMMDDHHMMSS><random hex>`. The random tail keeps two requests
/// issued within the same second apart.
pub fn generate_reference(prefix: &str, at: &NaiveDateTime) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        prefix,
        at.format(COMPACT_TIMESTAMP_FORMAT),
        suffix[..REFERENCE_SUFFIX_LEN].to_uppercase()
    )
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(sanitize_string)
        .filter(|value| !value.is_empty())
}

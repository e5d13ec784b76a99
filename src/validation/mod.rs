use bigdecimal::BigDecimal;
use std::fmt;

pub const ENTITY_CODE_MAX_LEN: usize = 5;
pub const REFERENCE_NUMBER_MAX_LEN: usize = 15;
pub const EMAIL_MAX_LEN: usize = 254;
pub const ADDRESS_LINE_MAX_LEN: usize = 50;
pub const POSTAL_CODE_MAX_LEN: usize = 16;
pub const COUNTRY_CODE_LEN: usize = 3;
pub const MAX_MINOR_UNIT_SCALE: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control() || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_numeric(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    let value = value.trim();
    validate_required(field, value)?;
    validate_max_len(field, value, max_len)?;

    if !value.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(field, "must contain only digits"));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

/// The fingerprint carries `amount * 100` as an integer, so anything finer
/// than a cent cannot be represented.
pub fn validate_minor_unit_precision(amount: &BigDecimal) -> ValidationResult {
    let cents = amount.clone() * BigDecimal::from(100);
    if cents.with_scale(0) != cents {
        return Err(ValidationError::new(
            "amount",
            format!("must have at most {} decimal places", MAX_MINOR_UNIT_SCALE),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult {
    let email = email.trim();
    validate_required("email", email)?;
    validate_max_len("email", email, EMAIL_MAX_LEN)?;

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::new("email", "must be a valid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
        assert!(validate_max_len("field", "çãé", 3).is_ok());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  Rua\tde   Santo António  "), "Rua de Santo António");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
        assert_eq!(sanitize_string("Rua 1\r\nAchada\tSanto António"), "Rua 1 Achada Santo António");
    }

    #[test]
    fn validates_numeric() {
        assert!(validate_numeric("entity_code", "00123", ENTITY_CODE_MAX_LEN).is_ok());
        assert!(validate_numeric("entity_code", "12a", ENTITY_CODE_MAX_LEN).is_err());
        assert!(validate_numeric("entity_code", "123456", ENTITY_CODE_MAX_LEN).is_err());
        assert!(validate_numeric("entity_code", "", ENTITY_CODE_MAX_LEN).is_err());
    }

    #[test]
    fn validates_positive_amount() {
        let positive = BigDecimal::from_str("1.23").expect("valid decimal");
        let zero = BigDecimal::from(0);
        let negative = BigDecimal::from(-1);

        assert!(validate_positive_amount(&positive).is_ok());
        assert!(validate_positive_amount(&zero).is_err());
        assert!(validate_positive_amount(&negative).is_err());
    }

    #[test]
    fn validates_minor_unit_precision() {
        let ok = BigDecimal::from_str("1000.00").unwrap();
        let also_ok = BigDecimal::from_str("10.5").unwrap();
        let too_fine = BigDecimal::from_str("10.005").unwrap();

        assert!(validate_minor_unit_precision(&ok).is_ok());
        assert!(validate_minor_unit_precision(&also_ok).is_ok());
        assert!(validate_minor_unit_precision(&too_fine).is_err());
    }

    #[test]
    fn validates_email() {
        assert!(validate_email("cliente@example.cv").is_ok());
        assert!(validate_email("cliente@localhost").is_err());
        assert!(validate_email("@example.cv").is_err());
        assert!(validate_email("cli ente@example.cv").is_err());
        assert!(validate_email("").is_err());
    }
}

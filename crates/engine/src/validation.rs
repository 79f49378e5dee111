//! Structural request validation
//!
//! Pure checks run before anything is read or written. A failure here never
//! produces an audit entry.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// Policy numbers: `^(65|66)\d+$`
pub fn policy_number(value: &str) -> EngineResult<()> {
    let valid = (value.starts_with("65") || value.starts_with("66"))
        && value.len() > 2
        && value.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "policy number '{value}' must start with 65 or 66 followed by digits"
        )))
    }
}

/// Mainland mobile numbers: 11 digits starting with 1
pub fn mobile(value: &str) -> EngineResult<()> {
    let valid =
        value.len() == 11 && value.starts_with('1') && value.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(EngineError::validation(
            "mobile must be 11 digits starting with 1",
        ))
    }
}

/// Free text with a minimum length in characters (after trimming)
pub fn min_chars(field: &str, value: &str, min: usize) -> EngineResult<()> {
    let actual = value.trim().chars().count();
    if actual < min {
        return Err(EngineError::validation(format!(
            "{field} must be at least {min} characters, got {actual}"
        )));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Evidence links must be absolute http(s) URLs
pub fn evidence_url(value: &str) -> EngineResult<()> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => Ok(()),
        _ => Err(EngineError::validation(format!(
            "authorization evidence '{value}' must be an http(s) URL"
        ))),
    }
}

pub fn positive_amount(field: &str, value: Decimal) -> EngineResult<()> {
    if value <= Decimal::ZERO {
        return Err(EngineError::validation(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

pub fn non_negative_amount(field: &str, value: Decimal) -> EngineResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(EngineError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_policy_number() {
        assert!(policy_number("6500001").is_ok());
        assert!(policy_number("66123").is_ok());
        assert!(policy_number("65").is_err());
        assert!(policy_number("6700001").is_err());
        assert!(policy_number("65A0001").is_err());
        assert!(policy_number(" 6500001").is_err());
        assert!(policy_number("６５00001").is_err());
    }

    #[test]
    fn test_mobile() {
        assert!(mobile("13800138000").is_ok());
        assert!(mobile("23800138000").is_err());
        assert!(mobile("1380013800").is_err());
        assert!(mobile("1380013800a").is_err());
    }

    #[test]
    fn test_min_chars_counts_characters() {
        assert!(min_chars("reason", "帮助客户完成身份验证", 10).is_ok());
        assert!(min_chars("reason", "帮助客户完成身份验", 10).is_err());
        assert!(min_chars("reason", "   short   ", 10).is_err());
    }

    #[test]
    fn test_evidence_url() {
        assert!(evidence_url("https://files.example.com/auth/123.mp3").is_ok());
        assert!(evidence_url("http://intranet/rec/1").is_ok());
        assert!(evidence_url("ftp://files/1").is_err());
        assert!(evidence_url("https://").is_err());
        assert!(evidence_url("https://bad host").is_err());
    }

    #[test]
    fn test_amounts() {
        assert!(positive_amount("amount", dec!(5000)).is_ok());
        assert!(positive_amount("amount", dec!(0)).is_err());
        assert!(positive_amount("amount", dec!(-1)).is_err());
        assert!(non_negative_amount("refund", dec!(0)).is_ok());
        assert!(non_negative_amount("refund", dec!(-0.01)).is_err());
    }
}

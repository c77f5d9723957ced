//! Phone/OTP input rules and the OTP challenge.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ApiError, ValidationError};

pub const PHONE_DIGITS: usize = 10;
pub const OTP_DIGITS: usize = 6;
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("static phone pattern"));
static OTP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("static otp pattern"));

/// Check a national phone number (digits only, without prefix).
pub fn validate_phone(digits: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(digits) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone {
            expected: PHONE_DIGITS,
        })
    }
}

pub fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if OTP_RE.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp {
            expected: OTP_DIGITS,
        })
    }
}

/// Strip everything but ASCII digits, e.g. from `"555 111 22 33"`.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// An issued OTP, waiting for the user's code.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// E.164 number, e.g. `+905551112233`.
    pub phone_number: String,
    pub country_code: String,
    pub session_token: Option<String>,
    pub requested_at: Instant,
}

impl OtpChallenge {
    pub fn resend_available_at(&self) -> Instant {
        self.requested_at + RESEND_COOLDOWN
    }

    /// Time left before a resend is allowed. Zero once available.
    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.resend_available_at().saturating_duration_since(now)
    }

    /// Build the verify request for a code.
    pub fn verify(&self, otp_code: &str) -> Result<VerifyOtp, ValidationError> {
        let otp_code = otp_code.trim();
        validate_otp(otp_code)?;
        Ok(VerifyOtp {
            phone_number: self.phone_number.clone(),
            otp_code: otp_code.to_string(),
            country_code: self.country_code.clone(),
            session_token: self.session_token.clone(),
        })
    }
}

/// Body of `POST /auth/verify-otp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyOtp {
    pub phone_number: String,
    pub otp_code: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// How the OTP screen should react to a failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpFailure {
    /// Wrong or expired code. The input should be cleared.
    InvalidCode(String),
    TooManyAttempts(String),
    Other(String),
}

impl OtpFailure {
    pub fn clears_input(&self) -> bool {
        matches!(self, Self::InvalidCode(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidCode(m) | Self::TooManyAttempts(m) | Self::Other(m) => m,
        }
    }
}

impl From<&ApiError> for OtpFailure {
    fn from(err: &ApiError) -> Self {
        let message = err.user_message();
        match err.code() {
            Some("INVALID_OTP" | "EXPIRED_OTP") => Self::InvalidCode(message),
            Some("TOO_MANY_ATTEMPTS") => Self::TooManyAttempts(message),
            _ => Self::Other(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::server_error;

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(validate_phone("5551112233").is_ok());
        assert_eq!(
            validate_phone("555111223"),
            Err(ValidationError::InvalidPhone { expected: 10 })
        );
        assert!(validate_phone("55511122334").is_err());
        assert!(validate_phone("555111223a").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn otp_must_be_six_digits() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("12345a").is_err());
    }

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("(555) 111-22 33"), "5551112233");
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_counts_down() {
        let challenge = OtpChallenge {
            phone_number: "+905551112233".into(),
            country_code: "TR".into(),
            session_token: None,
            requested_at: Instant::now(),
        };
        assert_eq!(challenge.cooldown_remaining(Instant::now()), RESEND_COOLDOWN);
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(
            challenge.cooldown_remaining(Instant::now()),
            Duration::from_secs(15)
        );
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(challenge.cooldown_remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn verify_request_carries_session_token() {
        let challenge = OtpChallenge {
            phone_number: "+905551112233".into(),
            country_code: "TR".into(),
            session_token: Some("sess".into()),
            requested_at: Instant::now(),
        };
        let req = challenge.verify(" 123456 ").unwrap();
        assert_eq!(req.otp_code, "123456");
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["session_token"], "sess");
        assert!(challenge.verify("12").is_err());
    }

    #[test]
    fn failure_classification() {
        let f = OtpFailure::from(&server_error(400, "INVALID_OTP", "Wrong code"));
        assert!(f.clears_input());
        assert_eq!(f.message(), "Wrong code");
        assert!(OtpFailure::from(&server_error(400, "EXPIRED_OTP", "Expired")).clears_input());
        assert!(matches!(
            OtpFailure::from(&server_error(429, "TOO_MANY_ATTEMPTS", "Slow down")),
            OtpFailure::TooManyAttempts(_)
        ));
        let other = OtpFailure::from(&ApiError::Transport("offline".into()));
        assert!(!other.clears_input());
    }
}

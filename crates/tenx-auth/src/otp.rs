//! One-time password generation and verification.
//!
//! Verification fails closed: a missing code, a missing or unreadable expiry,
//! an expired code, and a mismatch are all rejections.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Default validity window of a code.
pub const OTP_TTL_SECS: u64 = 600;

/// A uniformly random 6-digit code in `100000..=999999`.
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999_u32).to_string()
}

/// Expiry of a code issued at `now` with the default window.
pub fn otp_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    otp_expiry_after(now, OTP_TTL_SECS)
}

/// Expiry of a code issued at `now`, valid for `ttl_secs`.
pub fn otp_expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    now.checked_add_signed(Duration::seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A code as stored on a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredOtp {
    /// Pending code.
    pub code: Option<String>,
    /// When the code stops being accepted.
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredOtp {
    /// Build from stored columns. An expiry that is not RFC 3339 counts as
    /// missing.
    pub fn from_columns(code: Option<&str>, expiry: Option<&str>) -> Self {
        Self {
            code: code.map(str::to_owned),
            expires_at: expiry
                .and_then(|e| DateTime::parse_from_rfc3339(e).ok())
                .map(|d| d.with_timezone(&Utc)),
        }
    }
}

/// Why a code was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OtpRejection {
    /// No code is pending.
    #[error("no pending OTP")]
    Missing,
    /// The pending code has no expiry.
    #[error("OTP has no expiry")]
    MissingExpiry,
    /// The pending code expired.
    #[error("OTP expired")]
    Expired,
    /// The code does not match.
    #[error("OTP mismatch")]
    Mismatch,
}

/// Check `candidate` against a stored code at time `now`.
pub fn check_otp(stored: &StoredOtp, candidate: &str, now: DateTime<Utc>) -> Result<(), OtpRejection> {
    let code = stored
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(OtpRejection::Missing)?;
    let expires_at = stored.expires_at.ok_or(OtpRejection::MissingExpiry)?;
    if now > expires_at {
        return Err(OtpRejection::Expired);
    }
    if !constant_time_eq(code.as_bytes(), candidate.as_bytes()) {
        return Err(OtpRejection::Mismatch);
    }
    Ok(())
}

/// Whether `candidate` is accepted at time `now`.
pub fn verify_otp(stored: &StoredOtp, candidate: &str, now: DateTime<Utc>) -> bool {
    check_otp(stored, candidate, now).is_ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn stored(code: &str, expires_at: DateTime<Utc>) -> StoredOtp {
        StoredOtp {
            code: Some(code.into()),
            expires_at: Some(expires_at),
        }
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let n: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn expiry_is_ten_minutes() {
        let now = Utc::now();
        assert_eq!(otp_expiry(now) - now, Duration::minutes(10));
    }

    #[test]
    fn expired_code_is_rejected() {
        let now = Utc::now();
        let s = stored("123456", now - Duration::seconds(1));
        assert!(!verify_otp(&s, "123456", now));
        assert_matches!(check_otp(&s, "123456", now), Err(OtpRejection::Expired));
    }

    #[test]
    fn matching_code_within_window_is_accepted() {
        let now = Utc::now();
        let s = stored("123456", now + Duration::seconds(60));
        assert!(verify_otp(&s, "123456", now));
    }

    #[test]
    fn mismatch_is_rejected() {
        let now = Utc::now();
        let s = stored("123456", now + Duration::seconds(60));
        assert_matches!(check_otp(&s, "654321", now), Err(OtpRejection::Mismatch));
        assert_matches!(check_otp(&s, "12345", now), Err(OtpRejection::Mismatch));
    }

    #[test]
    fn missing_parts_fail_closed() {
        let now = Utc::now();
        assert_matches!(
            check_otp(&StoredOtp::default(), "123456", now),
            Err(OtpRejection::Missing)
        );
        let no_expiry = StoredOtp {
            code: Some("123456".into()),
            expires_at: None,
        };
        assert_matches!(
            check_otp(&no_expiry, "123456", now),
            Err(OtpRejection::MissingExpiry)
        );
    }

    #[test]
    fn unreadable_expiry_counts_as_missing() {
        let s = StoredOtp::from_columns(Some("123456"), Some("tomorrow"));
        assert!(s.expires_at.is_none());
        assert!(!verify_otp(&s, "123456", Utc::now()));
    }

    #[test]
    fn from_columns_parses_rfc3339() {
        let s = StoredOtp::from_columns(Some("1"), Some("2030-01-01T00:00:00+00:00"));
        assert_eq!(s.expires_at.unwrap().timestamp(), 1_893_456_000);
    }
}

//! # tenx-auth
//!
//! Passwordless login by one-time password.
//!
//! - [`otp`]: code generation, expiry, fail-closed verification
//! - [`identifier`]: email vs. phone classification of a login identifier
//! - [`delivery`]: the [`OtpDelivery`] seam with SMS, mail, and log-only
//!   implementations, routed by identifier kind

#![deny(unsafe_code)]

pub mod delivery;
pub mod errors;
pub mod identifier;
pub mod otp;

pub use delivery::{
    DeliveryRouter, HttpMailDelivery, LogOnlyDelivery, OtpDelivery, TwilioSmsDelivery,
};
pub use errors::{AuthError, Result};
pub use identifier::Identifier;
pub use otp::{
    OTP_TTL_SECS, OtpRejection, StoredOtp, check_otp, generate_otp, otp_expiry, otp_expiry_after,
    verify_otp,
};

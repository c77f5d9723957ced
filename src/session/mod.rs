//! Authentication and the signed-in user.
//!
//! Phone/OTP sign-in, session restore from stored tokens, profile updates
//! and sign-out. State changes are published as [`SessionEvent`]s.

pub mod otp;
pub mod store;

pub use otp::{OtpChallenge, OtpFailure, VerifyOtp};
pub use store::{LoginResult, PostLoginRoute, ProfileUpdate, SessionEvent, SessionStore};

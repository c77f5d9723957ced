//! Onboarding wizard for newly registered users.
//!
//! Tutors walk through eight steps and students through seven. Each step is
//! validated locally before anything is sent; most steps then save in the
//! background, while lesson pricing, availability and the final review must
//! reach the server before the wizard moves on.

pub mod manager;
pub mod model;
pub mod state;
pub mod validation;

pub use manager::{BackOutcome, BlockReason, OnboardingController, StepOutcome};
pub use model::{Gender, OnboardingForm};
pub use state::{OnboardingStep, StepCursor, steps_for};
pub use validation::{PricedLesson, validate_step};

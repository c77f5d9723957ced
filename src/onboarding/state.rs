//! Onboarding step machine: which screen the user is on and where it can go.

use serde::{Deserialize, Serialize};

use crate::model::Role;

/// The screens of the onboarding wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    PersonalInfo,
    Location,
    Education,
    Bio,
    /// Tutor only.
    LessonsPricing,
    /// Student only.
    LessonInterests,
    /// Tutor only.
    Availability,
    Photo,
    Review,
}

const TUTOR_STEPS: [OnboardingStep; 8] = [
    OnboardingStep::PersonalInfo,
    OnboardingStep::Location,
    OnboardingStep::Education,
    OnboardingStep::Bio,
    OnboardingStep::LessonsPricing,
    OnboardingStep::Availability,
    OnboardingStep::Photo,
    OnboardingStep::Review,
];

const STUDENT_STEPS: [OnboardingStep; 7] = [
    OnboardingStep::PersonalInfo,
    OnboardingStep::Location,
    OnboardingStep::Education,
    OnboardingStep::Bio,
    OnboardingStep::LessonInterests,
    OnboardingStep::Photo,
    OnboardingStep::Review,
];

/// Ordered steps for a role.
pub fn steps_for(role: Role) -> &'static [OnboardingStep] {
    match role {
        Role::Tutor => &TUTOR_STEPS,
        Role::Student => &STUDENT_STEPS,
    }
}

impl OnboardingStep {
    /// Whether `target` directly follows `self` for `role`.
    pub fn can_transition_to(&self, target: OnboardingStep, role: Role) -> bool {
        let steps = steps_for(role);
        steps
            .iter()
            .position(|s| s == self)
            .and_then(|i| steps.get(i + 1))
            .is_some_and(|next| *next == target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Review)
    }

    /// Steps whose server write must succeed before advancing.
    pub fn requires_save(&self) -> bool {
        matches!(
            self,
            Self::LessonsPricing | Self::Availability | Self::Review
        )
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::Location => "location",
            Self::Education => "education",
            Self::Bio => "bio",
            Self::LessonsPricing => "lessons_pricing",
            Self::LessonInterests => "lesson_interests",
            Self::Availability => "availability",
            Self::Photo => "photo",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

/// Position in the wizard. The index never exceeds `total() - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCursor {
    role: Role,
    index: usize,
}

impl StepCursor {
    pub fn new(role: Role) -> Self {
        Self { role, index: 0 }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        steps_for(self.role).len()
    }

    pub fn current(&self) -> OnboardingStep {
        let steps = steps_for(self.role);
        steps[self.index.min(steps.len() - 1)]
    }

    /// Move forward one step. Fails at the last step.
    pub fn advance(&mut self) -> Result<OnboardingStep, String> {
        let current = self.current();
        let next = steps_for(self.role)
            .get(self.index + 1)
            .copied()
            .ok_or_else(|| "Already at the last step".to_string())?;
        if !current.can_transition_to(next, self.role) {
            return Err(format!("Cannot transition from {current} to {next}"));
        }
        self.index += 1;
        Ok(next)
    }

    /// Move back one step. `None` at the first step.
    pub fn retreat(&mut self) -> Option<OnboardingStep> {
        self.index = self.index.checked_sub(1)?;
        Some(self.current())
    }
}

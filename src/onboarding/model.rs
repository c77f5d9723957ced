//! Onboarding form state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityEditor;
use crate::locations::LocationSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Everything the user has typed or picked so far.
#[derive(Debug, Clone, Default)]
pub struct OnboardingForm {
    pub full_name: String,
    pub birth_year: String,
    pub gender: Option<Gender>,
    pub location: Option<LocationSelection>,

    /// Tutor: selected school types, in selection order.
    pub school_type_ids: Vec<String>,
    /// Tutor: selected grades per school type.
    pub grades_by_school_type: BTreeMap<String, Vec<String>>,

    /// Student: the single school type.
    pub school_type_id: Option<String>,
    /// Student: the single grade.
    pub grade_id: Option<String>,
    pub school_name: String,

    pub bio: String,

    /// Tutor lessons or student interests, in selection order.
    pub lesson_type_ids: Vec<String>,
    /// Tutor: raw price input per lesson type, in whole currency units.
    pub prices: BTreeMap<String, String>,

    pub availability: AvailabilityEditor,
    pub photo_uploaded: bool,
}

/// Add `id` if absent, remove it if present.
pub(crate) fn toggle(list: &mut Vec<String>, id: &str) -> bool {
    if let Some(pos) = list.iter().position(|x| x == id) {
        list.remove(pos);
        false
    } else {
        list.push(id.to_string());
        true
    }
}

impl OnboardingForm {
    /// Deselecting a school type drops its grades.
    pub fn toggle_school_type(&mut self, school_type_id: &str) -> bool {
        let selected = toggle(&mut self.school_type_ids, school_type_id);
        if !selected {
            self.grades_by_school_type.remove(school_type_id);
        }
        selected
    }

    pub fn toggle_grade(&mut self, school_type_id: &str, grade_id: &str) -> bool {
        toggle(
            self.grades_by_school_type
                .entry(school_type_id.to_string())
                .or_default(),
            grade_id,
        )
    }

    /// Student school type. Changing it clears the grade.
    pub fn select_school_type(&mut self, school_type_id: &str) {
        if self.school_type_id.as_deref() != Some(school_type_id) {
            self.grade_id = None;
        }
        self.school_type_id = Some(school_type_id.to_string());
    }

    pub fn toggle_lesson(&mut self, lesson_type_id: &str) -> bool {
        toggle(&mut self.lesson_type_ids, lesson_type_id)
    }

    /// Grades of the selected school types only.
    pub fn selected_grades(&self) -> BTreeMap<String, Vec<String>> {
        self.school_type_ids
            .iter()
            .map(|st| {
                let grades = self.grades_by_school_type.get(st).cloned().unwrap_or_default();
                (st.clone(), grades)
            })
            .collect()
    }
}

//! Per-step validation. Each check returns the step's data record on
//! success and the message to show on failure.

use serde_json::{Value, json};

use super::model::OnboardingForm;
use super::state::OnboardingStep;
use crate::error::ValidationError;
use crate::i18n::Message;
use crate::model::Role;
use crate::tutor::parse_price_cents;

/// A priced lesson ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLesson {
    pub lesson_type_id: String,
    pub price_per_hour_cents: i64,
}

/// Validate `step` and build its data record.
pub fn validate_step(
    step: OnboardingStep,
    role: Role,
    form: &OnboardingForm,
) -> Result<Value, Message> {
    match step {
        OnboardingStep::PersonalInfo => personal_info(form),
        OnboardingStep::Location => location(form),
        OnboardingStep::Education => match role {
            Role::Tutor => tutor_education(form),
            Role::Student => student_education(form),
        },
        OnboardingStep::Bio => bio(form),
        OnboardingStep::LessonsPricing => {
            priced_lessons(form)?;
            Ok(json!({ "lesson_type_ids": form.lesson_type_ids, "prices": form.prices }))
        }
        OnboardingStep::LessonInterests => Ok(json!({ "lesson_interests": form.lesson_type_ids })),
        OnboardingStep::Availability => {
            Ok(json!({ "availability_slots": form.availability.slots() }))
        }
        OnboardingStep::Photo => Ok(json!({ "photo_uploaded": form.photo_uploaded })),
        OnboardingStep::Review => Ok(json!({})),
    }
}

fn personal_info(form: &OnboardingForm) -> Result<Value, Message> {
    let name = form.full_name.trim();
    let birth_year = form.birth_year.trim();
    let Some(gender) = form.gender.filter(|_| !name.is_empty() && !birth_year.is_empty()) else {
        return Err(Message::FillAllFields);
    };
    Ok(json!({ "full_name": name, "birth_year": birth_year, "gender": gender }))
}

fn location(form: &OnboardingForm) -> Result<Value, Message> {
    match &form.location {
        Some(selection) if !selection.location_id.is_empty() => {
            Ok(json!({ "location_id": selection.location_id }))
        }
        _ => Err(Message::SelectLocationError),
    }
}

/// At least one school type, and at least one grade for each of them.
pub fn tutor_education(form: &OnboardingForm) -> Result<Value, Message> {
    if form.school_type_ids.is_empty() {
        return Err(Message::SelectSchoolType);
    }
    let grades = form.selected_grades();
    if grades.values().any(Vec::is_empty) {
        return Err(Message::SelectAtLeastOneGrade);
    }
    Ok(json!({
        "school_type_ids": form.school_type_ids,
        "grades_by_school_type": grades,
    }))
}

/// Exactly one school type and one grade; the school name is optional.
pub fn student_education(form: &OnboardingForm) -> Result<Value, Message> {
    match (&form.school_type_id, &form.grade_id) {
        (Some(school_type_id), Some(grade_id)) => Ok(json!({
            "school_type_id": school_type_id,
            "grade_id": grade_id,
            "school_name": form.school_name.trim(),
        })),
        _ => Err(Message::FillAllFields),
    }
}

fn bio(form: &OnboardingForm) -> Result<Value, Message> {
    let bio = form.bio.trim();
    if bio.is_empty() {
        return Err(Message::BioRequired);
    }
    Ok(json!({ "bio": bio }))
}

/// At least one lesson, each with a positive whole price.
pub fn priced_lessons(form: &OnboardingForm) -> Result<Vec<PricedLesson>, Message> {
    if form.lesson_type_ids.is_empty() {
        return Err(Message::LessonPriceRequired);
    }
    form.lesson_type_ids
        .iter()
        .map(|id| {
            let raw = form.prices.get(id).map(String::as_str).unwrap_or("");
            let cents = parse_price_cents(raw).map_err(|e| match e {
                ValidationError::Empty(_) => Message::EnterPriceForAll,
                _ => Message::InvalidPrice,
            })?;
            Ok(PricedLesson {
                lesson_type_id: id.clone(),
                price_per_hour_cents: cents,
            })
        })
        .collect()
}

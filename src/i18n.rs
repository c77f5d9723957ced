//! UI language and localized user-facing messages.
//!
//! Translations live in `locales/*.yml` and are compiled in by `rust-i18n`.
//! Every message the core surfaces to a user goes through [`Message`], so a
//! missing translation is a compile-visible variant rather than a stray key.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Supported UI languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Tr => "tr",
        }
    }

    /// Normalise a language tag: `"tr-TR"`, `"tr_TR.UTF-8"` and `"tr"` map to
    /// Turkish, everything else to English.
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag
            .trim()
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if lang == "tr" { Self::Tr } else { Self::En }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Server-provided text keyed by language code.
pub type LocalizedText = BTreeMap<String, String>;

/// Resolve localized server text: requested language, then English, then
/// Turkish, then empty.
pub fn localized<'a>(text: &'a LocalizedText, locale: Locale) -> Cow<'a, str> {
    text.get(locale.as_str())
        .or_else(|| text.get("en"))
        .or_else(|| text.get("tr"))
        .map(|s| Cow::Borrowed(s.as_str()))
        .unwrap_or(Cow::Borrowed(""))
}

/// A user-facing message with its interpolation arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ErrorGeneric,
    ErrorLoadingData,
    PleaseWait,
    PhoneInvalid,
    OtpInvalid,
    ResendIn { seconds: u64 },
    FillAllFields,
    SelectLocationError,
    SelectSchoolType,
    SelectAtLeastOneGrade,
    BioRequired,
    LessonPriceRequired,
    EnterPriceForAll,
    InvalidPrice,
    SelectCountry,
    SelectState,
    SelectCity,
    SelectDistrict,
    SelectLocation,
    HoursSelectedDay { count: usize },
    HoursSelectedWeek { total: usize },
    ApprovalApproved,
    ApprovalRejected,
    ContentBlocked,
    SupportOpen,
    SupportReplied,
    SupportClosed,
}

impl Message {
    /// Render in the given language.
    pub fn render(&self, locale: Locale) -> String {
        let l = locale.as_str();
        match self {
            Self::ErrorGeneric => t!("common.error_generic", locale = l).to_string(),
            Self::ErrorLoadingData => t!("common.error_loading_data", locale = l).to_string(),
            Self::PleaseWait => t!("common.please_wait", locale = l).to_string(),
            Self::PhoneInvalid => t!("auth.phone_invalid", locale = l).to_string(),
            Self::OtpInvalid => t!("auth.otp_invalid", locale = l).to_string(),
            Self::ResendIn { seconds } => {
                t!("auth.resend_in", locale = l, seconds = seconds).to_string()
            }
            Self::FillAllFields => t!("onboarding.fill_all_fields", locale = l).to_string(),
            Self::SelectLocationError => {
                t!("onboarding.select_location_error", locale = l).to_string()
            }
            Self::SelectSchoolType => t!("onboarding.select_school_type", locale = l).to_string(),
            Self::SelectAtLeastOneGrade => {
                t!("onboarding.select_at_least_one_grade", locale = l).to_string()
            }
            Self::BioRequired => t!("onboarding.bio_required", locale = l).to_string(),
            Self::LessonPriceRequired => {
                t!("onboarding.lesson_price_required", locale = l).to_string()
            }
            Self::EnterPriceForAll => t!("onboarding.enter_price_for_all", locale = l).to_string(),
            Self::InvalidPrice => t!("onboarding.invalid_price", locale = l).to_string(),
            Self::SelectCountry => t!("onboarding.select_country", locale = l).to_string(),
            Self::SelectState => t!("onboarding.select_state", locale = l).to_string(),
            Self::SelectCity => t!("onboarding.select_city", locale = l).to_string(),
            Self::SelectDistrict => t!("onboarding.select_district", locale = l).to_string(),
            Self::SelectLocation => t!("onboarding.select_location", locale = l).to_string(),
            Self::HoursSelectedDay { count } => {
                t!("availability.hours_selected_day", locale = l, count = count).to_string()
            }
            Self::HoursSelectedWeek { total } => {
                t!("availability.hours_selected_week", locale = l, total = total).to_string()
            }
            Self::ApprovalApproved => t!("notifications.approval_approved", locale = l).to_string(),
            Self::ApprovalRejected => t!("notifications.approval_rejected", locale = l).to_string(),
            Self::ContentBlocked => t!("chat.content_blocked", locale = l).to_string(),
            Self::SupportOpen => t!("support.open", locale = l).to_string(),
            Self::SupportReplied => t!("support.replied", locale = l).to_string(),
            Self::SupportClosed => t!("support.closed", locale = l).to_string(),
        }
    }
}

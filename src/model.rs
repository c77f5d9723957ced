//! Wire types shared with the Dersimiz REST API.
//!
//! Field names follow the server's snake_case JSON. Optional fields carry
//! `#[serde(default)]` because the server omits them freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::i18n::LocalizedText;

/// Marketplace role chosen after the first login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tutor,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tutor => write!(f, "tutor"),
            Self::Student => write!(f, "student"),
        }
    }
}

/// Admin review state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_rejected: bool,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn approval_status(&self) -> ApprovalStatus {
        if self.is_approved {
            ApprovalStatus::Approved
        } else if self.is_rejected {
            ApprovalStatus::Rejected
        } else {
            ApprovalStatus::Pending
        }
    }

    pub fn is_tutor(&self) -> bool {
        self.role == Some(Role::Tutor)
    }
}

/// A subject a tutor can teach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonType {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// A priced lesson offered by a tutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorLesson {
    pub id: String,
    pub lesson_type_id: String,
    #[serde(default)]
    pub lesson_type: Option<LessonType>,
    pub price_per_hour_cents: i64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolType {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: String,
    pub school_type_id: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// A node of the server's location hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationItem {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Reference data for the onboarding wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingData {
    #[serde(default)]
    pub locations: Vec<LocationItem>,
    #[serde(default)]
    pub school_types: Vec<SchoolType>,
    #[serde(default, alias = "grade_options")]
    pub grades: Vec<Grade>,
    #[serde(default)]
    pub lesson_types: Vec<LessonType>,
}

impl OnboardingData {
    pub fn grades_for(&self, school_type_id: &str) -> impl Iterator<Item = &Grade> {
        self.grades
            .iter()
            .filter(move |g| g.school_type_id == school_type_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: i32,
    pub title: String,
    #[serde(default)]
    pub body_markdown: String,
}

// ── Chat ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPeer {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub other: ConversationPeer,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    ContactShare,
    DemoRequest,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Phone number carried by a `contact_share` message.
    pub fn shared_phone_number(&self) -> Option<&str> {
        if self.kind != MessageType::ContactShare {
            return None;
        }
        self.payload.as_ref()?.get("phone_number")?.as_str()
    }
}

// ── Notifications & support ─────────────────────────────────────────────

/// In-app notification (`/me/notifications`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// ── Discovery ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorSearchResult {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub lessons: Vec<TutorLesson>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub availability_slots: Vec<serde_json::Value>,
}

impl TutorSearchResult {
    /// Hourly price of the first listed lesson, in cents.
    pub fn headline_price_cents(&self) -> Option<i64> {
        self.lessons
            .first()
            .map(|l| l.price_per_hour_cents)
            .filter(|c| *c > 0)
    }
}

/// A student in a tutor's contact list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// ── Subscription ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub display_name: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub max_students: Option<i64>,
    #[serde(default)]
    pub search_visibility_boost: Option<f64>,
    #[serde(default)]
    pub profile_badge: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub display_name: LocalizedText,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    pub price_cents: i64,
    pub duration_days: i64,
    #[serde(default)]
    pub search_ranking_boost: f64,
    #[serde(default)]
    pub badge_text: Option<LocalizedText>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBoosterName {
    #[serde(default)]
    pub display_name: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBooster {
    pub booster: ActiveBoosterName,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentSubscription {
    #[serde(default)]
    pub current_subscription: Option<serde_json::Value>,
    #[serde(default)]
    pub active_boosters: Vec<ActiveBooster>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub billing_provider: String,
    pub created_at: DateTime<Utc>,
}

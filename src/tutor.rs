//! Tutor profile management: priced lessons, weekly availability and the
//! grades a tutor teaches.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::{ApiRequest, Transport, decode_list};
use crate::availability::AvailabilitySlot;
use crate::error::{ApiError, Result, ValidationError};
use crate::model::TutorLesson;

pub const DEFAULT_CURRENCY: &str = "TRY";

/// Parse an hourly price typed in whole currency units into cents.
///
/// Blank input is [`ValidationError::Empty`]; anything that is not a
/// positive integer is [`ValidationError::InvalidPrice`].
pub fn parse_price_cents(input: &str) -> std::result::Result<i64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("price"));
    }
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|units| *units > 0)
        .and_then(|units| units.checked_mul(100))
        .ok_or_else(|| ValidationError::InvalidPrice(trimmed.to_string()))
}

/// A grade the tutor currently teaches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TutorGrade {
    pub id: String,
    #[serde(default)]
    pub school_type_id: Option<String>,
}

/// What [`TutorService::sync_grades`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeSync {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub struct TutorService {
    transport: Arc<dyn Transport>,
}

impl TutorService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn lessons(&self) -> Result<Vec<TutorLesson>> {
        let data = self.transport.send(ApiRequest::get("/tutor/lessons")).await?;
        Ok(decode_list(data, "lessons")?)
    }

    /// Add a lesson priced in whole currency units.
    pub async fn add_lesson(&self, lesson_type_id: &str, price_units: &str) -> Result<()> {
        let cents = parse_price_cents(price_units)?;
        self.add_lesson_cents(lesson_type_id, cents).await?;
        Ok(())
    }

    pub async fn add_lesson_cents(
        &self,
        lesson_type_id: &str,
        price_per_hour_cents: i64,
    ) -> std::result::Result<(), ApiError> {
        self.transport
            .send(ApiRequest::post(
                "/tutor/lessons",
                json!({
                    "lesson_type_id": lesson_type_id,
                    "price_per_hour_cents": price_per_hour_cents,
                    "currency": DEFAULT_CURRENCY,
                }),
            ))
            .await?;
        info!(lesson_type_id, price_per_hour_cents, "Tutor lesson added");
        Ok(())
    }

    pub async fn remove_lesson(&self, id: &str) -> Result<()> {
        self.transport
            .send(ApiRequest::delete(format!("/tutor/lessons/{id}")))
            .await?;
        Ok(())
    }

    pub async fn availability(&self) -> Result<Vec<AvailabilitySlot>> {
        let data = self
            .transport
            .send(ApiRequest::get("/tutor/availability"))
            .await?;
        Ok(decode_list(data, "slots")?)
    }

    /// Replace the whole weekly availability.
    pub async fn save_availability(
        &self,
        slots: &[AvailabilitySlot],
    ) -> std::result::Result<(), ApiError> {
        self.transport
            .send(ApiRequest::put(
                "/tutor/availability",
                json!({ "slots": slots }),
            ))
            .await?;
        info!(slots = slots.len(), "Availability saved");
        Ok(())
    }

    pub async fn grades(&self) -> Result<Vec<TutorGrade>> {
        let data = self.transport.send(ApiRequest::get("/tutor/grades")).await?;
        Ok(decode_list(data, "grades")?)
    }

    /// Make the taught grades equal `desired`. Removals go first; calls run
    /// one at a time and are not rolled back on failure.
    pub async fn sync_grades(&self, desired: &[String]) -> Result<GradeSync> {
        let current: BTreeSet<String> = self.grades().await?.into_iter().map(|g| g.id).collect();
        let desired: BTreeSet<String> = desired.iter().cloned().collect();

        let removed: Vec<String> = current.difference(&desired).cloned().collect();
        let added: Vec<String> = desired.difference(&current).cloned().collect();

        for id in &removed {
            self.transport
                .send(ApiRequest::delete(format!("/tutor/grades/{id}")))
                .await?;
        }
        for id in &added {
            self.transport
                .send(ApiRequest::post("/tutor/grades", json!({ "grade_id": id })))
                .await?;
        }
        info!(added = added.len(), removed = removed.len(), "Tutor grades synced");
        Ok(GradeSync { added, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::error::Error;
    use crate::testing::{StubTransport, server_error};

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price_cents("500"), Ok(50_000));
        assert_eq!(parse_price_cents(" 1 "), Ok(100));
        assert_eq!(parse_price_cents(""), Err(ValidationError::Empty("price")));
        assert_eq!(parse_price_cents("   "), Err(ValidationError::Empty("price")));
        assert!(matches!(parse_price_cents("0"), Err(ValidationError::InvalidPrice(_))));
        assert!(matches!(parse_price_cents("-5"), Err(ValidationError::InvalidPrice(_))));
        assert!(matches!(parse_price_cents("abc"), Err(ValidationError::InvalidPrice(_))));
        assert!(matches!(parse_price_cents("12.5"), Err(ValidationError::InvalidPrice(_))));
        assert!(parse_price_cents(&i64::MAX.to_string()).is_err());
    }

    #[tokio::test]
    async fn add_lesson_posts_cents() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Post, "/tutor/lessons", json!({}));
        let service = TutorService::new(stub.clone());

        service.add_lesson("math", "450").await.unwrap();
        let sent = stub.requests_to(Method::Post, "/tutor/lessons");
        assert_eq!(
            sent[0].body,
            Some(json!({"lesson_type_id": "math", "price_per_hour_cents": 45000, "currency": "TRY"}))
        );

        let err = service.add_lesson("math", "0").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidPrice(_))));
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn lessons_accept_bare_or_wrapped_lists() {
        let stub = Arc::new(StubTransport::new());
        let lesson = json!({"id": "l1", "lesson_type_id": "math", "price_per_hour_cents": 100, "currency": "TRY"});
        stub.on(Method::Get, "/tutor/lessons", json!([lesson.clone()]));
        stub.on(Method::Get, "/tutor/lessons", json!({"lessons": [lesson]}));
        let service = TutorService::new(stub);
        assert_eq!(service.lessons().await.unwrap().len(), 1);
        assert_eq!(service.lessons().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_lesson_uses_id_path() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Delete, "/tutor/lessons/l9", json!({}));
        TutorService::new(stub.clone()).remove_lesson("l9").await.unwrap();
        assert_eq!(stub.requests()[0].method, Method::Delete);
    }

    #[tokio::test]
    async fn save_availability_replaces_all() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Put, "/tutor/availability", json!({}));
        let slots = vec![AvailabilitySlot::new(1, 23).unwrap()];
        TutorService::new(stub.clone())
            .save_availability(&slots)
            .await
            .unwrap();
        assert_eq!(
            stub.requests()[0].body,
            Some(json!({"slots": [{"day": 1, "start": "23:00", "end": "24:00"}]}))
        );
    }

    #[tokio::test]
    async fn sync_grades_diffs() {
        let stub = Arc::new(StubTransport::new());
        stub.on(
            Method::Get,
            "/tutor/grades",
            json!({"grades": [{"id": "g1"}, {"id": "g2"}]}),
        );
        stub.on(Method::Delete, "/tutor/grades/g1", json!({}));
        stub.on(Method::Post, "/tutor/grades", json!({}));
        let service = TutorService::new(stub.clone());

        let sync = service
            .sync_grades(&["g2".to_string(), "g3".to_string()])
            .await
            .unwrap();
        assert_eq!(sync.removed, vec!["g1"]);
        assert_eq!(sync.added, vec!["g3"]);
        let posts = stub.requests_to(Method::Post, "/tutor/grades");
        assert_eq!(posts[0].body, Some(json!({"grade_id": "g3"})));
    }

    #[tokio::test]
    async fn sync_grades_stops_on_failure() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Get, "/tutor/grades", json!({"grades": [{"id": "g1"}]}));
        stub.fail(Method::Delete, "/tutor/grades/g1", server_error(500, "X", "nope"));
        let service = TutorService::new(stub.clone());

        assert!(service.sync_grades(&["g2".to_string()]).await.is_err());
        assert!(stub.requests_to(Method::Post, "/tutor/grades").is_empty());
    }
}

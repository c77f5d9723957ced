//! Tutor search, favorites and the role dashboards.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, decode_list};
use crate::error::Result;
use crate::model::{StudentSummary, TutorSearchResult};

/// Search filters. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TutorSearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl TutorSearchQuery {
    pub fn lesson(mut self, lesson_type_id: impl Into<String>) -> Self {
        self.lesson_type_id = Some(lesson_type_id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into()).filter(|s: &String| !s.is_empty());
        self
    }
}

pub struct DiscoveryService {
    transport: Arc<dyn Transport>,
}

impl DiscoveryService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn search(&self, query: &TutorSearchQuery) -> Result<Vec<TutorSearchResult>> {
        let data = self
            .transport
            .send(ApiRequest::post("/student/search", json!(query)))
            .await?;
        let tutors: Vec<TutorSearchResult> = decode_list(data, "tutors")?;
        debug!(?query, results = tutors.len(), "Tutor search");
        Ok(tutors)
    }

    pub async fn favorites(&self) -> Result<Vec<TutorSearchResult>> {
        let data = self
            .transport
            .send(ApiRequest::get("/student/favorites"))
            .await?;
        Ok(decode_list(data, "tutors")?)
    }

    pub async fn set_favorite(&self, tutor_id: &str, favorite: bool) -> Result<()> {
        let path = format!("/student/favorites/{tutor_id}");
        let request = if favorite {
            ApiRequest::post_empty(path)
        } else {
            ApiRequest::delete(path)
        };
        self.transport.send(request).await?;
        info!(tutor_id, favorite, "Favorite updated");
        Ok(())
    }

    pub async fn student_dashboard(&self) -> Result<Map<String, Value>> {
        self.dashboard("/student/dashboard").await
    }

    pub async fn tutor_dashboard(&self) -> Result<Map<String, Value>> {
        self.dashboard("/tutor/dashboard").await
    }

    async fn dashboard(&self, path: &str) -> Result<Map<String, Value>> {
        let data = self.transport.send(ApiRequest::get(path)).await?;
        match data {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    pub async fn tutor_students(&self) -> Result<Vec<StudentSummary>> {
        let data = self.transport.send(ApiRequest::get("/tutor/students")).await?;
        Ok(decode_list(data, "students")?)
    }
}

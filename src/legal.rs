//! Legal documents the user has to accept, and where to go afterwards.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::api::{ApiRequest, Transport, decode_list};
use crate::error::Result;
use crate::model::{LegalDocument, User};
use crate::session::PostLoginRoute;

pub struct LegalService {
    transport: Arc<dyn Transport>,
}

impl LegalService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Documents not yet accepted, including new versions of accepted ones.
    pub async fn required(&self) -> Result<Vec<LegalDocument>> {
        let data = self.transport.send(ApiRequest::get("/legal/required")).await?;
        Ok(decode_list(data, "required_documents")?)
    }

    /// Accept every document in `documents`. Returns false when there was
    /// nothing to accept.
    pub async fn accept_all(&self, documents: &[LegalDocument]) -> Result<bool> {
        if documents.is_empty() {
            return Ok(false);
        }
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        self.transport
            .send(ApiRequest::post("/legal/accept", json!({ "document_ids": ids })))
            .await?;
        info!(count = ids.len(), "Legal documents accepted");
        Ok(true)
    }
}

/// Next screen once legal documents are settled.
pub fn route_after_legal(user: Option<&User>) -> PostLoginRoute {
    match user {
        None => PostLoginRoute::PhoneInput,
        Some(u) if u.role.is_none() => PostLoginRoute::RoleSelection,
        Some(u) if !u.onboarding_completed => PostLoginRoute::Onboarding,
        Some(_) => PostLoginRoute::Main,
    }
}

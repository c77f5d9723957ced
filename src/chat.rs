//! Chat between students and tutors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, decode, decode_field, decode_list};
use crate::error::{ApiError, Result};
use crate::i18n::{Locale, Message as Text};
use crate::model::{Conversation, Message};

pub const THREAD_PAGE_SIZE: u32 = 50;
pub const CONTENT_BLOCKED: &str = "CONTENT_BLOCKED";

/// Why a text message was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Nothing but whitespace to send.
    Empty,
    /// The server refused the content. The draft is discarded.
    ContentBlocked,
    /// Any other failure. The draft should be put back.
    Failed { message: String, draft: String },
}

impl SendFailure {
    fn from_error(e: &ApiError, draft: &str) -> Self {
        if e.code() == Some(CONTENT_BLOCKED) {
            Self::ContentBlocked
        } else {
            Self::Failed {
                message: e.user_message(),
                draft: draft.to_string(),
            }
        }
    }

    pub fn message(&self, locale: Locale) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::ContentBlocked => Some(Text::ContentBlocked.render(locale)),
            Self::Failed { message, .. } => Some(message.clone()),
        }
    }

    /// Text to put back in the input box.
    pub fn restored_draft(&self) -> Option<&str> {
        match self {
            Self::Failed { draft, .. } => Some(draft),
            _ => None,
        }
    }
}

/// Result of starting a conversation with a tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedConversation {
    pub conversation_id: String,
    /// False when the conversation already existed.
    pub created: bool,
}

#[derive(Deserialize)]
struct ConversationRef {
    id: String,
}

pub struct ChatService {
    transport: Arc<dyn Transport>,
}

impl ChatService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let data = self
            .transport
            .send(ApiRequest::get("/chat/conversations"))
            .await?;
        Ok(decode_list(data, "conversations")?)
    }

    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let data = self
            .transport
            .send(
                ApiRequest::get(format!("/chat/conversations/{conversation_id}/messages"))
                    .with_query("limit", THREAD_PAGE_SIZE.to_string()),
            )
            .await?;
        Ok(decode_list(data, "messages")?)
    }

    /// Read receipt. Failures are ignored.
    pub async fn mark_read(&self, conversation_id: &str) {
        let request = ApiRequest::post_empty(format!("/chat/conversations/{conversation_id}/read"));
        if let Err(e) = self.transport.send(request).await {
            debug!(conversation_id, error = %e, "Read receipt failed");
        }
    }

    /// Load the latest page of a thread and mark it read.
    pub async fn open_thread(&self, conversation_id: &str) -> Result<ChatThread> {
        let messages = self.messages(conversation_id).await?;
        self.mark_read(conversation_id).await;
        Ok(ChatThread {
            conversation_id: conversation_id.to_string(),
            messages,
            draft: String::new(),
        })
    }

    pub async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> std::result::Result<Option<Message>, SendFailure> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendFailure::Empty);
        }
        self.post_message(
            format!("/chat/conversations/{conversation_id}/messages"),
            json!({ "type": "text", "content": text }),
        )
        .await
        .map_err(|e| {
            debug!(conversation_id, error = %e, "Chat message not sent");
            SendFailure::from_error(&e, text)
        })
    }

    pub async fn share_contact(&self, conversation_id: &str) -> Result<Option<Message>> {
        let message = self
            .post_message(
                format!("/chat/conversations/{conversation_id}/share-contact"),
                json!({}),
            )
            .await?;
        info!(conversation_id, "Contact shared");
        Ok(message)
    }

    pub async fn request_demo(
        &self,
        conversation_id: &str,
        lesson_type_id: Option<&str>,
    ) -> Result<Option<Message>> {
        let mut body = Map::new();
        if let Some(id) = lesson_type_id.filter(|id| !id.is_empty()) {
            body.insert("lesson_type_id".into(), Value::from(id));
        }
        body.insert("preferred_times".into(), json!([]));
        let message = self
            .post_message(
                format!("/chat/conversations/{conversation_id}/demo-request"),
                Value::Object(body),
            )
            .await?;
        info!(conversation_id, "Demo requested");
        Ok(message)
    }

    pub async fn start_conversation(&self, tutor_id: &str) -> Result<StartedConversation> {
        let data = self
            .transport
            .send(ApiRequest::post(
                "/chat/conversations",
                json!({ "tutor_id": tutor_id }),
            ))
            .await?;
        let created = data.get("created").and_then(Value::as_bool).unwrap_or(false);
        let conversation: ConversationRef = decode_field(data, "conversation")?;
        Ok(StartedConversation {
            conversation_id: conversation.id,
            created,
        })
    }

    async fn post_message(
        &self,
        path: String,
        body: Value,
    ) -> std::result::Result<Option<Message>, ApiError> {
        let data = self.transport.send(ApiRequest::post(path, body)).await?;
        match data.get("message") {
            Some(message) if !message.is_null() => Ok(Some(decode(message.clone())?)),
            _ => Ok(None),
        }
    }
}

/// An open conversation: loaded messages plus the unsent draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatThread {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub draft: String,
}

impl ChatThread {
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Send the draft. The draft is cleared up front and restored unless the
    /// content was blocked. The sent message is appended on success.
    pub async fn send(&mut self, chat: &ChatService) -> std::result::Result<(), SendFailure> {
        let text = std::mem::take(&mut self.draft);
        match chat.send_text(&self.conversation_id, &text).await {
            Ok(message) => {
                self.messages.extend(message);
                Ok(())
            }
            Err(failure) => {
                match &failure {
                    SendFailure::Empty => self.draft = text,
                    SendFailure::ContentBlocked => {}
                    SendFailure::Failed { draft, .. } => self.draft = draft.clone(),
                }
                Err(failure)
            }
        }
    }

    pub async fn share_contact(&mut self, chat: &ChatService) -> Result<()> {
        let message = chat.share_contact(&self.conversation_id).await?;
        self.messages.extend(message);
        Ok(())
    }

    pub async fn request_demo(
        &mut self,
        chat: &ChatService,
        lesson_type_id: Option<&str>,
    ) -> Result<()> {
        let message = chat
            .request_demo(&self.conversation_id, lesson_type_id)
            .await?;
        self.messages.extend(message);
        Ok(())
    }
}

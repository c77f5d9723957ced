//! Support conversation with the admins, and the unread-reply counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, decode_field};
use crate::error::{Result, ValidationError};
use crate::i18n::{Locale, Message};
use crate::model::SupportMessage;
use crate::poller::{PollerHandle, spawn_poller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Replied,
    Closed,
}

impl TicketStatus {
    /// Unknown statuses read as closed.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "open" => Self::Open,
            "replied" => Self::Replied,
            _ => Self::Closed,
        }
    }

    pub fn label(&self, locale: Locale) -> String {
        match self {
            Self::Open => Message::SupportOpen,
            Self::Replied => Message::SupportReplied,
            Self::Closed => Message::SupportClosed,
        }
        .render(locale)
    }
}

#[derive(Debug, Deserialize)]
struct Ticket {
    #[serde(default)]
    status: Option<String>,
}

/// The user's single support thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportConversation {
    /// `None` until the first message opens a ticket.
    pub status: Option<TicketStatus>,
    pub messages: Vec<SupportMessage>,
}

pub struct SupportService {
    transport: Arc<dyn Transport>,
}

impl SupportService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn conversation(&self) -> Result<SupportConversation> {
        let data = self
            .transport
            .send(ApiRequest::get("/support/conversation"))
            .await?;
        let ticket: Option<Ticket> = decode_field(data.clone(), "ticket")?;
        let messages: Vec<SupportMessage> = decode_field(data, "messages")?;
        Ok(SupportConversation {
            status: ticket
                .and_then(|t| t.status)
                .map(|s| TicketStatus::parse(&s)),
            messages,
        })
    }

    /// Send a message and reload the thread. A blank subject is omitted.
    pub async fn send(&self, body: &str, subject: Option<&str>) -> Result<SupportConversation> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ValidationError::Empty("message").into());
        }
        let mut payload = Map::new();
        payload.insert("body".into(), Value::from(body));
        if let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) {
            payload.insert("subject".into(), Value::from(subject));
        }
        self.transport
            .send(ApiRequest::post("/support/messages", Value::Object(payload)))
            .await?;
        info!("Support message sent");
        self.conversation().await
    }
}

/// Count of admin replies the user has not seen.
pub struct SupportUnread {
    transport: Arc<dyn Transport>,
    count: AtomicU32,
    on_support_screen: AtomicBool,
}

impl SupportUnread {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            count: AtomicU32::new(0),
            on_support_screen: AtomicBool::new(false),
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn set_on_support_screen(&self, value: bool) {
        self.on_support_screen.store(value, Ordering::Release);
    }

    pub fn is_on_support_screen(&self) -> bool {
        self.on_support_screen.load(Ordering::Acquire)
    }

    /// Refresh the count. Any failure resets it to zero.
    pub async fn fetch_count(&self) -> u32 {
        let count = match self
            .transport
            .send(ApiRequest::get("/support/unread-count"))
            .await
        {
            Ok(data) => data
                .get("count")
                .and_then(Value::as_u64)
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(0),
            Err(e) => {
                debug!(error = %e, "Support unread fetch failed");
                0
            }
        };
        self.count.store(count, Ordering::Release);
        count
    }

    /// Mark the thread read. The count is left alone when the call fails.
    pub async fn mark_read(&self) {
        match self
            .transport
            .send(ApiRequest::post_empty("/support/conversation/mark-read"))
            .await
        {
            Ok(_) => self.count.store(0, Ordering::Release),
            Err(e) => debug!(error = %e, "Support mark-read failed"),
        }
    }
}

/// Poll the unread count, skipping ticks while the support screen is open.
pub fn spawn_unread_poller(unread: Arc<SupportUnread>, every: Duration) -> PollerHandle {
    spawn_poller("support-unread", every, move || {
        let unread = Arc::clone(&unread);
        async move {
            if !unread.is_on_support_screen() {
                unread.fetch_count().await;
            }
        }
    })
}

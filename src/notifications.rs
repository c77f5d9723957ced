//! Notifications: routing of opened push notifications, the in-app
//! notification list, and the approval-status watcher for tutors.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, decode_list};
use crate::error::Result;
use crate::i18n::{Locale, Message};
use crate::model::Notification;
use crate::poller::{PollerHandle, spawn_poller};
use crate::session::SessionStore;

pub const APPROVAL_STATUS: &str = "approval_status";
pub const APPROVAL_CHECK_LIMIT: u32 = 10;

/// Payload attached to a push notification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationData {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an opened notification should take the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Conversation {
        id: String,
        sender_id: Option<String>,
        sender_name: Option<String>,
    },
    SupportTicket { id: Option<String> },
    Notifications,
    Unknown,
}

impl NotificationTarget {
    pub fn resolve(data: &NotificationData) -> Self {
        match (data.kind.as_deref(), &data.conversation_id) {
            (Some("new_message"), Some(id)) => Self::Conversation {
                id: id.clone(),
                sender_id: data.sender_id.clone(),
                sender_name: data.sender_name.clone(),
            },
            (Some("support_reply"), _) => Self::SupportTicket {
                id: data.ticket_id.clone(),
            },
            (Some(APPROVAL_STATUS | "subscription" | "booster"), _) => Self::Notifications,
            _ => Self::Unknown,
        }
    }
}

/// Publishes a target for every notification the user opens.
pub struct NotificationRouter {
    session: Arc<SessionStore>,
    targets: broadcast::Sender<NotificationTarget>,
}

impl NotificationRouter {
    pub fn new(session: Arc<SessionStore>) -> Self {
        let (targets, _) = broadcast::channel(16);
        Self { session, targets }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationTarget> {
        self.targets.subscribe()
    }

    /// Route an opened notification. Ignored while signed out.
    pub async fn handle_open(&self, data: NotificationData) -> Option<NotificationTarget> {
        if !self.session.is_authenticated().await {
            debug!(kind = ?data.kind, "Notification opened while signed out");
            return None;
        }
        let target = NotificationTarget::resolve(&data);
        debug!(?target, "Notification opened");
        let _ = self.targets.send(target.clone());
        Some(target)
    }
}

pub struct NotificationService {
    transport: Arc<dyn Transport>,
}

impl NotificationService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<Notification>> {
        let mut request = ApiRequest::get("/me/notifications");
        if let Some(limit) = limit {
            request = request.with_query("limit", limit.to_string());
        }
        let data = self.transport.send(request).await?;
        Ok(decode_list(data, "notifications")?)
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        self.transport
            .send(ApiRequest::put_empty(format!("/me/notifications/{id}/read")))
            .await?;
        Ok(())
    }

    pub async fn mark_read_quietly(&self, id: &str) {
        if let Err(e) = self.mark_read(id).await {
            debug!(id, error = %e, "Mark notification read failed");
        }
    }

    /// Mark every unread item read, one call each.
    pub async fn mark_all_read(&self, notifications: &[Notification]) {
        for n in notifications.iter().filter(|n| !n.read) {
            self.mark_read_quietly(&n.id).await;
        }
    }
}

/// Outcome of an admin review of the tutor's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalNotice {
    Approved,
    Rejected,
    /// Any other status; carries the notification text.
    Other(String),
}

impl ApprovalNotice {
    fn from_notification(n: &Notification) -> Self {
        let status = n
            .data
            .as_ref()
            .and_then(|d| d.get("status"))
            .and_then(Value::as_str);
        match status {
            Some("approved") => Self::Approved,
            Some("rejected") => Self::Rejected,
            _ if !n.body.is_empty() => Self::Other(n.body.clone()),
            _ => Self::Other(n.title.clone()),
        }
    }

    pub fn message(&self, locale: Locale) -> String {
        match self {
            Self::Approved => Message::ApprovalApproved.render(locale),
            Self::Rejected => Message::ApprovalRejected.render(locale),
            Self::Other(text) => text.clone(),
        }
    }
}

/// Announces approval decisions to a signed-in tutor, once each.
pub struct ApprovalWatcher {
    notifications: NotificationService,
    session: Arc<SessionStore>,
    announced: Mutex<HashSet<String>>,
    notices: broadcast::Sender<ApprovalNotice>,
}

impl ApprovalWatcher {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            notifications: NotificationService::new(transport),
            session,
            announced: Mutex::new(HashSet::new()),
            notices,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalNotice> {
        self.notices.subscribe()
    }

    /// One check. Errors are swallowed; the session user is refreshed after
    /// a successful fetch.
    pub async fn check_once(&self) -> Vec<ApprovalNotice> {
        let is_tutor = self.session.user().await.is_some_and(|u| u.is_tutor());
        if !is_tutor {
            return Vec::new();
        }
        let list = match self.notifications.list(Some(APPROVAL_CHECK_LIMIT)).await {
            Ok(list) => list,
            Err(e) => {
                debug!(error = %e, "Approval check failed");
                return Vec::new();
            }
        };

        let fresh: Vec<Notification> = {
            let mut announced = self.announced.lock().unwrap_or_else(|e| e.into_inner());
            list.into_iter()
                .filter(|n| n.kind == APPROVAL_STATUS && !n.read)
                .filter(|n| announced.insert(n.id.clone()))
                .collect()
        };

        let mut notices = Vec::with_capacity(fresh.len());
        for n in &fresh {
            let notice = ApprovalNotice::from_notification(n);
            info!(id = %n.id, ?notice, "Approval status changed");
            let _ = self.notices.send(notice.clone());
            notices.push(notice);
            self.notifications.mark_read_quietly(&n.id).await;
        }
        self.session.hydrate().await;
        notices
    }
}

pub fn spawn_approval_poller(watcher: Arc<ApprovalWatcher>, every: Duration) -> PollerHandle {
    spawn_poller("approval", every, move || {
        let watcher = Arc::clone(&watcher);
        async move {
            watcher.check_once().await;
        }
    })
}

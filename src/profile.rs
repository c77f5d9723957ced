//! Profile management beyond the basic fields: avatar, completeness,
//! notification preferences and account deletion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiRequest, Transport, decode};
pub use crate::api::{UploadFile, UploadSource};
use crate::error::{ApiError, Result};
use crate::model::User;
use crate::session::SessionStore;

pub const AVATAR_FIELD: &str = "avatar";

/// Per-type push preferences. Unset fields keep the server default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_message: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_student_contact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_reply: Option<bool>,
    /// `"HH:MM"`.
    #[serde(default)]
    pub quiet_hours_start: Option<String>,
    #[serde(default)]
    pub quiet_hours_end: Option<String>,
}

pub struct ProfileService {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl ProfileService {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Upload a new avatar and return its URL.
    ///
    /// The session user is replaced with the returned user when there is
    /// one; otherwise the URL is patched in and approval goes back to
    /// pending.
    pub async fn upload_avatar(&self, file: UploadFile) -> Result<Option<String>> {
        let file_name = file.file_name.clone();
        let data = self
            .transport
            .upload("/profile/avatar", AVATAR_FIELD, file)
            .await?;
        let avatar_url = data
            .get("avatar_url")
            .and_then(Value::as_str)
            .map(str::to_string);

        match data.get("user").filter(|u| !u.is_null()) {
            Some(user) => {
                let user: User = decode(user.clone())?;
                self.session.set_user(Some(user)).await;
            }
            None => {
                if let Some(url) = &avatar_url {
                    let url = url.clone();
                    self.session
                        .modify_user(move |u| {
                            u.avatar_url = Some(url);
                            u.is_approved = false;
                            u.is_rejected = false;
                        })
                        .await;
                }
            }
        }
        info!(file = %file_name, "Avatar uploaded");
        Ok(avatar_url)
    }

    /// Profile completeness in percent. `None` when the server has no figure.
    pub async fn completeness(&self) -> Result<Option<u8>> {
        let data = self
            .transport
            .send(ApiRequest::get("/profile/completeness"))
            .await?;
        Ok(data
            .get("completeness")
            .and_then(Value::as_u64)
            .map(|p| p.min(100) as u8))
    }

    pub async fn notification_preferences(&self) -> Result<NotificationPreferences> {
        let mut data = self
            .transport
            .send(ApiRequest::get("/me/notification-preferences"))
            .await?;
        let prefs = match data.get_mut("notification_preferences") {
            Some(inner) => inner.take(),
            None => data,
        };
        if prefs.is_null() {
            return Ok(NotificationPreferences::default());
        }
        Ok(decode(prefs)?)
    }

    pub async fn set_notification_preferences(
        &self,
        prefs: &NotificationPreferences,
    ) -> Result<()> {
        let body = serde_json::to_value(prefs).map_err(ApiError::from)?;
        self.transport
            .send(ApiRequest::put("/me/notification-preferences", body))
            .await?;
        debug!(?prefs, "Notification preferences saved");
        Ok(())
    }

    /// Delete the account, then sign out locally.
    pub async fn delete_account(&self) -> Result<()> {
        self.transport.send(ApiRequest::delete("/profile")).await?;
        info!("Account deleted");
        self.session.logout().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::Method;
    use crate::config::ClientConfig;
    use crate::storage::MemoryCredentialStore;
    use crate::testing::{StubTransport, server_error, user_json};

    async fn service(stub: &Arc<StubTransport>) -> (ProfileService, Arc<SessionStore>) {
        let session = Arc::new(SessionStore::new(
            stub.clone(),
            Arc::new(MemoryCredentialStore::new()),
            &ClientConfig::default(),
        ));
        let mut user: User = serde_json::from_value(user_json("u1", Some("tutor"))).unwrap();
        user.is_approved = true;
        session.set_user(Some(user)).await;
        (ProfileService::new(stub.clone(), session.clone()), session)
    }

    fn photo() -> UploadFile {
        UploadFile::from_bytes(vec![0xFF, 0xD8], "me.jpg", "image/jpeg")
    }

    #[tokio::test]
    async fn avatar_upload_uses_returned_user() {
        let stub = Arc::new(StubTransport::new());
        let mut returned = user_json("u1", Some("tutor"));
        returned["avatar_url"] = json!("https://cdn/a.jpg");
        stub.on(
            Method::Post,
            "/profile/avatar",
            json!({"avatar_url": "https://cdn/a.jpg", "user": returned}),
        );
        let (profile, session) = service(&stub).await;

        let url = profile.upload_avatar(photo()).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn/a.jpg"));
        let uploads = stub.uploads();
        assert_eq!(uploads[0].0, "/profile/avatar");
        assert_eq!(uploads[0].1, "avatar");
        assert_eq!(uploads[0].2.file_name, "me.jpg");
        let user = session.user().await.unwrap();
        assert_eq!(user.avatar_url.as_deref(), Some("https://cdn/a.jpg"));
    }

    #[tokio::test]
    async fn avatar_upload_without_user_resets_approval() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Post, "/profile/avatar", json!({"avatar_url": "https://cdn/b.jpg"}));
        let (profile, session) = service(&stub).await;

        profile.upload_avatar(photo()).await.unwrap();
        let user = session.user().await.unwrap();
        assert_eq!(user.avatar_url.as_deref(), Some("https://cdn/b.jpg"));
        assert!(!user.is_approved);
        assert!(!user.is_rejected);
    }

    #[tokio::test]
    async fn avatar_upload_failure_leaves_user() {
        let stub = Arc::new(StubTransport::new());
        stub.fail(
            Method::Post,
            "/profile/avatar",
            server_error(413, "FILE_TOO_LARGE", "Image too large"),
        );
        let (profile, session) = service(&stub).await;
        assert!(profile.upload_avatar(photo()).await.is_err());
        assert!(session.user().await.unwrap().is_approved);
    }

    #[tokio::test]
    async fn completeness_is_optional() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Get, "/profile/completeness", json!({"completeness": 80}));
        stub.on(Method::Get, "/profile/completeness", json!({}));
        let (profile, _) = service(&stub).await;
        assert_eq!(profile.completeness().await.unwrap(), Some(80));
        assert_eq!(profile.completeness().await.unwrap(), None);
    }

    #[tokio::test]
    async fn preferences_accept_wrapped_or_bare() {
        let stub = Arc::new(StubTransport::new());
        stub.on(
            Method::Get,
            "/me/notification-preferences",
            json!({"notification_preferences": {"new_message": false}}),
        );
        stub.on(
            Method::Get,
            "/me/notification-preferences",
            json!({"support_reply": true, "quiet_hours_start": "22:00"}),
        );
        let (profile, _) = service(&stub).await;

        let wrapped = profile.notification_preferences().await.unwrap();
        assert_eq!(wrapped.new_message, Some(false));
        let bare = profile.notification_preferences().await.unwrap();
        assert_eq!(bare.support_reply, Some(true));
        assert_eq!(bare.quiet_hours_start.as_deref(), Some("22:00"));
    }

    #[tokio::test]
    async fn saving_preferences_sends_only_set_flags() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Put, "/me/notification-preferences", json!({}));
        let (profile, _) = service(&stub).await;
        let prefs = NotificationPreferences {
            new_message: Some(true),
            ..Default::default()
        };
        profile.set_notification_preferences(&prefs).await.unwrap();
        assert_eq!(
            stub.requests()[0].body,
            Some(json!({"new_message": true, "quiet_hours_start": null, "quiet_hours_end": null}))
        );
    }

    #[tokio::test]
    async fn delete_account_signs_out() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Delete, "/profile", json!({}));
        let (profile, session) = service(&stub).await;
        profile.delete_account().await.unwrap();
        assert!(!session.is_authenticated().await);
    }
}

//! The session store: the signed-in user and the authentication lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::otp::{OtpChallenge, VerifyOtp, digits_only, validate_phone};
use crate::api::{ApiRequest, AuthEvent, Transport, decode};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result, ValidationError};
use crate::model::{Role, User};
use crate::storage::{self, CredentialStore, Tokens};

/// Observable session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    UserChanged(Option<User>),
    LoggedOut,
    /// Token refresh failed; the user has been signed out.
    Unauthenticated,
}

/// Where the app goes after a successful OTP verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostLoginRoute {
    PhoneInput,
    LegalAgreements,
    RoleSelection,
    Onboarding,
    Main,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginResult {
    pub is_new_user: bool,
    pub requires_legal_accept: bool,
    pub next_step: String,
    pub user: User,
}

impl LoginResult {
    pub fn route(&self) -> PostLoginRoute {
        if self.requires_legal_accept {
            PostLoginRoute::LegalAgreements
        } else if self.is_new_user {
            PostLoginRoute::RoleSelection
        } else if !self.user.onboarding_completed {
            PostLoginRoute::Onboarding
        } else {
            PostLoginRoute::Main
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    #[serde(default)]
    is_new_user: bool,
    #[serde(default)]
    requires_legal_accept: bool,
    #[serde(default)]
    next_step: Option<String>,
}

/// Body of `PUT /profile`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    user: Option<User>,
    hydrated: bool,
}

/// Holds the current user. All writes go through this type and are
/// announced on the event channel.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    country_code: String,
    phone_prefix: String,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        config: &ClientConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            transport,
            credentials,
            country_code: config.country_code.clone(),
            phone_prefix: config.phone_prefix.clone(),
            state: RwLock::new(SessionState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.read().await.hydrated
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Replace the current user.
    pub async fn set_user(&self, user: Option<User>) {
        self.state.write().await.user = user.clone();
        self.emit(SessionEvent::UserChanged(user));
    }

    /// Patch the current user in place. No-op when signed out.
    pub async fn modify_user<F>(&self, f: F)
    where
        F: FnOnce(&mut User),
    {
        let updated = {
            let mut state = self.state.write().await;
            match state.user.as_mut() {
                Some(user) => {
                    f(user);
                    Some(user.clone())
                }
                None => None,
            }
        };
        if let Some(user) = updated {
            self.emit(SessionEvent::UserChanged(Some(user)));
        }
    }

    /// Restore the session from stored tokens. Any failure leaves the
    /// session anonymous; the store is hydrated afterwards either way.
    pub async fn hydrate(&self) {
        let user = if storage::access_token(self.credentials.as_ref()).await.is_none() {
            None
        } else {
            match self.fetch_profile().await {
                Ok(user) => user,
                Err(e) => {
                    debug!(error = %e, "Session hydrate failed");
                    None
                }
            }
        };

        {
            let mut state = self.state.write().await;
            state.user = user.clone();
            state.hydrated = true;
        }
        info!(signed_in = user.is_some(), "Session hydrated");
        self.emit(SessionEvent::UserChanged(user));
    }

    async fn fetch_profile(&self) -> std::result::Result<Option<User>, ApiError> {
        let data = self.transport.send(ApiRequest::get("/profile")).await?;
        user_from(data)
    }

    /// Request an OTP for a national number such as `"5551112233"`.
    pub async fn request_otp(&self, national_number: &str) -> Result<OtpChallenge> {
        let digits = digits_only(national_number);
        validate_phone(&digits)?;
        let phone_number = format!("{}{}", self.phone_prefix, digits);
        self.send_otp(phone_number, None).await
    }

    /// Ask for a new code once the cooldown has elapsed.
    pub async fn resend_otp(&self, challenge: &OtpChallenge) -> Result<OtpChallenge> {
        let remaining = challenge.cooldown_remaining(Instant::now());
        if !remaining.is_zero() {
            return Err(ValidationError::ResendCooldown {
                remaining_secs: remaining.as_secs_f64().ceil() as u64,
            }
            .into());
        }
        self.send_otp(
            challenge.phone_number.clone(),
            challenge.session_token.clone(),
        )
        .await
    }

    async fn send_otp(
        &self,
        phone_number: String,
        previous_token: Option<String>,
    ) -> Result<OtpChallenge> {
        let data = self
            .transport
            .send(ApiRequest::post(
                "/auth/request-otp",
                json!({ "phone_number": phone_number, "country_code": self.country_code }),
            ))
            .await?;
        let session_token = data
            .get("session_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(previous_token);
        info!(country = %self.country_code, "OTP requested");
        Ok(OtpChallenge {
            phone_number,
            country_code: self.country_code.clone(),
            session_token,
            requested_at: Instant::now(),
        })
    }

    /// Verify the code, store the token pair and sign the user in.
    pub async fn login(&self, request: VerifyOtp) -> Result<LoginResult> {
        let body = serde_json::to_value(&request).map_err(ApiError::from)?;
        let data = self
            .transport
            .send(ApiRequest::post("/auth/verify-otp", body))
            .await?;
        let response: VerifyResponse = decode(data)?;

        let (Some(access), Some(refresh), Some(user)) =
            (response.access_token, response.refresh_token, response.user)
        else {
            return Err(ApiError::Decode("Invalid login response".to_string()).into());
        };

        storage::save_tokens(self.credentials.as_ref(), &Tokens::new(access, refresh)).await?;
        {
            let mut state = self.state.write().await;
            state.user = Some(user.clone());
            state.hydrated = true;
        }
        info!(user_id = %user.id, new_user = response.is_new_user, "Signed in");
        self.emit(SessionEvent::UserChanged(Some(user.clone())));

        Ok(LoginResult {
            is_new_user: response.is_new_user,
            requires_legal_accept: response.requires_legal_accept,
            next_step: response.next_step.unwrap_or_default(),
            user,
        })
    }

    /// Sign out. The server call is best-effort; local state is always cleared.
    pub async fn logout(&self) {
        if storage::access_token(self.credentials.as_ref()).await.is_some() {
            if let Err(e) = self.transport.send(ApiRequest::post_empty("/auth/logout")).await {
                debug!(error = %e, "Logout request failed");
            }
        }
        self.clear_local().await;
        info!("Signed out");
        self.emit(SessionEvent::LoggedOut);
    }

    async fn clear_local(&self) {
        if let Err(e) = storage::clear_tokens(self.credentials.as_ref()).await {
            warn!(error = %e, "Failed to clear stored tokens");
        }
        self.state.write().await.user = None;
    }

    /// `PUT /profile`. Falls back to a re-hydrate when the response has no user.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Option<User>> {
        let body = serde_json::to_value(&update).map_err(ApiError::from)?;
        let data = self.transport.send(ApiRequest::put("/profile", body)).await?;
        match user_from(data)? {
            Some(user) => {
                self.set_user(Some(user.clone())).await;
                Ok(Some(user))
            }
            None => {
                self.hydrate().await;
                Ok(self.user().await)
            }
        }
    }

    pub async fn select_role(&self, role: Role) -> Result<Option<User>> {
        self.update_profile(ProfileUpdate {
            role: Some(role),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Sign the user out whenever the gateway reports a dead session.
    pub fn spawn_auth_listener(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<AuthEvent>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::Unauthenticated) => {
                        info!("Session expired, signing out");
                        store.state.write().await.user = None;
                        store.emit(SessionEvent::Unauthenticated);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Auth listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Extract `user` from a profile payload.
fn user_from(data: Value) -> std::result::Result<Option<User>, ApiError> {
    match data.get("user") {
        Some(user) if !user.is_null() => Ok(Some(decode(user.clone())?)),
        _ => Ok(None),
    }
}

//! HTTP gateway over reqwest.
//!
//! Every request carries `Authorization: Bearer <access>` when a token is
//! stored and `Accept-Language` from the locale watch channel. A 401 triggers
//! one `POST /auth/refresh` and one retry of the original request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::envelope::unwrap_response;
use super::{ApiRequest, Method, Transport, UploadFile};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::i18n::Locale;
use crate::storage::{self, CredentialStore, Tokens};

const REFRESH_PATH: &str = "/auth/refresh";
const LOGOUT_PATH: &str = "/auth/logout";

/// Authentication events raised by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The session could not be refreshed. Tokens may already be cleared.
    Unauthenticated,
}

/// Body of an outgoing request. Multipart bodies are rebuilt per attempt.
enum Outgoing<'a> {
    Json(&'a ApiRequest),
    Multipart {
        path: &'a str,
        field: &'a str,
        file: &'a UploadFile,
        bytes: &'a [u8],
    },
}

impl Outgoing<'_> {
    fn path(&self) -> &str {
        match self {
            Self::Json(req) => &req.path,
            Self::Multipart { path, .. } => path,
        }
    }

    fn method(&self) -> Method {
        match self {
            Self::Json(req) => req.method,
            Self::Multipart { .. } => Method::Post,
        }
    }
}

/// Production [`Transport`].
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    locale: watch::Receiver<Locale>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl HttpGateway {
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        locale: watch::Receiver<Locale>,
    ) -> Result<Self, ApiError> {
        Self::with_base_url(config.api_base(), config.http_timeout, credentials, locale)
    }

    /// Build against an explicit versioned base such as `http://host/api/v1`.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
        locale: watch::Receiver<Locale>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))?;
        let (auth_events, _) = broadcast::channel(16);
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            locale,
            auth_events,
        })
    }

    /// Subscribe to authentication events.
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn emit_unauthenticated(&self) {
        // No receivers is fine: nobody is signed in to be told.
        let _ = self.auth_events.send(AuthEvent::Unauthenticated);
    }

    async fn attempt(&self, outgoing: &Outgoing<'_>) -> Result<Value, ApiError> {
        let url = self.url(outgoing.path());
        let mut builder = match outgoing.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };

        let locale = *self.locale.borrow();
        builder = builder.header(reqwest::header::ACCEPT_LANGUAGE, locale.as_str());
        if let Some(token) = storage::access_token(self.credentials.as_ref()).await {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder = match outgoing {
            Outgoing::Json(req) => {
                let mut b = builder;
                if !req.query.is_empty() {
                    b = b.query(&req.query);
                }
                match &req.body {
                    Some(body) => b.json(body),
                    None => b,
                }
            }
            Outgoing::Multipart {
                field, file, bytes, ..
            } => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime)?;
                builder.multipart(Form::new().part(field.to_string(), part))
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        unwrap_response(status, &body)
    }

    /// Send with the refresh-once policy.
    async fn dispatch(&self, outgoing: Outgoing<'_>) -> Result<Value, ApiError> {
        let first = self.attempt(&outgoing).await;
        let err = match first {
            Err(e) if e.status() == Some(401) => e,
            other => return other,
        };

        let path = outgoing.path();
        if path.contains(LOGOUT_PATH) || path.contains(REFRESH_PATH) {
            return Err(err);
        }

        match self.refresh().await {
            RefreshOutcome::Refreshed => {
                debug!(path, "Retrying after token refresh");
                self.attempt(&outgoing).await
            }
            RefreshOutcome::NoRefreshToken | RefreshOutcome::Failed => {
                self.emit_unauthenticated();
                Err(err)
            }
            RefreshOutcome::Incomplete => Err(err),
        }
    }

    async fn refresh(&self) -> RefreshOutcome {
        let Some(refresh_token) = storage::refresh_token(self.credentials.as_ref()).await else {
            info!("No refresh token, session is unauthenticated");
            return RefreshOutcome::NoRefreshToken;
        };

        match self.post_refresh(&refresh_token).await {
            Ok(data) => {
                let access = data.get("access_token").and_then(Value::as_str);
                let refresh = data.get("refresh_token").and_then(Value::as_str);
                let (Some(access), Some(refresh)) = (access, refresh) else {
                    warn!("Refresh response did not contain a token pair");
                    return RefreshOutcome::Incomplete;
                };
                let tokens = Tokens::new(access, refresh);
                if let Err(e) = storage::save_tokens(self.credentials.as_ref(), &tokens).await {
                    warn!(error = %e, "Failed to store refreshed tokens");
                }
                info!("Access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                if let Err(e) = storage::clear_tokens(self.credentials.as_ref()).await {
                    warn!(error = %e, "Failed to clear tokens");
                }
                RefreshOutcome::Failed
            }
        }
    }

    async fn post_refresh(&self, refresh_token: &SecretString) -> Result<Value, ApiError> {
        let locale = *self.locale.borrow();
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .header(reqwest::header::ACCEPT_LANGUAGE, locale.as_str())
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        unwrap_response(status, &body)
    }
}

enum RefreshOutcome {
    Refreshed,
    NoRefreshToken,
    Failed,
    /// The server answered but without both tokens.
    Incomplete,
}

#[async_trait]
impl Transport for HttpGateway {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        debug!(method = %request.method, path = %request.path, "API request");
        self.dispatch(Outgoing::Json(&request)).await
    }

    async fn upload(&self, path: &str, field: &str, file: UploadFile) -> Result<Value, ApiError> {
        let bytes = file.read().await?;
        debug!(path, field, size = bytes.len(), "API upload");
        self.dispatch(Outgoing::Multipart {
            path,
            field,
            file: &file,
            bytes: &bytes,
        })
        .await
    }
}

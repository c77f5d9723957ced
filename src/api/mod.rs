//! REST API access.
//!
//! Services talk to the server through the [`Transport`] trait so they can be
//! driven by [`HttpGateway`] in production and by an in-process stub in tests.
//! A transport returns the unwrapped `data` member of the response envelope.

pub mod envelope;
pub mod gateway;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

pub use gateway::{AuthEvent, HttpGateway};

/// HTTP verb of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

/// A JSON request against the versioned API base.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to `/api/v1`, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    /// POST without a request body.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path, None)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn put_empty(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path, None)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, None)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file for a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub source: UploadSource,
    pub file_name: String,
    pub mime: String,
}

impl UploadFile {
    pub fn from_path(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self {
            source: UploadSource::Path(path),
            file_name,
            mime: mime.into(),
        }
    }

    pub fn from_bytes(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            source: UploadSource::Bytes(bytes),
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    /// Load the file contents.
    pub async fn read(&self) -> Result<Vec<u8>, ApiError> {
        match &self.source {
            UploadSource::Bytes(bytes) => Ok(bytes.clone()),
            UploadSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ApiError::Transport(format!("read {}: {e}", path.display()))),
        }
    }
}

/// Remote data gateway seam.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON request and return the envelope's `data`.
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;

    /// Multipart upload of a single file under `field`.
    async fn upload(&self, path: &str, field: &str, file: UploadFile) -> Result<Value, ApiError>;
}

/// Deserialize an API payload into a typed value.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

/// Deserialize one member of an API payload. A missing or null member
/// decodes as if it were `null`, so `Vec`/`Option` targets come back empty.
pub fn decode_field<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T, ApiError> {
    let member = value
        .get_mut(key)
        .map(Value::take)
        .unwrap_or(Value::Null);
    let absent = member.is_null();
    match serde_json::from_value(member) {
        Ok(decoded) => Ok(decoded),
        Err(_) if absent => {
            serde_json::from_value(Value::Array(Vec::new()))
                .map_err(|e| ApiError::Decode(format!("missing field `{key}`: {e}")))
        }
        Err(e) => Err(ApiError::Decode(format!("field `{key}`: {e}"))),
    }
}

/// Decode a list that the server returns either bare or wrapped as `{key: [...]}`.
pub fn decode_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, ApiError> {
    if value.is_array() {
        decode(value)
    } else {
        decode_field(value, key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_list_accepts_both_shapes() {
        let bare: Vec<u8> = decode_list(json!([1, 2]), "items").unwrap();
        let wrapped: Vec<u8> = decode_list(json!({"items": [1, 2]}), "items").unwrap();
        assert_eq!(bare, wrapped);
        let empty: Vec<u8> = decode_list(Value::Null, "items").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn request_builders() {
        let req = ApiRequest::get("/locations").with_query("parent_id", "tr");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, vec![("parent_id".to_string(), "tr".to_string())]);
        assert!(req.body.is_none());

        let req = ApiRequest::put("/tutor/availability", json!({"slots": []}));
        assert_eq!(req.method.to_string(), "PUT");
        assert_eq!(req.body, Some(json!({"slots": []})));
    }

    #[test]
    fn decode_field_handles_missing_lists() {
        let items: Vec<String> = decode_field(json!({"other": 1}), "locations").unwrap();
        assert!(items.is_empty());

        let items: Vec<String> = decode_field(json!({"locations": ["a", "b"]}), "locations").unwrap();
        assert_eq!(items, vec!["a", "b"]);

        let count: Option<u32> = decode_field(json!({}), "count").unwrap();
        assert!(count.is_none());
    }

    #[test]
    fn decode_field_reports_type_errors() {
        let err = decode_field::<Vec<String>>(json!({"locations": 5}), "locations").unwrap_err();
        assert!(matches!(err, ApiError::Decode(msg) if msg.contains("locations")));
    }

    #[test]
    fn upload_file_name_from_path() {
        let file = UploadFile::from_path("/tmp/photos/me.jpg", "image/jpeg");
        assert_eq!(file.file_name, "me.jpg");
    }

    #[tokio::test]
    async fn upload_reads_bytes() {
        let file = UploadFile::from_bytes(vec![1, 2, 3], "a.png", "image/png");
        assert_eq!(file.read().await.unwrap(), vec![1, 2, 3]);
    }
}

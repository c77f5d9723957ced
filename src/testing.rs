//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{ApiRequest, Method, Transport, UploadFile};
use crate::error::ApiError;

type Route = (Method, String);

/// Stub transport with canned responses per `(method, path)`.
///
/// Responses queue up in order; the last one keeps answering. Unrouted
/// requests fail with a 404 server error. Every request is recorded.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<Route, VecDeque<Result<Value, ApiError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
    uploads: Mutex<Vec<(String, String, UploadFile)>>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response is delayed, for in-flight tests.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn on(&self, method: Method, path: &str, data: Value) -> &Self {
        self.push(method, path, Ok(data))
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) -> &Self {
        self.push(method, path, Err(error))
    }

    fn push(&self, method: Method, path: &str, response: Result<Value, ApiError>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, String, UploadFile)> {
        self.uploads.lock().unwrap().clone()
    }

    fn respond(&self, method: Method, path: &str) -> Result<Value, ApiError> {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(server_error(404, "NOT_FOUND", &format!("no stub for {method} {path}"))),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let (method, path) = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(method, &path)
    }

    async fn upload(&self, path: &str, field: &str, file: UploadFile) -> Result<Value, ApiError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), field.to_string(), file));
        self.respond(Method::Post, path)
    }
}

pub fn server_error(status: u16, code: &str, message: &str) -> ApiError {
    ApiError::Server {
        status,
        code: code.to_string(),
        message: message.to_string(),
        details: None,
    }
}

pub fn user_json(id: &str, role: Option<&str>) -> Value {
    json!({
        "id": id,
        "phone_number": "+905551112233",
        "role": role,
        "full_name": "Ayşe Yılmaz",
        "is_approved": false,
        "onboarding_completed": false
    })
}

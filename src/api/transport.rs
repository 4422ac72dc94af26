//! HTTP transport: request/response shapes and the reqwest-backed client.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ApiError, ErrorBody};
use crate::config::ApiConfig;

/// Versioned path every endpoint lives under
pub const API_PREFIX: &str = "/api/v1/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Patch,
  Delete,
}

impl Method {
  fn as_reqwest(self) -> reqwest::Method {
    match self {
      Self::Get => reqwest::Method::GET,
      Self::Post => reqwest::Method::POST,
      Self::Patch => reqwest::Method::PATCH,
      Self::Delete => reqwest::Method::DELETE,
    }
  }
}

/// How the response body should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
  #[default]
  Json,
  Text,
}

/// A request relative to the API prefix
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path below `/api/v1/`, e.g. `/examples/3/`
  pub path: String,
  pub query: Vec<(&'static str, String)>,
  pub body: Option<Value>,
  pub format: ResponseFormat,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
      format: ResponseFormat::Json,
    }
  }

  pub fn with_query(mut self, key: &'static str, value: impl ToString) -> Self {
    self.query.push((key, value.to_string()));
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn as_text(mut self) -> Self {
    self.format = ResponseFormat::Text;
    self
  }

  /// Path plus query string, for logging
  pub fn describe(&self) -> String {
    if self.query.is_empty() {
      self.path.clone()
    } else {
      let qs: Vec<String> = self.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
      format!("{}?{}", self.path, qs.join("&"))
    }
  }
}

/// Bearer token shared between the session store (writer) and the
/// transport (reader). Read at request time, so a login takes effect for
/// every request dispatched after it.
#[derive(Debug, Clone, Default)]
pub struct Credentials(Arc<RwLock<Option<String>>>);

impl Credentials {
  pub fn token(&self) -> Option<String> {
    self.0.read().ok().and_then(|t| t.clone())
  }

  pub fn set(&self, token: Option<String>) {
    if let Ok(mut guard) = self.0.write() {
      *guard = token;
    }
  }
}

/// Transport used by the cache store to reach the server.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Execute the request. A non-2xx response is an `ApiError::Status`.
  async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: String,
  credentials: Credentials,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig, credentials: Credentials) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    // Validate early so a typo in the config fails at startup
    url::Url::parse(&config.url).map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;

    Ok(Self {
      client,
      base_url: config.url.trim_end_matches('/').to_string(),
      credentials,
    })
  }

  fn url_for(&self, path: &str) -> String {
    format!(
      "{}{}{}",
      self.base_url,
      API_PREFIX.trim_end_matches('/'),
      path
    )
  }

  fn headers(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = self.credentials.token().filter(|t| t != "null") {
      if let Ok(value) = HeaderValue::from_str(&format!("Token {}", token)) {
        headers.insert(AUTHORIZATION, value);
      }
    }
    headers
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let url = self.url_for(&request.path);
    debug!(method = ?request.method, %url, "sending request");

    let mut builder = self
      .client
      .request(request.method.as_reqwest(), &url)
      .headers(self.headers());
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    if status.is_success() {
      let body = parse_body(&text, request.format).inspect_err(|e| {
        warn!(%url, "response is not valid JSON: {}", e);
      })?;
      return Ok(body);
    }
    // Error pages are often HTML, kept as text
    let body = parse_body(&text, request.format).unwrap_or(Value::String(text));
    Err(ApiError::Status {
      status: status.as_u16(),
      body: ErrorBody::from_value(&body),
    })
  }
}

/// Empty bodies (204 No Content) become null
fn parse_body(text: &str, format: ResponseFormat) -> Result<Value, serde_json::Error> {
  if text.is_empty() {
    return Ok(Value::Null);
  }
  match format {
    ResponseFormat::Text => Ok(Value::String(text.to_string())),
    ResponseFormat::Json => serde_json::from_str(text),
  }
}

#[cfg(test)]
pub mod fake {
  //! In-memory transport for tests.

  use super::*;
  use std::collections::{HashMap, VecDeque};
  use std::sync::Mutex;

  type Script = HashMap<(Method, String), VecDeque<Result<Value, ApiError>>>;

  /// Scripted transport: responses are queued per (method, path) and each
  /// call pops the next one. The last queued response is reused once the
  /// queue is down to one.
  #[derive(Clone, Default)]
  pub struct FakeTransport {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<ApiRequest>>>,
    credentials: Credentials,
    seen_tokens: Arc<Mutex<Vec<Option<String>>>>,
  }

  impl FakeTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
      Self {
        credentials,
        ..Self::default()
      }
    }

    pub fn respond(&self, method: Method, path: &str, response: Result<Value, ApiError>) {
      self
        .script
        .lock()
        .unwrap()
        .entry((method, path.to_string()))
        .or_default()
        .push_back(response);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
      self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == method && r.path == path)
        .count()
    }

    pub fn seen_tokens(&self) -> Vec<Option<String>> {
      self.seen_tokens.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
      self.calls.lock().unwrap().push(request.clone());
      self
        .seen_tokens
        .lock()
        .unwrap()
        .push(self.credentials.token());

      let mut script = self.script.lock().unwrap();
      let queue = script.get_mut(&(request.method, request.path.clone()));
      match queue {
        Some(q) if q.len() > 1 => q.pop_front().unwrap(),
        Some(q) if q.len() == 1 => q[0].clone(),
        _ => Err(ApiError::Status {
          status: 404,
          body: ErrorBody::default(),
        }),
      }
    }
  }
}

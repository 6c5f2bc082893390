//! Instrumented, timeout-bounded request wrapper around `reqwest::blocking`.
//!
//! Every failure (no response, deadline expiry, non-2xx status) comes back as one
//! [`TransportError`]. Cross-cutting behavior is attached as [`Middleware`]:
//! `before` runs ahead of dispatch, then exactly one of `after` / `on_error`.
//!
//! There is no retry here. A scan upload is not idempotent from the user's point
//! of view, so retry policy belongs to the caller.

use crate::domain::models::AuditEvent;
use crate::services::audit::AuditSink;
use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const TIMEOUT_MESSAGE: &str = "timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(UploadPart),
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout_ms: Option<u64>,
}

/// Normalized failure. `status_code` is `None` when no response arrived.
#[derive(Debug)]
pub struct TransportError {
    pub status_code: Option<u16>,
    pub message: String,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn timeout(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            status_code: None,
            message: TIMEOUT_MESSAGE.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn no_response(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            status_code: None,
            message: cause.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(code),
            message: message.into(),
            cause: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.status_code.is_none() && self.message == TIMEOUT_MESSAGE
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "status {}: {}", code, self.message),
            None => write!(f, "no response: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Per-call state visible to middleware.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub started: Instant,
}

impl RequestContext {
    fn new(method: Method, path: &str, url: String) -> Self {
        Self {
            method,
            path: path.to_string(),
            url,
            headers: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

pub trait Middleware: Send + Sync {
    fn before(&self, _ctx: &mut RequestContext) {}
    fn after(&self, _ctx: &RequestContext, _status: u16) {}
    fn on_error(&self, _ctx: &RequestContext, _err: &TransportError) {}
}

/// Adds `Accept: application/json` and a fresh `X-Request-Id`.
pub struct DefaultHeaders;

impl Middleware for DefaultHeaders {
    fn before(&self, ctx: &mut RequestContext) {
        ctx.headers
            .push(("Accept".to_string(), "application/json".to_string()));
        ctx.headers
            .push(("X-Request-Id".to_string(), uuid::Uuid::new_v4().to_string()));
    }
}

/// Reports `{method, path, status, elapsed_ms}` for every completed call.
pub struct AuditMiddleware {
    sink: Arc<dyn AuditSink>,
}

impl AuditMiddleware {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    fn emit(&self, ctx: &RequestContext, status: Option<u16>) {
        self.sink.record(&AuditEvent {
            method: ctx.method.as_str().to_string(),
            path: ctx.path.clone(),
            status,
            elapsed_ms: ctx.elapsed_ms(),
        });
    }
}

impl Middleware for AuditMiddleware {
    fn after(&self, ctx: &RequestContext, status: u16) {
        self.emit(ctx, Some(status));
    }

    fn on_error(&self, ctx: &RequestContext, err: &TransportError) {
        self.emit(ctx, err.status_code);
    }
}

pub trait Transport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<Value, TransportError>;
}

pub struct TransportClient {
    base_url: String,
    http: Client,
    default_timeout: Duration,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl TransportClient {
    pub fn new(base_url: impl Into<String>, default_timeout_ms: u64) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {}", e))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            default_timeout: Duration::from_millis(default_timeout_ms),
            middleware: Vec::new(),
        })
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn dispatch(
        &self,
        ctx: &RequestContext,
        body: RequestBody,
        timeout: Duration,
    ) -> Result<(u16, Value), TransportError> {
        let mut req = match ctx.method {
            Method::Get => self.http.get(&ctx.url),
            Method::Post => self.http.post(&ctx.url),
        }
        .timeout(timeout);
        for (name, value) in &ctx.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => req.json(&value),
            RequestBody::Multipart(part) => req.multipart(upload_form(part)?),
        };

        let resp = req.send().map_err(classify_reqwest)?;
        let status = resp.status();
        let text = resp.text().map_err(classify_reqwest)?;
        let payload = parse_payload(&text);

        if status.is_success() {
            return Ok((status.as_u16(), payload));
        }
        let message = server_message(&payload).unwrap_or_else(|| {
            format!(
                "request failed: {}",
                status.canonical_reason().unwrap_or("unexpected status")
            )
        });
        Err(TransportError::status(status.as_u16(), message))
    }
}

impl Transport for TransportClient {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<Value, TransportError> {
        let mut ctx = RequestContext::new(method, path, self.url_for(path));
        for m in &self.middleware {
            m.before(&mut ctx);
        }
        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        match self.dispatch(&ctx, body, timeout) {
            Ok((status, payload)) => {
                for m in &self.middleware {
                    m.after(&ctx, status);
                }
                Ok(payload)
            }
            Err(err) => {
                for m in &self.middleware {
                    m.on_error(&ctx, &err);
                }
                Err(err)
            }
        }
    }
}

fn upload_form(part: UploadPart) -> Result<multipart::Form, TransportError> {
    let file = multipart::Part::bytes(part.bytes)
        .file_name(part.file_name)
        .mime_str(&part.content_type)
        .map_err(TransportError::no_response)?;
    Ok(multipart::Form::new().part(part.field, file))
}

fn classify_reqwest(err: reqwest::Error) -> TransportError {
    if is_timeout(&err) {
        TransportError::timeout(err)
    } else {
        TransportError::no_response(err)
    }
}

fn is_timeout(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = std::error::Error::source(e);
    }
    false
}

/// JSON when it parses, otherwise the raw text as a JSON string.
fn parse_payload(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn server_message(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

//! Scan submission: accepted file in, findings or one categorized failure out.
//!
//! Raw transport detail is logged and dropped here; callers only ever see a
//! [`SubmitError`] category with a short message and a next action.

use crate::domain::constants::{SCAN_PATH, UPLOAD_FIELD};
use crate::domain::models::{NextAction, ReceivedFindings};
use crate::services::admission::{self, AcceptedFile};
use crate::services::transport::{
    Method, RequestBody, RequestOptions, Transport, TransportError, UploadPart,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("scan timed out")]
    Timeout,
    #[error("scan service unreachable")]
    Network,
    #[error("file unreadable by engine")]
    Unreadable,
    #[error("scan service failed with status {0}")]
    Server(u16),
    #[error("unexpected response shape")]
    UnexpectedShape,
    #[error("a scan is already in progress")]
    InFlight,
    #[error("selected file could not be read")]
    FileRead,
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "SCAN_TIMEOUT",
            Self::Network => "NETWORK_ERROR",
            Self::Unreadable => "FILE_UNREADABLE",
            Self::Server(_) => "SERVER_ERROR",
            Self::UnexpectedShape => "UNEXPECTED_RESPONSE_SHAPE",
            Self::InFlight => "SCAN_IN_FLIGHT",
            Self::FileRead => "FILE_READ_ERROR",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout => "Scan timed out. Please try again.",
            Self::Network => "Upload failed. Please check your network or contact support.",
            Self::Unreadable => "Upload rejected. File not readable by the engine.",
            Self::Server(_) => "Upload failed. Please try again or contact support.",
            Self::UnexpectedShape => "Unexpected response from server.",
            Self::InFlight => "A scan is already running. Wait for it to finish.",
            Self::FileRead => "The selected file could not be read. Choose the file again.",
        }
    }

    pub fn action(&self) -> NextAction {
        match self {
            Self::Unreadable | Self::FileRead => NextAction::ChangeFile,
            _ => NextAction::Retry,
        }
    }
}

/// At most one outstanding scan. The guard may move to the thread that
/// performs the upload; dropping it reopens the gate.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    in_flight: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicBool>,
}

impl SubmissionGate {
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

pub struct ScanService<T: Transport> {
    transport: T,
    gate: SubmissionGate,
    options: RequestOptions,
}

impl<T: Transport> ScanService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            gate: SubmissionGate::default(),
            options: RequestOptions::default(),
        }
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub fn submit(&self, accepted: &AcceptedFile) -> Result<ReceivedFindings, SubmitError> {
        let guard = self.gate.try_begin().ok_or(SubmitError::InFlight)?;
        self.submit_held(guard, accepted)
    }

    /// Submits under a guard already taken from [`Self::gate`].
    pub fn submit_held(
        &self,
        _guard: InFlightGuard,
        accepted: &AcceptedFile,
    ) -> Result<ReceivedFindings, SubmitError> {
        let file = accepted.file();
        let bytes = admission::read_content(file).map_err(|e| {
            tracing::warn!(file = %file.name, error = %e, "failed to read selected file");
            SubmitError::FileRead
        })?;
        tracing::info!(
            file = %file.name,
            size = bytes.len(),
            sha256 = %admission::sha256_hex(&bytes),
            "submitting file for scan"
        );

        let body = RequestBody::Multipart(UploadPart {
            field: UPLOAD_FIELD.to_string(),
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            bytes,
        });
        let payload = self
            .transport
            .request(Method::Post, SCAN_PATH, body, &self.options)
            .map_err(categorize)?;
        parse_findings(payload)
    }
}

fn categorize(err: TransportError) -> SubmitError {
    tracing::warn!(
        status = ?err.status_code,
        message = %err.message,
        cause = ?err.cause,
        "scan request failed"
    );
    match err.status_code {
        None if err.is_timeout() => SubmitError::Timeout,
        None => SubmitError::Network,
        Some(400) => SubmitError::Unreadable,
        Some(code) => SubmitError::Server(code),
    }
}

/// Only a JSON array of objects is a usable result. Field-level oddities
/// inside an object never reject the scan.
pub fn parse_findings(payload: Value) -> Result<ReceivedFindings, SubmitError> {
    let Value::Array(items) = payload else {
        tracing::warn!(kind = value_kind(&payload), "scan response is not an array");
        return Err(SubmitError::UnexpectedShape);
    };
    ReceivedFindings::decode(items).map_err(|index| {
        tracing::warn!(index, "scan response entry is not an object");
        SubmitError::UnexpectedShape
    })
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use crate::domain::models::AuditEvent;
use crate::services::storage;

/// Receiver for per-request audit events. Implementations must not fail
/// observably: recording is never allowed to change request outcomes.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits each event as a structured `tracing` record on the `nuvai_audit` target.
#[derive(Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event.status {
            Some(status) => tracing::info!(
                target: "nuvai_audit",
                method = %event.method,
                path = %event.path,
                status,
                elapsed_ms = event.elapsed_ms,
                "http request completed"
            ),
            None => tracing::info!(
                target: "nuvai_audit",
                method = %event.method,
                path = %event.path,
                elapsed_ms = event.elapsed_ms,
                "http request got no response"
            ),
        }
    }
}

/// Appends events to `~/.config/nuvai/audit.jsonl`.
#[derive(Default)]
pub struct JsonlAuditSink;

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        let data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        storage::audit("http_request", data);
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

//! Fault isolation around view rendering.
//!
//! A [`FaultBoundary`] is a two-state machine. In `Normal` it runs the guarded
//! render; an `Err` or a panic moves it to `Faulted`, persists exactly one
//! [`DiagnosticRecord`] and yields a fallback view instead of content. While
//! faulted the render is not attempted. `recover` returns to `Normal`.
//!
//! Storage and remote forwarding are injected. Neither may raise a second
//! fault: their failures are logged and dropped.

use crate::domain::constants::{DIAGNOSTIC_KIND, HOME_ROUTE};
use crate::domain::models::{BuildMode, DiagnosticRecord};
use crate::services::transport::{Method, RequestBody, RequestOptions, Transport, TransportClient};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const FAULT_MESSAGE: &str =
    "Something went wrong while displaying this view. Your data is safe.";

pub trait DiagnosticStore: Send + Sync {
    /// Overwrites whatever record was stored before.
    fn save(&self, record: &DiagnosticRecord) -> anyhow::Result<()>;
    fn load(&self) -> anyhow::Result<Option<DiagnosticRecord>>;
    /// Returns whether a record was present.
    fn clear(&self) -> anyhow::Result<bool>;
}

pub trait DiagnosticReporter: Send + Sync {
    /// Fire-and-forget. The returned handle, if any, may be drained later.
    fn forward(&self, record: DiagnosticRecord) -> Option<JoinHandle<()>>;
}

/// Posts the record as JSON to a configured endpoint on a detached thread.
pub struct HttpDiagnosticReporter {
    endpoint: String,
    timeout_ms: u64,
}

impl HttpDiagnosticReporter {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms,
        }
    }
}

impl DiagnosticReporter for HttpDiagnosticReporter {
    fn forward(&self, record: DiagnosticRecord) -> Option<JoinHandle<()>> {
        let endpoint = self.endpoint.clone();
        let timeout_ms = self.timeout_ms;
        let spawned = std::thread::Builder::new()
            .name("nuvai-diagnostics".to_string())
            .spawn(move || {
                let body = match serde_json::to_value(&record) {
                    Ok(v) => RequestBody::Json(v),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode diagnostic record");
                        return;
                    }
                };
                let sent = TransportClient::new(endpoint.as_str(), timeout_ms)
                    .map_err(|e| e.to_string())
                    .and_then(|client| {
                        client
                            .request(Method::Post, "", body, &RequestOptions::default())
                            .map_err(|e| e.to_string())
                    });
                match sent {
                    Ok(_) => tracing::info!(id = %record.id, "diagnostic record forwarded"),
                    Err(e) => tracing::warn!(
                        id = %record.id,
                        endpoint = %endpoint,
                        error = %e,
                        "failed to forward diagnostic record"
                    ),
                }
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "failed to start diagnostic forwarding");
                None
            }
        }
    }
}

/// What the user sees in place of a faulted view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultView {
    pub trace_id: String,
    pub message: String,
    pub recovery: String,
    /// Raw detail, development builds only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryState {
    Normal,
    Faulted(FaultView),
}

#[derive(Debug)]
pub enum Rendered<T> {
    Content(T),
    Fallback(FaultView),
}

pub struct FaultBoundary {
    state: BoundaryState,
    store: Arc<dyn DiagnosticStore>,
    reporter: Option<Arc<dyn DiagnosticReporter>>,
    mode: BuildMode,
    pending: Vec<JoinHandle<()>>,
}

impl FaultBoundary {
    pub fn new(store: Arc<dyn DiagnosticStore>, mode: BuildMode) -> Self {
        Self {
            state: BoundaryState::Normal,
            store,
            reporter: None,
            mode,
            pending: Vec::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn DiagnosticReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, BoundaryState::Faulted(_))
    }

    pub fn guard<T>(&mut self, path: &str, render: impl FnOnce() -> anyhow::Result<T>) -> Rendered<T> {
        if let BoundaryState::Faulted(view) = &self.state {
            return Rendered::Fallback(view.clone());
        }
        let outcome = {
            let _depth = GuardDepth::enter();
            std::panic::catch_unwind(AssertUnwindSafe(render))
        };
        match outcome {
            Ok(Ok(content)) => Rendered::Content(content),
            Ok(Err(err)) => Rendered::Fallback(self.enter_fault(path, err.to_string(), format!("{:?}", err))),
            Err(payload) => {
                let (message, detail) = match take_captured_panic() {
                    Some(p) => (p.message, format!("panicked at {}\n{}", p.location, p.backtrace)),
                    None => (
                        panic_payload_to_string(payload.as_ref()),
                        Backtrace::force_capture().to_string(),
                    ),
                };
                Rendered::Fallback(self.enter_fault(path, message, detail))
            }
        }
    }

    /// Clears fault state and names the route to return to.
    pub fn recover(&mut self) -> &'static str {
        if let BoundaryState::Faulted(view) = &self.state {
            tracing::info!(trace_id = %view.trace_id, "recovered from fault");
        }
        self.state = BoundaryState::Normal;
        HOME_ROUTE
    }

    /// Waits up to `bound` for forwarding threads. Unfinished ones stay detached.
    pub fn drain(&mut self, bound: Duration) {
        let deadline = Instant::now() + bound;
        while self.pending.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        for handle in self.pending.drain(..) {
            if !handle.is_finished() {
                continue;
            }
            if let Err(payload) = handle.join() {
                tracing::warn!(
                    panic = %panic_payload_to_string(payload.as_ref()),
                    "diagnostic forwarding thread panicked"
                );
            }
        }
    }

    fn enter_fault(&mut self, path: &str, message: String, detail: String) -> FaultView {
        let record = DiagnosticRecord {
            kind: DIAGNOSTIC_KIND.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            message,
            stack_detail: detail,
            timestamp: chrono::Utc::now().to_rfc3339(),
            agent: agent(),
            path: path.to_string(),
        };
        tracing::error!(
            id = %record.id,
            path = %record.path,
            message = %record.message,
            "view rendering faulted"
        );
        if let Err(e) = self.store.save(&record) {
            tracing::warn!(id = %record.id, error = %e, "failed to persist diagnostic record");
        }
        if self.mode == BuildMode::Production {
            if let Some(reporter) = &self.reporter {
                if let Some(handle) = reporter.forward(record.clone()) {
                    self.pending.push(handle);
                }
            }
        }
        let view = FaultView {
            trace_id: record.id,
            message: FAULT_MESSAGE.to_string(),
            recovery: HOME_ROUTE.to_string(),
            detail: (self.mode == BuildMode::Development).then_some(record.stack_detail),
        };
        self.state = BoundaryState::Faulted(view.clone());
        view
    }
}

pub fn agent() -> String {
    format!(
        "nuvai/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

struct CapturedPanic {
    message: String,
    location: String,
    backtrace: String,
}

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<CapturedPanic>> = const { RefCell::new(None) };
}

struct GuardDepth;

impl GuardDepth {
    fn enter() -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for GuardDepth {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn take_captured_panic() -> Option<CapturedPanic> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Routes panics raised inside a guarded render to the boundary instead of
/// stderr. Panics elsewhere still reach the previously installed hook.
pub fn install_panic_capture() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(|d| d.get()) == 0 {
                previous(info);
                return;
            }
            let captured = CapturedPanic {
                message: panic_payload_to_string(info.payload()),
                location: info
                    .location()
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "unknown location".to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(captured));
        }));
    });
}

pub fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryDiagnosticStore {
    slot: std::sync::Mutex<Option<DiagnosticRecord>>,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryDiagnosticStore {
    pub fn writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl DiagnosticStore for MemoryDiagnosticStore {
    fn save(&self, record: &DiagnosticRecord) -> anyhow::Result<()> {
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(record.clone());
        }
        Ok(())
    }

    fn load(&self) -> anyhow::Result<Option<DiagnosticRecord>> {
        Ok(self.slot.lock().map(|s| s.clone()).unwrap_or_default())
    }

    fn clear(&self) -> anyhow::Result<bool> {
        Ok(self.slot.lock().map(|mut s| s.take().is_some()).unwrap_or(false))
    }
}

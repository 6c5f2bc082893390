//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `scan.rs` — `scan` and `validate`.
//! - `findings.rs` — `findings show|copy` over an exported results file.
//! - `diagnostics.rs` — the last recorded fault.
//! - `shell.rs` — interactive session holding presenter and boundary state.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Every view is rendered through a `FaultBoundary`.
//! - Keep behavior and output schema stable.

pub mod diagnostics;
pub mod findings;
pub mod scan;
pub mod shell;

pub use diagnostics::handle_diagnostics_commands;
pub use findings::handle_findings_commands;
pub use scan::{handle_scan, handle_validate};
pub use shell::run_shell;

use crate::services::audit::{JsonlAuditSink, TracingAuditSink};
use crate::services::boundary::{FaultBoundary, HttpDiagnosticReporter, Rendered};
use crate::services::clipboard::CommandClipboard;
use crate::services::config::Settings;
use crate::services::output::{print_fault, Reported};
use crate::services::storage::FileDiagnosticStore;
use crate::services::submission::ScanService;
use crate::services::transport::{AuditMiddleware, DefaultHeaders, TransportClient};
use std::sync::Arc;
use std::time::Duration;

pub const RESULTS_ROUTE: &str = "/results";

/// Upper bound on waiting for diagnostic forwarding before exit.
pub const DRAIN_BOUND: Duration = Duration::from_secs(2);

pub struct AppContext {
    pub json: bool,
    pub settings: Settings,
}

impl AppContext {
    pub fn transport(&self) -> anyhow::Result<TransportClient> {
        let mut client = TransportClient::new(self.settings.base_url.as_str(), self.settings.timeout_ms)?
            .with_middleware(Arc::new(DefaultHeaders))
            .with_middleware(Arc::new(AuditMiddleware::new(Arc::new(TracingAuditSink))));
        if self.settings.audit_jsonl {
            client = client.with_middleware(Arc::new(AuditMiddleware::new(Arc::new(JsonlAuditSink))));
        }
        Ok(client)
    }

    pub fn scan_service(&self) -> anyhow::Result<ScanService<TransportClient>> {
        Ok(ScanService::new(self.transport()?))
    }

    pub fn boundary(&self) -> anyhow::Result<FaultBoundary> {
        let store = FileDiagnosticStore::at_default_location()?;
        let mut boundary = FaultBoundary::new(Arc::new(store), self.settings.mode);
        if let Some(endpoint) = &self.settings.diagnostics_endpoint {
            boundary = boundary.with_reporter(Arc::new(HttpDiagnosticReporter::new(
                endpoint.as_str(),
                self.settings.timeout_ms,
            )));
        }
        Ok(boundary)
    }

    pub fn clipboard(&self) -> CommandClipboard {
        CommandClipboard::new(self.settings.clipboard_command.clone())
    }
}

/// Renders one view through a fresh boundary. A fault prints the fallback and
/// fails with [`Reported`].
pub fn present(
    ctx: &AppContext,
    path: &str,
    render: impl FnOnce() -> anyhow::Result<String>,
) -> anyhow::Result<()> {
    let mut boundary = ctx.boundary()?;
    let rendered = boundary.guard(path, render);
    let outcome = match rendered {
        Rendered::Content(text) => {
            println!("{}", text);
            Ok(())
        }
        Rendered::Fallback(view) => {
            print_fault(ctx.json, &view);
            Err(Reported.into())
        }
    };
    boundary.drain(DRAIN_BOUND);
    outcome
}

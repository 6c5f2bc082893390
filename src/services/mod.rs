//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `admission.rs` — local file checks before anything is uploaded.
//! - `transport.rs` — timeout-bounded HTTP with middleware and one error shape.
//! - `audit.rs` — sinks for per-request audit events.
//! - `submission.rs` — upload an accepted file, categorize failures.
//! - `presenter.rs` — filter/sort/export/copy over received findings.
//! - `boundary.rs` — fault isolation for rendering + diagnostic records.
//! - `clipboard.rs` — system clipboard via external tools.
//! - `config.rs` — layered settings.
//! - `storage.rs` — config dir paths, audit log, diagnostic slot.
//! - `output.rs` — JSON/text output helpers and error classification.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod admission;
pub mod audit;
pub mod boundary;
pub mod clipboard;
pub mod config;
pub mod output;
pub mod presenter;
pub mod storage;
pub mod submission;
pub mod transport;

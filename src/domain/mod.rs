//! Shared data model layer (structs/constants only).
//!
//! ## Files
//! - `models.rs` — findings, source files, diagnostic records, report/output structs.
//! - `constants.rs` — allow-lists, defaults and fixed names (export file, diagnostic slot).
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! `Finding` and `DiagnosticRecord` are wire/storage shapes. Changes here affect the scan
//! service contract, exported files and `--json` outputs; keep them in sync with
//! `docs/contracts/*`.

pub mod constants;
pub mod models;

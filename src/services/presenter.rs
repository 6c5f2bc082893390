//! Findings presentation: filter, stable severity sort, export and copy.
//!
//! The presenter never mutates the received array. Filtering and sorting
//! produce a derived view; export always serializes the array as received.

use crate::domain::constants::EXPORT_FILE_STEM;
use crate::domain::models::{CopyReport, Finding, FindingsView, NextAction, ReceivedFindings, Severity};
use crate::services::clipboard::Clipboard;
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const COPY_OK_MESSAGE: &str = "Recommendation copied to clipboard!";
pub const COPY_FAILED_MESSAGE: &str = "Failed to copy recommendation.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SeverityFilter {
    #[default]
    All,
    Only(Severity),
}

impl SeverityFilter {
    pub fn matches(&self, severity: &Severity) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == severity,
        }
    }
}

impl FromStr for SeverityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("severity filter cannot be empty".to_string());
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(Self::Only(Severity::parse_loose(s)))
    }
}

impl fmt::Display for SeverityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(s) => write!(f, "{}", s),
        }
    }
}

/// Filter by exact severity, then stable-sort by rank.
pub fn derive_view(findings: &[Finding], filter: &SeverityFilter) -> Vec<Finding> {
    let mut view: Vec<Finding> = findings
        .iter()
        .filter(|f| filter.matches(&f.severity))
        .cloned()
        .collect();
    view.sort_by_key(|f| f.severity.rank());
    view
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    LoadFailed,
    NoFindings,
    NoFindingsForFilter,
    Findings,
}

impl DisplayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadFailed => "load_failed",
            Self::NoFindings => "no_findings",
            Self::NoFindingsForFilter => "no_findings_for_filter",
            Self::Findings => "findings",
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::LoadFailed => {
                Some("Failed to load scan results. Please try again or contact support.")
            }
            Self::NoFindings => Some("No issues found. The scan reported no findings."),
            Self::NoFindingsForFilter => Some("No findings match the selected severity filter."),
            Self::Findings => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityStyle {
    pub label: &'static str,
    pub color: &'static str,
    pub badge: &'static str,
}

const NEUTRAL_STYLE: SeverityStyle = SeverityStyle {
    label: "Unclassified",
    color: "white",
    badge: "⚪",
};

pub fn style_for(severity: &Severity) -> SeverityStyle {
    match severity {
        Severity::Critical => SeverityStyle {
            label: "Critical",
            color: "red",
            badge: "🔴",
        },
        Severity::High => SeverityStyle {
            label: "High",
            color: "orange",
            badge: "🟠",
        },
        Severity::Medium => SeverityStyle {
            label: "Medium",
            color: "yellow",
            badge: "🟡",
        },
        Severity::Warning => SeverityStyle {
            label: "Warning",
            color: "blue",
            badge: "🔵",
        },
        Severity::Info => SeverityStyle {
            label: "Info",
            color: "light gray",
            badge: "⚪",
        },
        Severity::Tip => SeverityStyle {
            label: "Tip",
            color: "emerald",
            badge: "🟢",
        },
        Severity::Error => SeverityStyle {
            label: "Error",
            color: "gray",
            badge: "⚫",
        },
        Severity::Other(_) => NEUTRAL_STYLE,
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Txt,
}

impl ExportFormat {
    pub fn file_name(&self) -> String {
        match self {
            Self::Json => format!("{}.json", EXPORT_FILE_STEM),
            Self::Txt => format!("{}.txt", EXPORT_FILE_STEM),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PresenterError {
    #[error("no scan results to export")]
    NothingToExport,
    #[error("export failed: {0}")]
    ExportFailed(String),
    #[error("no finding at position {position} (showing {shown})")]
    NoSuchFinding { position: usize, shown: usize },
}

impl PresenterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NothingToExport => "NOTHING_TO_EXPORT",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::NoSuchFinding { .. } => "NO_SUCH_FINDING",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NothingToExport => "There are no scan results to export yet.".to_string(),
            Self::ExportFailed(_) => "Unable to generate download file. Please try again.".to_string(),
            Self::NoSuchFinding { position, shown } => {
                format!("No finding at position {}. {} shown.", position, shown)
            }
        }
    }

    pub fn action(&self) -> NextAction {
        match self {
            Self::NothingToExport => NextAction::ChangeFile,
            Self::ExportFailed(_) => NextAction::Retry,
            Self::NoSuchFinding { .. } => NextAction::CheckInput,
        }
    }
}

/// Presentation state for one scan result. `received` is `None` when no
/// result was ever received.
#[derive(Debug, Clone, Default)]
pub struct FindingsPresenter {
    received: Option<ReceivedFindings>,
    filter: SeverityFilter,
}

impl FindingsPresenter {
    pub fn new(received: Option<ReceivedFindings>) -> Self {
        Self {
            received,
            filter: SeverityFilter::All,
        }
    }

    fn findings(&self) -> Option<&[Finding]> {
        self.received.as_ref().map(|r| r.findings.as_slice())
    }

    pub fn with_filter(mut self, filter: SeverityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn set_filter(&mut self, filter: SeverityFilter) {
        self.filter = filter;
    }

    pub fn visible(&self) -> Vec<Finding> {
        self.findings()
            .map(|f| derive_view(f, &self.filter))
            .unwrap_or_default()
    }

    pub fn state(&self) -> DisplayState {
        match self.findings() {
            None => DisplayState::LoadFailed,
            Some(all) if all.is_empty() => DisplayState::NoFindings,
            Some(_) if self.visible().is_empty() => DisplayState::NoFindingsForFilter,
            Some(_) => DisplayState::Findings,
        }
    }

    pub fn view_report(&self) -> FindingsView {
        let state = self.state();
        let findings = self.visible();
        FindingsView {
            state: state.as_str().to_string(),
            filter: self.filter.to_string(),
            total: self.findings().map(<[Finding]>::len).unwrap_or(0),
            shown: findings.len(),
            message: state.message().map(str::to_string),
            findings,
        }
    }

    /// Writes the array exactly as received (json) or one block per entry
    /// (txt). The active filter is ignored.
    pub fn export(&self, format: ExportFormat) -> Result<String, PresenterError> {
        let received = self
            .received
            .as_ref()
            .ok_or(PresenterError::NothingToExport)?;
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&received.raw)
                .map_err(|e| PresenterError::ExportFailed(e.to_string())),
            ExportFormat::Txt => Ok(txt_report(&received.findings)),
        }
    }

    pub fn export_to_dir(&self, dir: &Path, format: ExportFormat) -> Result<PathBuf, PresenterError> {
        let body = self.export(format)?;
        std::fs::create_dir_all(dir).map_err(|e| PresenterError::ExportFailed(e.to_string()))?;
        let path = dir.join(format.file_name());
        std::fs::write(&path, body).map_err(|e| PresenterError::ExportFailed(e.to_string()))?;
        tracing::info!(path = %path.display(), "exported scan results");
        Ok(path)
    }

    /// `position` is 1-based in the displayed (filtered, sorted) view.
    pub fn recommendation_at(&self, position: usize) -> Result<String, PresenterError> {
        let visible = self.visible();
        position
            .checked_sub(1)
            .and_then(|i| visible.get(i))
            .map(|f| f.recommendation.clone())
            .ok_or(PresenterError::NoSuchFinding {
                position,
                shown: visible.len(),
            })
    }

    /// Never fails: the outcome is reported as feedback.
    pub fn copy_recommendation(&self, position: usize, clipboard: &dyn Clipboard) -> CopyReport {
        let outcome = self
            .recommendation_at(position)
            .map_err(|e| e.user_message())
            .and_then(|text| clipboard.write_text(&text).map_err(|e| e.to_string()));
        match outcome {
            Ok(()) => CopyReport {
                position,
                status: "copied".to_string(),
                message: COPY_OK_MESSAGE.to_string(),
            },
            Err(detail) => {
                tracing::warn!(position, error = %detail, "copy recommendation failed");
                CopyReport {
                    position,
                    status: "failed".to_string(),
                    message: COPY_FAILED_MESSAGE.to_string(),
                }
            }
        }
    }

    pub fn render_text(&self) -> String {
        let state = self.state();
        let mut out = String::new();
        if let Some(message) = state.message() {
            out.push_str(message);
            return out;
        }
        let visible = self.visible();
        out.push_str(&format!(
            "Scan results: {} of {} shown (filter: {})\n",
            visible.len(),
            self.findings().map(<[Finding]>::len).unwrap_or(0),
            self.filter
        ));
        for (i, f) in visible.iter().enumerate() {
            let style = style_for(&f.severity);
            out.push_str(&format!(
                "\n{:>2}. {} [{}] {}\n    Description: {}\n    Recommendation: {}\n",
                i + 1,
                style.badge,
                f.severity,
                f.category,
                f.message,
                f.recommendation
            ));
        }
        out
    }
}

fn txt_report(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| {
            format!(
                "[{}] {}\n- Description: {}\n- Recommendation: {}\n\n",
                f.severity, f.category, f.message, f.recommendation
            )
        })
        .collect()
}

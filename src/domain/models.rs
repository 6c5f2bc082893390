use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Severity level as reported by the scan service.
///
/// Levels outside the known set are kept verbatim in `Other` so that an
/// unexpected value never aborts presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Warning,
    Info,
    Tip,
    Error,
    Other(String),
}

impl Severity {
    /// Known levels in display order.
    pub const RANKED: [Severity; 7] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Warning,
        Severity::Info,
        Severity::Tip,
        Severity::Error,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Tip => "TIP",
            Self::Error => "ERROR",
            Self::Other(raw) => raw,
        }
    }

    /// Position in the sort order; unrecognised levels sort after `ERROR`.
    pub fn rank(&self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Warning => 3,
            Self::Info => 4,
            Self::Tip => 5,
            Self::Error => 6,
            Self::Other(_) => 7,
        }
    }

    /// Case-insensitive match against the known levels, for user input.
    pub fn parse_loose(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self::RANKED
            .iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "WARNING" => Self::Warning,
            "INFO" => Self::Info,
            "TIP" => Self::Tip,
            "ERROR" => Self::Error,
            _ => Self::Other(raw),
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_severity() -> Severity {
    Severity::Info
}

fn default_category() -> String {
    "Unknown".to_string()
}

fn default_message() -> String {
    "No description provided.".to_string()
}

fn default_recommendation() -> String {
    "No recommendation available.".to_string()
}

/// Text of a loosely typed wire field. `null` counts as absent; other
/// non-string values keep their JSON text.
fn loose_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn loose_severity<'de, D: Deserializer<'de>>(d: D) -> Result<Severity, D::Error> {
    Ok(loose_text(Value::deserialize(d)?)
        .map(Severity::from)
        .unwrap_or_else(default_severity))
}

fn loose_category<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(loose_text(Value::deserialize(d)?).unwrap_or_else(default_category))
}

fn loose_message<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(loose_text(Value::deserialize(d)?).unwrap_or_else(default_message))
}

fn loose_recommendation<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(loose_text(Value::deserialize(d)?).unwrap_or_else(default_recommendation))
}

/// One issue reported by the scan service. Wire shape:
/// `{level, type, message, recommendation}`.
///
/// Any JSON object decodes: missing or `null` fields take their defaults and
/// non-string values are kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "level", default = "default_severity", deserialize_with = "loose_severity")]
    pub severity: Severity,
    #[serde(rename = "type", default = "default_category", deserialize_with = "loose_category")]
    pub category: String,
    #[serde(default = "default_message", deserialize_with = "loose_message")]
    pub message: String,
    #[serde(default = "default_recommendation", deserialize_with = "loose_recommendation")]
    pub recommendation: String,
}

/// A findings array as received, next to its decoded entries. Export uses
/// `raw`; every view is derived from `findings`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceivedFindings {
    pub raw: Vec<Value>,
    pub findings: Vec<Finding>,
}

impl ReceivedFindings {
    /// Fails with the 0-based index of the first entry that is not an object.
    pub fn decode(raw: Vec<Value>) -> Result<Self, usize> {
        let findings = raw
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if !item.is_object() {
                    return Err(i);
                }
                Finding::deserialize(item).map_err(|_| i)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw, findings })
    }
}

#[cfg(test)]
impl From<Vec<Finding>> for ReceivedFindings {
    fn from(findings: Vec<Finding>) -> Self {
        Self {
            raw: findings
                .iter()
                .filter_map(|f| serde_json::to_value(f).ok())
                .collect(),
            findings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A candidate upload. Content stays on disk until submission reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub content: FileContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    UnsupportedExtension,
    InvalidMime,
    TooLarge,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension => "UNSUPPORTED_EXTENSION",
            Self::InvalidMime => "INVALID_MIME",
            Self::TooLarge => "TOO_LARGE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected(RejectReason),
}

/// The one concrete step offered alongside every user-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    ChangeFile,
    Retry,
    GoHome,
    CheckInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// Snapshot of a caught rendering fault. Exactly one is kept on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    pub kind: String,
    pub id: String,
    pub message: String,
    pub stack_detail: String,
    pub timestamp: String,
    pub agent: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub method: String,
    pub path: String,
    /// `None` when no response was received (network failure, timeout).
    pub status: Option<u16>,
    pub elapsed_ms: u64,
}

#[derive(Serialize, Clone)]
pub struct FileSummary {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Serialize)]
pub struct AdmissionReport {
    pub file: FileSummary,
    pub verdict: String,
    pub max_bytes: u64,
}

#[derive(Serialize, Clone)]
pub struct FindingsView {
    pub state: String,
    pub filter: String,
    pub total: usize,
    pub shown: usize,
    pub message: Option<String>,
    pub findings: Vec<Finding>,
}

#[derive(Serialize, Clone)]
pub struct CopyReport {
    pub position: usize,
    pub status: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ScanReport {
    pub file: FileSummary,
    pub view: FindingsView,
    pub exported_to: Option<String>,
    pub copy: Option<CopyReport>,
}

//! Client-side admission gate over a selected file.
//!
//! Advisory only: the scan service still enforces its own limits. Rules run in a
//! fixed order and the first failure wins: extension, then declared content type,
//! then size.

use crate::domain::constants::{ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS, DEFAULT_MAX_BYTES};
use crate::domain::models::{FileContent, RejectReason, SourceFile, ValidationVerdict};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("no file selected")]
    NoSelection,
    #[error("cannot open {path}: {detail}")]
    Unavailable { path: String, detail: String },
    #[error("{name} rejected: {}", .reason.code())]
    Rejected {
        name: String,
        reason: RejectReason,
        message: String,
    },
}

impl AdmissionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSelection => "NO_SELECTION",
            Self::Unavailable { .. } => "FILE_UNAVAILABLE",
            Self::Rejected { reason, .. } => reason.code(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NoSelection => "Please select a file before uploading.".to_string(),
            Self::Unavailable { .. } => {
                "The selected file could not be opened. Choose another file.".to_string()
            }
            Self::Rejected { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            allowed_content_types: ALLOWED_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl AdmissionPolicy {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_extra_extensions(mut self, extra: &[String]) -> Self {
        for ext in extra {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !self.allowed_extensions.contains(&ext) {
                self.allowed_extensions.push(ext);
            }
        }
        self
    }

    pub fn validate(&self, file: &SourceFile) -> ValidationVerdict {
        let ext_ok = extension_of(&file.name)
            .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false);
        if !ext_ok {
            return ValidationVerdict::Rejected(RejectReason::UnsupportedExtension);
        }
        if !self
            .allowed_content_types
            .iter()
            .any(|t| t == &file.content_type)
        {
            return ValidationVerdict::Rejected(RejectReason::InvalidMime);
        }
        if file.size > self.max_bytes {
            return ValidationVerdict::Rejected(RejectReason::TooLarge);
        }
        ValidationVerdict::Accepted
    }

    pub fn rejection_message(&self, reason: RejectReason) -> String {
        match reason {
            RejectReason::UnsupportedExtension => {
                format!("Unsupported file type. Supported: {}", self.extensions_label())
            }
            RejectReason::InvalidMime => {
                "MIME type not accepted. Ensure the file is a valid source file.".to_string()
            }
            RejectReason::TooLarge => format!(
                "File is too large. Maximum allowed: {}.",
                human_size(self.max_bytes)
            ),
        }
    }

    /// Human-readable allow-list, e.g. `.py, .js`.
    pub fn extensions_label(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A file that passed admission. Only `admit` constructs one, so the scan
/// service cannot be handed an unchecked file.
#[derive(Debug, Clone)]
pub struct AcceptedFile(SourceFile);

impl AcceptedFile {
    pub fn file(&self) -> &SourceFile {
        &self.0
    }
}

/// Lowercased extension without the dot; `None` for names with no separator
/// or an empty suffix.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type a browser-style picker would declare for `name`.
pub fn declared_content_type(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("py") => "text/x-python",
        Some("js") => "application/javascript",
        Some("jsx") => "text/jsx",
        Some("ts") => "application/typescript",
        Some("html") | Some("htm") => "text/html",
        Some("php") => "application/x-php",
        Some("cpp") | Some("cc") | Some("cxx") => "text/x-c++src",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Turn an optional path into a candidate file. Reads metadata only.
pub fn select(path: Option<&Path>, content_type: Option<&str>) -> anyhow::Result<SourceFile> {
    let Some(path) = path else {
        return Err(AdmissionError::NoSelection.into());
    };
    let unavailable = |detail: String| AdmissionError::Unavailable {
        path: path.display().to_string(),
        detail,
    };
    let meta = std::fs::metadata(path).map_err(|e| unavailable(e.to_string()))?;
    if !meta.is_file() {
        return Err(unavailable("not a regular file".to_string()).into());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let content_type = content_type
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| declared_content_type(&name).to_string());
    Ok(SourceFile {
        name,
        size: meta.len(),
        content_type,
        content: FileContent::Path(path.to_path_buf()),
    })
}

pub fn admit(policy: &AdmissionPolicy, file: SourceFile) -> Result<AcceptedFile, AdmissionError> {
    match policy.validate(&file) {
        ValidationVerdict::Accepted => Ok(AcceptedFile(file)),
        ValidationVerdict::Rejected(reason) => Err(AdmissionError::Rejected {
            name: file.name,
            reason,
            message: policy.rejection_message(reason),
        }),
    }
}

pub fn read_content(file: &SourceFile) -> std::io::Result<Vec<u8>> {
    match &file.content {
        FileContent::Bytes(bytes) => Ok(bytes.clone()),
        FileContent::Path(path) => std::fs::read(path),
    }
}

pub fn fingerprint(file: &SourceFile) -> std::io::Result<String> {
    let bytes = read_content(file)?;
    Ok(sha256_hex(&bytes))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

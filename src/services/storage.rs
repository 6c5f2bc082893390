use crate::domain::constants::{APP_NAME, DIAGNOSTIC_SLOT_KEY};
use crate::domain::models::DiagnosticRecord;
use crate::services::boundary::DiagnosticStore;
use std::path::PathBuf;

pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config").join(APP_NAME))
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn diagnostic_slot_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join(format!("{}.json", DIAGNOSTIC_SLOT_KEY)))
}

/// Best effort: audit failures never surface.
pub fn audit(action: &str, data: serde_json::Value) {
    let Ok(dir) = config_dir() else {
        return;
    };
    let path = dir.join("audit.jsonl");
    let _ = std::fs::create_dir_all(&dir);
    let event = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}

/// The single on-disk diagnostic slot. Each save replaces the previous record.
#[derive(Debug, Clone)]
pub struct FileDiagnosticStore {
    path: PathBuf,
}

impl FileDiagnosticStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn at_default_location() -> anyhow::Result<Self> {
        Ok(Self::new(diagnostic_slot_path()?))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl DiagnosticStore for FileDiagnosticStore {
    fn save(&self, record: &DiagnosticRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn load(&self) -> anyhow::Result<Option<DiagnosticRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn clear(&self) -> anyhow::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

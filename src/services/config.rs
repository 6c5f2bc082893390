//! Layered settings: CLI flag > environment > `~/.config/nuvai/config.toml` > defaults.

use crate::domain::constants::{DEFAULT_BASE_URL, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT_MS};
use crate::domain::models::BuildMode;
use crate::services::admission::AdmissionPolicy;
use crate::services::storage;
use serde::Deserialize;

pub const ENV_API_URL: &str = "NUVAI_API_URL";
pub const ENV_TIMEOUT_MS: &str = "NUVAI_TIMEOUT_MS";
pub const ENV_ERROR_ENDPOINT: &str = "NUVAI_ERROR_ENDPOINT";
pub const ENV_MODE: &str = "NUVAI_MODE";
pub const ENV_CLIPBOARD_CMD: &str = "NUVAI_CLIPBOARD_CMD";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("cannot parse {path}: {message}")]
    Unparseable { path: String, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub client: ClientSection,
    pub admission: AdmissionSection,
    pub diagnostics: DiagnosticsSection,
    pub clipboard: ClipboardSection,
    pub audit: AuditSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdmissionSection {
    pub max_bytes: Option<u64>,
    pub extra_extensions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    pub endpoint: Option<String>,
    pub mode: Option<BuildMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClipboardSection {
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub jsonl: bool,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_bytes: u64,
    pub extra_extensions: Vec<String>,
    pub diagnostics_endpoint: Option<String>,
    pub mode: BuildMode,
    pub clipboard_command: Option<String>,
    pub audit_jsonl: bool,
}

pub fn load_config_file() -> anyhow::Result<ConfigFile> {
    let path = storage::config_path()?;
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    toml::from_str(&raw).map_err(|e| {
        ConfigError::Unparseable {
            path: path.display().to_string(),
            message: e.message().to_string(),
        }
        .into()
    })
}

impl Settings {
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        let file = load_config_file()?;
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }

    pub fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> anyhow::Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let env_timeout = match env(ENV_TIMEOUT_MS) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS.to_string(),
                value: raw.clone(),
            })?),
            None => None,
        };
        let env_mode = match env(ENV_MODE) {
            Some(raw) => Some(parse_mode(&raw).ok_or(ConfigError::InvalidValue {
                key: ENV_MODE.to_string(),
                value: raw.clone(),
            })?),
            None => None,
        };

        let timeout_ms = overrides
            .timeout_ms
            .or(env_timeout)
            .or(file.client.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(Self {
            base_url: overrides
                .base_url
                .clone()
                .or_else(|| env(ENV_API_URL))
                .or(file.client.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_ms,
            max_bytes: file.admission.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            extra_extensions: file.admission.extra_extensions,
            diagnostics_endpoint: env(ENV_ERROR_ENDPOINT).or(file.diagnostics.endpoint),
            mode: env_mode
                .or(file.diagnostics.mode)
                .unwrap_or_else(BuildMode::current),
            clipboard_command: env(ENV_CLIPBOARD_CMD).or(file.clipboard.command),
            audit_jsonl: file.audit.jsonl,
        })
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy::default()
            .with_max_bytes(self.max_bytes)
            .with_extra_extensions(&self.extra_extensions)
    }
}

fn parse_mode(raw: &str) -> Option<BuildMode> {
    match raw.to_ascii_lowercase().as_str() {
        "development" | "dev" => Some(BuildMode::Development),
        "production" | "prod" => Some(BuildMode::Production),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn file(raw: &str) -> ConfigFile {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let s = Settings::resolve(ConfigFile::default(), env_of(&[]), &Overrides::default()).unwrap();
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.timeout_ms, 10_000);
        assert_eq!(s.max_bytes, 1024 * 1024);
        assert_eq!(s.mode, BuildMode::current());
        assert_eq!(s.diagnostics_endpoint, None);
        assert!(!s.audit_jsonl);
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let cfg = || {
            file(
                r#"
                [client]
                base_url = "http://file:1"
                timeout_ms = 3000
                "#,
            )
        };
        let env = [(ENV_API_URL, "http://env:2"), (ENV_TIMEOUT_MS, "4000")];

        let from_file = Settings::resolve(cfg(), env_of(&[]), &Overrides::default()).unwrap();
        assert_eq!((from_file.base_url.as_str(), from_file.timeout_ms), ("http://file:1", 3000));

        let from_env = Settings::resolve(cfg(), env_of(&env), &Overrides::default()).unwrap();
        assert_eq!((from_env.base_url.as_str(), from_env.timeout_ms), ("http://env:2", 4000));

        let flags = Overrides {
            base_url: Some("http://flag:3".to_string()),
            timeout_ms: Some(5000),
        };
        let from_flag = Settings::resolve(cfg(), env_of(&env), &flags).unwrap();
        assert_eq!((from_flag.base_url.as_str(), from_flag.timeout_ms), ("http://flag:3", 5000));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let s = Settings::resolve(
            ConfigFile::default(),
            env_of(&[(ENV_API_URL, "  "), (ENV_ERROR_ENDPOINT, "")]),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.diagnostics_endpoint, None);
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let err = Settings::resolve(
            ConfigFile::default(),
            env_of(&[(ENV_TIMEOUT_MS, "soon")]),
            &Overrides::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS.to_string(),
                value: "soon".to_string()
            })
        );
        assert!(Settings::resolve(
            ConfigFile::default(),
            env_of(&[(ENV_MODE, "staging")]),
            &Overrides::default()
        )
        .is_err());
    }

    #[test]
    fn diagnostics_and_admission_sections_apply() {
        let cfg = file(
            r#"
            [admission]
            max_bytes = 2048
            extra_extensions = ["rs"]

            [diagnostics]
            endpoint = "https://errors.example/ingest"
            mode = "production"

            [audit]
            jsonl = true
            "#,
        );
        let s = Settings::resolve(cfg, env_of(&[(ENV_MODE, "development")]), &Overrides::default())
            .unwrap();
        assert_eq!(s.mode, BuildMode::Development);
        assert_eq!(s.diagnostics_endpoint.as_deref(), Some("https://errors.example/ingest"));
        assert!(s.audit_jsonl);

        let policy = s.admission_policy();
        assert_eq!(policy.max_bytes, 2048);
        assert!(policy.allowed_extensions.contains(&"rs".to_string()));
    }

    #[test]
    fn unknown_sections_fail_to_parse() {
        assert!(toml::from_str::<ConfigFile>("[bogus]\nx = 1\n").is_err());
    }
}

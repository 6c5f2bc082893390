use super::{present, AppContext, RESULTS_ROUTE};
use crate::cli::FindingsCommands;
use crate::domain::models::{JsonOut, ReceivedFindings};
use crate::services::output::print_one;
use crate::services::presenter::FindingsPresenter;
use serde_json::Value;
use std::path::Path;

/// Raw entries of an exported results file. `None` when the file is missing,
/// unreadable, or not a JSON array.
pub fn load_results_file(path: &Path) -> Option<Vec<Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read results file");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => Some(items),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "results file is not an array");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "results file is not JSON");
            None
        }
    }
}

/// Card-by-card decoding; one entry that is not an object fails the whole view.
pub fn decode_findings(items: Vec<Value>) -> anyhow::Result<ReceivedFindings> {
    ReceivedFindings::decode(items)
        .map_err(|i| anyhow::anyhow!("Invalid finding data at entry {}.", i + 1))
}

pub fn handle_findings_commands(ctx: &AppContext, command: &FindingsCommands) -> anyhow::Result<()> {
    match command {
        FindingsCommands::Show { file, filter } => {
            let items = load_results_file(file);
            let filter = filter.clone();
            let json = ctx.json;
            present(ctx, RESULTS_ROUTE, move || {
                let findings = items.map(decode_findings).transpose()?;
                let presenter = FindingsPresenter::new(findings).with_filter(filter);
                if json {
                    Ok(serde_json::to_string_pretty(&JsonOut {
                        ok: true,
                        data: presenter.view_report(),
                    })?)
                } else {
                    Ok(presenter.render_text().trim_end().to_string())
                }
            })
        }
        FindingsCommands::Copy {
            file,
            position,
            filter,
        } => {
            let findings = load_results_file(file)
                .map(decode_findings)
                .transpose()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "results file has malformed entries");
                    None
                });
            let presenter = FindingsPresenter::new(findings).with_filter(filter.clone());
            let report = presenter.copy_recommendation(*position, &ctx.clipboard());
            print_one(ctx.json, report, |r| r.message.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_array_file_is_not_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(&path, r#"{"findings": []}"#).unwrap();
        assert!(load_results_file(&path).is_none());
        assert!(load_results_file(&dir.path().join("missing.json")).is_none());

        std::fs::write(&path, "[]").unwrap();
        assert_eq!(load_results_file(&path), Some(Vec::new()));
    }

    #[test]
    fn decoding_rejects_non_object_entries() {
        let err = decode_findings(vec![json!({"level": "HIGH"}), json!(42)]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid finding data at entry 2.");

        let ok = decode_findings(vec![json!({"level": null, "type": "XSS"})]).unwrap();
        assert_eq!(ok.findings[0].category, "XSS");
        assert_eq!(ok.raw[0]["level"], Value::Null);
    }
}

use super::{present, AppContext, RESULTS_ROUTE};
use crate::cli::ScanArgs;
use crate::domain::models::{AdmissionReport, FileSummary, JsonOut, ScanReport, SourceFile};
use crate::services::admission::{self, human_size};
use crate::services::output::print_one;
use crate::services::presenter::FindingsPresenter;
use std::path::PathBuf;

pub fn summarize(file: &SourceFile, sha256: Option<String>) -> FileSummary {
    FileSummary {
        name: file.name.clone(),
        size: file.size,
        content_type: file.content_type.clone(),
        sha256,
    }
}

pub fn handle_validate(
    ctx: &AppContext,
    file: Option<&PathBuf>,
    content_type: Option<&str>,
) -> anyhow::Result<()> {
    let policy = ctx.settings.admission_policy();
    let selected = admission::select(file.map(PathBuf::as_path), content_type)?;
    let summary = summarize(&selected, None);
    let accepted = admission::admit(&policy, selected)?;
    tracing::debug!(file = %accepted.file().name, "file passed admission");
    print_one(
        ctx.json,
        AdmissionReport {
            file: summary,
            verdict: "accepted".to_string(),
            max_bytes: policy.max_bytes,
        },
        |r| {
            format!(
                "accepted\t{}\t{}\t{} (limit {})",
                r.file.name,
                r.file.content_type,
                human_size(r.file.size),
                human_size(r.max_bytes)
            )
        },
    )
}

pub fn handle_scan(ctx: &AppContext, args: &ScanArgs) -> anyhow::Result<()> {
    let policy = ctx.settings.admission_policy();
    let selected = admission::select(args.file.as_deref(), args.content_type.as_deref())?;
    let accepted = admission::admit(&policy, selected)?;
    let sha256 = admission::fingerprint(accepted.file()).ok();

    let received = ctx.scan_service()?.submit(&accepted)?;
    let presenter = FindingsPresenter::new(Some(received)).with_filter(args.filter.clone());

    let exported_to = match &args.export {
        Some(dir) => Some(presenter.export_to_dir(dir, args.format)?),
        None => None,
    };
    let copy = args
        .copy
        .map(|position| presenter.copy_recommendation(position, &ctx.clipboard()));

    let report = ScanReport {
        file: summarize(accepted.file(), sha256),
        view: presenter.view_report(),
        exported_to: exported_to.map(|p| p.display().to_string()),
        copy,
    };
    let json = ctx.json;
    present(ctx, RESULTS_ROUTE, move || {
        if json {
            return Ok(serde_json::to_string_pretty(&JsonOut {
                ok: true,
                data: report,
            })?);
        }
        let mut out = format!(
            "file: {} ({}, {})\n",
            report.file.name,
            report.file.content_type,
            human_size(report.file.size)
        );
        if let Some(sha) = &report.file.sha256 {
            out.push_str(&format!("sha256: {}\n", sha));
        }
        out.push('\n');
        out.push_str(presenter.render_text().trim_end());
        if let Some(path) = &report.exported_to {
            out.push_str(&format!("\n\nexported: {}", path));
        }
        if let Some(copy) = &report.copy {
            out.push_str(&format!("\n{}", copy.message));
        }
        Ok(out)
    })
}

use crate::domain::models::{JsonOut, NextAction};
use crate::services::admission::AdmissionError;
use crate::services::boundary::FaultView;
use crate::services::config::ConfigError;
use crate::services::presenter::PresenterError;
use crate::services::submission::SubmitError;
use serde::Serialize;

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Marks a failure whose output has already been written.
#[derive(thiserror::Error, Debug)]
#[error("already reported")]
pub struct Reported;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub action: NextAction,
}

#[derive(Serialize)]
struct ErrorOut<'a> {
    ok: bool,
    error: &'a ErrorBody,
}

/// Stable code, short message and next action for any command failure.
/// Unrecognised errors are logged and reported as `INTERNAL`.
pub fn classify(err: &anyhow::Error) -> ErrorBody {
    if let Some(e) = err.downcast_ref::<AdmissionError>() {
        return ErrorBody {
            code: e.code().to_string(),
            message: e.user_message(),
            action: NextAction::ChangeFile,
        };
    }
    if let Some(e) = err.downcast_ref::<SubmitError>() {
        return ErrorBody {
            code: e.code().to_string(),
            message: e.user_message().to_string(),
            action: e.action(),
        };
    }
    if let Some(e) = err.downcast_ref::<PresenterError>() {
        return ErrorBody {
            code: e.code().to_string(),
            message: e.user_message(),
            action: e.action(),
        };
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return ErrorBody {
            code: "CONFIG_INVALID".to_string(),
            message: e.to_string(),
            action: NextAction::CheckInput,
        };
    }
    tracing::error!(error = ?err, "unhandled command failure");
    ErrorBody {
        code: "INTERNAL".to_string(),
        message: "Something went wrong. Please try again.".to_string(),
        action: NextAction::Retry,
    }
}

pub fn print_error(json: bool, body: &ErrorBody) {
    if json {
        let out = ErrorOut {
            ok: false,
            error: body,
        };
        match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{{\"ok\":false,\"error\":{{\"code\":\"{}\"}}}}", body.code),
        }
    } else {
        eprintln!("error[{}]: {}", body.code, body.message);
        eprintln!("next: {}", action_hint(body.action));
    }
}

/// Fallback output for a faulted view. JSON shares the error envelope.
pub fn print_fault(json: bool, view: &FaultView) {
    if json {
        let out = serde_json::json!({
            "ok": false,
            "error": {
                "code": "RENDER_FAULT",
                "message": view.message,
                "action": NextAction::GoHome,
                "trace_id": view.trace_id,
                "recovery": view.recovery,
                "detail": view.detail,
            }
        });
        println!("{}", out);
    } else {
        println!("{}", fault_text(view));
    }
}

pub fn fault_text(view: &FaultView) -> String {
    let mut out = format!(
        "{}\nTrace ID: {}\nReturn home: {}",
        view.message, view.trace_id, view.recovery
    );
    if let Some(detail) = &view.detail {
        out.push_str("\n\n--- diagnostic detail ---\n");
        out.push_str(detail);
    }
    out
}

pub fn action_hint(action: NextAction) -> &'static str {
    match action {
        NextAction::ChangeFile => "choose a different file",
        NextAction::Retry => "try again",
        NextAction::GoHome => "return to the start",
        NextAction::CheckInput => "check the command arguments",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RejectReason;

    #[test]
    fn known_errors_keep_their_codes() {
        let err: anyhow::Error = AdmissionError::Rejected {
            name: "a.exe".to_string(),
            reason: RejectReason::UnsupportedExtension,
            message: "Unsupported file type.".to_string(),
        }
        .into();
        let body = classify(&err);
        assert_eq!(body.code, "UNSUPPORTED_EXTENSION");
        assert_eq!(body.action, NextAction::ChangeFile);

        let body = classify(&SubmitError::Timeout.into());
        assert_eq!(body.code, "SCAN_TIMEOUT");
        assert_eq!(body.message, "Scan timed out. Please try again.");
        assert_eq!(body.action, NextAction::Retry);

        let body = classify(&PresenterError::NothingToExport.into());
        assert_eq!(body.code, "NOTHING_TO_EXPORT");
    }

    #[test]
    fn context_does_not_hide_the_code() {
        let err = anyhow::Error::from(SubmitError::Unreadable).context("scan failed");
        assert_eq!(classify(&err).code, "FILE_UNREADABLE");
    }

    #[test]
    fn unknown_errors_are_internal_and_generic() {
        let body = classify(&anyhow::anyhow!("db pool exhausted at 0xdeadbeef"));
        assert_eq!(body.code, "INTERNAL");
        assert!(!body.message.contains("0xdeadbeef"));
    }

    #[test]
    fn fault_text_shows_detail_only_when_present() {
        let mut view = FaultView {
            trace_id: "t-1".to_string(),
            message: "oops".to_string(),
            recovery: "/".to_string(),
            detail: None,
        };
        assert!(!fault_text(&view).contains("diagnostic detail"));
        view.detail = Some("stack".to_string());
        assert!(fault_text(&view).contains("stack"));
        assert!(fault_text(&view).contains("Trace ID: t-1"));
    }
}

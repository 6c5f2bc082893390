use super::AppContext;
use crate::cli::DiagnosticsCommands;
use crate::services::boundary::DiagnosticStore;
use crate::services::output::print_one;
use crate::services::storage::FileDiagnosticStore;

pub fn handle_diagnostics_commands(
    ctx: &AppContext,
    command: &DiagnosticsCommands,
) -> anyhow::Result<()> {
    let store = FileDiagnosticStore::at_default_location()?;
    match command {
        DiagnosticsCommands::Show => {
            let record = store.load()?;
            print_one(ctx.json, record, |r| match r {
                Some(r) => format!(
                    "id: {}\nkind: {}\ntimestamp: {}\npath: {}\nagent: {}\nmessage: {}\n\n{}",
                    r.id, r.kind, r.timestamp, r.path, r.agent, r.message, r.stack_detail
                ),
                None => "no diagnostic record".to_string(),
            })
        }
        DiagnosticsCommands::Clear => {
            let cleared = store.clear()?;
            print_one(
                ctx.json,
                serde_json::json!({ "cleared": cleared }),
                |_| {
                    if cleared {
                        "cleared diagnostic record".to_string()
                    } else {
                        "no diagnostic record".to_string()
                    }
                },
            )
        }
    }
}

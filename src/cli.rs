use crate::services::presenter::{ExportFormat, SeverityFilter};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nuvai", version, about = "Nuvai source scanner client")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "Scan service root URL (overrides NUVAI_API_URL and config)"
    )]
    pub base_url: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Tracing filter, e.g. info or nuvai_audit=info"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate, upload and present findings for one source file
    Scan(ScanArgs),
    /// Run the local admission checks only; nothing is uploaded
    Validate {
        file: Option<PathBuf>,
        #[arg(long, help = "Declared content type (default: derived from extension)")]
        content_type: Option<String>,
    },
    /// Work with an exported findings file
    Findings {
        #[command(subcommand)]
        command: FindingsCommands,
    },
    /// Inspect or clear the last recorded fault
    Diagnostics {
        #[command(subcommand)]
        command: DiagnosticsCommands,
    },
    /// Interactive session
    Shell,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    pub file: Option<PathBuf>,
    #[arg(long, help = "Declared content type (default: derived from extension)")]
    pub content_type: Option<String>,
    #[arg(long, default_value = "ALL", help = "ALL or one severity, e.g. HIGH")]
    pub filter: SeverityFilter,
    #[arg(long, help = "Directory to write the unfiltered results to")]
    pub export: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
    #[arg(long, help = "Copy the recommendation at this displayed position (1-based)")]
    pub copy: Option<usize>,
    #[arg(long, help = "Request deadline in milliseconds")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum FindingsCommands {
    Show {
        file: PathBuf,
        #[arg(long, default_value = "ALL")]
        filter: SeverityFilter,
    },
    Copy {
        file: PathBuf,
        position: usize,
        #[arg(long, default_value = "ALL")]
        filter: SeverityFilter,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiagnosticsCommands {
    Show,
    Clear,
}

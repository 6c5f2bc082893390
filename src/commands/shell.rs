//! Line-oriented interactive session.
//!
//! One session owns one scan service (and so one in-flight gate), the current
//! presenter, and a single fault boundary that stays faulted across commands
//! until `home` recovers it. Uploads run on a worker thread so the session keeps
//! answering commands while a scan is outstanding.

use super::findings::{decode_findings, load_results_file};
use super::{AppContext, DRAIN_BOUND, RESULTS_ROUTE};
use crate::domain::constants::HOME_ROUTE;
use crate::domain::models::ReceivedFindings;
use crate::services::admission::{self, AdmissionPolicy};
use crate::services::boundary::{FaultBoundary, Rendered};
use crate::services::clipboard::Clipboard;
use crate::services::output::{classify, fault_text};
use crate::services::presenter::{ExportFormat, FindingsPresenter, SeverityFilter};
use crate::services::submission::{ScanService, SubmitError};
use crate::services::transport::Transport;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

const HELP: &str = "commands:
  scan <path>           validate and upload a file (runs in the background)
  open <results.json>   load exported results
  filter <ALL|LEVEL>    change the severity filter
  show                  show the current results
  export [dir] [txt]    write unfiltered results (default: current dir, json)
  copy <n>              copy the recommendation at position n
  home                  clear results and recover from a fault
  quit                  leave the session";

/// How often the input loop checks for a finished scan while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type ScanOutcome = Result<ReceivedFindings, SubmitError>;

struct PendingScan {
    file: String,
    done: Receiver<ScanOutcome>,
}

pub struct Session<T: Transport, C: Clipboard> {
    service: Arc<ScanService<T>>,
    clipboard: C,
    policy: AdmissionPolicy,
    boundary: FaultBoundary,
    presenter: Option<FindingsPresenter>,
    filter: SeverityFilter,
    pending: Option<PendingScan>,
}

pub enum Step {
    Continue(String),
    Quit,
}

impl<T, C> Session<T, C>
where
    T: Transport + Send + Sync + 'static,
    C: Clipboard,
{
    pub fn new(
        service: ScanService<T>,
        clipboard: C,
        policy: AdmissionPolicy,
        boundary: FaultBoundary,
    ) -> Self {
        Self {
            service: Arc::new(service),
            clipboard,
            policy,
            boundary,
            presenter: None,
            filter: SeverityFilter::All,
            pending: None,
        }
    }

    pub fn boundary_mut(&mut self) -> &mut FaultBoundary {
        &mut self.boundary
    }

    pub fn step(&mut self, line: &str) -> Step {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Step::Continue(String::new());
        };
        let args: Vec<&str> = parts.collect();
        if self.boundary.is_faulted() && !matches!(command, "help" | "home" | "quit" | "exit") {
            return Step::Continue(self.show());
        }
        let text = match (command, args.as_slice()) {
            ("quit" | "exit", _) => return Step::Quit,
            ("help", _) => HELP.to_string(),
            ("scan", [path]) => self.scan(Path::new(path)),
            ("open", [path]) => self.open(Path::new(path)),
            ("filter", [level]) => match level.parse::<SeverityFilter>() {
                Ok(filter) => {
                    self.filter = filter.clone();
                    if let Some(p) = self.presenter.as_mut() {
                        p.set_filter(filter);
                    }
                    self.show()
                }
                Err(e) => e,
            },
            ("show", []) => self.show(),
            ("export", rest) => self.export(rest),
            ("copy", [n]) => match n.parse::<usize>() {
                Ok(position) => self.copy(position),
                Err(_) => format!("not a position: {}", n),
            },
            ("home", []) => {
                self.presenter = None;
                self.pending = None;
                self.filter = SeverityFilter::All;
                format!("home: {}", self.boundary.recover())
            }
            _ => format!("unknown command: {} (try `help`)", line.trim()),
        };
        Step::Continue(text)
    }

    /// Applies a finished background scan, if there is one.
    pub fn poll(&mut self) -> Option<String> {
        let outcome = match self.pending.as_ref()?.done.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => None,
        };
        Some(self.finish(outcome))
    }

    /// Blocks until the outstanding scan, if any, finishes. The transport
    /// deadline bounds the wait.
    pub fn wait(&mut self) -> Option<String> {
        let outcome = self.pending.as_ref()?.done.recv().ok();
        Some(self.finish(outcome))
    }

    fn scan(&mut self, path: &Path) -> String {
        let Some(guard) = self.service.gate().try_begin() else {
            return error_line(&SubmitError::InFlight.into());
        };
        let accepted = match admission::select(Some(path), None)
            .and_then(|file| Ok(admission::admit(&self.policy, file)?))
        {
            Ok(accepted) => accepted,
            Err(e) => return error_line(&e),
        };
        let file = accepted.file().name.clone();
        let (tx, done) = mpsc::channel();
        let service = Arc::clone(&self.service);
        let spawned = std::thread::Builder::new()
            .name("nuvai-scan".to_string())
            .spawn(move || {
                let _ = tx.send(service.submit_held(guard, &accepted));
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to start scan worker");
            return error_line(&e.into());
        }
        self.pending = Some(PendingScan {
            file: file.clone(),
            done,
        });
        format!("scanning {}; results follow when ready", file)
    }

    /// `None` means the worker went away without reporting.
    fn finish(&mut self, outcome: Option<ScanOutcome>) -> String {
        let file = self.pending.take().map(|p| p.file).unwrap_or_default();
        match outcome {
            Some(Ok(received)) => {
                self.presenter =
                    Some(FindingsPresenter::new(Some(received)).with_filter(self.filter.clone()));
                format!("scan of {} finished\n{}", file, self.show())
            }
            Some(Err(e)) => error_line(&e.into()),
            None => {
                tracing::warn!(file = %file, "scan worker exited without a result");
                error_line(&anyhow::anyhow!("scan worker exited without a result"))
            }
        }
    }

    fn open(&mut self, path: &Path) -> String {
        let items = load_results_file(path);
        let filter = self.filter.clone();
        match self.boundary.guard(RESULTS_ROUTE, move || {
            let received = items.map(decode_findings).transpose()?;
            Ok(FindingsPresenter::new(received).with_filter(filter))
        }) {
            Rendered::Content(presenter) => {
                self.presenter = Some(presenter);
                self.show()
            }
            Rendered::Fallback(view) => fault_text(&view),
        }
    }

    fn show(&mut self) -> String {
        let presenter = self.presenter.clone();
        let scanning = self.pending.as_ref().map(|p| p.file.clone());
        let rendered = self.boundary.guard(RESULTS_ROUTE, move || {
            Ok(match (presenter, scanning) {
                (Some(p), _) => p.render_text().trim_end().to_string(),
                (None, Some(file)) => format!("scan of {} in progress", file),
                (None, None) => "no results yet; `scan <path>` or `open <file>` first".to_string(),
            })
        });
        match rendered {
            Rendered::Content(text) => text,
            Rendered::Fallback(view) => fault_text(&view),
        }
    }

    fn export(&self, args: &[&str]) -> String {
        let (dir, format) = match args {
            [] => (PathBuf::from("."), ExportFormat::Json),
            [dir] => (PathBuf::from(dir), ExportFormat::Json),
            [dir, "txt"] => (PathBuf::from(dir), ExportFormat::Txt),
            [dir, "json"] => (PathBuf::from(dir), ExportFormat::Json),
            _ => return "usage: export [dir] [json|txt]".to_string(),
        };
        let presenter = self.presenter.clone().unwrap_or_default();
        match presenter.export_to_dir(&dir, format) {
            Ok(path) => format!("exported: {}", path.display()),
            Err(e) => error_line(&e.into()),
        }
    }

    fn copy(&self, position: usize) -> String {
        match &self.presenter {
            Some(p) => p.copy_recommendation(position, &self.clipboard).message,
            None => FindingsPresenter::default()
                .copy_recommendation(position, &self.clipboard)
                .message,
        }
    }
}

fn error_line(err: &anyhow::Error) -> String {
    let body = classify(err);
    format!("error[{}]: {}", body.code, body.message)
}

/// Stdin is read on its own thread so a finished scan is reported without
/// waiting for the next command.
fn spawn_line_reader() -> std::io::Result<Receiver<String>> {
    let (tx, lines) = mpsc::channel();
    std::thread::Builder::new()
        .name("nuvai-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read shell input");
                        break;
                    }
                }
            }
        })?;
    Ok(lines)
}

pub fn run_shell(ctx: &AppContext) -> anyhow::Result<()> {
    let mut session = Session::new(
        ctx.scan_service()?,
        ctx.clipboard(),
        ctx.settings.admission_policy(),
        ctx.boundary()?,
    );
    let lines = spawn_line_reader()?;
    let mut stdout = std::io::stdout();
    writeln!(stdout, "nuvai shell (route {}). Type `help`.", HOME_ROUTE)?;
    stdout.flush()?;
    loop {
        if let Some(done) = session.poll() {
            writeln!(stdout, "{}", done)?;
            stdout.flush()?;
        }
        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match session.step(&line) {
            Step::Quit => break,
            Step::Continue(text) if text.is_empty() => {}
            Step::Continue(text) => writeln!(stdout, "{}", text)?,
        }
        stdout.flush()?;
    }
    if let Some(done) = session.wait() {
        writeln!(stdout, "{}", done)?;
    }
    session.boundary_mut().drain(DRAIN_BOUND);
    Ok(())
}

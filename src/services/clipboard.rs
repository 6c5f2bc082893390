use std::io::Write;
use std::process::{Command, Stdio};

pub trait Clipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Pipes text into an external clipboard program.
///
/// A configured command line runs through the shell; otherwise the usual
/// platform tools are tried in order until one can be spawned.
#[derive(Debug, Clone, Default)]
pub struct CommandClipboard {
    command: Option<String>,
}

const CANDIDATES: &[&[&str]] = &[
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
    &["clip"],
];

impl CommandClipboard {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

impl Clipboard for CommandClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        if let Some(line) = &self.command {
            let mut cmd = shell_command(line);
            return pipe(&mut cmd, text);
        }
        for argv in CANDIDATES {
            let mut cmd = Command::new(argv[0]);
            cmd.args(&argv[1..]);
            match pipe(&mut cmd, text) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::debug!(program = argv[0], error = %e, "clipboard tool unavailable"),
            }
        }
        anyhow::bail!("no clipboard tool available")
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(not(unix))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

fn pipe(cmd: &mut Command, text: &str) -> anyhow::Result<()> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    // Reap the child even when it stopped reading early.
    let status = child.wait()?;
    written?;
    if !status.success() {
        anyhow::bail!("clipboard command exited with {}", status);
    }
    Ok(())
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryClipboard {
    pub fail: bool,
    pub written: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("clipboard denied");
        }
        self.written.borrow_mut().push(text.to_string());
        Ok(())
    }
}

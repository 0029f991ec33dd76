//! Helpers shared by the backends that shell out to a binary.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::error::BackendFailure;

/// Locate `name` on `PATH`.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| candidate.is_file())
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![dir.join(format!("{name}.exe")), dir.join(name)]
    } else {
        vec![dir.join(name)]
    }
}

/// Whether a usable `nice` command exists. Probed once per process.
pub fn has_nice_support() -> bool {
    static NICE: OnceLock<bool> = OnceLock::new();
    *NICE.get_or_init(|| {
        Command::new("nice")
            .stdin(Stdio::null())
            .output()
            .map(|out| {
                let stdout = String::from_utf8_lossy(&out.stdout);
                let stderr = String::from_utf8_lossy(&out.stderr);
                looks_like_nice(stdout.lines().next().or_else(|| stderr.lines().next()))
            })
            .unwrap_or(false)
    })
}

/// `nice` without arguments prints the current niceness, or a usage line on
/// some platforms.
fn looks_like_nice(first_line: Option<&str>) -> bool {
    match first_line.map(str::trim) {
        Some(line) if line.to_ascii_lowercase().contains("usage") => true,
        Some(line) => {
            let digits = line.trim_start_matches('-');
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Build a command for `binary`, wrapped in `nice` when requested and available.
pub fn command(binary: &Path, use_nice: bool) -> Command {
    if use_nice && has_nice_support() {
        let mut cmd = Command::new("nice");
        cmd.arg(binary);
        cmd
    } else {
        Command::new(binary)
    }
}

/// Run `cmd` to completion. A non-zero exit becomes [`BackendFailure::Failed`]
/// carrying the captured stderr.
pub fn run(mut cmd: Command) -> Result<(), BackendFailure> {
    let program = display_program(cmd.get_program());
    log::debug!("Running {:?}", cmd);

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| BackendFailure::Failed(format!("failed to start {program}: {e}")))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    Err(BackendFailure::Failed(if stderr.is_empty() {
        format!("{program} exited with {}", output.status)
    } else {
        format!("{program} exited with {}: {stderr}", output.status)
    }))
}

fn display_program(program: &OsStr) -> String {
    Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_nice() {
        assert!(looks_like_nice(Some("0")));
        assert!(looks_like_nice(Some("10\n")));
        assert!(looks_like_nice(Some("usage: nice [-n increment] utility")));
        assert!(!looks_like_nice(Some("nice: command not found")));
        assert!(!looks_like_nice(Some("")));
        assert!(!looks_like_nice(None));
    }

    #[test]
    fn test_find_binary_missing() {
        assert!(find_binary("definitely-not-a-real-binary-4f2a").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        match run(cmd).unwrap_err() {
            BackendFailure::Failed(msg) => {
                assert!(msg.starts_with("sh exited with"), "{msg}");
                assert!(msg.contains("broken"), "{msg}");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_success() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 0"]);
        run(cmd).unwrap();
    }
}

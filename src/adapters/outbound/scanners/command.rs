use crate::auditing::domain::ScannerKind;
use crate::shared::error::AuditError;
use crate::shared::security::MAX_SCANNER_OUTPUT_SIZE;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Longest stderr/stdout excerpt carried in an error message.
const MAX_ERROR_EXCERPT: usize = 500;

/// Runs an audit command in `dir` and returns its stdout.
///
/// Exit codes listed in `accepted` are treated as success (package managers
/// use non-zero codes to say "vulnerabilities found"). The child is killed
/// if the returned future is dropped or `cancel` fires.
pub(super) async fn run_audit_command(
    kind: ScannerKind,
    program: &str,
    args: &[&str],
    dir: &Path,
    accepted: &[i32],
    cancel: &CancellationToken,
) -> Result<String, AuditError> {
    if !dir.is_dir() {
        return Err(AuditError::ProjectDirectoryMissing {
            scanner: kind,
            path: dir.to_path_buf(),
        });
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AuditError::Cancelled),
        output = command.output() => output.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AuditError::ScannerUnavailable {
                scanner: kind,
                details: format!("'{}' not found in PATH", program),
            },
            _ => AuditError::ScanExecutionFailed {
                scanner: kind,
                exit_code: None,
                details: format!("failed to run {}: {}", program, e),
            },
        })?,
    };

    let exit_code = output.status.code();
    if !exit_code.is_some_and(|code| accepted.contains(&code)) {
        return Err(AuditError::ScanExecutionFailed {
            scanner: kind,
            exit_code,
            details: failure_details(&output.stderr, &output.stdout, exit_code),
        });
    }

    if output.stdout.len() > MAX_SCANNER_OUTPUT_SIZE {
        return Err(AuditError::ScanOutputUnparseable {
            scanner: kind,
            details: format!(
                "output is too large ({} bytes, limit {} bytes)",
                output.stdout.len(),
                MAX_SCANNER_OUTPUT_SIZE
            ),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| AuditError::ScanOutputUnparseable {
        scanner: kind,
        details: format!("output is not valid UTF-8: {}", e),
    })
}

/// Prefers stderr, falls back to stdout, then to the bare exit status.
fn failure_details(stderr: &[u8], stdout: &[u8], exit_code: Option<i32>) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    let text = [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        });
    truncate(&text, MAX_ERROR_EXCERPT)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}

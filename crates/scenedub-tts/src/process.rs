//! Subprocess plumbing shared by the engine crates.
//!
//! Engine runs carry no internal deadline. Callers that need to abort pass
//! a cancellation token, and `kill_on_drop` reaps the child when the race
//! abandons it.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SynthesisError, SynthesisResult};

/// Cap on how much captured stderr is carried into an error message.
const STDERR_EXCERPT_LEN: usize = 400;

/// Run an engine binary to completion, optionally feeding text on stdin.
///
/// A spawn failure with `NotFound` maps to [`SynthesisError::Unavailable`]
/// with install guidance. A nonzero exit maps to [`SynthesisError::Failed`]
/// carrying a stderr excerpt. A stdin write failure is not classified on
/// its own; the exit status decides. Cancellation kills the child and
/// returns [`SynthesisError::Cancelled`].
pub async fn run_engine(
    program: &str,
    args: &[String],
    stdin_text: Option<&str>,
    cancel: &CancellationToken,
) -> SynthesisResult<()> {
    debug!("running {} {:?}", program, args);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin_text.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SynthesisError::Unavailable(format!(
                "{program} not found. Please install {program} to synthesize speech."
            ))
        } else {
            SynthesisError::Io(e)
        }
    })?;

    let run = async move {
        if let Some(input) = stdin_text {
            if let Some(mut stdin) = child.stdin.take() {
                // A dead engine closes the pipe mid-write; the exit status
                // below decides the outcome.
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!("stdin write failed: {}", e);
                }
                // Dropping stdin sends EOF so the engine starts rendering.
                drop(stdin);
            }
        }
        child.wait_with_output().await
    };

    let output = tokio::select! {
        result = run => result?,
        _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
    };

    if !output.status.success() {
        return Err(SynthesisError::Failed(format!(
            "{} exited with status {}: {}",
            program,
            output.status,
            stderr_excerpt(&output.stderr)
        )));
    }
    Ok(())
}

/// Read back the WAV file an engine was asked to write.
///
/// A missing, unreadable or empty file after a clean exit counts as an
/// engine failure under the engine's name, not as an IO error of ours.
pub async fn read_engine_output(program: &str, path: &Path) -> SynthesisResult<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Err(SynthesisError::Failed(format!(
            "{} wrote an empty file to {}",
            program,
            path.display()
        ))),
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(SynthesisError::Failed(format!(
            "{} produced no output at {}: {}",
            program,
            path.display(),
            e
        ))),
    }
}

fn stderr_excerpt(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_EXCERPT_LEN {
        return trimmed.to_string();
    }
    let mut end = STDERR_EXCERPT_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

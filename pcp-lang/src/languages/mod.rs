use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;

use crate::{CompileFailure, CompiledUnit, Language, COMPLETION_EXIT_CODE, TERMINATION_EXIT_CODE};

pub(crate) mod java;
pub(crate) mod python;

/// Trait that defines how a supported language is compiled and launched.
///
/// An adapter never writes the source code to shared storage: the toolchain may only use a private
/// scratch directory that is removed before `compile` returns.
pub trait LanguageAdapter: std::fmt::Debug + Send + Sync {
    /// The language handled by this adapter.
    fn language(&self) -> Language;

    /// List of valid extensions for this language, lowercase and without the leading dot.
    fn extensions(&self) -> Vec<&'static str>;

    /// Whether `name` can be used as the name of the entry point of a submission.
    fn is_valid_entry_point(&self, name: &str) -> bool;

    /// Compile the source code. The entry point has already been validated and the size of the
    /// source already checked.
    fn compile(&self, source: &str, entry_point: &str) -> Result<CompiledUnit, CompileFailure>;
}

/// Find a tool of the toolchain in `$PATH`. Absolute paths are accepted as they are.
pub(crate) fn find_tool(name: &OsStr) -> Result<PathBuf, CompileFailure> {
    which::which(name).map_err(|e| CompileFailure::ToolchainMissing {
        tool: name.to_string_lossy().into_owned(),
        reason: e.to_string(),
    })
}

/// Fill a launcher harness template with the name of the entry point and the reserved exit codes.
pub(crate) fn render_harness(template: &str, entry_point: &str) -> String {
    template
        .replace("@ENTRY@", entry_point)
        .replace("@TERMINATION_EXIT_CODE@", &TERMINATION_EXIT_CODE.to_string())
        .replace("@COMPLETION_EXIT_CODE@", &COMPLETION_EXIT_CODE.to_string())
}

/// Run a tool of the toolchain to completion, optionally writing `stdin` to its standard input.
/// A failure to start or wait for the tool is an internal compilation error.
pub(crate) fn run_tool(mut command: Command, stdin: Option<&[u8]>) -> Result<Output, CompileFailure> {
    trace!("Running toolchain command: {:?}", command);
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| {
        CompileFailure::Internal(format!(
            "Failed to start {:?}: {}",
            command.get_program(),
            e
        ))
    })?;
    let feeder = match (stdin, child.stdin.take()) {
        (Some(data), Some(mut pipe)) => {
            let data = data.to_vec();
            let feeder = thread::Builder::new()
                .name("Toolchain stdin".into())
                .spawn(move || {
                    // the tool may exit without reading everything
                    let _ = pipe.write_all(&data);
                })
                .map_err(|e| CompileFailure::Internal(format!("Failed to spawn feeder: {}", e)))?;
            Some(feeder)
        }
        _ => None,
    };
    let output = child
        .wait_with_output()
        .map_err(|e| CompileFailure::Internal(format!("Failed to wait the toolchain: {}", e)))?;
    if let Some(feeder) = feeder {
        let _ = feeder.join();
    }
    Ok(output)
}

/// Merge the standard output and error of a failed tool into the text of the diagnostics.
pub(crate) fn diagnostics_of(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stdout);
    }
    if text.trim().is_empty() {
        text = format!("Compiler exited with {}", output.status);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn test_render_harness() {
        let text = render_harness(
            "@ENTRY@.main(args); halt(@COMPLETION_EXIT_CODE@); halt(@TERMINATION_EXIT_CODE@);",
            "Sol",
        );
        assert_that!(text.as_str()).is_equal_to("Sol.main(args); halt(85); halt(86);");
    }

    #[test]
    fn test_find_tool_missing() {
        let res = find_tool(OsStr::new("surely-not-a-real-compiler-xyz"));
        assert_that!(matches!(res, Err(CompileFailure::ToolchainMissing { .. }))).is_true();
    }
}

use pcp_exec::ExecutionResult;
use serde::{Deserialize, Serialize};

use crate::RunStatus;

/// How the output of a submission is compared with the expected one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputComparison {
    /// The outputs must be byte-for-byte equal.
    Exact,
    /// Line endings are normalized, and the trailing whitespace of each line and the trailing
    /// empty lines are ignored.
    #[default]
    TrailingWhitespace,
    /// The outputs must have the same whitespace-separated tokens.
    Whitespace,
}

impl OutputComparison {
    /// Whether `output` matches `expected`.
    pub fn matches(&self, output: &str, expected: &str) -> bool {
        match self {
            OutputComparison::Exact => output == expected,
            OutputComparison::TrailingWhitespace => {
                significant_lines(output).eq(significant_lines(expected))
            }
            OutputComparison::Whitespace => {
                output.split_whitespace().eq(expected.split_whitespace())
            }
        }
    }
}

/// The lines of `text` without their trailing whitespace, dropping the trailing empty lines.
fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let len = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    lines.into_iter().take(len)
}

/// Decide the status of a run from the result of its execution and the expected output. This is a
/// pure function of its arguments.
///
/// An output cut at the cap is never a `Pass`: what was dropped cannot be compared.
pub fn classify(result: &ExecutionResult, judge: &str, comparison: OutputComparison) -> RunStatus {
    if !result.compiled() || result.exception() {
        RunStatus::Invalid
    } else if result.timed_out() || result.truncated() {
        RunStatus::Fail
    } else if comparison.matches(result.stdout().unwrap_or_default(), judge) {
        RunStatus::Pass
    } else {
        RunStatus::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcp_exec::Fault;
    use pcp_lang::CompileFailure;
    use speculoos::prelude::*;
    use std::time::Duration;

    fn completed(stdout: &str) -> ExecutionResult {
        ExecutionResult::completed(Duration::from_millis(10), stdout.into(), "".into())
    }

    #[test]
    fn test_state_table() {
        let policy = OutputComparison::TrailingWhitespace;
        let failure = ExecutionResult::compile_failure(CompileFailure::Diagnostics("x".into()));
        assert_that!(classify(&failure, "", policy)).is_equal_to(RunStatus::Invalid);
        let fault = ExecutionResult::faulted(
            Duration::ZERO,
            Fault::RuntimeFault("boom".into()),
            "1\n".into(),
            "".into(),
        );
        assert_that!(classify(&fault, "1\n", policy)).is_equal_to(RunStatus::Invalid);
        let exit = ExecutionResult::faulted(
            Duration::ZERO,
            Fault::TerminationAttempt,
            "1\n".into(),
            "".into(),
        );
        assert_that!(classify(&exit, "1\n", policy)).is_equal_to(RunStatus::Invalid);
        let timeout = ExecutionResult::timeout(
            Duration::from_secs(2),
            Duration::from_secs(1),
            "1\n".into(),
            "".into(),
        );
        assert_that!(classify(&timeout, "1\n", policy)).is_equal_to(RunStatus::Fail);
        assert_that!(classify(&completed("1\n"), "1\n", policy)).is_equal_to(RunStatus::Pass);
        assert_that!(classify(&completed("2\n"), "1\n", policy)).is_equal_to(RunStatus::Fail);
        let truncated = completed("1\n2\n").with_truncated(true);
        assert_that!(classify(&truncated, "1\n2\n", policy)).is_equal_to(RunStatus::Fail);
    }

    #[test]
    fn test_idempotent() {
        let result = completed("1 2\n");
        for policy in [
            OutputComparison::Exact,
            OutputComparison::TrailingWhitespace,
            OutputComparison::Whitespace,
        ] {
            let first = classify(&result, "1  2", policy);
            assert_that!(classify(&result, "1  2", policy)).is_equal_to(first);
        }
    }

    #[test]
    fn test_exact() {
        let policy = OutputComparison::Exact;
        assert_that!(policy.matches("1\n2\n", "1\n2\n")).is_true();
        assert_that!(policy.matches("1\n2", "1\n2\n")).is_false();
        assert_that!(policy.matches("1\r\n", "1\n")).is_false();
    }

    #[test]
    fn test_trailing_whitespace() {
        let policy = OutputComparison::TrailingWhitespace;
        assert_that!(policy.matches("1\n2\n", "1\n2")).is_true();
        assert_that!(policy.matches("1  \r\n2\t\n\n\n", "1\n2\n")).is_true();
        assert_that!(policy.matches("", "\n\n")).is_true();
        assert_that!(policy.matches(" 1\n", "1\n")).is_false();
        assert_that!(policy.matches("1\n\n2\n", "1\n2\n")).is_false();
        assert_that!(policy.matches("1 2\n", "1  2\n")).is_false();
    }

    #[test]
    fn test_whitespace() {
        let policy = OutputComparison::Whitespace;
        assert_that!(policy.matches("1  2\n\n3", "1\n2 3\n")).is_true();
        assert_that!(policy.matches("1 2", "1 2 3")).is_false();
        assert_that!(policy.matches("12", "1 2")).is_false();
    }

    #[test]
    fn test_serde_names() {
        let policy: OutputComparison = serde_json::from_str("\"trailing-whitespace\"").unwrap();
        assert_that!(policy).is_equal_to(OutputComparison::TrailingWhitespace);
        assert_that!(OutputComparison::default()).is_equal_to(OutputComparison::TrailingWhitespace);
    }
}

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Error};
use pcp_exec::{ExecutorConfig, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIME_LIMIT};
use serde::{Deserialize, Serialize};

use crate::{OutputComparison, QuestionConfig, DEFAULT_CONTEST_DURATION};

/// The configuration file of a contest. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestConfig {
    /// The questions, in order.
    pub questions: Vec<QuestionConfig>,
    /// The timing of the contest.
    #[serde(default)]
    pub timing: TimingConfig,
    /// The parameters of the judge.
    #[serde(default)]
    pub judge: JudgeConfig,
}

/// The timing of the contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Duration of the contest, in seconds.
    #[serde(default = "default_contest")]
    pub contest: u64,
}

/// The parameters of the judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Wall-clock limit of each execution, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Number of judge workers.
    #[serde(default = "num_cpus::get")]
    pub workers: usize,
    /// Number of executions that may run at the same time.
    #[serde(default = "default_parallel_executions")]
    pub parallel_executions: usize,
    /// How the outputs are compared.
    #[serde(default)]
    pub comparison: OutputComparison,
    /// Cap of the captured bytes of each stream.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// How many times an execution is attempted when the executor fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_contest() -> u64 {
    DEFAULT_CONTEST_DURATION.as_secs()
}

fn default_timeout() -> u64 {
    DEFAULT_TIME_LIMIT.as_secs()
}

fn default_parallel_executions() -> usize {
    1
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_max_attempts() -> usize {
    3
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            contest: default_contest(),
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            timeout: default_timeout(),
            workers: num_cpus::get(),
            parallel_executions: default_parallel_executions(),
            comparison: OutputComparison::default(),
            max_output_bytes: default_max_output_bytes(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl JudgeConfig {
    /// The configuration of the executor used by the judge.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            time_limit: Duration::from_secs(self.timeout),
            max_output_bytes: self.max_output_bytes,
            parallel_executions: self.parallel_executions,
            namespace_root: None,
        }
    }
}

impl TimingConfig {
    /// The duration of the contest.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.contest)
    }
}

impl ContestConfig {
    /// Parse a configuration from its JSON text.
    pub fn from_json(text: &str) -> Result<ContestConfig, Error> {
        serde_json::from_str(text).context("Invalid contest configuration")
    }

    /// Read the configuration from a JSON file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<ContestConfig, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read the configuration at {}", path.display()))?;
        ContestConfig::from_json(&text)
            .with_context(|| format!("Cannot parse the configuration at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ContestConfig::from_json(
            r#"{
                "questions": [{"name": "sum", "input_file": "in.txt", "judge_file": "out.txt"}],
                "teams": [{"name": "ignored"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.timing.contest, 3 * 60 * 60);
        assert_eq!(config.judge.timeout, 60);
        assert_eq!(config.judge.parallel_executions, 1);
        assert_eq!(config.judge.max_attempts, 3);
        assert_eq!(config.judge.comparison, OutputComparison::TrailingWhitespace);
        assert_eq!(config.questions[0].input_file, Path::new("in.txt"));
    }

    #[test]
    fn test_judge_section() {
        let config = ContestConfig::from_json(
            r#"{
                "questions": [],
                "timing": {"contest": 60},
                "judge": {"timeout": 5, "workers": 2, "comparison": "exact"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.timing.duration(), Duration::from_secs(60));
        assert_eq!(config.judge.workers, 2);
        assert_eq!(config.judge.comparison, OutputComparison::Exact);
        let exec = config.judge.executor_config();
        assert_eq!(exec.time_limit, Duration::from_secs(5));
        assert_eq!(exec.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
    }

    #[test]
    fn test_invalid() {
        assert!(ContestConfig::from_json("{}").is_err());
        assert!(ContestConfig::read("/surely/not/here.json").is_err());
    }
}

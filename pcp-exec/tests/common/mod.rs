#![allow(dead_code)]

use std::time::Duration;

use pcp_exec::{ExecutionRequest, Executor, ExecutorConfig};
use pcp_lang::Language;

pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

pub fn has_python() -> bool {
    which::which("python3").is_ok()
}

pub fn has_java() -> bool {
    which::which("javac").is_ok() && which::which("java").is_ok()
}

pub fn executor(time_limit: Duration) -> Executor {
    Executor::new(ExecutorConfig {
        time_limit,
        ..ExecutorConfig::default()
    })
}

pub fn request(language: Language, entry_point: &str, source: &str, input: &str) -> ExecutionRequest {
    ExecutionRequest {
        source: source.to_string(),
        entry_point: entry_point.to_string(),
        language,
        input: input.to_string(),
        args: vec![],
    }
}

pub fn python(source: &str, input: &str) -> ExecutionRequest {
    request(Language::Python3, "sol", source, input)
}

pub fn java(source: &str, input: &str) -> ExecutionRequest {
    request(Language::Java, "Main", source, input)
}

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Error};
use pcp_contest::{entry_point_of, Contest, LogSink, SessionRef, SubmissionRequest};
use pcp_exec::{ExecutionRequest, Executor, ExecutorConfig};
use pcp_lang::{Language, LanguageManager};

use crate::opt::{ExecOpt, JudgeOpt};

/// The session of the submissions made from the command line.
const CLI_SESSION: &str = "cli";

/// Entry point of `pcp exec`.
pub fn main_exec(opt: ExecOpt) -> Result<(), Error> {
    let language = language_of(&opt.file, opt.language)?;
    let entry_point = entry_point_of(file_name_of(&opt.file)?)?;
    let source = read(&opt.file)?;
    let input = match &opt.input {
        Some(path) => read(path)?,
        None => String::new(),
    };

    let executor = Executor::new(ExecutorConfig {
        time_limit: Duration::from_secs(opt.time_limit),
        ..ExecutorConfig::default()
    });
    let request = ExecutionRequest {
        source,
        entry_point,
        language,
        input,
        args: opt.args,
    };
    let result = executor
        .execute(&request)
        .context("The execution failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Entry point of `pcp judge`.
pub fn main_judge(opt: JudgeOpt) -> Result<(), Error> {
    let request = SubmissionRequest {
        question: opt.question,
        language: language_of(&opt.file, opt.language)?,
        code: read(&opt.file)?,
        file_name: file_name_of(&opt.file)?.to_string(),
    };
    let contest = Contest::load(&opt.config, Arc::new(LogSink))
        .with_context(|| format!("Cannot load the contest at {}", opt.config.display()))?;
    contest.clock().start();

    let run = contest
        .submit_and_wait(SessionRef(CLI_SESSION.into()), request)
        .context("Submission rejected")?;
    let report = serde_json::json!({
        "run": run.representation(),
        "result": run.result(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    contest.shutdown();
    Ok(())
}

/// The language of a source file: the one specified, or the one detected from the extension.
fn language_of(path: &Path, language: Option<Language>) -> Result<Language, Error> {
    match language {
        Some(language) => Ok(language),
        None => LanguageManager::detect_language(path).ok_or_else(|| {
            anyhow!(
                "Cannot detect the language of {}, use --language",
                path.display()
            )
        }),
    }
}

fn file_name_of(path: &Path) -> Result<&str, Error> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name {}", path.display()))
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

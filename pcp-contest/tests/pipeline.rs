use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pcp_contest::{
    ChannelSink, Contest, ContestConfig, IntakeError, JudgeConfig, OutputComparison,
    QuestionConfig, RunStatus, SessionRef, SubmissionRequest, TimingConfig,
};
use pcp_lang::Language;
use pretty_assertions::assert_eq;
use speculoos::prelude::*;
use tempfile::TempDir;

fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

fn has_python() -> bool {
    which::which("python3").is_ok()
}

fn write_question(dir: &Path, name: &str, input: &str, judge: &str) -> QuestionConfig {
    std::fs::write(dir.join(format!("{}.in", name)), input).unwrap();
    std::fs::write(dir.join(format!("{}.out", name)), judge).unwrap();
    QuestionConfig {
        name: name.into(),
        input_file: format!("{}.in", name).into(),
        judge_file: format!("{}.out", name).into(),
    }
}

fn config(questions: Vec<QuestionConfig>) -> ContestConfig {
    ContestConfig {
        questions,
        timing: TimingConfig::default(),
        judge: JudgeConfig {
            timeout: 2,
            workers: 2,
            comparison: OutputComparison::TrailingWhitespace,
            ..JudgeConfig::default()
        },
    }
}

fn python(question: usize, code: &str) -> SubmissionRequest {
    SubmissionRequest {
        question,
        language: Language::Python3,
        code: code.into(),
        file_name: "sol.py".into(),
    }
}

#[test]
fn test_rejections() {
    setup();
    let tmp = TempDir::new().unwrap();
    let question = write_question(tmp.path(), "echo", "1", "1");
    let (sink, _receiver) = ChannelSink::new();
    let contest = Contest::new(config(vec![question]), tmp.path(), Arc::new(sink)).unwrap();
    let team = SessionRef("team".into());

    assert_that!(contest.submit(team.clone(), python(1, "print(1)")))
        .is_err_containing(IntakeError::NotStarted);
    contest.clock().start();
    assert_that!(contest.submit(team.clone(), python(2, "print(1)")))
        .is_err_containing(IntakeError::UnknownQuestion(2));
    let mut request = python(1, "print(1)");
    request.file_name = "".into();
    assert_that!(contest.submit(team, request))
        .is_err_containing(IntakeError::InvalidFileName("".into()));
    assert_that!(contest.log().is_empty()).is_true();
}

#[test]
fn test_unreadable_question_is_invalid() {
    setup();
    let tmp = TempDir::new().unwrap();
    let question = QuestionConfig {
        name: "broken".into(),
        input_file: "missing.in".into(),
        judge_file: "missing.out".into(),
    };
    let (sink, receiver) = ChannelSink::new();
    let contest = Contest::new(config(vec![question]), tmp.path(), Arc::new(sink)).unwrap();
    contest.clock().start();
    let team = SessionRef("team".into());
    let id = contest.submit(team.clone(), python(1, "print(1)")).unwrap();
    let judged = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(judged.id, id);
    assert_eq!(judged.session, team);
    assert_eq!(judged.run.status, RunStatus::Invalid);
    contest.shutdown();
}

#[test]
fn test_submit_after_close() {
    setup();
    let tmp = TempDir::new().unwrap();
    let question = QuestionConfig {
        name: "broken".into(),
        input_file: "missing.in".into(),
        judge_file: "missing.out".into(),
    };
    let (sink, receiver) = ChannelSink::new();
    let contest = Contest::new(config(vec![question]), tmp.path(), Arc::new(sink)).unwrap();
    contest.clock().start();
    let team = SessionRef("team".into());
    let id = contest.submit(team.clone(), python(1, "print(1)")).unwrap();

    contest.close();
    assert_that!(contest.submit(team.clone(), python(1, "print(2)")))
        .is_err_containing(IntakeError::PipelineClosed);
    // the queued run is still judged, the refused one is not left pending
    let judged = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(judged.id, id);
    let runs = contest.runs_of(&team);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Invalid);
    assert_that!(runs.iter().any(|run| run.status == RunStatus::Pending)).is_false();
    contest.shutdown();
}

#[test]
fn test_judge_submissions() {
    setup();
    if !has_python() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let echo = write_question(tmp.path(), "echo", "1 2 3 4 5", "1\n2\n3\n4\n5\n");
    let (sink, receiver) = ChannelSink::new();
    let contest = Contest::new(config(vec![echo]), tmp.path(), Arc::new(sink)).unwrap();
    contest.clock().start();
    let team = SessionRef("team".into());

    let cases = [
        (
            "import sys\nfor t in sys.stdin.read().split():\n    print(t)\n",
            RunStatus::Pass,
        ),
        ("print('1 2 3 4 5')\n", RunStatus::Fail),
        ("def broken(:\n", RunStatus::Invalid),
        ("while True:\n    pass\n", RunStatus::Fail),
        ("import sys\nsys.exit(0)\n", RunStatus::Invalid),
        ("raise ValueError('nope')\n", RunStatus::Invalid),
    ];
    let mut expected = HashMap::new();
    for (code, status) in cases {
        let id = contest.submit(team.clone(), python(1, code)).unwrap();
        expected.insert(id, status);
    }
    for _ in 0..expected.len() {
        let judged = receiver.recv_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(Some(&judged.run.status), expected.get(&judged.id), "{:?}", judged);
        assert_that!(judged.run.time.timestamp).is_greater_than(0);
    }
    let runs = contest.runs_of(&team);
    assert_eq!(runs.len(), expected.len());
    assert_that!(runs.iter().all(|run| run.status != RunStatus::Pending)).is_true();
    contest.shutdown();
}

#[test]
fn test_submit_and_wait() {
    setup();
    if !has_python() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    let echo = write_question(tmp.path(), "echo", "hello", "hello\n");
    let (sink, receiver) = ChannelSink::new();
    let contest = Contest::new(config(vec![echo]), tmp.path(), Arc::new(sink)).unwrap();
    contest.clock().start();
    let run = contest
        .submit_and_wait(SessionRef("team".into()), python(1, "print(input())\n"))
        .unwrap();
    assert_eq!(run.status(), RunStatus::Pass);
    assert_eq!(run.result().unwrap().stdout(), Some("hello\n"));
    assert_eq!(receiver.try_recv().unwrap().run.status, RunStatus::Pass);
}

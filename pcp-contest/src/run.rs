use std::sync::Mutex;

use pcp_exec::ExecutionResult;
use pcp_lang::Language;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ContestTime, Submission, SubmissionId};

/// The status of a run. `Pending` is the only non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Not judged yet.
    Pending,
    /// The output matches the expected one.
    Pass,
    /// The output does not match the expected one, or the time limit was exceeded.
    Fail,
    /// The submission did not compile, crashed or tried to terminate its host.
    Invalid,
}

impl RunStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Pending)
    }
}

/// An invalid transition of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The run was already judged.
    #[error("Run {id} was already judged as {status:?}")]
    AlreadyJudged {
        /// The submission of the run.
        id: SubmissionId,
        /// The status of the run.
        status: RunStatus,
    },
    /// A run can only move to a terminal status.
    #[error("{0:?} is not a terminal status")]
    NotTerminal(RunStatus),
}

#[derive(Debug)]
struct RunState {
    status: RunStatus,
    judged_at: Option<ContestTime>,
    result: Option<ExecutionResult>,
}

/// A submission together with its judging status.
#[derive(Debug)]
pub struct Run {
    submission: Submission,
    state: Mutex<RunState>,
}

/// The public representation of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRepresentation {
    /// The number of the question.
    pub question: usize,
    /// The status of the run.
    pub status: RunStatus,
    /// When the run was judged, or submitted if still pending.
    pub time: ContestTime,
    /// The language of the submission.
    pub language: Language,
}

impl Run {
    /// Make a pending run for the submission.
    pub fn new(submission: Submission) -> Run {
        Run {
            submission,
            state: Mutex::new(RunState {
                status: RunStatus::Pending,
                judged_at: None,
                result: None,
            }),
        }
    }

    /// The submission of the run.
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// The current status.
    pub fn status(&self) -> RunStatus {
        self.state.lock().unwrap().status
    }

    /// When the run was judged.
    pub fn judged_at(&self) -> Option<ContestTime> {
        self.state.lock().unwrap().judged_at
    }

    /// The result of the execution, if the submission was executed.
    pub fn result(&self) -> Option<ExecutionResult> {
        self.state.lock().unwrap().result.clone()
    }

    /// Move the run to its terminal status. Only one transition is allowed.
    pub(crate) fn complete(
        &self,
        status: RunStatus,
        judged_at: ContestTime,
        result: Option<ExecutionResult>,
    ) -> Result<(), RunError> {
        if !status.is_terminal() {
            return Err(RunError::NotTerminal(status));
        }
        let mut state = self.state.lock().unwrap();
        if state.status.is_terminal() {
            return Err(RunError::AlreadyJudged {
                id: self.submission.id(),
                status: state.status,
            });
        }
        state.status = status;
        state.judged_at = Some(judged_at);
        state.result = result;
        Ok(())
    }

    /// The public representation of the run.
    pub fn representation(&self) -> RunRepresentation {
        let state = self.state.lock().unwrap();
        RunRepresentation {
            question: self.submission.question().number(),
            status: state.status,
            time: state
                .judged_at
                .unwrap_or_else(|| self.submission.submitted_at()),
            language: self.submission.language(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ContestClock, Question, QuestionSet, SessionRef, SubmissionLog, SubmissionRequest,
        DEFAULT_CONTEST_DURATION,
    };
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;
    use std::sync::Arc;

    fn pending_run() -> Arc<Run> {
        let questions = QuestionSet::new(vec![Question::from_texts(1, "echo", "1", "1")]);
        SubmissionLog::new()
            .record(
                SessionRef("team".into()),
                &questions,
                SubmissionRequest {
                    question: 1,
                    language: Language::Java,
                    code: "".into(),
                    file_name: "Main.java".into(),
                },
                &ContestClock::new(DEFAULT_CONTEST_DURATION),
            )
            .unwrap()
    }

    #[test]
    fn test_single_transition() {
        let run = pending_run();
        assert_that!(run.status()).is_equal_to(RunStatus::Pending);
        let at = ContestTime {
            timestamp: 20,
            elapsed: 11,
            left: 1,
        };
        assert_that!(run.complete(RunStatus::Pass, at, None)).is_ok();
        assert_that!(run.complete(RunStatus::Fail, at, None)).is_err_containing(
            RunError::AlreadyJudged {
                id: SubmissionId(0),
                status: RunStatus::Pass,
            },
        );
        assert_that!(run.status()).is_equal_to(RunStatus::Pass);
        assert_that!(run.judged_at()).is_equal_to(Some(at));
    }

    #[test]
    fn test_not_terminal() {
        let run = pending_run();
        assert_that!(run.complete(RunStatus::Pending, ContestTime::default(), None))
            .is_err_containing(RunError::NotTerminal(RunStatus::Pending));
    }

    #[test]
    fn test_representation() {
        let run = pending_run();
        let json = serde_json::to_value(run.representation()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "question": 1,
                "status": "pending",
                "time": {"timestamp": 0, "elapsed": 0, "left": 0},
                "language": "java",
            })
        );
        let at = ContestTime {
            timestamp: 10,
            elapsed: 1,
            left: 2,
        };
        run.complete(RunStatus::Invalid, at, None).unwrap();
        assert_eq!(run.representation().status, RunStatus::Invalid);
        assert_eq!(run.representation().time, at);
    }
}

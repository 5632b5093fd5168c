use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pcp_lang::Language;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ContestClock, ContestTime, Question, QuestionSet, Run};

/// The identifier of a submission, unique and increasing in order of submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the session that sent a submission. Authentication is not handled here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRef(pub String);

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submission as received from the intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// The number of the question, starting from 1.
    pub question: usize,
    /// The language of the source.
    pub language: Language,
    /// The source code.
    pub code: String,
    /// The name of the submitted file, its stem is the entry point.
    pub file_name: String,
}

/// A submission was rejected by the intake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    /// The contest has not started yet.
    #[error("The contest has not started yet")]
    NotStarted,
    /// The question does not exist.
    #[error("Unknown question {0}")]
    UnknownQuestion(usize),
    /// The file name does not yield an entry point.
    #[error("Invalid file name {0:?}")]
    InvalidFileName(String),
    /// The judge is not accepting submissions anymore.
    #[error("The judge is shut down")]
    PipelineClosed,
}

/// An immutable record of a submission.
#[derive(Debug, Clone)]
pub struct Submission {
    id: SubmissionId,
    session: SessionRef,
    question: Arc<Question>,
    language: Language,
    code: String,
    entry_point: String,
    submitted_at: ContestTime,
}

impl Submission {
    /// The identifier of the submission.
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    /// The session that sent the submission.
    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    /// The question the submission is for.
    pub fn question(&self) -> &Arc<Question> {
        &self.question
    }

    /// The language of the source.
    pub fn language(&self) -> Language {
        self.language
    }

    /// The source code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The name of the entry point.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// When the submission was received.
    pub fn submitted_at(&self) -> ContestTime {
        self.submitted_at
    }
}

/// Extract the entry point from the name of the submitted file: `Main.java` gives `Main`.
pub fn entry_point_of(file_name: &str) -> Result<String, IntakeError> {
    let invalid = || IntakeError::InvalidFileName(file_name.to_string());
    let path = Path::new(file_name);
    if path.components().count() != 1 {
        return Err(invalid());
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    if stem.is_empty() || stem.starts_with('.') {
        return Err(invalid());
    }
    Ok(stem.to_string())
}

/// The append-only log of the runs of the contest.
#[derive(Debug, Default)]
pub struct SubmissionLog {
    runs: Mutex<Vec<Arc<Run>>>,
}

impl SubmissionLog {
    /// Make an empty log.
    pub fn new() -> SubmissionLog {
        SubmissionLog::default()
    }

    /// Record a submission, creating its pending run. The id and the submission time are assigned
    /// under the lock of the log, so ids are unique and increasing in the order of the times.
    pub fn record(
        &self,
        session: SessionRef,
        questions: &QuestionSet,
        request: SubmissionRequest,
        clock: &ContestClock,
    ) -> Result<Arc<Run>, IntakeError> {
        let question = questions
            .get(request.question)
            .ok_or(IntakeError::UnknownQuestion(request.question))?
            .clone();
        let entry_point = entry_point_of(&request.file_name)?;
        let mut runs = self.runs.lock().unwrap();
        let submission = Submission {
            id: SubmissionId(runs.len() as u64),
            session,
            question,
            language: request.language,
            code: request.code,
            entry_point,
            submitted_at: clock.now(),
        };
        debug!(
            "Recorded submission {} of {} for question {}",
            submission.id,
            submission.session,
            submission.question.number()
        );
        let run = Arc::new(Run::new(submission));
        runs.push(run.clone());
        Ok(run)
    }

    /// The run of the specified submission.
    pub fn get(&self, id: SubmissionId) -> Option<Arc<Run>> {
        self.runs.lock().unwrap().get(id.0 as usize).cloned()
    }

    /// The runs of a session, in order of submission.
    pub fn runs_of(&self, session: &SessionRef) -> Vec<Arc<Run>> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .filter(|run| run.submission().session() == session)
            .cloned()
            .collect()
    }

    /// All the runs, in order of submission.
    pub fn all(&self) -> Vec<Arc<Run>> {
        self.runs.lock().unwrap().clone()
    }

    /// The number of recorded submissions.
    pub fn len(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Whether nothing was submitted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Bookkeeping of a contest around the judge: questions, submissions, runs and the pipeline that
//! judges them.
//!
//! A submission is recorded in the [`SubmissionLog`](struct.SubmissionLog.html), creating a
//! pending [`Run`](struct.Run.html) that is queued in the [`JudgePipeline`](struct.JudgePipeline.html).
//! A worker of the pipeline executes it, [`classify`](fn.classify.html)-es the result against the
//! expected output of the question and hands the judged run to a
//! [`ResultSink`](trait.ResultSink.html).

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod broadcast;
mod classifier;
mod config;
mod pipeline;
mod question;
mod run;
mod submission;
mod time;

pub use broadcast::{ChannelSink, JudgedRun, LogSink, ResultSink};
pub use classifier::{classify, OutputComparison};
pub use config::{ContestConfig, JudgeConfig, TimingConfig};
pub use pipeline::{JudgePipeline, PipelineClosed};
pub use question::{Question, QuestionConfig, QuestionError, QuestionRepresentation, QuestionSet};
pub use run::{Run, RunError, RunRepresentation, RunStatus};
pub use submission::{
    entry_point_of, IntakeError, SessionRef, Submission, SubmissionId, SubmissionLog,
    SubmissionRequest,
};
pub use time::{ContestClock, ContestTime, DEFAULT_CONTEST_DURATION};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Error};

/// A running contest: the questions, the clock, the log of the submissions and the judge.
pub struct Contest {
    config: ContestConfig,
    questions: QuestionSet,
    clock: Arc<ContestClock>,
    log: SubmissionLog,
    pipeline: JudgePipeline,
}

impl Contest {
    /// Load the contest from its configuration file. The paths of the questions are relative to the
    /// directory of the file.
    pub fn load<P: AsRef<Path>>(path: P, sink: Arc<dyn ResultSink>) -> Result<Contest, Error> {
        let path = path.as_ref();
        let config = ContestConfig::read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Contest::new(config, base_dir, sink)
    }

    /// Make a contest from its configuration, starting the judge pipeline.
    pub fn new(
        config: ContestConfig,
        base_dir: &Path,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Contest, Error> {
        let questions = QuestionSet::from_configs(&config.questions, base_dir);
        info!("Loaded {} questions", questions.len());
        let clock = Arc::new(ContestClock::new(config.timing.duration()));
        let pipeline = JudgePipeline::start(&config.judge, clock.clone(), sink)
            .context("Cannot start the judge pipeline")?;
        Ok(Contest {
            config,
            questions,
            clock,
            log: SubmissionLog::new(),
            pipeline,
        })
    }

    /// The configuration of the contest.
    pub fn config(&self) -> &ContestConfig {
        &self.config
    }

    /// The questions of the contest.
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// The clock of the contest.
    pub fn clock(&self) -> &ContestClock {
        &self.clock
    }

    /// The log of the submissions.
    pub fn log(&self) -> &SubmissionLog {
        &self.log
    }

    /// Record a submission and queue it for judging. Returns as soon as the pending run is recorded.
    pub fn submit(
        &self,
        session: SessionRef,
        request: SubmissionRequest,
    ) -> Result<SubmissionId, IntakeError> {
        let run = self.record(session, request)?;
        let id = run.submission().id();
        if self.pipeline.enqueue(run.clone()).is_err() {
            // recorded while the pipeline was closing: the run must still be terminal
            warn!("Run {} cannot be judged, the pipeline is closed", id);
            if let Err(e) = run.complete(RunStatus::Invalid, self.clock.now(), None) {
                warn!("{}", e);
            }
            return Err(IntakeError::PipelineClosed);
        }
        Ok(id)
    }

    /// Record a submission and judge it on the calling thread.
    pub fn submit_and_wait(
        &self,
        session: SessionRef,
        request: SubmissionRequest,
    ) -> Result<Arc<Run>, IntakeError> {
        let run = self.record(session, request)?;
        self.pipeline.judge_now(&run);
        Ok(run)
    }

    /// The representations of the runs of a session.
    pub fn runs_of(&self, session: &SessionRef) -> Vec<RunRepresentation> {
        self.log
            .runs_of(session)
            .iter()
            .map(|run| run.representation())
            .collect()
    }

    /// Stop accepting submissions. The queued ones are still judged.
    pub fn close(&self) {
        self.pipeline.close();
    }

    /// Stop the judge, waiting for the queued runs.
    pub fn shutdown(self) {
        self.pipeline.shutdown();
    }

    fn record(
        &self,
        session: SessionRef,
        request: SubmissionRequest,
    ) -> Result<Arc<Run>, IntakeError> {
        if !self.clock.is_started() {
            return Err(IntakeError::NotStarted);
        }
        if self.pipeline.is_closed() {
            return Err(IntakeError::PipelineClosed);
        }
        self.log
            .record(session, &self.questions, request, &self.clock)
    }
}

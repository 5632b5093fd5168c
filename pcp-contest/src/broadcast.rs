use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

use crate::{Run, RunRepresentation, SessionRef, SubmissionId};

/// A run that reached its terminal status, ready to be delivered to its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgedRun {
    /// The submission of the run.
    pub id: SubmissionId,
    /// The session that sent the submission.
    pub session: SessionRef,
    /// The public representation of the run.
    pub run: RunRepresentation,
}

impl JudgedRun {
    /// Snapshot of a judged run.
    pub fn of(run: &Run) -> JudgedRun {
        JudgedRun {
            id: run.submission().id(),
            session: run.submission().session().clone(),
            run: run.representation(),
        }
    }
}

/// Receiver of the judged runs. The delivery to the sessions is up to the implementation.
pub trait ResultSink: Send + Sync {
    /// Hand a judged run to the sink. Must not block for long: it is called by the judge workers.
    fn publish(&self, judged: JudgedRun);
}

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn publish(&self, judged: JudgedRun) {
        self.as_ref().publish(judged)
    }
}

/// A sink that only logs the judged runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&self, judged: JudgedRun) {
        info!(
            "Run {} of {} for question {}: {:?}",
            judged.id, judged.session, judged.run.question, judged.run.status
        );
    }
}

/// A sink that forwards the judged runs to a channel, drained by an external transport.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<JudgedRun>,
}

impl ChannelSink {
    /// Make a sink and the receiver of its channel.
    pub fn new() -> (ChannelSink, Receiver<JudgedRun>) {
        let (sender, receiver) = unbounded();
        (ChannelSink { sender }, receiver)
    }
}

impl ResultSink for ChannelSink {
    fn publish(&self, judged: JudgedRun) {
        if self.sender.send(judged).is_err() {
            debug!("Nobody is listening for judged runs");
        }
    }
}

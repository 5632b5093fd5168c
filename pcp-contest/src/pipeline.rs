use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use pcp_exec::{ExecutionRequest, ExecutionResult, Executor};
use thiserror::Error;

use crate::{
    classify, ContestClock, JudgeConfig, JudgedRun, OutputComparison, ResultSink, Run, RunStatus,
    SubmissionId,
};

/// The pipeline cannot accept more runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The judge pipeline is shut down")]
pub struct PipelineClosed;

/// What the workers share.
struct Shared {
    executor: Executor,
    clock: Arc<ContestClock>,
    sink: Arc<dyn ResultSink>,
    comparison: OutputComparison,
    max_attempts: usize,
}

/// Bounded pool of workers that judge the runs off the request path.
pub struct JudgePipeline {
    sender: Mutex<Option<Sender<Arc<Run>>>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl JudgePipeline {
    /// Spawn the workers of the pipeline.
    pub fn start(
        config: &JudgeConfig,
        clock: Arc<ContestClock>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<JudgePipeline, std::io::Error> {
        let shared = Arc::new(Shared {
            executor: Executor::new(config.executor_config()),
            clock,
            sink,
            comparison: config.comparison,
            max_attempts: config.max_attempts.max(1),
        });
        let (sender, receiver) = unbounded::<Arc<Run>>();
        let workers = (0..config.workers.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("Judge worker {}", i))
                    .spawn(move || worker_thread(i, shared, receiver))
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!("Judge pipeline started with {} workers", workers.len());
        Ok(JudgePipeline {
            sender: Mutex::new(Some(sender)),
            workers,
            shared,
        })
    }

    /// Queue a pending run. Returns immediately, the result reaches the sink later.
    pub fn enqueue(&self, run: Arc<Run>) -> Result<(), PipelineClosed> {
        let sender = self.sender.lock().unwrap();
        let sender = sender.as_ref().ok_or(PipelineClosed)?;
        sender.send(run).map_err(|_| PipelineClosed)
    }

    /// Stop accepting runs. The queued ones are still judged.
    pub fn close(&self) {
        if self.sender.lock().unwrap().take().is_some() {
            debug!("Judge pipeline closed");
        }
    }

    /// Whether the pipeline stopped accepting runs.
    pub fn is_closed(&self) -> bool {
        self.sender.lock().unwrap().is_none()
    }

    /// Judge a run on the calling thread, publishing it to the sink.
    pub fn judge_now(&self, run: &Run) -> RunStatus {
        judge(&self.shared, run)
    }

    /// Stop accepting runs, wait for the queued ones to be judged and for the workers to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.close();
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("A judge worker panicked");
            }
        }
        debug!("Judge pipeline stopped");
    }
}

impl Drop for JudgePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_thread(index: usize, shared: Arc<Shared>, receiver: Receiver<Arc<Run>>) {
    trace!("Judge worker {} ready", index);
    while let Ok(run) = receiver.recv() {
        judge(&shared, &run);
    }
    trace!("Judge worker {} exiting", index);
}

/// Execute and classify a run, moving it to its terminal status. Internal errors of the executor
/// are retried `max_attempts` times, then the run is marked `Invalid`.
fn judge(shared: &Shared, run: &Run) -> RunStatus {
    let submission = run.submission();
    let question = submission.question();
    let (status, result) = match (question.input(), question.judge()) {
        (Ok(input), Ok(judge)) => {
            let request = ExecutionRequest {
                source: submission.code().to_string(),
                entry_point: submission.entry_point().to_string(),
                language: submission.language(),
                input: input.to_string(),
                args: vec![],
            };
            match execute_with_retry(shared, &request, submission.id()) {
                Some(result) => (classify(&result, judge, shared.comparison), Some(result)),
                None => (RunStatus::Invalid, None),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            error!("Cannot judge run {}: {}", submission.id(), e);
            (RunStatus::Invalid, None)
        }
    };
    if let Err(e) = run.complete(status, shared.clock.now(), result) {
        warn!("{}", e);
        return run.status();
    }
    debug!(
        "Run {} of {} for question {} judged: {:?}",
        submission.id(),
        submission.session(),
        question.number(),
        status
    );
    shared.sink.publish(JudgedRun::of(run));
    status
}

fn execute_with_retry(
    shared: &Shared,
    request: &ExecutionRequest,
    id: SubmissionId,
) -> Option<ExecutionResult> {
    for attempt in 1..=shared.max_attempts {
        match shared.executor.execute(request) {
            Ok(result) => return Some(result),
            Err(e) => warn!(
                "Attempt {}/{} of run {} failed: {}",
                attempt, shared.max_attempts, id, e
            ),
        }
    }
    error!("Giving up on run {}", id);
    None
}

use std::io::{ErrorKind, Read, Write};
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use crate::{ExecError, StreamPermit};

/// Default cap of the captured bytes of each stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// How long `restore` waits for the helper threads to drain the pipes before detaching them.
pub(crate) const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// The bytes captured from one stream of the child.
#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: bool,
    /// Set by `restore`, once sealed nothing else is appended.
    sealed: bool,
}

impl Capture {
    fn shared() -> Arc<Mutex<Capture>> {
        Arc::new(Mutex::new(Capture::default()))
    }
}

/// Scoped ownership of the standard streams of exactly one execution.
///
/// Activating the context connects the fixed input to the standard input of the child and captures
/// its standard output and error in private buffers. The buffers can be read at any point, also
/// after a timeout, to support judging partial output. `restore` releases everything and is run
/// also when the context is dropped.
#[derive(Debug)]
pub struct ExecutionContext {
    input: Vec<u8>,
    max_output_bytes: usize,
    stdout: Arc<Mutex<Capture>>,
    stderr: Arc<Mutex<Capture>>,
    /// Receives a message from every helper thread when it is done.
    helpers_done: Option<Receiver<()>>,
    helpers: usize,
    activated: bool,
    /// The slot of the gate, `None` after `restore`.
    permit: Option<StreamPermit>,
}

impl ExecutionContext {
    /// Make a context that feeds `input` to the child, owning the gate slot `permit`.
    pub fn new<I: Into<Vec<u8>>>(input: I, permit: StreamPermit) -> ExecutionContext {
        ExecutionContext {
            input: input.into(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            stdout: Capture::shared(),
            stderr: Capture::shared(),
            helpers_done: None,
            helpers: 0,
            activated: false,
            permit: Some(permit),
        }
    }

    /// Change the cap of the captured bytes of each stream.
    pub fn with_output_limit(mut self, max_output_bytes: usize) -> ExecutionContext {
        self.max_output_bytes = max_output_bytes;
        self
    }

    /// Redirect the standard streams of `child` to this context: the input is written to its
    /// stdin, which is then closed, while stdout and stderr are captured.
    pub fn activate(&mut self, child: &mut Child) -> Result<(), ExecError> {
        if self.activated || self.permit.is_none() {
            return Err(ExecError::ContextReused);
        }
        let stdin = child.stdin.take().ok_or(ExecError::StreamUnavailable)?;
        let stdout = child.stdout.take().ok_or(ExecError::StreamUnavailable)?;
        let stderr = child.stderr.take().ok_or(ExecError::StreamUnavailable)?;
        self.activated = true;

        let (done_tx, done_rx) = unbounded();
        self.helpers_done = Some(done_rx);

        let input = self.input.clone();
        let done = done_tx.clone();
        spawn_helper("Stdin feeder", move || {
            let mut stdin = stdin;
            match stdin.write_all(&input) {
                Ok(()) => {}
                // the program does not have to read all the input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => debug!("Cannot write the input: {}", e),
            }
            drop(stdin);
            let _ = done.send(());
        })?;
        self.helpers += 1;

        for (name, pipe, capture) in [
            ("Stdout pump", Box::new(stdout) as Box<dyn Read + Send>, &self.stdout),
            ("Stderr pump", Box::new(stderr) as Box<dyn Read + Send>, &self.stderr),
        ] {
            let capture = capture.clone();
            let limit = self.max_output_bytes;
            let done = done_tx.clone();
            spawn_helper(name, move || {
                pump(pipe, &capture, limit);
                let _ = done.send(());
            })?;
            self.helpers += 1;
        }
        Ok(())
    }

    /// The standard output captured so far.
    pub fn out(&self) -> String {
        String::from_utf8_lossy(&self.stdout.lock().unwrap().bytes).into_owned()
    }

    /// The standard error captured so far.
    pub fn err(&self) -> String {
        String::from_utf8_lossy(&self.stderr.lock().unwrap().bytes).into_owned()
    }

    /// Whether some output was dropped because it exceeded the cap.
    pub fn truncated(&self) -> bool {
        self.stdout.lock().unwrap().truncated || self.stderr.lock().unwrap().truncated
    }

    /// Whether the context currently owns the streams.
    pub fn is_active(&self) -> bool {
        self.activated && self.permit.is_some()
    }

    /// Return to the original state: wait at most `DRAIN_GRACE` for the pipes to be drained, seal
    /// the buffers and release the slot of the gate. Calling it more than once is harmless.
    pub fn restore(&mut self) {
        if self.permit.is_none() {
            return;
        }
        if let Some(done) = self.helpers_done.take() {
            let deadline = Instant::now() + DRAIN_GRACE;
            let mut pending = self.helpers;
            while pending > 0 {
                match done.recv_deadline(deadline) {
                    Ok(()) => pending -= 1,
                    Err(_) => {
                        warn!("{} stream helpers did not finish, detaching them", pending);
                        break;
                    }
                }
            }
        }
        for capture in [&self.stdout, &self.stderr] {
            let mut capture = match capture.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            capture.sealed = true;
        }
        self.permit = None;
        trace!("Execution context restored");
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.restore();
    }
}

fn spawn_helper<F>(name: &str, f: F) -> Result<(), ExecError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map(|_| ())
        .map_err(|source| ExecError::Thread {
            name: name.to_string(),
            source,
        })
}

/// Copy everything from `pipe` into `capture`, dropping the bytes after `limit` and everything
/// that arrives after the capture is sealed.
fn pump(mut pipe: Box<dyn Read + Send>, capture: &Mutex<Capture>, limit: usize) {
    let mut buf = [0u8; 8192];
    loop {
        let n = match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Cannot read from the child: {}", e);
                break;
            }
        };
        let mut capture = capture.lock().unwrap();
        if capture.sealed {
            break;
        }
        let room = limit.saturating_sub(capture.bytes.len());
        if n > room {
            capture.truncated = true;
        }
        let take = n.min(room);
        capture.bytes.extend_from_slice(&buf[..take]);
    }
}

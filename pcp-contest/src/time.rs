use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The default duration of a contest.
pub const DEFAULT_CONTEST_DURATION: Duration = Duration::from_secs(3 * 60 * 60);

/// A point in time of the contest. Before the start every field is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContestTime {
    /// Unix timestamp, in milliseconds.
    pub timestamp: u64,
    /// Milliseconds since the start of the contest.
    pub elapsed: u64,
    /// Milliseconds until the end of the contest.
    pub left: u64,
}

/// The clock of the contest.
#[derive(Debug)]
pub struct ContestClock {
    duration: Duration,
    start: Mutex<Option<(SystemTime, Instant)>>,
}

impl ContestClock {
    /// Make a clock for a contest of the specified duration, not started yet.
    pub fn new(duration: Duration) -> ContestClock {
        ContestClock {
            duration,
            start: Mutex::new(None),
        }
    }

    /// The duration of the contest.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start the contest now. Starting it again restarts the clock.
    pub fn start(&self) {
        let now = (SystemTime::now(), Instant::now());
        info!("Starting the contest at {:?}", now.0);
        *self.start.lock().unwrap() = Some(now);
    }

    /// Whether the contest has started.
    pub fn is_started(&self) -> bool {
        self.start.lock().unwrap().is_some()
    }

    /// The current time of the contest.
    pub fn now(&self) -> ContestTime {
        let start = *self.start.lock().unwrap();
        match start {
            None => ContestTime::default(),
            Some((wall, monotonic)) => {
                let elapsed = monotonic.elapsed();
                let timestamp = (wall + elapsed)
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                ContestTime {
                    timestamp: timestamp.as_millis() as u64,
                    elapsed: elapsed.as_millis() as u64,
                    left: self.duration.saturating_sub(elapsed).as_millis() as u64,
                }
            }
        }
    }
}

use std::sync::{Arc, Condvar, Mutex};

use crate::ExecError;

/// Counting gate around the execution contexts. With the default width of 1 the executions are
/// strictly serialized.
#[derive(Debug, Clone)]
pub struct StreamGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    /// Maximum number of permits granted at the same time.
    width: usize,
    /// Number of permits currently granted.
    in_use: Mutex<usize>,
    /// Notified every time a permit is released.
    released: Condvar,
}

/// The ownership of one slot of a [`StreamGate`](struct.StreamGate.html). The slot is released
/// when the permit is dropped.
#[derive(Debug)]
pub struct StreamPermit {
    inner: Arc<GateInner>,
}

impl StreamGate {
    /// Make a gate with `width` slots. A width of zero is treated as one.
    pub fn new(width: usize) -> StreamGate {
        StreamGate {
            inner: Arc::new(GateInner {
                width: width.max(1),
                in_use: Mutex::new(0),
                released: Condvar::new(),
            }),
        }
    }

    /// The number of slots of the gate.
    pub fn width(&self) -> usize {
        self.inner.width
    }

    /// The number of permits currently granted.
    pub fn in_use(&self) -> usize {
        *self.inner.in_use.lock().unwrap()
    }

    /// Take a permit without blocking, failing with `ResourceContention` if the gate is full.
    pub fn try_acquire(&self) -> Result<StreamPermit, ExecError> {
        let mut in_use = self.inner.in_use.lock().unwrap();
        if *in_use >= self.inner.width {
            return Err(ExecError::ResourceContention {
                width: self.inner.width,
            });
        }
        *in_use += 1;
        Ok(StreamPermit {
            inner: self.inner.clone(),
        })
    }

    /// Take a permit, waiting for one to be released if the gate is full.
    pub fn acquire(&self) -> StreamPermit {
        let mut in_use = self.inner.in_use.lock().unwrap();
        while *in_use >= self.inner.width {
            in_use = self.inner.released.wait(in_use).unwrap();
        }
        *in_use += 1;
        StreamPermit {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for StreamPermit {
    fn drop(&mut self) {
        // a poisoned counter still has to be decremented
        let mut in_use = match self.inner.in_use.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *in_use = in_use.saturating_sub(1);
        self.inner.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_single_slot() {
        let gate = StreamGate::new(1);
        let permit = gate.try_acquire().unwrap();
        assert_that!(gate.in_use()).is_equal_to(1);
        assert_that!(matches!(
            gate.try_acquire(),
            Err(ExecError::ResourceContention { width: 1 })
        ))
        .is_true();
        drop(permit);
        assert_that!(gate.in_use()).is_equal_to(0);
        assert_that!(gate.try_acquire()).is_ok();
    }

    #[test]
    fn test_zero_width() {
        let gate = StreamGate::new(0);
        assert_that!(gate.width()).is_equal_to(1);
    }

    #[test]
    fn test_never_more_than_width() {
        let gate = StreamGate::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let active = active.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    let _permit = gate.acquire();
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_that!(max_seen.load(Ordering::SeqCst)).is_less_than_or_equal_to(2);
        assert_that!(gate.in_use()).is_equal_to(0);
    }
}

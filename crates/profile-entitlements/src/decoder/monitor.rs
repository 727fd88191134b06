//! Waiting for the decoder to exit.

use super::{DecoderExit, DecoderProcess};
use std::io;
use std::thread;
use std::time::{Duration, Instant};

/// Default liveness sampling interval when a deadline is set.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How watching a decoder ended.
#[derive(Debug)]
pub enum Completion {
    /// The process exited on its own.
    Exited(DecoderExit),
    /// The deadline passed; the process was killed.
    TimedOut(Duration),
    /// Querying the process failed.
    Failed(io::Error),
}

/// Observes a decoder until it exits.
///
/// Without a timeout the watching thread simply blocks in `wait()`. With a
/// timeout it samples `try_wait()` every `poll_interval` and kills the
/// process once the deadline passes. Either way [`CompletionMonitor::watch`]
/// returns on the first observed exit, so callers act on completion once.
#[derive(Debug, Clone, Copy)]
pub struct CompletionMonitor {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl CompletionMonitor {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Block the current thread until `process` exits or the deadline passes.
    pub fn watch(&self, process: &mut dyn DecoderProcess) -> Completion {
        match self.timeout {
            None => match process.wait() {
                Ok(exit) => Completion::Exited(exit),
                Err(e) => Completion::Failed(e),
            },
            Some(limit) => self.poll_until(process, limit),
        }
    }

    fn poll_until(&self, process: &mut dyn DecoderProcess, limit: Duration) -> Completion {
        let deadline = Instant::now() + limit;
        loop {
            match process.try_wait() {
                Ok(Some(exit)) => return Completion::Exited(exit),
                Ok(None) => {}
                Err(e) => return Completion::Failed(e),
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(?limit, "decoder timed out; killing it");
                if let Err(e) = process.kill() {
                    return Completion::Failed(e);
                }
                // Reap so the pipe closes and no zombie is left behind.
                if let Err(e) = process.wait() {
                    tracing::warn!(error = %e, "failed to reap killed decoder");
                }
                return Completion::TimedOut(limit);
            }

            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl Default for CompletionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports "running" a fixed number of times, then "exited" forever.
    struct Scripted {
        running_samples: usize,
        samples: usize,
        waits: usize,
        killed: bool,
    }

    impl Scripted {
        fn new(running_samples: usize) -> Self {
            Self {
                running_samples,
                samples: 0,
                waits: 0,
                killed: false,
            }
        }
    }

    impl DecoderProcess for Scripted {
        fn try_wait(&mut self) -> io::Result<Option<DecoderExit>> {
            self.samples += 1;
            if self.killed {
                return Ok(Some(DecoderExit::new(None)));
            }
            if self.samples > self.running_samples {
                Ok(Some(DecoderExit::new(Some(0))))
            } else {
                Ok(None)
            }
        }

        fn wait(&mut self) -> io::Result<DecoderExit> {
            self.waits += 1;
            Ok(DecoderExit::new(if self.killed { None } else { Some(0) }))
        }

        fn kill(&mut self) -> io::Result<()> {
            self.killed = true;
            Ok(())
        }
    }

    struct Broken;

    impl DecoderProcess for Broken {
        fn try_wait(&mut self) -> io::Result<Option<DecoderExit>> {
            Err(io::Error::other("no such process"))
        }

        fn wait(&mut self) -> io::Result<DecoderExit> {
            Err(io::Error::other("no such process"))
        }

        fn kill(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_watch_without_timeout_blocks_on_wait() {
        let mut process = Scripted::new(100);
        let completion = CompletionMonitor::default().watch(&mut process);

        assert!(matches!(completion, Completion::Exited(exit) if exit.success()));
        assert_eq!(process.waits, 1);
        assert_eq!(process.samples, 0);
    }

    #[test]
    fn test_poll_stops_at_first_exit() {
        let mut process = Scripted::new(3);
        let timeout = Some(Duration::from_secs(30));
        let monitor = CompletionMonitor::new(Duration::from_millis(1), timeout);

        let completion = monitor.watch(&mut process);

        assert!(matches!(completion, Completion::Exited(_)));
        assert_eq!(process.samples, 4);
        assert!(!process.killed);
    }

    #[test]
    fn test_poll_kills_after_deadline() {
        let mut process = Scripted::new(usize::MAX);
        let limit = Duration::from_millis(20);
        let monitor = CompletionMonitor::new(Duration::from_millis(5), Some(limit));

        let completion = monitor.watch(&mut process);

        assert!(matches!(completion, Completion::TimedOut(d) if d == limit));
        assert!(process.killed);
        assert_eq!(process.waits, 1);
    }

    #[test]
    fn test_query_failure_reported() {
        let timeout = Some(Duration::from_secs(1));
        let monitor = CompletionMonitor::new(Duration::from_millis(1), timeout);
        assert!(matches!(monitor.watch(&mut Broken), Completion::Failed(_)));
        assert!(matches!(CompletionMonitor::default().watch(&mut Broken), Completion::Failed(_)));
    }
}

//! EntitlementExtractor builder API
//!
//! Orchestrates one extraction: prepares the working directory, launches the
//! decoder, drains its output and waits for it on background threads, then
//! writes the entitlements plist and notifies the observer.

use crate::decoder::{
    Completion, CompletionMonitor, Decoder, DecoderProcess, LaunchedDecoder, OutputReader,
    SecurityCmsDecoder, monitor::DEFAULT_POLL_INTERVAL,
};
use crate::entitlements::process_output;
use crate::observer::{ENTITLEMENTS_GENERATED, ExtractionObserver, GENERATING_ENTITLEMENTS};
use crate::request::{ExtractionRequest, ExtractionResult};
use crate::workdir::{WorkdirLock, recreate_dir};
use crate::{Error, Result};
use std::io;
use std::path::{self, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::Span;

/// Entitlements extractor with builder pattern configuration.
///
/// # Example
///
/// ```ignore
/// use profile_entitlements::{EntitlementExtractor, ExtractionRequest, SecurityCmsDecoder};
/// use std::time::Duration;
///
/// let extractor = EntitlementExtractor::new()
///     .decoder(SecurityCmsDecoder::new("/usr/bin/security"))
///     .timeout(Duration::from_secs(30));
///
/// let request = ExtractionRequest::new("Payload/MyApp.app")
///     .provisioning_profile("profile.mobileprovision");
/// extractor.extract(request, observer).join();
/// ```
#[derive(Clone)]
pub struct EntitlementExtractor {
    decoder: Arc<dyn Decoder>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl EntitlementExtractor {
    /// Create an extractor using `/usr/bin/security cms -D -i` with no timeout.
    pub fn new() -> Self {
        Self {
            decoder: Arc::new(SecurityCmsDecoder::default()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    /// Set the decoder used to turn a provisioning profile into a plist.
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Set how often a running decoder is checked when a timeout is set.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Kill the decoder and fail with [`Error::Timeout`] if it runs longer than this.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn monitor(&self) -> CompletionMonitor {
        CompletionMonitor::new(self.poll_interval, self.timeout)
    }

    /// Extract entitlements for `request`, reporting to `observer`.
    ///
    /// Directory setup, the skip decision and the decoder launch happen on
    /// the calling thread; waiting for the decoder and post-processing happen
    /// on a background thread. The outcome is delivered only through
    /// `observer`, exactly once. The returned handle can be joined to block
    /// until that has happened.
    ///
    /// Only one extraction may use a given working directory at a time; a
    /// concurrent request for the same bundle fails with [`Error::InProgress`].
    pub fn extract<O: ExtractionObserver>(
        &self,
        request: ExtractionRequest,
        observer: O,
    ) -> ExtractionHandle {
        let span = tracing::info_span!(
            "extract_entitlements",
            bundle = %request.bundle_path().display()
        );
        let observer = Arc::new(observer);

        match span.in_scope(|| self.start(&request, &*observer)) {
            Ok(Some(pending)) => self.spawn_completion(pending, observer, span),
            Ok(None) => {
                observer.on_ready(&ExtractionResult::Skipped);
                ExtractionHandle::finished()
            }
            Err(e) => {
                span.in_scope(|| tracing::error!(error = %e, "entitlements extraction failed"));
                observer.on_failed(&e);
                ExtractionHandle::finished()
            }
        }
    }

    /// Prepare the working directory and launch the decoder.
    ///
    /// Returns `None` when the request is skipped.
    fn start(
        &self,
        request: &ExtractionRequest,
        observer: &dyn ExtractionObserver,
    ) -> Result<Option<PendingExtraction>> {
        let working_dir = path::absolute(request.working_directory())?;
        let lock = WorkdirLock::acquire(&working_dir)?;
        recreate_dir(&working_dir)?;

        let profile = match request.provisioning_profile_path() {
            Some(profile) if !request.should_skip() => profile,
            _ => {
                tracing::info!(
                    premade = ?request.premade_entitlements_path(),
                    "no provisioning profile to decode; skipping entitlements generation"
                );
                return Ok(None);
            }
        };

        observer.on_progress(true, GENERATING_ENTITLEMENTS);
        tracing::info!(profile = %profile.display(), "generating entitlements");

        let LaunchedDecoder {
            mut process,
            output,
        } = self.decoder.launch(profile, &request.decoder_cwd())?;

        let reader = match OutputReader::spawn(output) {
            Ok(reader) => reader,
            Err(e) => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(e.into());
            }
        };

        Ok(Some(PendingExtraction {
            process,
            reader,
            working_dir,
            _lock: lock,
        }))
    }

    fn spawn_completion<O: ExtractionObserver>(
        &self,
        pending: PendingExtraction,
        observer: Arc<O>,
        span: Span,
    ) -> ExtractionHandle {
        let monitor = self.monitor();
        let notify = Arc::clone(&observer);
        // The pending decoder is handed over only once the thread exists, so a
        // failed spawn still leaves it here to be killed.
        let (tx, rx) = mpsc::channel::<PendingExtraction>();

        let spawned = thread::Builder::new()
            .name("decoder-completion".into())
            .spawn(move || {
                let Ok(pending) = rx.recv() else {
                    return;
                };
                let _entered = span.enter();
                match pending.complete(monitor, &*notify) {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "entitlements ready");
                        notify.on_ready(&ExtractionResult::Generated(path));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "entitlements extraction failed");
                        notify.on_failed(&e);
                    }
                }
            });

        match spawned {
            Ok(handle) => match tx.send(pending) {
                Ok(()) => ExtractionHandle {
                    thread: Some(handle),
                },
                Err(mpsc::SendError(pending)) => {
                    pending.abort();
                    observer.on_failed(&Error::Io(io::Error::other(
                        "completion thread exited before taking the decoder",
                    )));
                    ExtractionHandle::finished()
                }
            },
            Err(e) => {
                pending.abort();
                observer.on_failed(&Error::Io(e));
                ExtractionHandle::finished()
            }
        }
    }
}

impl Default for EntitlementExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// A launched decoder waiting to be completed.
struct PendingExtraction {
    process: Box<dyn DecoderProcess>,
    reader: OutputReader,
    working_dir: PathBuf,
    _lock: WorkdirLock,
}

impl PendingExtraction {
    fn complete(
        mut self,
        monitor: CompletionMonitor,
        observer: &dyn ExtractionObserver,
    ) -> Result<PathBuf> {
        let exit = match monitor.watch(&mut *self.process) {
            Completion::Exited(exit) => exit,
            Completion::TimedOut(limit) => {
                // Left detached: a surviving grandchild may still hold the pipe open.
                drop(self.reader);
                return Err(Error::Timeout(limit));
            }
            Completion::Failed(e) => {
                self.reap();
                return Err(Error::Io(e));
            }
        };

        tracing::info!(status = %exit, "decoder finished");
        observer.on_progress(true, ENTITLEMENTS_GENERATED);

        // The pipe hits EOF when the child exits, but the reader may not have
        // caught up yet; join before touching the output.
        let text = self.reader.finish()?;
        process_output(&text, exit, &self.working_dir)
    }

    /// Give up on the decoder without waiting for its output.
    fn abort(mut self) {
        tracing::warn!("abandoning decoder");
        self.reap();
    }

    fn reap(&mut self) {
        if let Err(e) = self.process.kill() {
            tracing::debug!(error = %e, "failed to kill decoder");
        }
        if let Err(e) = self.process.wait() {
            tracing::debug!(error = %e, "failed to reap decoder");
        }
    }
}

/// Handle to a running extraction.
#[derive(Debug)]
pub struct ExtractionHandle {
    thread: Option<JoinHandle<()>>,
}

impl ExtractionHandle {
    fn finished() -> Self {
        Self { thread: None }
    }

    /// Whether the observer has already received the outcome.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the observer has received the outcome.
    ///
    /// A panic raised by the observer on the background thread is resumed here.
    pub fn join(self) {
        if let Some(thread) = self.thread {
            if let Err(panic) = thread.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }
}

//! Caller notification interface.

use crate::{Error, ExtractionResult};
use std::sync::Arc;

/// Progress message sent when decoding starts.
pub const GENERATING_ENTITLEMENTS: &str = "Generating entitlements";

/// Progress message sent once the decoder has exited.
pub const ENTITLEMENTS_GENERATED: &str = "Entitlements generated";

/// Receives the progress and outcome of one extraction.
///
/// The observer is moved into [`crate::EntitlementExtractor::extract`] and
/// dropped when the extraction finishes. Exactly one of
/// [`on_ready`](Self::on_ready) and [`on_failed`](Self::on_failed) is called
/// per extraction, possibly from a background thread.
pub trait ExtractionObserver: Send + Sync + 'static {
    /// Informational progress update.
    fn on_progress(&self, animate: bool, message: &str) {
        let _ = (animate, message);
    }

    /// The extraction finished.
    ///
    /// [`ExtractionResult::Skipped`] means nothing was generated and signing
    /// can proceed with the caller's own entitlements;
    /// [`ExtractionResult::Generated`] carries the absolute path of the
    /// written entitlements plist.
    fn on_ready(&self, result: &ExtractionResult);

    /// The extraction failed; signing must not proceed with its output.
    fn on_failed(&self, error: &Error);
}

impl<T: ExtractionObserver + ?Sized> ExtractionObserver for Arc<T> {
    fn on_progress(&self, animate: bool, message: &str) {
        (**self).on_progress(animate, message);
    }

    fn on_ready(&self, result: &ExtractionResult) {
        (**self).on_ready(result);
    }

    fn on_failed(&self, error: &Error) {
        (**self).on_failed(error);
    }
}

//! Error types for entitlements extraction.
//!
//! This module defines the [`enum@Error`] enum covering every failure an
//! extraction can report: working-directory setup, launching and waiting on
//! the decoder, and turning its output into an entitlements file.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error
//! - [`crate::ExtractionObserver::on_failed`] - Where asynchronous failures are delivered

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type for entitlements extraction.
///
/// Failures of an asynchronous extraction are handed to
/// [`crate::ExtractionObserver::on_failed`]; synchronous helpers return them
/// through [`crate::Result<T>`].
///
/// # Examples
///
/// ```
/// use profile_entitlements::{entitlements, Error};
///
/// let result = entitlements::parse_document("not a plist");
/// match result {
///     Err(Error::MalformedOutput(e)) => eprintln!("decoder output unusable: {e}"),
///     Err(e) => eprintln!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The working directory could not be created.
    ///
    /// Fatal: the extraction has nowhere to write its output.
    #[error("Failed to create working directory {}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stale working directory could not be removed.
    ///
    /// Never propagated by the extractor; it is logged and extraction continues.
    #[error("Failed to remove working directory {}: {source}", .path.display())]
    DirectoryDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoder process could not be started.
    #[error("Failed to launch decoder {program}: {source}")]
    DecoderLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoder exited unsuccessfully and its output is not a property list.
    #[error("Decoder failed ({status}): {output}")]
    DecodeFailed { status: String, output: String },

    /// The decoder output could not be parsed as a property list.
    #[error("Malformed decoder output: {0}")]
    MalformedOutput(#[source] plist::Error),

    /// The decoded profile has no `Entitlements` dictionary.
    #[error("Decoded profile has no Entitlements dictionary")]
    MissingEntitlementsKey,

    /// The entitlements file could not be written.
    #[error("Failed to write entitlements file {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoder did not exit before the configured deadline and was killed.
    #[error("Decoder did not finish within {0:?}")]
    Timeout(Duration),

    /// Another extraction currently owns the same working directory.
    #[error("An extraction is already running in {}", .0.display())]
    InProgress(PathBuf),

    /// The thread draining decoder output did not complete normally.
    #[error("Decoder output reader failed: {0}")]
    OutputReader(String),

    /// Property list serialization failed.
    #[error("Plist error: {0}")]
    Plist(#[from] plist::Error),
}

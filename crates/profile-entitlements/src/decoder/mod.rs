//! Decoder process handling.
//!
//! This module provides the pieces that run the external CMS decoder:
//! - [`SecurityCmsDecoder`] launches `security cms -D -i <profile>` with
//!   stdout and stderr merged into one pipe
//! - [`OutputReader`] drains that pipe on its own thread so the child never
//!   blocks on a full pipe
//! - [`CompletionMonitor`] waits for the child to exit, optionally against a deadline
//!
//! [`Decoder`] and [`DecoderProcess`] are the seams the extractor talks to,
//! so a different decoder (or a scripted one in tests) can be plugged in.

pub mod monitor;
pub mod reader;
pub mod security;

pub use monitor::{Completion, CompletionMonitor};
pub use reader::OutputReader;
pub use security::SecurityCmsDecoder;

use crate::Result;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ExitStatus};

/// How a decoder process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderExit {
    code: Option<i32>,
}

impl DecoderExit {
    /// Exit with the given code; `None` means the process was killed by a signal.
    pub fn new(code: Option<i32>) -> Self {
        Self { code }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for DecoderExit {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.code())
    }
}

impl fmt::Display for DecoderExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// A running decoder process.
pub trait DecoderProcess: Send {
    /// Non-blocking liveness check; `Some` once the process has exited.
    fn try_wait(&mut self) -> io::Result<Option<DecoderExit>>;

    /// Block until the process exits.
    fn wait(&mut self) -> io::Result<DecoderExit>;

    /// Kill the process. Killing one that already exited is not an error.
    fn kill(&mut self) -> io::Result<()>;
}

impl DecoderProcess for Child {
    fn try_wait(&mut self) -> io::Result<Option<DecoderExit>> {
        Ok(Child::try_wait(self)?.map(DecoderExit::from))
    }

    fn wait(&mut self) -> io::Result<DecoderExit> {
        Ok(Child::wait(self)?.into())
    }

    fn kill(&mut self) -> io::Result<()> {
        match Child::kill(self) {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }
}

/// A launched decoder: the process plus its merged output stream.
pub struct LaunchedDecoder {
    pub process: Box<dyn DecoderProcess>,
    pub output: Box<dyn Read + Send>,
}

impl fmt::Debug for LaunchedDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedDecoder").finish_non_exhaustive()
    }
}

/// Starts a decoder for a provisioning profile.
pub trait Decoder: Send + Sync {
    /// Launch the decoder on `profile`, running in `cwd`.
    ///
    /// The returned output stream must reach end-of-stream once the process
    /// has exited.
    fn launch(&self, profile: &Path, cwd: &Path) -> Result<LaunchedDecoder>;
}

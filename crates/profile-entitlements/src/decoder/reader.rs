//! Background draining of decoder output.

use crate::{Error, Result};
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

/// Drains a decoder's merged output on a dedicated thread.
///
/// The child can block writing to a full pipe, so the stream must be read
/// while the process runs, not after it exits. The captured text is handed
/// back once by [`OutputReader::finish`].
#[derive(Debug)]
pub struct OutputReader {
    handle: JoinHandle<io::Result<Vec<u8>>>,
}

impl OutputReader {
    /// Start reading `stream` to end-of-stream.
    pub fn spawn(mut stream: Box<dyn Read + Send>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("decoder-output".into())
            .spawn(move || {
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf)?;
                Ok(buf)
            })?;
        Ok(Self { handle })
    }

    /// Wait for the stream to be fully drained and return it as text.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the plist parser
    /// decides whether what remains is usable.
    pub fn finish(self) -> Result<String> {
        let bytes = self
            .handle
            .join()
            .map_err(|_| Error::OutputReader("reader thread panicked".into()))?
            .map_err(|e| Error::OutputReader(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "decoder output captured");

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!("decoder output is not valid UTF-8; decoding lossily");
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

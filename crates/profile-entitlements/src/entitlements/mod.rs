//! Turning decoder output into an entitlements file.
//!
//! The decoded provisioning profile is an XML plist whose top-level
//! dictionary holds an `Entitlements` dictionary among other keys
//! (`AppIDName`, `TeamName`, `ExpirationDate`, ...). Only that inner
//! dictionary is written out; the `Entitlements` wrapper key is dropped.

pub mod repair;

pub use repair::{SEC_POLICY_MARKER, repair_decoder_output};

use crate::decoder::DecoderExit;
use crate::request::ENTITLEMENTS_FILE_NAME;
use crate::{Error, Result};
use plist::{Dictionary, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Key of the entitlements dictionary inside a decoded profile.
pub const ENTITLEMENTS_KEY: &str = "Entitlements";

const EXCERPT_CHARS: usize = 200;

/// Parse decoder output as an XML property list.
///
/// Only the XML format is accepted; the decoder never emits binary or
/// OpenStep plists, so anything else is a diagnostic message.
pub fn parse_document(text: &str) -> Result<Value> {
    Value::from_reader_xml(text.as_bytes()).map_err(Error::MalformedOutput)
}

/// Pull the `Entitlements` dictionary out of a decoded profile.
pub fn extract_entitlements(document: &Value) -> Result<Dictionary> {
    document
        .as_dictionary()
        .and_then(|dict| dict.get(ENTITLEMENTS_KEY))
        .and_then(Value::as_dictionary)
        .cloned()
        .ok_or(Error::MissingEntitlementsKey)
}

/// Write `entitlements` as an XML plist to `<dir>/entitlements.plist`,
/// replacing any existing file.
pub fn write_entitlements(entitlements: &Dictionary, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(ENTITLEMENTS_FILE_NAME);

    let mut buf = Vec::new();
    plist::to_writer_xml(&mut buf, entitlements)?;

    fs::write(&path, buf).map_err(|source| Error::FileWrite {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), keys = entitlements.len(), "entitlements written");
    Ok(path)
}

/// Read back an entitlements file written by [`write_entitlements`].
pub fn read_entitlements(path: impl AsRef<Path>) -> Result<Dictionary> {
    let path = path.as_ref();
    Value::from_file(path)?.into_dictionary().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} does not hold a dictionary", path.display()),
        ))
    })
}

/// Repair, parse, extract, and write in one go.
///
/// `exit` is how the decoder ended. An unsuccessful exit only becomes an
/// error ([`Error::DecodeFailed`]) when the output is also unparseable.
pub fn process_output(text: &str, exit: DecoderExit, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let repaired = repair_decoder_output(text);

    let document = match parse_document(repaired) {
        Ok(document) => document,
        Err(_) if !exit.success() => {
            return Err(Error::DecodeFailed {
                status: exit.to_string(),
                output: excerpt(repaired),
            });
        }
        Err(e) => return Err(e),
    };

    if !exit.success() {
        tracing::warn!(status = %exit, "decoder exited unsuccessfully but produced a plist");
    }

    let entitlements = extract_entitlements(&document)?;
    write_entitlements(&entitlements, dir)
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

//! Extraction requests and their outcome.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to the bundle path to form the scratch directory.
pub const WORKING_DIR_SUFFIX: &str = "-entitlements";

/// File name of the generated entitlements plist.
pub const ENTITLEMENTS_FILE_NAME: &str = "entitlements.plist";

/// Inputs for one entitlements extraction.
///
/// Empty paths are treated the same as unset ones.
///
/// # Example
///
/// ```
/// use profile_entitlements::ExtractionRequest;
/// use std::path::Path;
///
/// let request = ExtractionRequest::new("/tmp/Payload/MyApp.app")
///     .provisioning_profile("profile.mobileprovision");
///
/// assert_eq!(
///     request.working_directory(),
///     Path::new("/tmp/Payload/MyApp.app-entitlements")
/// );
/// assert!(!request.should_skip());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    bundle_path: PathBuf,
    premade_entitlements: Option<PathBuf>,
    provisioning_profile: Option<PathBuf>,
}

impl ExtractionRequest {
    /// Create a request for the app bundle at `bundle_path`.
    pub fn new(bundle_path: impl AsRef<Path>) -> Self {
        Self {
            bundle_path: bundle_path.as_ref().to_path_buf(),
            premade_entitlements: None,
            provisioning_profile: None,
        }
    }

    /// Set an entitlements file the caller already has.
    ///
    /// When present, no decoding happens and the caller is told to proceed
    /// with its own file.
    pub fn premade_entitlements(mut self, path: impl AsRef<Path>) -> Self {
        self.premade_entitlements = non_empty(path.as_ref());
        self
    }

    /// Set the provisioning profile (`.mobileprovision`) to decode.
    pub fn provisioning_profile(mut self, path: impl AsRef<Path>) -> Self {
        self.provisioning_profile = non_empty(path.as_ref());
        self
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn premade_entitlements_path(&self) -> Option<&Path> {
        self.premade_entitlements.as_deref()
    }

    pub fn provisioning_profile_path(&self) -> Option<&Path> {
        self.provisioning_profile.as_deref()
    }

    /// Scratch directory for this request: the bundle path with
    /// [`WORKING_DIR_SUFFIX`] appended to its last component.
    pub fn working_directory(&self) -> PathBuf {
        let mut dir = OsString::from(self.bundle_path.as_os_str());
        dir.push(WORKING_DIR_SUFFIX);
        PathBuf::from(dir)
    }

    /// Whether the decoder should not run for this request.
    ///
    /// True when a pre-made entitlements file was supplied, or when there is
    /// no provisioning profile to decode (which covers both inputs being empty).
    pub fn should_skip(&self) -> bool {
        self.premade_entitlements.is_some() || self.provisioning_profile.is_none()
    }

    /// Directory the decoder runs in: the bundle itself when it is a
    /// directory, otherwise the directory containing it.
    pub(crate) fn decoder_cwd(&self) -> PathBuf {
        if self.bundle_path.is_dir() {
            return self.bundle_path.clone();
        }
        match self.bundle_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn non_empty(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path.to_path_buf())
    }
}

/// Terminal outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Nothing was generated; the caller already has what it needs.
    Skipped,
    /// Entitlements were written to this absolute path.
    Generated(PathBuf),
}

impl ExtractionResult {
    /// Path of the generated file, `None` for [`ExtractionResult::Skipped`].
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Skipped => None,
            Self::Generated(path) => Some(path),
        }
    }
}

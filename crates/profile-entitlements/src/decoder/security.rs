//! Launcher for the platform `security` CMS decoder.

use super::{Decoder, LaunchedDecoder};
use crate::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default decoder binary on macOS.
pub const DEFAULT_PROGRAM: &str = "/usr/bin/security";

/// Arguments placed before the profile path: decode a CMS message from a file.
pub const DEFAULT_ARGS: [&str; 3] = ["cms", "-D", "-i"];

/// Runs `<program> <args...> <profile>` with stdout and stderr merged.
///
/// # Example
///
/// ```
/// use profile_entitlements::SecurityCmsDecoder;
///
/// let decoder = SecurityCmsDecoder::new("/opt/tools/security")
///     .args(["cms", "-D", "-i"]);
/// assert_eq!(decoder.program().to_str(), Some("/opt/tools/security"));
/// ```
#[derive(Debug, Clone)]
pub struct SecurityCmsDecoder {
    program: PathBuf,
    args: Vec<String>,
}

impl SecurityCmsDecoder {
    /// Use `program` with the default `cms -D -i` arguments.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: DEFAULT_ARGS.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Replace the arguments placed before the profile path.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, profile: &Path, cwd: &Path) -> io::Result<(Command, io::PipeReader)> {
        let (reader, writer) = io::pipe()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(profile)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);

        Ok((command, reader))
    }
}

impl Default for SecurityCmsDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Decoder for SecurityCmsDecoder {
    fn launch(&self, profile: &Path, cwd: &Path) -> Result<LaunchedDecoder> {
        let launch_error = |source| Error::DecoderLaunch {
            program: self.program.display().to_string(),
            source,
        };

        let (mut command, reader) = self.command(profile, cwd).map_err(launch_error)?;
        let child = command.spawn().map_err(launch_error)?;
        // The command still owns our copies of the pipe's write end; the
        // reader only sees EOF once they are closed.
        drop(command);

        tracing::debug!(
            program = %self.program.display(),
            profile = %profile.display(),
            pid = child.id(),
            "decoder launched"
        );

        Ok(LaunchedDecoder {
            process: Box::new(child),
            output: Box::new(reader),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_default_decoder() {
        let decoder = SecurityCmsDecoder::default();
        assert_eq!(decoder.program(), Path::new(DEFAULT_PROGRAM));
        assert_eq!(decoder.args, vec!["cms", "-D", "-i"]);
    }

    #[test]
    fn test_launch_missing_program() {
        let temp = tempfile::tempdir().unwrap();
        let decoder = SecurityCmsDecoder::new(temp.path().join("no-such-decoder"));

        let result = decoder.launch(Path::new("profile.mobileprovision"), temp.path());

        match result {
            Err(Error::DecoderLaunch { program, .. }) => {
                assert!(program.ends_with("no-such-decoder"));
            }
            other => panic!("expected DecoderLaunch, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_merges_stdout_and_stderr() {
        let temp = tempfile::tempdir().unwrap();
        let decoder =
            SecurityCmsDecoder::new("/bin/sh").args(["-c", "echo out; echo err >&2", "sh"]);

        let mut launched = decoder.launch(Path::new("ignored"), temp.path()).unwrap();
        let mut text = String::new();
        launched.output.read_to_string(&mut text).unwrap();
        let exit = launched.process.wait().unwrap();

        assert!(exit.success());
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_runs_in_cwd() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "found").unwrap();
        let decoder = SecurityCmsDecoder::new("/bin/cat").args(Vec::<String>::new());

        let mut launched = decoder.launch(Path::new("marker.txt"), temp.path()).unwrap();
        let mut text = String::new();
        launched.output.read_to_string(&mut text).unwrap();
        launched.process.wait().unwrap();

        assert_eq!(text, "found");
    }
}

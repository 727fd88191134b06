//! Command-line interface for extracting entitlements from a provisioning profile.
//!
//! Decodes the profile with `security cms -D -i`, writes the `Entitlements`
//! dictionary to `<bundle>-entitlements/entitlements.plist` and prints the
//! path for the signing step.

mod logging;

use clap::Parser;
use logging::{LogConfig, LogFormat};
use profile_entitlements::entitlements::read_entitlements;
use profile_entitlements::{
    EntitlementExtractor, Error, ExtractionObserver, ExtractionRequest, ExtractionResult,
    SecurityCmsDecoder,
};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "profile-entitlements")]
#[command(about = "Extract entitlements from an iOS provisioning profile")]
struct Cli {
    /// App bundle being re-signed
    bundle: PathBuf,

    /// Provisioning profile (.mobileprovision) to decode
    #[arg(short = 'm', long)]
    profile: Option<PathBuf>,

    /// Pre-made entitlements file; when given nothing is decoded
    #[arg(short = 'e', long)]
    entitlements: Option<PathBuf>,

    /// CMS decoder binary
    #[arg(long, env = "ENTITLEMENTS_DECODER", default_value = "/usr/bin/security")]
    decoder: PathBuf,

    /// Kill the decoder after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// How often to check the decoder when --timeout is set (milliseconds)
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Also print the extracted entitlements
    #[arg(long)]
    print: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

enum Outcome {
    Ready(ExtractionResult),
    Failed(String),
}

/// Forwards the extraction outcome to `main`.
struct ChannelObserver {
    tx: Sender<Outcome>,
}

impl ExtractionObserver for ChannelObserver {
    fn on_progress(&self, _animate: bool, message: &str) {
        tracing::info!("{message}");
    }

    fn on_ready(&self, result: &ExtractionResult) {
        let _ = self.tx.send(Outcome::Ready(result.clone()));
    }

    fn on_failed(&self, error: &Error) {
        let _ = self.tx.send(Outcome::Failed(error.to_string()));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging(&LogConfig::from_verbosity(cli.verbose, cli.log_format));

    let mut extractor = EntitlementExtractor::new()
        .decoder(SecurityCmsDecoder::new(&cli.decoder))
        .poll_interval(Duration::from_millis(cli.poll_interval_ms));

    if let Some(secs) = cli.timeout {
        extractor = extractor.timeout(Duration::from_secs(secs));
    }

    let mut request = ExtractionRequest::new(&cli.bundle);
    if let Some(ref profile) = cli.profile {
        request = request.provisioning_profile(profile);
    }
    if let Some(ref entitlements) = cli.entitlements {
        request = request.premade_entitlements(entitlements);
    }

    let (tx, rx) = mpsc::channel();
    extractor.extract(request, ChannelObserver { tx }).join();

    match rx.recv()? {
        Outcome::Ready(result) => match result.path() {
            Some(path) => {
                println!("{}", path.display());
                if cli.print {
                    let entitlements = read_entitlements(path)?;
                    plist::to_writer_xml(std::io::stdout(), &entitlements)?;
                    println!();
                }
            }
            None => match cli.entitlements {
                Some(premade) => println!("{}", premade.display()),
                None => eprintln!("Nothing to generate: no provisioning profile given"),
            },
        },
        Outcome::Failed(message) => return Err(message.into()),
    }

    Ok(())
}

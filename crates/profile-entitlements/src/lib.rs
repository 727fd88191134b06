//! Entitlements extraction from iOS provisioning profiles.
//!
//! Decodes a `.mobileprovision` file with the platform CMS decoder
//! (`security cms -D -i`), repairs the decoder's known output quirk, and
//! writes the profile's `Entitlements` dictionary as an XML plist that a
//! code-signing step can consume.
//!
//! # Examples
//!
//! ```no_run
//! use profile_entitlements::{
//!     EntitlementExtractor, Error, ExtractionObserver, ExtractionRequest, ExtractionResult,
//! };
//!
//! struct Print;
//!
//! impl ExtractionObserver for Print {
//!     fn on_ready(&self, result: &ExtractionResult) {
//!         println!("ready: {:?}", result.path());
//!     }
//!
//!     fn on_failed(&self, error: &Error) {
//!         eprintln!("failed: {error}");
//!     }
//! }
//!
//! let request = ExtractionRequest::new("/tmp/Payload/MyApp.app")
//!     .provisioning_profile("profile.mobileprovision");
//! EntitlementExtractor::new().extract(request, Print).join();
//! ```

pub mod decoder;
pub mod entitlements;
pub mod error;
pub mod extractor;
pub mod observer;
pub mod request;
pub mod workdir;

pub use decoder::{Decoder, DecoderExit, DecoderProcess, LaunchedDecoder, SecurityCmsDecoder};
pub use error::Error;
pub use extractor::{EntitlementExtractor, ExtractionHandle};
pub use observer::ExtractionObserver;
pub use request::{ExtractionRequest, ExtractionResult};

pub type Result<T> = std::result::Result<T, Error>;

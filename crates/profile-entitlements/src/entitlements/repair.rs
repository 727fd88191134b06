//! Repair of known decoder output corruption.
//!
//! On some macOS releases `security cms -D` prints a `SecPolicySetValue`
//! diagnostic line ahead of the XML document. That line is dropped here.

/// Substring identifying the junk diagnostic line.
pub const SEC_POLICY_MARKER: &str = "SecPolicySetValue";

/// Drop the leading junk line from decoder output.
///
/// When `text` contains [`SEC_POLICY_MARKER`], everything up to and
/// including the first newline is removed. Text without the marker, or with
/// the marker but no newline, is returned unchanged.
///
/// # Example
///
/// ```
/// use profile_entitlements::entitlements::repair_decoder_output;
///
/// let raw = "SecPolicySetValue: One or more parameters passed to a function were not valid.\n<?xml version=\"1.0\"?>";
/// assert_eq!(repair_decoder_output(raw), "<?xml version=\"1.0\"?>");
/// assert_eq!(repair_decoder_output("<?xml version=\"1.0\"?>"), "<?xml version=\"1.0\"?>");
/// ```
pub fn repair_decoder_output(text: &str) -> &str {
    if !text.contains(SEC_POLICY_MARKER) {
        return text;
    }
    match text.find('\n') {
        Some(newline) => &text[newline + 1..],
        None => text,
    }
}

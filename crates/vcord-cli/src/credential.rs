//! # Credential Subcommands
//!
//! Offline operations on credential documents: `encode`, `decode` and
//! `verify`. None of these touch a ledger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use vcord_core::{decode, encode, validate::parse_credential, verify_credential};

/// Arguments for `vcord encode`.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Credential JSON document.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `vcord decode`.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded payload, or `@FILE` to read it from a file (hex text or
    /// raw bytes).
    #[arg(value_name = "HEX|@FILE")]
    pub input: String,
}

/// Arguments for `vcord verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON document.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Read a JSON document from disk.
pub fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Resolve a `decode` argument to payload bytes.
pub fn payload_bytes(input: &str) -> Result<Vec<u8>> {
    match input.strip_prefix('@') {
        Some(path) => {
            let raw = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
            let as_hex = std::str::from_utf8(&raw)
                .ok()
                .and_then(|text| hex::decode(text.trim()).ok());
            Ok(as_hex.unwrap_or(raw))
        }
        None => hex::decode(input.trim()).context("payload is not valid hex"),
    }
}

/// Encode a credential and print the payload as hex.
pub fn run_encode(args: &EncodeArgs) -> Result<u8> {
    let doc = read_json(&args.file)?;
    let payload = encode(&doc).context("credential rejected")?;
    tracing::info!(bytes = payload.len(), "credential encoded");
    println!("{}", hex::encode(payload));
    Ok(0)
}

/// Decode a payload and print the credential as JSON.
pub fn run_decode(args: &DecodeArgs) -> Result<u8> {
    let bytes = payload_bytes(&args.input)?;
    let credential = decode(&bytes).context("payload rejected")?;
    println!("{}", serde_json::to_string_pretty(&credential)?);
    Ok(0)
}

/// Check structure, validity dates and proof shape of a credential.
///
/// Exit code 1 when any check fails.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let doc = read_json(&args.file)?;
    let credential = parse_credential(&doc).context("credential is structurally invalid")?;
    let report = verify_credential(&credential, chrono::Utc::now());
    if report.is_valid() {
        println!("OK: credential is valid");
        return Ok(0);
    }
    println!("FAIL: {} check(s) failed", report.failures().len());
    for failure in report.failures() {
        println!("  - {failure}");
    }
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inline_hex_payload() {
        assert_eq!(payload_bytes("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(payload_bytes("zz").is_err());
    }

    #[test]
    fn file_payload_hex_or_raw() {
        let mut hex_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(hex_file, "deadbeef").unwrap();
        let arg = format!("@{}", hex_file.path().display());
        assert_eq!(payload_bytes(&arg).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);

        let mut raw_file = tempfile::NamedTempFile::new().unwrap();
        raw_file.write_all(&[0x01, 0xff, 0x00]).unwrap();
        let arg = format!("@{}", raw_file.path().display());
        assert_eq!(payload_bytes(&arg).unwrap(), vec![0x01, 0xff, 0x00]);
    }

    #[test]
    fn read_json_reports_path() {
        let err = read_json(Path::new("/nonexistent/credential.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/credential.json"));
    }
}

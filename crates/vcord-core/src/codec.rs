//! # Inscription Payload Codec
//!
//! Wire format, all integers big-endian:
//!
//! ```text
//! [version: u8 = 0x01][len: u32][canonical JSON: len bytes][crc32: u32]
//! ```
//!
//! The CRC-32 is the IEEE 802.3 checksum (reflected polynomial `0xEDB88320`,
//! initial value `0xFFFFFFFF`, final complement) over every byte before it.
//!
//! ## Decode order
//!
//! 1. Checksum over all but the last four bytes (`Integrity`). Fewer than
//!    four bytes carry no checksum at all and fail the same way.
//! 2. Version byte (`UnsupportedVersion`).
//! 3. Declared length against the bytes actually present (`Truncated`).
//!    Bytes between the body and the checksum are padding and ignored.
//! 4. JSON parse, then the same structural validation `encode` runs.

use serde::Serialize;

use crate::canonical::CanonicalJson;
use crate::credential::IdentityCredential;
use crate::error::{CanonicalizationError, CodecError};
use crate::validate::parse_credential;

/// The only payload format version this crate reads or writes.
pub const FORMAT_VERSION: u8 = 0x01;

/// Version byte plus length field.
pub const HEADER_LEN: usize = 5;

/// Trailing checksum.
pub const TRAILER_LEN: usize = 4;

/// IEEE CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate and frame a credential.
///
/// Accepts anything that serializes to a credential-shaped JSON object, so a
/// raw `serde_json::Value` missing a field is rejected with that field's name
/// rather than failing to type-check. The framed body is the caller's
/// document in canonical form; nothing in it is reformatted.
pub fn encode(credential: &impl Serialize) -> Result<Vec<u8>, CodecError> {
    let value =
        serde_json::to_value(credential).map_err(CanonicalizationError::SerializationFailed)?;
    parse_credential(&value)?;
    let body = CanonicalJson::from_value(&value)?.into_bytes();
    let len = u32::try_from(body.len()).map_err(|_| CodecError::Oversized(body.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&body);
    let crc = crc32(&out);
    out.extend_from_slice(&crc.to_be_bytes());

    tracing::debug!(body_len = body.len(), crc = format_args!("{crc:#010x}"), "encoded credential");
    Ok(out)
}

/// Verify, unframe, parse and validate a payload.
pub fn decode(bytes: &[u8]) -> Result<IdentityCredential, CodecError> {
    let Some(framed_len) = bytes.len().checked_sub(TRAILER_LEN) else {
        return Err(CodecError::Integrity {
            stored: None,
            computed: crc32(&[]),
        });
    };
    let (framed, trailer) = bytes.split_at(framed_len);

    let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32(framed);
    if stored != computed {
        return Err(CodecError::Integrity {
            stored: Some(stored),
            computed,
        });
    }

    match framed.first() {
        Some(&FORMAT_VERSION) => {}
        Some(&other) => return Err(CodecError::UnsupportedVersion(other)),
        None => {
            return Err(CodecError::Truncated {
                declared: HEADER_LEN,
                available: 0,
            })
        }
    }
    if framed.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            declared: HEADER_LEN,
            available: framed.len(),
        });
    }

    let declared = u32::from_be_bytes([framed[1], framed[2], framed[3], framed[4]]) as usize;
    let available = framed.len() - HEADER_LEN;
    if declared > available {
        return Err(CodecError::Truncated {
            declared,
            available,
        });
    }

    let body = &framed[HEADER_LEN..HEADER_LEN + declared];
    let value: serde_json::Value = serde_json::from_slice(body)?;
    Ok(parse_credential(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::fixtures::sample_credential;
    use crate::credential::{
        CredentialStatus, DocumentType, Proof, VerificationLevel, W3C_VC_CONTEXT_V1,
    };
    use crate::error::ValidationError;
    use proptest::prelude::*;

    /// Replace the checksum so only the field under test is wrong.
    fn reseal(mut framed: Vec<u8>) -> Vec<u8> {
        let crc = crc32(&framed);
        framed.extend_from_slice(&crc.to_be_bytes());
        framed
    }

    fn unsealed(encoded: &[u8]) -> Vec<u8> {
        encoded[..encoded.len() - TRAILER_LEN].to_vec()
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn frame_layout() {
        let encoded = encode(&sample_credential()).unwrap();
        assert_eq!(encoded[0], FORMAT_VERSION);
        let len = u32::from_be_bytes(encoded[1..5].try_into().unwrap()) as usize;
        assert_eq!(encoded.len(), HEADER_LEN + len + TRAILER_LEN);
        let body: serde_json::Value = serde_json::from_slice(&encoded[5..5 + len]).unwrap();
        assert_eq!(body["credentialSubject"]["fullName"], "John Doe");
        let crc = u32::from_be_bytes(encoded[5 + len..].try_into().unwrap());
        assert_eq!(crc, crc32(&encoded[..5 + len]));
    }

    #[test]
    fn round_trip_with_optional_blocks() {
        let mut c = sample_credential();
        c.proof = Some(Proof {
            proof_type: "EcdsaSecp256k1Signature2019".into(),
            created: "2024-01-01T00:00:00Z".into(),
            verification_method: "did:example:issuer#key-1".into(),
            proof_purpose: "assertionMethod".into(),
            proof_value: "z58DAdFfa9".into(),
            nonce: Some("n-1".into()),
            extensions: Default::default(),
        });
        c.status = Some(CredentialStatus {
            id: "https://example.org/status/24#94567".into(),
            status_type: "RevocationList2020Status".into(),
            revocation_list_index: "94567".into(),
            revocation_list_credential: "https://example.org/status/24".into(),
            extensions: Default::default(),
        });
        assert_eq!(decode(&encode(&c).unwrap()).unwrap(), c);
    }

    #[test]
    fn encoding_is_deterministic() {
        let c = sample_credential();
        assert_eq!(encode(&c).unwrap(), encode(&c).unwrap());
    }

    #[test]
    fn raw_json_without_subject_rejected_by_name() {
        let mut v = serde_json::to_value(sample_credential()).unwrap();
        v.as_object_mut().unwrap().remove("credentialSubject");
        let err = encode(&v).unwrap_err();
        assert!(
            matches!(&err, CodecError::Validation(ValidationError::MissingField { field }) if field == "credentialSubject"),
            "{err}"
        );
        assert!(err.to_string().contains("credentialSubject"));
    }

    #[test]
    fn version_two_rejected_even_with_valid_checksum() {
        let mut framed = unsealed(&encode(&sample_credential()).unwrap());
        framed[0] = 0x02;
        let err = decode(&reseal(framed)).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(0x02)));
    }

    #[test]
    fn declared_length_beyond_data_is_truncated() {
        let mut framed = unsealed(&encode(&sample_credential()).unwrap());
        let available = framed.len() - HEADER_LEN;
        framed[1..5].copy_from_slice(&(available as u32 + 1).to_be_bytes());
        let err = decode(&reseal(framed)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Truncated { declared, available: a } if declared == available + 1 && a == available
        ));
    }

    #[test]
    fn trailing_padding_before_checksum_ignored() {
        let c = sample_credential();
        let mut framed = unsealed(&encode(&c).unwrap());
        framed.extend_from_slice(&[0u8; 7]);
        assert_eq!(decode(&reseal(framed)).unwrap(), c);
    }

    #[test]
    fn inputs_shorter_than_a_checksum_fail_integrity() {
        let shorts: [&[u8]; 3] = [&[], &[0x01, 0x02], &[1, 2, 3]];
        for short in shorts {
            assert!(
                matches!(decode(short), Err(CodecError::Integrity { stored: None, .. })),
                "{short:?}"
            );
        }
    }

    #[test]
    fn checksummed_header_that_stops_early_is_truncated() {
        assert!(matches!(
            decode(&reseal(vec![FORMAT_VERSION, 0, 0])),
            Err(CodecError::Truncated { declared: HEADER_LEN, available: 3 })
        ));
        assert!(matches!(
            decode(&reseal(Vec::new())),
            Err(CodecError::Truncated { declared: HEADER_LEN, available: 0 })
        ));
    }

    #[test]
    fn issuer_document_is_framed_verbatim() {
        let doc = serde_json::json!({
            "issuanceDate": "2024-01-01T00:00:00.000Z",
            "expirationDate": "2030-01-01T02:00:00+02:00",
            "@context": W3C_VC_CONTEXT_V1,
            "type": ["VerifiableCredential", "IdentityCredential"],
            "issuer": {
                "verifierType": "government",
                "name": "Test Issuer",
                "id": "did:example:issuer"
            },
            "credentialSubject": {
                "id": "did:example:holder",
                "fullName": "Ana Silva",
                "dateOfBirth": "1990-01-01",
                "nationality": "PT",
                "documentType": "nationalId",
                "documentNumber": "X1234567",
                "verificationLevel": "expert",
                "verificationDate": "2024-01-01T00:00:00.000Z",
                "expirationDate": "2030-01-01T00:00:00.000Z"
            },
            "evidence": [{"type": "DocumentVerification", "verifier": "did:example:issuer"}],
            "termsOfUse": [{"type": "IssuerPolicy", "id": "urn:policy:1"}],
            "credentialStatus": {"id": "urn:status:1", "type": "StatusList2021Entry"}
        });

        let encoded = encode(&doc).unwrap();
        let len = u32::from_be_bytes(encoded[1..5].try_into().unwrap()) as usize;
        let body = std::str::from_utf8(&encoded[HEADER_LEN..HEADER_LEN + len]).unwrap();
        assert!(body.contains(r#""issuanceDate":"2024-01-01T00:00:00.000Z""#), "{body}");
        assert!(body.contains(r#""expirationDate":"2030-01-01T02:00:00+02:00""#), "{body}");

        let decoded = decode(&encoded).unwrap();
        assert_eq!(serde_json::to_value(&decoded).unwrap(), doc);
        assert_eq!(encode(&decoded).unwrap(), encoded);
    }

    #[test]
    fn tampered_body_with_valid_checksum_fails_validation() {
        let c = sample_credential();
        let mut v = serde_json::to_value(&c).unwrap();
        v["credentialSubject"]["documentType"] = "library-card".into();
        let body = serde_json::to_vec(&v).unwrap();
        let mut framed = vec![FORMAT_VERSION];
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);
        let err = decode(&reseal(framed)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Validation(ValidationError::InvalidEnum { field: "documentType", .. })
        ));
    }

    #[test]
    fn non_json_body_with_valid_checksum_is_json_error() {
        let body = b"not json";
        let mut framed = vec![FORMAT_VERSION];
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(body);
        assert!(matches!(decode(&reseal(framed)), Err(CodecError::Json(_))));
    }

    fn arb_credential() -> impl Strategy<Value = IdentityCredential> {
        (
            "[A-Za-z ]{1,40}",
            "[A-Z0-9]{6,12}",
            prop_oneof![
                Just(DocumentType::Passport),
                Just(DocumentType::NationalId),
                Just(DocumentType::DriverLicense)
            ],
            prop_oneof![
                Just(VerificationLevel::Basic),
                Just(VerificationLevel::Advanced),
                Just(VerificationLevel::Expert)
            ],
            0i64..4_000_000_000,
        )
            .prop_map(|(name, number, doc, level, secs)| {
                let mut c = sample_credential();
                c.credential_subject.full_name = name;
                c.credential_subject.document_number = number;
                c.credential_subject.document_type = doc;
                c.credential_subject.verification_level = level;
                c.issuance_date = chrono::DateTime::from_timestamp(secs, 0)
                    .unwrap()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
                c
            })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(c in arb_credential()) {
            prop_assert_eq!(decode(&encode(&c).unwrap()).unwrap(), c);
        }

        #[test]
        fn any_single_byte_flip_is_an_integrity_error(
            c in arb_credential(),
            pos in any::<prop::sample::Index>(),
            mask in 1u8..=255,
        ) {
            let mut bytes = encode(&c).unwrap();
            let i = pos.index(bytes.len());
            bytes[i] ^= mask;
            let is_integrity = matches!(decode(&bytes), Err(CodecError::Integrity { .. }));
            prop_assert!(is_integrity);
        }
    }
}

//! # Inscription Envelope
//!
//! Builds and parses the ord envelope that carries an encoded credential:
//!
//! ```text
//! OP_FALSE OP_IF
//!   "ord"
//!   0x01 "text/plain"
//!   OP_0 <payload chunk> <payload chunk> ...
//! OP_ENDIF
//! ```
//!
//! The branch never executes; it stores data only. Payloads longer than
//! 520 bytes are split into consecutive pushes, each within the script
//! element size limit, and [`InscriptionEnvelope::parse`] concatenates them.

use bitcoin::opcodes::all::{OP_ENDIF, OP_IF, OP_PUSHBYTES_0};
use bitcoin::opcodes::OP_FALSE;
use bitcoin::script::{Builder, Instruction, PushBytes};
use bitcoin::{Script, ScriptBuf, Transaction};

use crate::error::TxError;

/// Protocol marker pushed after `OP_IF`.
pub const PROTOCOL_ID: [u8; 3] = *b"ord";

/// Field tag for the content type.
pub const CONTENT_TYPE_TAG: [u8; 1] = [0x01];

/// Content type of credential inscriptions.
pub const CONTENT_TYPE: &str = "text/plain";

/// Maximum size of a single data push.
pub const MAX_PUSH_SIZE: usize = 520;

/// Compile the envelope around `payload`.
pub fn build_inscription_script(payload: &[u8]) -> Result<ScriptBuf, TxError> {
    let mut builder = Builder::new()
        .push_opcode(OP_FALSE)
        .push_opcode(OP_IF)
        .push_slice(PROTOCOL_ID)
        .push_slice(CONTENT_TYPE_TAG)
        .push_slice(b"text/plain")
        .push_opcode(OP_PUSHBYTES_0);

    for chunk in payload.chunks(MAX_PUSH_SIZE) {
        let push: &PushBytes = chunk.try_into()?;
        builder = builder.push_slice(push);
    }

    Ok(builder.push_opcode(OP_ENDIF).into_script())
}

/// A parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InscriptionEnvelope {
    /// Value of the content-type field, if present.
    pub content_type: Option<Vec<u8>>,
    /// Concatenated body pushes.
    pub body: Vec<u8>,
}

impl InscriptionEnvelope {
    /// Find the first complete envelope in `script`.
    ///
    /// The envelope may follow other opcodes (e.g. `<key> OP_CHECKSIG` in a
    /// tapscript). Scripts that fail to decode, or envelopes without a
    /// closing `OP_ENDIF`, yield `None`.
    pub fn parse(script: &Script) -> Option<Self> {
        let instructions: Vec<Instruction<'_>> =
            script.instructions().collect::<Result<_, _>>().ok()?;

        let start = instructions.windows(3).position(|w| {
            matches!(
                w,
                [Instruction::PushBytes(f), Instruction::Op(op), Instruction::PushBytes(id)]
                    if f.is_empty() && *op == OP_IF && id.as_bytes() == PROTOCOL_ID
            )
        })?;

        let mut fields: Vec<&[u8]> = Vec::new();
        let mut body: Option<Vec<u8>> = None;
        for instruction in &instructions[start + 3..] {
            match instruction {
                Instruction::Op(op) if *op == OP_ENDIF => {
                    let content_type = fields
                        .chunks(2)
                        .find(|kv| kv.len() == 2 && kv[0] == CONTENT_TYPE_TAG)
                        .map(|kv| kv[1].to_vec());
                    return Some(Self {
                        content_type,
                        body: body.unwrap_or_default(),
                    });
                }
                Instruction::PushBytes(bytes) => match body.as_mut() {
                    Some(body) => body.extend_from_slice(bytes.as_bytes()),
                    // The body tag is an empty push in key position.
                    None if bytes.is_empty() && fields.len() % 2 == 0 => body = Some(Vec::new()),
                    None => fields.push(bytes.as_bytes()),
                },
                Instruction::Op(_) => return None,
            }
        }
        None
    }
}

/// Locate the inscription payload in a transaction.
///
/// Search order:
/// 1. The witness element at index 1 of any input, when it is an envelope.
/// 2. Any output script that is an envelope.
/// 3. The raw witness element at index 1 of the first input that has one.
pub fn extract_payload(tx: &Transaction) -> Option<Vec<u8>> {
    let carriers: Vec<&[u8]> = tx.input.iter().filter_map(|i| i.witness.nth(1)).collect();

    carriers
        .iter()
        .find_map(|el| InscriptionEnvelope::parse(Script::from_bytes(el)))
        .or_else(|| {
            tx.output
                .iter()
                .find_map(|o| InscriptionEnvelope::parse(&o.script_pubkey))
        })
        .map(|envelope| envelope.body)
        .or_else(|| carriers.first().map(|el| el.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::opcodes::all::OP_CHECKSIG;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, Sequence, TxIn, TxOut, Witness};

    fn tx_with(witness: Witness, outputs: Vec<ScriptBuf>) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness,
            }],
            output: outputs
                .into_iter()
                .map(|script_pubkey| TxOut {
                    value: Amount::from_sat(546),
                    script_pubkey,
                })
                .collect(),
        }
    }

    #[test]
    fn exact_script_bytes_for_small_payload() {
        let script = build_inscription_script(&[0xde, 0xad]).unwrap();
        let expected = concat!(
            "00",                       // OP_FALSE
            "63",                       // OP_IF
            "03", "6f7264",             // "ord"
            "01", "01",                 // content-type tag
            "0a", "746578742f706c61696e", // "text/plain"
            "00",                       // OP_0 body tag
            "02", "dead",               // payload
            "68",                       // OP_ENDIF
        );
        assert_eq!(hex::encode(script.as_bytes()), expected);
    }

    #[test]
    fn large_payload_is_chunked_and_reassembled() {
        let payload: Vec<u8> = (0..1300u32).map(|i| i as u8).collect();
        let script = build_inscription_script(&payload).unwrap();
        let pushes: Vec<usize> = script
            .instructions()
            .filter_map(|i| match i.unwrap() {
                Instruction::PushBytes(p) if p.len() > 16 => Some(p.len()),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![520, 520, 260]);

        let parsed = InscriptionEnvelope::parse(&script).unwrap();
        assert_eq!(parsed.body, payload);
        assert_eq!(parsed.content_type.as_deref(), Some(CONTENT_TYPE.as_bytes()));
    }

    #[test]
    fn empty_payload_round_trips() {
        let script = build_inscription_script(&[]).unwrap();
        assert_eq!(InscriptionEnvelope::parse(&script).unwrap().body, Vec::<u8>::new());
    }

    #[test]
    fn envelope_after_key_spend_prefix_is_found() {
        let mut bytes = Builder::new()
            .push_slice([0x02; 33])
            .push_opcode(OP_CHECKSIG)
            .into_script()
            .into_bytes();
        bytes.extend_from_slice(build_inscription_script(b"hello").unwrap().as_bytes());
        let parsed = InscriptionEnvelope::parse(Script::from_bytes(&bytes)).unwrap();
        assert_eq!(parsed.body, b"hello");
    }

    #[test]
    fn unterminated_or_foreign_scripts_are_not_envelopes() {
        let script = build_inscription_script(b"data").unwrap();
        let truncated = &script.as_bytes()[..script.len() - 1];
        assert!(InscriptionEnvelope::parse(Script::from_bytes(truncated)).is_none());

        let p2wpkh = ScriptBuf::from_bytes([vec![0x00, 0x14], vec![7u8; 20]].concat());
        assert!(InscriptionEnvelope::parse(&p2wpkh).is_none());
    }

    #[test]
    fn extract_prefers_witness_envelope() {
        let envelope = build_inscription_script(b"from-witness").unwrap();
        let witness = Witness::from_slice(&[vec![0x30], envelope.to_bytes()]);
        let other = build_inscription_script(b"from-output").unwrap();
        let tx = tx_with(witness, vec![other]);
        assert_eq!(extract_payload(&tx).unwrap(), b"from-witness");
    }

    #[test]
    fn extract_falls_back_to_output_envelope() {
        let witness = Witness::from_slice(&[vec![0x30; 71], vec![0x02; 33]]);
        let tx = tx_with(witness, vec![build_inscription_script(b"from-output").unwrap()]);
        assert_eq!(extract_payload(&tx).unwrap(), b"from-output");
    }

    #[test]
    fn extract_falls_back_to_raw_witness_element() {
        let witness = Witness::from_slice(&[vec![0x30], b"raw-payload".to_vec()]);
        let tx = tx_with(witness, vec![ScriptBuf::new()]);
        assert_eq!(extract_payload(&tx).unwrap(), b"raw-payload");
    }

    #[test]
    fn extract_without_carrier_is_none() {
        let tx = tx_with(Witness::from_slice(&[vec![0x30]]), vec![ScriptBuf::new()]);
        assert!(extract_payload(&tx).is_none());
        let tx = tx_with(Witness::new(), vec![]);
        assert!(extract_payload(&tx).is_none());
    }
}

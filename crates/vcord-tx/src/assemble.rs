//! # Transaction Assembly
//!
//! Turns a funded selection and an inscription script into a signed,
//! serialized transaction. A PSBT is the working structure:
//!
//! 1. Unsigned transaction: one input per selected output, the inscription
//!    output at the dust floor, and change only when it exceeds 546 sat.
//! 2. Each input is signed in order and the signature stored as a partial
//!    signature.
//! 3. Every partial signature is verified against its sighash and the key
//!    committed to by the spent script. One failure aborts the whole
//!    assembly; nothing is finalized.
//! 4. Inputs are finalized (witness `[sig, pubkey]` for P2WPKH, scriptSig
//!    `<sig> <pubkey>` for P2PKH) and the transaction is extracted.
//!
//! Signing is RFC 6979 deterministic, so identical requests produce
//! identical transactions.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    ecdsa, Amount, CompressedPublicKey, FeeRate, Psbt, PublicKey, Script, ScriptBuf, Sequence,
    Transaction, TxIn, TxOut, Txid, Witness,
};
use vcord_ledger::Utxo;

use crate::error::TxError;
use crate::signer::HashSigner;
use crate::size::{estimate_size, fee_for, CHANGE_DUST_THRESHOLD};

/// Everything the assembler needs besides the signer.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// Outputs to spend, in input order.
    pub utxos: &'a [Utxo],
    /// Inscription envelope placed in the inscription output.
    pub script: &'a Script,
    /// Fee rate applied to the estimated size.
    pub fee_rate: FeeRate,
    /// Value of the inscription output.
    pub inscription_value: Amount,
    /// Destination of any change.
    pub change_script: &'a Script,
    /// Size the fee for witness inputs (otherwise legacy).
    pub witness: bool,
}

/// A finalized inscription transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInscription {
    /// The transaction, witnesses included.
    pub tx: Transaction,
    /// Its id.
    pub txid: Txid,
    /// Inputs minus outputs.
    pub fee: Amount,
    /// Change output value, if one was created.
    pub change: Option<Amount>,
    /// Consensus serialization, hex encoded.
    pub raw_hex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpendKind {
    P2wpkh,
    P2pkh,
}

fn spend_kind(input: usize, script: &Script) -> Result<SpendKind, TxError> {
    if script.is_p2wpkh() {
        Ok(SpendKind::P2wpkh)
    } else if script.is_p2pkh() {
        Ok(SpendKind::P2pkh)
    } else {
        Err(TxError::UnsupportedInput {
            input,
            script: script.to_owned(),
        })
    }
}

fn key_commits_to(kind: SpendKind, key: &CompressedPublicKey, script: &Script) -> bool {
    let expected = match kind {
        SpendKind::P2wpkh => ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
        SpendKind::P2pkh => ScriptBuf::new_p2pkh(&key.pubkey_hash()),
    };
    expected.as_script() == script
}

/// Build, sign, verify and serialize an inscription transaction.
pub fn assemble(
    req: &AssemblyRequest<'_>,
    signer: &dyn HashSigner,
) -> Result<SignedInscription, TxError> {
    let kinds = req
        .utxos
        .iter()
        .enumerate()
        .map(|(i, u)| spend_kind(i, &u.script_pubkey))
        .collect::<Result<Vec<_>, _>>()?;

    // ── Fee and change ───────────────────────────────────────────────
    let fee = fee_for(
        estimate_size(req.utxos.len(), req.script.len(), req.witness),
        req.fee_rate,
    )
    .ok_or(TxError::AmountOverflow("fee"))?;
    let total = req
        .utxos
        .iter()
        .try_fold(Amount::ZERO, |acc, u| acc.checked_add(u.value))
        .ok_or(TxError::AmountOverflow("input total"))?;
    let required = fee
        .checked_add(req.inscription_value)
        .ok_or(TxError::AmountOverflow("required amount"))?;
    let remainder = total
        .checked_sub(required)
        .ok_or(TxError::InsufficientFunds {
            required,
            available: total,
        })?;
    let change = (remainder > CHANGE_DUST_THRESHOLD).then_some(remainder);

    // ── Unsigned transaction ─────────────────────────────────────────
    let mut output = vec![TxOut {
        value: req.inscription_value,
        script_pubkey: req.script.to_owned(),
    }];
    if let Some(value) = change {
        output.push(TxOut {
            value,
            script_pubkey: req.change_script.to_owned(),
        });
    }
    let unsigned = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: req
            .utxos
            .iter()
            .map(|u| TxIn {
                previous_output: u.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_LOCKTIME_NO_RBF,
                witness: Witness::new(),
            })
            .collect(),
        output,
    };
    let mut psbt = Psbt::from_unsigned_tx(unsigned)?;
    for ((input, utxo), kind) in psbt.inputs.iter_mut().zip(req.utxos).zip(&kinds) {
        if *kind == SpendKind::P2wpkh {
            input.witness_utxo = Some(utxo.txout());
        }
    }

    // ── Sign ─────────────────────────────────────────────────────────
    let key = signer.public_key();
    let pubkey = PublicKey::new(key.0);
    let mut sighashes = Vec::with_capacity(req.utxos.len());
    {
        let mut cache = SighashCache::new(&psbt.unsigned_tx);
        for (i, (utxo, kind)) in req.utxos.iter().zip(&kinds).enumerate() {
            let digest = match kind {
                SpendKind::P2wpkh => cache
                    .p2wpkh_signature_hash(i, &utxo.script_pubkey, utxo.value, EcdsaSighashType::All)
                    .map_err(|e| TxError::Sighash {
                        input: i,
                        reason: e.to_string(),
                    })?
                    .to_byte_array(),
                SpendKind::P2pkh => cache
                    .legacy_signature_hash(i, &utxo.script_pubkey, EcdsaSighashType::All.to_u32())
                    .map_err(|e| TxError::Sighash {
                        input: i,
                        reason: e.to_string(),
                    })?
                    .to_byte_array(),
            };
            sighashes.push(digest);
        }
    }
    for (i, digest) in sighashes.iter().enumerate() {
        let signature = signer.sign(digest)?;
        psbt.inputs[i].partial_sigs.insert(
            pubkey,
            ecdsa::Signature {
                signature,
                sighash_type: EcdsaSighashType::All,
            },
        );
    }

    // ── Verify all before finalizing any ─────────────────────────────
    let secp = Secp256k1::verification_only();
    for (i, ((input, digest), (utxo, kind))) in psbt
        .inputs
        .iter()
        .zip(&sighashes)
        .zip(req.utxos.iter().zip(&kinds))
        .enumerate()
    {
        let valid = key_commits_to(*kind, &key, &utxo.script_pubkey)
            && input.partial_sigs.get(&pubkey).is_some_and(|sig| {
                secp.verify_ecdsa(&Message::from_digest(*digest), &sig.signature, &key.0)
                    .is_ok()
            });
        if !valid {
            tracing::warn!(input = i, "signature validation failed, aborting assembly");
            return Err(TxError::SignatureValidation { input: i });
        }
    }

    // ── Finalize ─────────────────────────────────────────────────────
    for (i, (input, kind)) in psbt.inputs.iter_mut().zip(&kinds).enumerate() {
        let sig = input
            .partial_sigs
            .remove(&pubkey)
            .ok_or(TxError::SignatureValidation { input: i })?;
        match kind {
            SpendKind::P2wpkh => {
                input.final_script_witness = Some(Witness::p2wpkh(&sig, &key.0));
            }
            SpendKind::P2pkh => {
                input.final_script_sig = Some(
                    Builder::new()
                        .push_slice(PushBytesBuf::try_from(sig.to_vec())?)
                        .push_key(&pubkey)
                        .into_script(),
                );
            }
        }
    }

    let tx = psbt.extract_tx_unchecked_fee_rate();
    let txid = tx.compute_txid();
    let raw_hex = serialize_hex(&tx);
    let outputs: Amount = tx.output.iter().map(|o| o.value).sum();
    let fee = total
        .checked_sub(outputs)
        .ok_or(TxError::AmountOverflow("final fee"))?;

    tracing::info!(
        %txid,
        inputs = tx.input.len(),
        fee_sat = fee.to_sat(),
        change_sat = change.map(Amount::to_sat),
        "assembled inscription transaction"
    );

    Ok(SignedInscription {
        tx,
        txid,
        fee,
        change,
        raw_hex,
    })
}

//! # UTXO Selection
//!
//! First-fit selection over an immutable snapshot of the ledger listing.
//! Outputs are taken in listing order until the running total reaches the
//! target; the result is an index range into the snapshot, never a mutation
//! of shared wallet state. Concurrent pipelines each hold their own snapshot.
//!
//! Selection does not minimize input count or avoid dust; the assembler
//! decides whether the remainder becomes a change output.

use std::ops::Range;

use bitcoin::{Amount, FeeRate};
use vcord_ledger::{LedgerRpc, Utxo};

use crate::error::TxError;
use crate::size::{estimate_size, fee_for};

/// A prefix of a listing snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Indices of the selected outputs in the snapshot.
    pub range: Range<usize>,
    /// Sum of the selected values.
    pub total: Amount,
}

impl Selection {
    /// Number of selected outputs.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The selected outputs within `snapshot`.
    pub fn utxos<'s>(&self, snapshot: &'s [Utxo]) -> &'s [Utxo] {
        &snapshot[self.range.clone()]
    }
}

/// Shortest listing prefix whose sum reaches `required`.
///
/// At least one output is always selected, since a transaction needs an
/// input. Fails with [`TxError::InsufficientFunds`] carrying the listing
/// total when the whole listing falls short.
pub fn select_prefix(utxos: &[Utxo], required: Amount) -> Result<Selection, TxError> {
    let mut total = Amount::ZERO;
    for (i, utxo) in utxos.iter().enumerate() {
        total = total
            .checked_add(utxo.value)
            .ok_or(TxError::AmountOverflow("selection total"))?;
        if total >= required {
            return Ok(Selection {
                range: 0..i + 1,
                total,
            });
        }
    }
    Err(TxError::InsufficientFunds {
        required,
        available: total,
    })
}

/// Selection sized for an inscription, with the fee it was sized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingPlan {
    /// The chosen prefix.
    pub selection: Selection,
    /// Fee for a transaction spending exactly the selected inputs.
    pub fee: Amount,
    /// `fee + inscription_value`.
    pub required: Amount,
}

/// Select inputs covering the fee plus the inscription output.
///
/// The fee depends on the input count, so the estimate starts at one input
/// and is recomputed whenever the chosen prefix is longer than the count it
/// was sized for. Each round's target is at least the previous one, so the
/// prefix only grows and the loop ends within `utxos.len()` rounds.
pub fn select_for_inscription(
    utxos: &[Utxo],
    script_len: usize,
    fee_rate: FeeRate,
    inscription_value: Amount,
    witness: bool,
) -> Result<FundingPlan, TxError> {
    let mut inputs = 1;
    loop {
        let fee = fee_for(estimate_size(inputs, script_len, witness), fee_rate)
            .ok_or(TxError::AmountOverflow("fee"))?;
        let required = fee
            .checked_add(inscription_value)
            .ok_or(TxError::AmountOverflow("funding target"))?;
        let selection = select_prefix(utxos, required)?;
        if selection.len() <= inputs {
            tracing::debug!(
                inputs = selection.len(),
                fee_sat = fee.to_sat(),
                required_sat = required.to_sat(),
                "selected inscription inputs"
            );
            return Ok(FundingPlan {
                selection,
                fee,
                required,
            });
        }
        inputs = selection.len();
    }
}

/// Reads fresh listings from the ledger and selects from them.
pub struct UtxoSelector<'a> {
    ledger: &'a dyn LedgerRpc,
    min_confirmations: u32,
}

impl<'a> UtxoSelector<'a> {
    /// Selector over outputs with at least `min_confirmations`.
    pub fn new(ledger: &'a dyn LedgerRpc, min_confirmations: u32) -> Self {
        Self {
            ledger,
            min_confirmations,
        }
    }

    /// A fresh listing. Never cached.
    pub async fn snapshot(&self) -> Result<Vec<Utxo>, TxError> {
        Ok(self.ledger.list_unspent(self.min_confirmations).await?)
    }

    /// Outputs covering `required`, taken first-fit in listing order.
    pub async fn select(&self, required: Amount) -> Result<Vec<Utxo>, TxError> {
        let snapshot = self.snapshot().await?;
        let selection = select_prefix(&snapshot, required)?;
        Ok(selection.utxos(&snapshot).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, ScriptBuf, Txid};
    use proptest::prelude::*;
    use vcord_ledger::MockLedger;

    fn utxo(n: u8, sat: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_byte_array([n; 32]), 0),
            value: Amount::from_sat(sat),
            script_pubkey: ScriptBuf::new(),
            confirmations: 1,
        }
    }

    #[test]
    fn short_listing_is_insufficient() {
        let utxos = vec![utxo(1, 200_000), utxo(2, 300_000)];
        match select_prefix(&utxos, Amount::from_sat(1_000_000)) {
            Err(TxError::InsufficientFunds {
                required,
                available,
            }) => {
                assert_eq!(required.to_sat(), 1_000_000);
                assert_eq!(available.to_sat(), 500_000);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn returns_first_prefix_reaching_target() {
        let utxos = vec![
            utxo(1, 400_000),
            utxo(2, 400_000),
            utxo(3, 300_000),
            utxo(4, 5_000_000),
        ];
        let sel = select_prefix(&utxos, Amount::from_sat(1_000_000)).unwrap();
        assert_eq!(sel.range, 0..3);
        assert_eq!(sel.total.to_sat(), 1_100_000);
        assert_eq!(sel.utxos(&utxos), &utxos[..3]);
    }

    #[test]
    fn listing_order_not_value_order() {
        let utxos = vec![utxo(1, 10_000), utxo(2, 2_000_000)];
        let sel = select_prefix(&utxos, Amount::from_sat(5_000)).unwrap();
        assert_eq!(sel.range, 0..1);
    }

    #[test]
    fn zero_target_still_takes_one_input() {
        let utxos = vec![utxo(1, 1)];
        assert_eq!(select_prefix(&utxos, Amount::ZERO).unwrap().len(), 1);
        assert!(select_prefix(&[], Amount::ZERO).is_err());
    }

    #[test]
    fn inscription_selection_resizes_fee_for_extra_inputs() {
        let rate = FeeRate::from_sat_per_vb_unchecked(10);
        let one_input_fee = fee_for(estimate_size(1, 200, true), rate).unwrap();
        // First output alone covers the one-input target but not the
        // two-input one once a second input is needed.
        let utxos = vec![
            utxo(1, one_input_fee.to_sat() + 546 - 1),
            utxo(2, 600),
            utxo(3, 100_000),
        ];
        let plan = select_for_inscription(&utxos, 200, rate, Amount::from_sat(546), true).unwrap();
        let fee = fee_for(estimate_size(plan.selection.len(), 200, true), rate).unwrap();
        assert_eq!(plan.fee, fee);
        assert_eq!(plan.required, fee + Amount::from_sat(546));
        assert!(plan.selection.total >= plan.required);
        assert_eq!(plan.selection.len(), 3);
    }

    #[tokio::test]
    async fn selector_reads_fresh_listing() {
        let ledger = MockLedger::new();
        ledger.fund(Amount::from_sat(50_000), ScriptBuf::new());
        let selector = UtxoSelector::new(&ledger, 1);
        assert_eq!(selector.select(Amount::from_sat(40_000)).await.unwrap().len(), 1);
        assert!(selector.select(Amount::from_sat(90_000)).await.is_err());

        ledger.fund(Amount::from_sat(50_000), ScriptBuf::new());
        assert_eq!(selector.select(Amount::from_sat(90_000)).await.unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn selection_is_minimal_prefix(
            values in proptest::collection::vec(1u64..1_000_000, 1..20),
            target in 1u64..5_000_000,
        ) {
            let utxos: Vec<Utxo> = values.iter().enumerate().map(|(i, v)| utxo(i as u8, *v)).collect();
            let sum: u64 = values.iter().sum();
            match select_prefix(&utxos, Amount::from_sat(target)) {
                Ok(sel) => {
                    prop_assert!(sel.total.to_sat() >= target);
                    let without_last: u64 = values[..sel.len() - 1].iter().sum();
                    prop_assert!(sel.len() == 1 || without_last < target);
                }
                Err(_) => prop_assert!(sum < target),
            }
        }
    }
}

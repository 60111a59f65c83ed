//! Size and fee estimation for inscription transactions.
//!
//! ```text
//! size = 10                       version + locktime
//!      + inputs * (68 | 148)      witness | legacy input
//!      + 34                       inscription output
//!      + (script_len + 106)       witness data, witness mode only
//! ```
//!
//! The estimate drives fee calculation only; it is not a consensus size.
//! Legacy mode leaves the envelope out even though it sits in an output
//! script, so a legacy fee runs short by about `script_len * rate`.

use bitcoin::{Amount, FeeRate};

/// Output value of a witness-mode inscription.
pub const WITNESS_DUST_FLOOR: Amount = Amount::from_sat(546);

/// Output value of a legacy-mode inscription.
pub const LEGACY_DUST_FLOOR: Amount = Amount::from_sat(1000);

/// Change at or below this value is folded into the fee.
pub const CHANGE_DUST_THRESHOLD: Amount = Amount::from_sat(546);

const BASE_SIZE: u64 = 10;
const WITNESS_INPUT_SIZE: u64 = 68;
const LEGACY_INPUT_SIZE: u64 = 148;
const OUTPUT_SIZE: u64 = 34;
const WITNESS_OVERHEAD: u64 = 106;

/// Inscription output value for the given mode.
pub fn dust_floor(witness: bool) -> Amount {
    if witness {
        WITNESS_DUST_FLOOR
    } else {
        LEGACY_DUST_FLOOR
    }
}

/// Estimated size in bytes of an inscription spending `inputs` outputs.
pub fn estimate_size(inputs: usize, script_len: usize, witness: bool) -> u64 {
    let input_size = if witness {
        WITNESS_INPUT_SIZE
    } else {
        LEGACY_INPUT_SIZE
    };
    let witness_data = if witness {
        script_len as u64 + WITNESS_OVERHEAD
    } else {
        0
    };
    BASE_SIZE + inputs as u64 * input_size + OUTPUT_SIZE + witness_data
}

/// `ceil(size * rate)` with the rate taken in sat/vB.
///
/// Computed in sat/kwu so fractional sat/vB rates round up rather than
/// truncate. `None` on overflow.
pub fn fee_for(size: u64, rate: FeeRate) -> Option<Amount> {
    // sat/vB = sat/kwu * 4 / 1000
    let numerator = size.checked_mul(rate.to_sat_per_kwu())?.checked_mul(4)?;
    Some(Amount::from_sat(numerator.div_ceil(1000)))
}

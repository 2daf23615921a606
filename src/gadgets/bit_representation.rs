use super::is_zero::IsZeroGadget;
use crate::{
    constraint_builder::{AdviceColumn, BinaryColumn, ConstraintBuilder, Query},
    util::Bit,
};
use halo2_proofs::{
    arithmetic::{Field, FieldExt},
    circuit::Region,
    halo2curves::bn256::Fr,
    plonk::{ConstraintSystem, Error},
};

/// Rows `(value, index)` such that `value` is the big endian accumulation of
/// `index + 1` bits. Looking up `(x, n - 1)` proves `0 <= x < 2^n`.
pub trait BitsLookup {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 2];
}

impl<F: FieldExt> ConstraintBuilder<F> {
    pub fn bit_width_lookup(
        &mut self,
        name: &'static str,
        value: Query<F>,
        n_bits: usize,
        bits: &impl BitsLookup,
    ) {
        debug_assert!(n_bits > 0);
        self.add_lookup(name, [value, Query::from(n_bits as u64 - 1)], bits.lookup());
    }
}

// Bits are accumulated most significant first, so proving that x fits into n
// bits doesn't prove that it fits into fewer.
#[derive(Clone)]
pub struct BitRepresentationConfig {
    // lookup columns
    value: AdviceColumn,
    index: AdviceColumn,

    // internal columns
    bit: BinaryColumn,
    index_is_zero: IsZeroGadget,
}

impl BitsLookup for BitRepresentationConfig {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 2] {
        [self.value.current(), self.index.current()]
    }
}

impl BitRepresentationConfig {
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
    ) -> Self {
        let [value, index] = cb.advice_columns(cs);
        let [bit] = cb.binary_columns(cs);
        let index_is_zero = IsZeroGadget::configure(cs, cb, index);

        cb.assert_zero(
            "index increases by 1 or resets to 0",
            index.current() * (index.current() - index.previous() - 1),
        );
        cb.assert_equal(
            "current value = previous value * 2 * (index != 0) + bit",
            value.current(),
            value.previous() * 2 * !index_is_zero.current() + bit.current(),
        );

        Self {
            value,
            index,
            bit,
            index_is_zero,
        }
    }

    pub fn n_rows_required(bit_width_checks: &[(Fr, usize)]) -> usize {
        1 + bit_width_checks.iter().map(|(_, n_bits)| n_bits).sum::<usize>()
    }

    /// Decomposes the low `n_bits` bits of each value, starting at offset 1.
    /// A value wider than `n_bits` accumulates to something else and its
    /// lookup then fails.
    pub fn assign(
        &self,
        region: &mut Region<'_, Fr>,
        bit_width_checks: &[(Fr, usize)],
    ) -> Result<(), Error> {
        let mut offset = 1;
        for (value, n_bits) in bit_width_checks {
            let mut accumulator = Fr::zero();
            for (index, i) in (0..*n_bits).rev().enumerate() {
                let bit = value.bit(i);
                accumulator = accumulator.double() + Fr::from(bit);

                self.bit.assign(region, offset, bit)?;
                self.value.assign(region, offset, accumulator)?;
                self.index.assign(region, offset, index as u64)?;
                self.index_is_zero
                    .assign(region, offset, Fr::from(index as u64))?;

                offset += 1;
            }
            if accumulator != *value {
                log::debug!("{:?} does not fit into {} bits", value, n_bits);
            }
        }
        Ok(())
    }
}

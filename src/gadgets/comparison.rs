use super::{bit_representation::BitsLookup, is_zero::IsZeroGadget};
use crate::constraint_builder::{AdviceColumn, BinaryColumn, BinaryQuery, ConstraintBuilder, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::Region,
    halo2curves::bn256::Fr,
    plonk::{ConstraintSystem, Error},
};

/// Compares two `n_bits` wide unsigned integers. `difference = left - right +
/// lt * 2^n_bits` must itself fit into `n_bits`, which pins `lt` down.
#[derive(Clone, Copy)]
pub struct ComparisonGadget {
    lt: BinaryColumn,
    difference: AdviceColumn,
    difference_is_zero: IsZeroGadget,
    n_bits: usize,
}

impl ComparisonGadget {
    /// Both inputs have to be range checked to `n_bits` by the caller.
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
        left: Query<F>,
        right: Query<F>,
        n_bits: usize,
        bits: &impl BitsLookup,
    ) -> Self {
        let [lt] = cb.binary_columns(cs);
        let [difference] = cb.advice_columns(cs);
        let difference_is_zero = IsZeroGadget::configure(cs, cb, difference);

        cb.assert_equal(
            "difference = left - right + lt * 2^n",
            difference.current(),
            left - right + Query::power_of_two(n_bits) * lt.current(),
        );
        cb.bit_width_lookup("difference fits into n bits", difference.current(), n_bits, bits);

        Self {
            lt,
            difference,
            difference_is_zero,
            n_bits,
        }
    }

    pub fn lt<F: FieldExt>(&self) -> BinaryQuery<F> {
        self.lt.current()
    }

    // lt and difference == 0 are never both 1.
    pub fn leq<F: FieldExt>(&self) -> BinaryQuery<F> {
        BinaryQuery(Query::from(self.lt()) + self.difference_is_zero.current())
    }

    pub fn assign(
        &self,
        region: &mut Region<'_, Fr>,
        offset: usize,
        left: u64,
        right: u64,
    ) -> Result<(), Error> {
        let (lt, difference) = difference(left, right, self.n_bits);
        self.lt.assign(region, offset, lt)?;
        self.difference.assign(region, offset, difference)?;
        self.difference_is_zero.assign(region, offset, difference)
    }
}

pub(crate) fn difference(left: u64, right: u64, n_bits: usize) -> (bool, Fr) {
    let lt = left < right;
    let difference = Fr::from(left) - Fr::from(right);
    if lt {
        (lt, difference + Fr::from(1u64 << n_bits))
    } else {
        (lt, difference)
    }
}

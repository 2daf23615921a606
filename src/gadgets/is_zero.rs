use crate::constraint_builder::{AdviceColumn, BinaryQuery, ConstraintBuilder, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::Region,
    plonk::{ConstraintSystem, Error},
};

/// `current()` is 1 exactly when `value` is 0.
#[derive(Clone, Copy)]
pub struct IsZeroGadget {
    value: AdviceColumn,
    inverse_or_zero: AdviceColumn,
}

impl IsZeroGadget {
    pub fn current<F: FieldExt>(self) -> BinaryQuery<F> {
        BinaryQuery(Query::one() - self.value.current() * self.inverse_or_zero.current())
    }

    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
        value: AdviceColumn,
    ) -> Self {
        let inverse_or_zero = AdviceColumn(cs.advice_column());
        cb.assert_zero(
            "value is 0 or inverse_or_zero is inverse of value",
            value.current() * (Query::one() - value.current() * inverse_or_zero.current()),
        );
        Self {
            value,
            inverse_or_zero,
        }
    }

    /// Assigns only the inverse; the owner of `value` assigns it.
    pub fn assign<F: FieldExt>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: F,
    ) -> Result<(), Error> {
        self.inverse_or_zero
            .assign(region, offset, value.invert().unwrap_or(F::zero()))
    }
}

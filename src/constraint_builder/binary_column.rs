use super::{BinaryQuery, ConstraintBuilder, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::{Region, Value},
    plonk::{Advice, Column, ConstraintSystem, Error},
};

/// An advice column constrained to hold 0 or 1 wherever the conditions it was
/// configured under are active.
#[derive(Clone, Copy)]
pub struct BinaryColumn(pub Column<Advice>);

impl BinaryColumn {
    pub fn rotation<F: FieldExt>(self, i: i32) -> BinaryQuery<F> {
        BinaryQuery(Query::Advice(self.0, i))
    }

    pub fn current<F: FieldExt>(self) -> BinaryQuery<F> {
        self.rotation(0)
    }

    pub fn previous<F: FieldExt>(self) -> BinaryQuery<F> {
        self.rotation(-1)
    }

    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
    ) -> Self {
        let column = Self(cs.advice_column());
        cb.assert_zero(
            "binary column is 0 or 1",
            Query::from(column.current()) * (Query::one() - column.current()),
        );
        column
    }

    pub fn assign<F: FieldExt>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: bool,
    ) -> Result<(), Error> {
        region.assign_advice(|| "binary", self.0, offset, || Value::known(F::from(value)))?;
        Ok(())
    }
}

use super::{BinaryQuery, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::{AssignedCell, Region, Value},
    plonk::{Advice, Column, Error, Fixed},
};

#[derive(Clone, Copy)]
pub struct SelectorColumn(pub Column<Fixed>);

impl SelectorColumn {
    pub fn current<F: FieldExt>(self) -> BinaryQuery<F> {
        self.rotation(0)
    }

    pub fn rotation<F: FieldExt>(self, i: i32) -> BinaryQuery<F> {
        BinaryQuery(Query::Fixed(self.0, i))
    }

    pub fn enable<F: FieldExt>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
    ) -> Result<(), Error> {
        region.assign_fixed(|| "selector", self.0, offset, || Value::known(F::one()))?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct FixedColumn(pub Column<Fixed>);

impl FixedColumn {
    pub fn rotation<F: FieldExt>(self, i: i32) -> Query<F> {
        Query::Fixed(self.0, i)
    }

    pub fn current<F: FieldExt>(self) -> Query<F> {
        self.rotation(0)
    }

    pub fn assign<F: FieldExt, T: Into<F>>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: T,
    ) -> Result<(), Error> {
        let value = value.into();
        region.assign_fixed(|| "fixed", self.0, offset, || Value::known(value))?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct AdviceColumn(pub Column<Advice>);

impl AdviceColumn {
    pub fn rotation<F: FieldExt>(self, i: i32) -> Query<F> {
        Query::Advice(self.0, i)
    }

    pub fn current<F: FieldExt>(self) -> Query<F> {
        self.rotation(0)
    }

    pub fn previous<F: FieldExt>(self) -> Query<F> {
        self.rotation(-1)
    }

    pub fn delta<F: FieldExt>(self) -> Query<F> {
        self.current() - self.previous()
    }

    pub fn assign<F: FieldExt, T: Into<F>>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: T,
    ) -> Result<(), Error> {
        self.assign_cell(region, offset, value)?;
        Ok(())
    }

    /// Like `assign`, but keeps the cell for copy constraints.
    pub fn assign_cell<F: FieldExt, T: Into<F>>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: T,
    ) -> Result<AssignedCell<F, F>, Error> {
        let value = value.into();
        region.assign_advice(|| "advice", self.0, offset, || Value::known(value))
    }
}

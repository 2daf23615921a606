use crate::constraint_builder::{BinaryColumn, BinaryQuery, ConstraintBuilder, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::Region,
    plonk::{ConstraintSystem, Error},
};
use strum::IntoEnumIterator;

/// One hot encoding of an enum. The first variant has no column of its own:
/// it is the row where every column is 0, so unassigned rows decode to it.
#[derive(Clone)]
pub struct OneHot<T> {
    columns: Vec<(T, BinaryColumn)>,
}

impl<T: IntoEnumIterator + Copy + Eq> OneHot<T> {
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
    ) -> Self {
        let columns = T::iter()
            .skip(1)
            .map(|variant| (variant, BinaryColumn::configure(cs, cb)))
            .collect();
        let config = Self { columns };
        cb.assert(
            "sum of binary columns in OneHot is 0 or 1",
            config.sum(0).or(!config.sum(0)),
        );
        config
    }

    pub fn assign<F: FieldExt>(
        &self,
        region: &mut Region<'_, F>,
        offset: usize,
        value: T,
    ) -> Result<(), Error> {
        for (variant, column) in &self.columns {
            column.assign(region, offset, *variant == value)?;
        }
        Ok(())
    }

    pub fn current_matches<F: FieldExt>(&self, variants: &[T]) -> BinaryQuery<F> {
        self.matches(variants, 0)
    }

    pub fn previous_matches<F: FieldExt>(&self, variants: &[T]) -> BinaryQuery<F> {
        self.matches(variants, -1)
    }

    fn matches<F: FieldExt>(&self, variants: &[T], rotation: i32) -> BinaryQuery<F> {
        BinaryQuery(
            variants
                .iter()
                .map(|variant| self.matches_variant(*variant, rotation))
                .sum(),
        )
    }

    fn matches_variant<F: FieldExt>(&self, variant: T, rotation: i32) -> Query<F> {
        match self.columns.iter().find(|(v, _)| *v == variant) {
            Some((_, column)) => column.rotation(rotation).into(),
            None => (!self.sum(rotation)).into(),
        }
    }

    fn sum<F: FieldExt>(&self, rotation: i32) -> BinaryQuery<F> {
        BinaryQuery(
            self.columns
                .iter()
                .map(|(_, column)| Query::from(column.rotation(rotation)))
                .sum(),
        )
    }
}

use crate::constraint_builder::{AdviceColumn, ConstraintBuilder, FixedColumn, Query};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::Region,
    halo2curves::bn256::Fr,
    plonk::{Advice, Column, ConstraintSystem, Error, Fixed},
};

/// Source of `(enabled, left, right, hash)` rows proving `hash = H(left, right)`.
pub trait PoseidonLookup {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 4];
}

impl<F: FieldExt> ConstraintBuilder<F> {
    pub fn poseidon_lookup(
        &mut self,
        name: &'static str,
        [left, right, hash]: [Query<F>; 3],
        poseidon: &impl PoseidonLookup,
    ) {
        self.add_lookup(name, [Query::one(), left, right, hash], poseidon.lookup());
    }
}

/// The hash table shared with the poseidon permutation circuit. Row 0 is left
/// empty so that disabled lookups, which query all zeros, always match.
#[derive(Clone, Copy)]
pub struct PoseidonTable {
    q_enable: FixedColumn,
    left: AdviceColumn,
    right: AdviceColumn,
    hash: AdviceColumn,
}

impl PoseidonTable {
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
    ) -> Self {
        let [q_enable] = cb.fixed_columns(cs);
        let [left, right, hash] = cb.advice_columns(cs);
        Self {
            q_enable,
            left,
            right,
            hash,
        }
    }

    /// `(q_enable, [hash, left, right])`, for the permutation circuit that
    /// fills and proves the table.
    pub fn columns(&self) -> (Column<Fixed>, [Column<Advice>; 3]) {
        (self.q_enable.0, [self.hash.0, self.left.0, self.right.0])
    }

    pub fn n_rows_required(hash_traces: &[(Fr, Fr, Fr)]) -> usize {
        1 + hash_traces.len()
    }

    /// Fills the table from native hash traces without proving the
    /// permutation. Only for mock proving.
    pub fn dev_load(
        &self,
        region: &mut Region<'_, Fr>,
        hash_traces: &[(Fr, Fr, Fr)],
    ) -> Result<(), Error> {
        for (offset, (left, right, hash)) in hash_traces.iter().enumerate() {
            let offset = offset + 1;
            self.q_enable.assign(region, offset, Fr::one())?;
            self.left.assign(region, offset, *left)?;
            self.right.assign(region, offset, *right)?;
            self.hash.assign(region, offset, *hash)?;
        }
        Ok(())
    }
}

impl PoseidonLookup for PoseidonTable {
    fn lookup<F: FieldExt>(&self) -> [Query<F>; 4] {
        [
            self.q_enable.current(),
            self.left.current(),
            self.right.current(),
            self.hash.current(),
        ]
    }
}

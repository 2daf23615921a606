use halo2_proofs::{arithmetic::FieldExt, plonk::ConstraintSystem};

mod binary_column;
mod binary_query;
mod column;
mod query;

pub use binary_column::BinaryColumn;
pub use binary_query::BinaryQuery;
pub use column::{AdviceColumn, FixedColumn, SelectorColumn};
pub use query::Query;

/// Collects gates and lookups under a stack of conditions. Every constraint is
/// multiplied by all conditions in scope, starting with the `every_row`
/// selector, so disabled rows never constrain anything.
pub struct ConstraintBuilder<F: FieldExt> {
    constraints: Vec<(&'static str, Query<F>)>,
    #[allow(clippy::type_complexity)]
    lookups: Vec<(&'static str, Vec<(Query<F>, Query<F>)>)>,

    conditions: Vec<BinaryQuery<F>>,
}

impl<F: FieldExt> ConstraintBuilder<F> {
    pub fn new(every_row: SelectorColumn) -> Self {
        Self {
            constraints: vec![],
            lookups: vec![],

            conditions: vec![every_row.current()],
        }
    }

    pub fn assert_zero(&mut self, name: &'static str, query: Query<F>) {
        let condition = self
            .conditions
            .iter()
            .fold(BinaryQuery::one(), |a, b| a.and(b.clone()));
        self.constraints.push((name, condition.condition(query)))
    }

    pub fn assert_equal(&mut self, name: &'static str, left: Query<F>, right: Query<F>) {
        self.assert_zero(name, left - right)
    }

    pub fn assert(&mut self, name: &'static str, condition: BinaryQuery<F>) {
        self.assert_zero(name, Query::one() - condition);
    }

    /// Runs `configure` with `condition` pushed onto the condition stack and
    /// hands back whatever it built.
    pub fn condition<T>(
        &mut self,
        condition: BinaryQuery<F>,
        configure: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.conditions.push(condition);
        let configured = configure(self);
        self.conditions.pop();
        configured
    }

    /// Lookups skip the every_row selector to save a degree. Callers are
    /// expected to issue them inside a condition that is zero on disabled
    /// rows, so those rows look up the all zero tuple.
    pub fn add_lookup<const N: usize>(
        &mut self,
        name: &'static str,
        left: [Query<F>; N],
        right: [Query<F>; N],
    ) {
        let condition = self
            .conditions
            .iter()
            .skip(1)
            .fold(BinaryQuery::one(), |a, b| a.and(b.clone()));
        let lookup = left
            .into_iter()
            .map(|q| q * condition.clone())
            .zip(right.into_iter())
            .collect();
        self.lookups.push((name, lookup))
    }

    pub fn advice_columns<const N: usize>(
        &self,
        cs: &mut ConstraintSystem<F>,
    ) -> [AdviceColumn; N] {
        [0; N].map(|_| AdviceColumn(cs.advice_column()))
    }

    pub fn fixed_columns<const N: usize>(&self, cs: &mut ConstraintSystem<F>) -> [FixedColumn; N] {
        [0; N].map(|_| FixedColumn(cs.fixed_column()))
    }

    pub fn binary_columns<const N: usize>(
        &mut self,
        cs: &mut ConstraintSystem<F>,
    ) -> [BinaryColumn; N] {
        [0; N].map(|_| BinaryColumn::configure::<F>(cs, self))
    }

    pub fn build(self, cs: &mut ConstraintSystem<F>) {
        assert_eq!(
            self.conditions.len(),
            1,
            "Cannot call build while in a condition"
        );

        for (name, query) in self.constraints {
            cs.create_gate(name, |meta| vec![query.run(meta)])
        }
        for (name, lookup) in self.lookups {
            cs.lookup_any(name, |meta| {
                lookup
                    .into_iter()
                    .map(|(left, right)| (left.run(meta), right.run(meta)))
                    .collect()
            });
        }
    }
}

use super::BinaryQuery;
use halo2_proofs::{
    arithmetic::{Field, FieldExt},
    plonk::{Advice, Column, Expression, Fixed, VirtualCells},
    poly::Rotation,
};

/// An expression tree over column queries, evaluated into a halo2
/// `Expression` only when the constraint builder emits gates.
#[derive(Clone)]
pub enum Query<F: Clone> {
    Constant(F),
    Advice(Column<Advice>, i32),
    Fixed(Column<Fixed>, i32),
    Neg(Box<Self>),
    Add(Box<Self>, Box<Self>),
    Mul(Box<Self>, Box<Self>),
}

impl<F: FieldExt> Query<F> {
    pub fn zero() -> Self {
        Self::from(0)
    }

    pub fn one() -> Self {
        Self::from(1)
    }

    /// 2^n as a constant, for n below the field's bit length.
    pub fn power_of_two(n: usize) -> Self {
        Self::Constant((0..n).fold(F::one(), |power, _| power.double()))
    }

    pub fn run(&self, meta: &mut VirtualCells<'_, F>) -> Expression<F> {
        match self {
            Query::Constant(f) => Expression::Constant(*f),
            Query::Advice(c, r) => meta.query_advice(*c, Rotation(*r)),
            Query::Fixed(c, r) => meta.query_fixed(*c, Rotation(*r)),
            Query::Neg(q) => Expression::Constant(F::zero()) - q.run(meta),
            Query::Add(q, u) => q.run(meta) + u.run(meta),
            Query::Mul(q, u) => q.run(meta) * u.run(meta),
        }
    }
}

impl<F: FieldExt> From<u64> for Query<F> {
    fn from(x: u64) -> Self {
        Self::Constant(F::from(x))
    }
}

impl<F: FieldExt> From<BinaryQuery<F>> for Query<F> {
    fn from(b: BinaryQuery<F>) -> Self {
        b.0
    }
}

impl<F: Field, T: Into<Query<F>>> std::ops::Add<T> for Query<F> {
    type Output = Self;
    fn add(self, other: T) -> Self::Output {
        Self::Add(Box::new(self), Box::new(other.into()))
    }
}

impl<F: Field, T: Into<Query<F>>> std::ops::Sub<T> for Query<F> {
    type Output = Self;
    fn sub(self, other: T) -> Self::Output {
        Self::Add(Box::new(self), Box::new(Self::Neg(Box::new(other.into()))))
    }
}

impl<F: Field, T: Into<Query<F>>> std::ops::Mul<T> for Query<F> {
    type Output = Self;
    fn mul(self, other: T) -> Self::Output {
        Self::Mul(Box::new(self), Box::new(other.into()))
    }
}

impl<F: FieldExt> std::iter::Sum for Query<F> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Query::zero(), |sum, query| sum + query)
    }
}

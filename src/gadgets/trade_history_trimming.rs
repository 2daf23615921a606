use super::{bit_representation::BitsLookup, comparison::ComparisonGadget};
use crate::{
    constants::TradeHistoryParams,
    constraint_builder::{AdviceColumn, ConstraintBuilder, Query},
    types::{TradeHistoryTrimming, TrimmedTradeHistory},
};
use halo2_proofs::{
    arithmetic::FieldExt,
    circuit::Region,
    halo2curves::bn256::Fr,
    plonk::{ConstraintSystem, Error},
};

/// Decides what survives of a stored record when `order_id` visits its slot.
///
/// A newer order discards the stored `filled` and `cancelled` and takes the
/// slot over. An older order keeps the stored record and reads as cancelled,
/// since a later order already owns the slot.
#[derive(Clone)]
pub struct TradeHistoryTrimmingConfig {
    // stored order id vs order_id
    order_ids: ComparisonGadget,

    filled: AdviceColumn,
    cancelled: AdviceColumn,
    cancelled_to_store: AdviceColumn,
    order_id_to_store: AdviceColumn,
}

impl TradeHistoryTrimmingConfig {
    pub fn configure<F: FieldExt>(
        cs: &mut ConstraintSystem<F>,
        cb: &mut ConstraintBuilder<F>,
        [stored_filled, stored_cancelled, stored_order_id]: [Query<F>; 3],
        order_id: Query<F>,
        params: &TradeHistoryParams,
        bits: &impl BitsLookup,
    ) -> Self {
        let [filled, cancelled, cancelled_to_store, order_id_to_store] = cb.advice_columns(cs);

        let n_bits = params.num_bits_order_id();
        cb.bit_width_lookup(
            "stored order id fits into NUM_BITS_ORDER_ID",
            stored_order_id.clone(),
            n_bits,
            bits,
        );
        cb.bit_width_lookup(
            "order id fits into NUM_BITS_ORDER_ID",
            order_id.clone(),
            n_bits,
            bits,
        );
        let order_ids = ComparisonGadget::configure(
            cs,
            cb,
            stored_order_id.clone(),
            order_id.clone(),
            n_bits,
            bits,
        );

        let is_newer_order = order_ids.lt();
        let force_cancel = !order_ids.leq();
        cb.assert_equal(
            "filled = stored order id < order id ? 0 : stored filled",
            filled.current(),
            is_newer_order.select(Query::zero(), stored_filled),
        );
        cb.assert_equal(
            "cancelled_to_store = stored order id < order id ? 0 : stored cancelled",
            cancelled_to_store.current(),
            is_newer_order.select(Query::zero(), stored_cancelled),
        );
        cb.assert_equal(
            "cancelled = stored order id > order id ? 1 : cancelled_to_store",
            cancelled.current(),
            force_cancel.select(Query::one(), cancelled_to_store.current()),
        );
        cb.assert_equal(
            "order_id_to_store = stored order id < order id ? order id : stored order id",
            order_id_to_store.current(),
            is_newer_order.select(order_id, stored_order_id),
        );

        Self {
            order_ids,
            filled,
            cancelled,
            cancelled_to_store,
            order_id_to_store,
        }
    }

    pub fn filled<F: FieldExt>(&self) -> Query<F> {
        self.filled.current()
    }

    pub fn cancelled<F: FieldExt>(&self) -> Query<F> {
        self.cancelled.current()
    }

    pub fn cancelled_to_store<F: FieldExt>(&self) -> Query<F> {
        self.cancelled_to_store.current()
    }

    pub fn order_id_to_store<F: FieldExt>(&self) -> Query<F> {
        self.order_id_to_store.current()
    }

    /// Assigns the comparison and the four outputs. The stored record and the
    /// order id belong to the caller's columns.
    pub fn assign(
        &self,
        region: &mut Region<'_, Fr>,
        offset: usize,
        trimming: &TradeHistoryTrimming,
    ) -> Result<TrimmedTradeHistory, Error> {
        self.order_ids
            .assign(region, offset, trimming.stored.order_id, trimming.order_id)?;

        let trimmed = trimming.trim();
        self.filled
            .assign(region, offset, Fr::from_u128(trimmed.filled))?;
        self.cancelled.assign(region, offset, Fr::from(trimmed.cancelled))?;
        self.cancelled_to_store
            .assign(region, offset, Fr::from(trimmed.cancelled_to_store))?;
        self.order_id_to_store
            .assign(region, offset, Fr::from(trimmed.order_id_to_store))?;
        Ok(trimmed)
    }
}

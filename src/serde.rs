//! JSON block input. Field elements are decimal strings or `0x` prefixed hex,
//! amounts are decimal strings.

use crate::{
    constants::TradeHistoryParams,
    error::TradeHistoryError,
    types::{MerkleProof, OrderFill, TradeHistory, TradeHistoryUpdate},
    util::{fr_from_biguint, fr_to_biguint},
};
use halo2_proofs::{arithmetic::Field, halo2curves::bn256::Fr};
use num_bigint::BigUint;
use num_traits::Num;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryBlock {
    pub trade_history_merkle_root_before: String,
    pub fills: Vec<OrderFillDe>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFillDe {
    #[serde(rename = "orderID")]
    pub order_id: u64,
    pub trade_history_address: u64,
    pub fill: String,
    pub trade_history_before: TradeHistoryDe,
    pub trade_history_after: TradeHistoryDe,
    pub proof: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistoryDe {
    pub filled: String,
    pub cancelled: u64,
    #[serde(rename = "orderID")]
    pub order_id: u64,
}

impl TryFrom<&TradeHistoryDe> for TradeHistory {
    type Error = TradeHistoryError;

    fn try_from(t: &TradeHistoryDe) -> Result<Self, Self::Error> {
        let cancelled = match t.cancelled {
            0 => false,
            1 => true,
            other => return Err(TradeHistoryError::InvalidFlag(other)),
        };
        Ok(Self {
            filled: parse_amount(&t.filled)?,
            cancelled,
            order_id: t.order_id,
        })
    }
}

impl From<&TradeHistory> for TradeHistoryDe {
    fn from(t: &TradeHistory) -> Self {
        Self {
            filled: t.filled.to_string(),
            cancelled: t.cancelled.into(),
            order_id: t.order_id,
        }
    }
}

impl TradeHistoryBlock {
    pub fn from_json(json: &str) -> Result<Self, TradeHistoryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TradeHistoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Inverse of `fills`. Only the first root is kept; the rest are implied
    /// by the updates themselves.
    pub fn from_fills(fills: &[OrderFill]) -> Self {
        let root_before = fills
            .first()
            .map_or_else(Fr::zero, |fill| fill.update.merkle_root_before);
        Self {
            trade_history_merkle_root_before: format_field(&root_before),
            fills: fills
                .iter()
                .map(|fill| OrderFillDe {
                    order_id: fill.order_id,
                    trade_history_address: fill.update.address,
                    fill: fill.update.fill.to_string(),
                    trade_history_before: (&fill.update.before).into(),
                    trade_history_after: (&fill.update.after).into(),
                    proof: fill.update.proof.siblings().iter().map(format_field).collect(),
                })
                .collect(),
        }
    }

    /// Typed fills, each starting from the root the previous one ends with.
    pub fn fills(&self, params: &TradeHistoryParams) -> Result<Vec<OrderFill>, TradeHistoryError> {
        let mut root = parse_field(&self.trade_history_merkle_root_before)?;
        let mut fills = Vec::with_capacity(self.fills.len());
        for fill in &self.fills {
            let proof = fill
                .proof
                .iter()
                .map(|sibling| parse_field(sibling))
                .collect::<Result<Vec<_>, _>>()?;
            let update = TradeHistoryUpdate::new(
                params,
                root,
                fill.trade_history_address,
                (&fill.trade_history_before).try_into()?,
                (&fill.trade_history_after).try_into()?,
                MerkleProof(proof),
                parse_amount(&fill.fill)?,
            )?;
            root = update.new_root();
            fills.push(OrderFill {
                order_id: fill.order_id,
                update,
            });
        }
        Ok(fills)
    }
}

pub fn parse_field(s: &str) -> Result<Fr, TradeHistoryError> {
    let value = match s.strip_prefix("0x") {
        Some(hex_digits) => {
            let padded = if hex_digits.len() % 2 == 1 {
                format!("0{}", hex_digits)
            } else {
                hex_digits.to_string()
            };
            BigUint::from_bytes_be(&hex::decode(padded)?)
        }
        None => BigUint::from_str_radix(s, 10)
            .map_err(|_| TradeHistoryError::InvalidNumber(s.to_string()))?,
    };
    fr_from_biguint(&value).ok_or_else(|| TradeHistoryError::NonCanonicalField(s.to_string()))
}

pub fn format_field(x: &Fr) -> String {
    fr_to_biguint(x).to_string()
}

fn parse_amount(s: &str) -> Result<u128, TradeHistoryError> {
    s.parse()
        .map_err(|_| TradeHistoryError::InvalidNumber(s.to_string()))
}

//! Core data types for confirmation-time analysis

use serde::{Deserialize, Serialize};

use crate::analysis::column::{Column, GasCategory};
use crate::analysis::quantile::QuantileCutoffs;

/// One row of the upstream mined-transaction table.
///
/// Columns are nullable upstream, so every field is optional here; the
/// feature builder decides which gaps disqualify a row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionObservation {
    pub block_posted: Option<i64>,
    pub block_mined: Option<i64>,
    /// Gas units the sender authorised.
    pub gas_offered: Option<i64>,
    /// Price per gas unit, in wei.
    pub gas_price: Option<i64>,
    pub hashpower_accepting: Option<f64>,
    pub tx_atabove: Option<i64>,
    pub tx_unchained: Option<i64>,
    pub highgas2: Option<i64>,
    pub chained: Option<i64>,
    pub round_gp_10gwei: Option<f64>,
}

impl TransactionObservation {
    /// Blocks between posting and mining, when both are known.
    pub fn raw_confirm_time(&self) -> Option<i64> {
        self.block_mined?.checked_sub(self.block_posted?)
    }

    /// Only an explicit `chained == 1` marks a row as chained.
    pub fn is_chained(&self) -> bool {
        self.chained == Some(1)
    }

    /// Value of a raw (non-derived) column as `f64`.
    ///
    /// A missing `round_gp_10gwei` falls back to the rounded `gas_price`.
    /// Derived columns return `None`; use [`DerivedFeatureRow::value`].
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::BlockPosted => self.block_posted.map(|v| v as f64),
            Column::BlockMined => self.block_mined.map(|v| v as f64),
            Column::GasOffered => self.gas_offered.map(|v| v as f64),
            Column::GasPrice => self.gas_price.map(|v| v as f64),
            Column::HashpowerAccepting => self.hashpower_accepting,
            Column::TxAtabove => self.tx_atabove.map(|v| v as f64),
            Column::TxUnchained => self.tx_unchained.map(|v| v as f64),
            Column::Highgas2 => self.highgas2.map(|v| v as f64),
            Column::Chained => self.chained.map(|v| v as f64),
            Column::RoundGp10Gwei => self
                .round_gp_10gwei
                .or_else(|| self.gas_price.map(round_gp_10gwei)),
            Column::ConfirmTime | Column::Hpa2 | Column::GasCat(_) => None,
        }
    }
}

/// Round a wei gas price the way the collector buckets it.
///
/// The price is first scaled by `1e8`; values in `[1, 10)` are floored,
/// values from 10 up are floored to the nearest multiple of ten, and
/// anything below 1 becomes 0.
pub fn round_gp_10gwei(gas_price: i64) -> f64 {
    let gp = gas_price as f64 / 1e8;
    if (1.0..10.0).contains(&gp) {
        gp.floor()
    } else if gp >= 10.0 {
        (gp / 10.0).floor() * 10.0
    } else {
        0.0
    }
}

/// A cleaned observation with the derived model features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatureRow {
    pub observation: TransactionObservation,
    /// `block_mined - block_posted`; always `> 0` here.
    pub confirm_time: i64,
    pub gas_category: GasCategory,
    /// `hashpower_accepting` squared.
    pub hpa2: Option<f64>,
}

impl DerivedFeatureRow {
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::ConfirmTime => Some(self.confirm_time as f64),
            Column::Hpa2 => self.hpa2,
            Column::GasCat(category) => Some(f64::from(self.gas_cat(category))),
            raw => self.observation.value(raw),
        }
    }

    /// 0/1 indicator for one quantile bucket.
    pub fn gas_cat(&self, category: GasCategory) -> u8 {
        u8::from(self.gas_category == category)
    }

    /// `[gasCat1, .., gasCat5]`; exactly one entry is 1.
    pub fn gas_cat_indicators(&self) -> [u8; 5] {
        let mut indicators = [0; 5];
        indicators[self.gas_category.index()] = 1;
        indicators
    }
}

/// Row counts gathered while cleaning the observation table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDiagnostics {
    pub total_rows: usize,
    /// Rows where both block numbers are present.
    pub with_confirm_time: usize,
    pub negative_confirm_time: usize,
    pub zero_confirm_time: usize,
    pub pre_chained: usize,
    pub post_chained: usize,
    pub non_positive_removed: usize,
    pub atabove_removed: usize,
    pub incomplete_removed: usize,
    pub cleaned_rows: usize,
    pub max_gas_offered: Option<i64>,
    /// Confirm time of the first cleaned row offering `max_gas_offered`.
    pub confirm_time_at_max_gas: Option<i64>,
    pub category_counts: [usize; 5],
}

/// Output of the feature builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    pub rows: Vec<DerivedFeatureRow>,
    pub cutoffs: QuantileCutoffs,
    pub diagnostics: FilterDiagnostics,
}

/// Predicted confirmation time joined with the covariates used for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(rename = "confirmTime")]
    pub confirm_time: i64,
    pub predict: f64,
    pub round_gp_10gwei: Option<f64>,
    pub hashpower_accepting: Option<f64>,
    pub tx_atabove: Option<i64>,
    pub tx_unchained: Option<i64>,
    pub highgas2: Option<i64>,
}

impl PredictionRow {
    pub fn new(row: &DerivedFeatureRow, predict: f64) -> Self {
        let obs = &row.observation;
        Self {
            confirm_time: row.confirm_time,
            predict,
            round_gp_10gwei: obs.round_gp_10gwei,
            hashpower_accepting: obs.hashpower_accepting,
            tx_atabove: obs.tx_atabove,
            tx_unchained: obs.tx_unchained,
            highgas2: obs.highgas2,
        }
    }
}

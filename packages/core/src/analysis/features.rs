//! Feature builder: cleans raw observations and derives model features.

use tracing::{debug, info, warn};

use crate::analysis::{
    column::{Column, GasCategory},
    error::AnalysisError,
    quantile::QuantileCutoffs,
    types::{
        round_gp_10gwei, DerivedFeatureRow, FeatureSet, FilterDiagnostics,
        TransactionObservation,
    },
};

/// Turns the raw observation table into [`DerivedFeatureRow`]s.
///
/// Filtering order:
/// 1. drop rows without a confirm time (missing block numbers, or chained)
/// 2. drop rows with `confirmTime <= 0`
/// 3. drop rows with `tx_atabove <= 0` (or missing)
/// 4. drop rows missing `gas_offered` or any column the model needs
///
/// Quantile cutoffs are computed over the rows that survive all four steps.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    required: Vec<Column>,
}

impl FeatureBuilder {
    /// Builder that additionally requires `required` columns to be present.
    pub fn new(required: impl IntoIterator<Item = Column>) -> Self {
        let mut sources: Vec<Column> = Vec::new();
        for column in required {
            if let Some(source) = column.source() {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }
        Self { required: sources }
    }

    pub fn build(&self, observations: &[TransactionObservation]) -> Result<FeatureSet, AnalysisError> {
        let mut diagnostics = FilterDiagnostics {
            total_rows: observations.len(),
            ..Default::default()
        };

        for confirm_time in observations.iter().filter_map(|o| o.raw_confirm_time()) {
            diagnostics.with_confirm_time += 1;
            if confirm_time < 0 {
                diagnostics.negative_confirm_time += 1;
            } else if confirm_time == 0 {
                diagnostics.zero_confirm_time += 1;
            }
        }

        diagnostics.pre_chained = observations.len();
        let unchained: Vec<(&TransactionObservation, i64)> = observations
            .iter()
            .filter(|o| !o.is_chained())
            .filter_map(|o| o.raw_confirm_time().map(|t| (o, t)))
            .collect();
        diagnostics.post_chained = unchained.len();

        let positive: Vec<_> = unchained.into_iter().filter(|(_, t)| *t > 0).collect();
        diagnostics.non_positive_removed = diagnostics.post_chained - positive.len();

        let before_atabove = positive.len();
        let atabove: Vec<_> = positive
            .into_iter()
            .filter(|(o, _)| o.tx_atabove.map_or(false, |n| n > 0))
            .collect();
        diagnostics.atabove_removed = before_atabove - atabove.len();

        let before_complete = atabove.len();
        let complete: Vec<_> = atabove
            .into_iter()
            .filter(|(o, _)| self.is_complete(o))
            .collect();
        diagnostics.incomplete_removed = before_complete - complete.len();
        diagnostics.cleaned_rows = complete.len();

        debug!(
            total = diagnostics.total_rows,
            post_chained = diagnostics.post_chained,
            cleaned = diagnostics.cleaned_rows,
            "Filtered observation table"
        );

        if complete.is_empty() {
            return Err(AnalysisError::no_data(format!(
                "all {} rows were removed by cleaning",
                diagnostics.total_rows
            )));
        }

        let gas_values: Vec<f64> = complete
            .iter()
            .filter_map(|(o, _)| o.gas_offered.map(|g| g as f64))
            .collect();
        let cutoffs = QuantileCutoffs::from_values(&gas_values)
            .ok_or_else(|| AnalysisError::no_data("no gas_offered values to compute quantiles"))?;

        if cutoffs.is_degenerate() {
            warn!(?cutoffs, "gas_offered quantile cutoffs coincide; some categories will be empty");
        }

        let rows: Vec<DerivedFeatureRow> = complete
            .into_iter()
            .map(|(o, confirm_time)| derive_row(o, confirm_time, &cutoffs))
            .collect();

        for row in &rows {
            diagnostics.category_counts[row.gas_category.index()] += 1;
        }

        diagnostics.max_gas_offered = rows.iter().filter_map(|r| r.observation.gas_offered).max();
        diagnostics.confirm_time_at_max_gas = diagnostics.max_gas_offered.and_then(|max| {
            rows.iter()
                .find(|r| r.observation.gas_offered == Some(max))
                .map(|r| r.confirm_time)
        });

        info!(
            cleaned = diagnostics.cleaned_rows,
            q50 = cutoffs.q50,
            q99 = cutoffs.q99,
            "Derived gas features"
        );

        Ok(FeatureSet {
            rows,
            cutoffs,
            diagnostics,
        })
    }

    fn is_complete(&self, observation: &TransactionObservation) -> bool {
        observation.gas_offered.is_some()
            && self
                .required
                .iter()
                .all(|column| observation.value(*column).map_or(false, f64::is_finite))
    }
}

fn derive_row(
    observation: &TransactionObservation,
    confirm_time: i64,
    cutoffs: &QuantileCutoffs,
) -> DerivedFeatureRow {
    let mut observation = observation.clone();
    if observation.round_gp_10gwei.is_none() {
        observation.round_gp_10gwei = observation.gas_price.map(round_gp_10gwei);
    }

    // is_complete() guarantees gas_offered is present
    let gas_category = observation
        .gas_offered
        .map(|g| cutoffs.categorize(g as f64))
        .unwrap_or(GasCategory::Cat1);
    let hpa2 = observation.hashpower_accepting.map(|h| h * h);

    DerivedFeatureRow {
        observation,
        confirm_time,
        gas_category,
        hpa2,
    }
}

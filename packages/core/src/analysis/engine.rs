//! Confirmation-time engine - orchestrates cleaning, fitting and prediction

use std::time::Instant;

use tracing::info;

use crate::analysis::{
    config::ModelConfig,
    error::AnalysisError,
    features::FeatureBuilder,
    formula::{DesignMatrix, Formula},
    glm::{GlmFit, PoissonGlm},
    provider::ObservationSource,
    types::{FeatureSet, PredictionRow, TransactionObservation},
};

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub formula: Formula,
    pub features: FeatureSet,
    pub design: DesignMatrix,
    pub fit: GlmFit,
    /// One row per cleaned observation, in table order.
    pub predictions: Vec<PredictionRow>,
}

/// Runs the feature builder and the Poisson model for one formula
pub struct GasModelEngine {
    formula: Formula,
    builder: FeatureBuilder,
    glm: PoissonGlm,
}

impl GasModelEngine {
    /// Create an engine, failing early if the formula does not parse.
    pub fn new(config: &ModelConfig) -> Result<Self, AnalysisError> {
        let formula = Formula::parse(&config.formula)?;
        let builder = FeatureBuilder::new(formula.columns());
        let glm = PoissonGlm::new(config.fit.max_iterations, config.fit.tolerance);

        Ok(Self {
            formula,
            builder,
            glm,
        })
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Read the whole source table and analyse it.
    pub async fn run(
        &self,
        source: &(dyn ObservationSource + Send + Sync),
    ) -> Result<ModelRun, AnalysisError> {
        let observations = Self::load(source).await?;
        self.analyze(&observations)
    }

    /// Fetch every observation, treating an empty table as missing data.
    pub async fn load(
        source: &(dyn ObservationSource + Send + Sync),
    ) -> Result<Vec<TransactionObservation>, AnalysisError> {
        let observations = source.fetch_observations().await?;
        info!(
            source = source.source_name(),
            rows = observations.len(),
            "Fetched mined transactions"
        );

        if observations.is_empty() {
            return Err(AnalysisError::no_data(format!(
                "{} returned no rows",
                source.source_name()
            )));
        }

        Ok(observations)
    }

    /// Clean `observations`, fit the model and join predictions back.
    pub fn analyze(&self, observations: &[TransactionObservation]) -> Result<ModelRun, AnalysisError> {
        let started = Instant::now();

        let features = self.builder.build(observations)?;
        let design = DesignMatrix::build(&self.formula, &features.rows)?;
        let fit = self.glm.fit(&design)?;

        let predictions: Vec<PredictionRow> = features
            .rows
            .iter()
            .zip(fit.fitted_values.iter())
            .map(|(row, predict)| PredictionRow::new(row, *predict))
            .collect();

        info!(
            formula = %self.formula,
            rows = predictions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model run complete"
        );

        Ok(ModelRun {
            formula: self.formula.clone(),
            features,
            design,
            fit,
            predictions,
        })
    }
}

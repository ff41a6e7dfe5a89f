//! Human-readable and JSON rendering of a model run.
//!
//! The text report follows the order a reader checks things in: how many
//! rows survived cleaning, where the gas quantiles fell, a preview of the
//! design matrix, the GLM summary, then predicted confirmation times next
//! to the covariates that drove them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{
    glm::GlmFit, quantile::QuantileCutoffs, FilterDiagnostics, GasCategory, ModelRun,
    PredictionRow,
};

const RULE_WIDTH: usize = 78;

/// Columns of the result table, in print order.
pub const RESULT_COLUMNS: [&str; 7] = [
    "confirmTime",
    "predict",
    "round_gp_10gwei",
    "hashpower_accepting",
    "tx_atabove",
    "tx_unchained",
    "highgas2",
];

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub formula: String,
    pub diagnostics: FilterDiagnostics,
    pub cutoffs: QuantileCutoffs,
    pub model: GlmFit,
    pub results: Vec<PredictionRow>,
    #[serde(skip)]
    design_columns: Vec<String>,
    #[serde(skip)]
    design_head: Vec<(f64, Vec<f64>)>,
    #[serde(skip)]
    preview_rows: usize,
}

impl Report {
    pub fn new(source: impl Into<String>, run: ModelRun, preview_rows: usize) -> Self {
        let design = &run.design;
        let head = design.nrows().min(preview_rows);
        let design_head = (0..head)
            .map(|i| (design.y[i], design.x.row(i).iter().copied().collect()))
            .collect();

        Self {
            generated_at: Utc::now(),
            source: source.into(),
            formula: run.formula.to_string(),
            diagnostics: run.features.diagnostics,
            cutoffs: run.features.cutoffs,
            design_columns: design.column_names.clone(),
            design_head,
            model: run.fit,
            results: run.predictions,
            preview_rows,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn write_diagnostics(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.diagnostics;
        writeln!(f, "source table: {}", self.source)?;
        writeln!(f, "rows read: {}", d.total_rows)?;
        writeln!(f, "rows with confirm times: {}", d.with_confirm_time)?;
        writeln!(f, "negative confirm time: {}", d.negative_confirm_time)?;
        writeln!(f, "zero confirm time: {}", d.zero_confirm_time)?;
        writeln!(f, "pre-chained: {}", d.pre_chained)?;
        writeln!(f, "post-chained: {}", d.post_chained)?;
        writeln!(f, "removed, confirm time <= 0: {}", d.non_positive_removed)?;
        writeln!(f, "removed, tx_atabove <= 0: {}", d.atabove_removed)?;
        writeln!(f, "removed, missing covariates: {}", d.incomplete_removed)?;
        writeln!(f, "cleaned transactions: {}", d.cleaned_rows)?;
        writeln!(f)?;

        writeln!(f, "gas offered data")?;
        writeln!(f, "max: {}", display_opt(d.max_gas_offered))?;
        writeln!(f, "delay at max: {}", display_opt(d.confirm_time_at_max_gas))?;
        for (level, cutoff) in self.cutoffs.levels() {
            writeln!(f, "{:<6}{:>14.2}", format!("{:.2}", level), cutoff)?;
        }
        for category in GasCategory::ALL {
            writeln!(
                f,
                "{:<8}{:>12}",
                category.name(),
                d.category_counts[category.index()]
            )?;
        }
        writeln!(f)
    }

    fn write_design_preview(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = &self.model.response_name;
        writeln!(f, "{:>6}{:>14}", "", response)?;
        for (i, (y, _)) in self.design_head.iter().enumerate() {
            writeln!(f, "{:>6}{:>14}", i, format_float(*y))?;
        }
        writeln!(f)?;

        write!(f, "{:>6}", "")?;
        for name in &self.design_columns {
            write!(f, "{:>21}", name)?;
        }
        writeln!(f)?;
        for (i, (_, x)) in self.design_head.iter().enumerate() {
            write!(f, "{:>6}", i)?;
            for value in x {
                write!(f, "{:>21}", format_float(*value))?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }

    fn write_results(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for name in RESULT_COLUMNS {
            write!(f, "{:>21}", name)?;
        }
        writeln!(f)?;

        let total = self.results.len();
        let preview = self.preview_rows;
        if total > preview.saturating_mul(2) {
            for i in 0..preview {
                write_result_row(f, i, &self.results[i])?;
            }
            writeln!(f, "{:>8}", "...")?;
            for i in total - preview..total {
                write_result_row(f, i, &self.results[i])?;
            }
        } else {
            for (i, row) in self.results.iter().enumerate() {
                write_result_row(f, i, row)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "[{} rows x {} columns]", total, RESULT_COLUMNS.len())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_diagnostics(f)?;
        self.write_design_preview(f)?;
        write_summary(f, &self.model, self.generated_at)?;
        writeln!(f)?;
        self.write_results(f)
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, fit: &GlmFit, at: DateTime<Utc>) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);

    let left = [
        ("Dep. Variable:", fit.response_name.clone()),
        ("Model:", "GLM".to_string()),
        ("Model Family:", "Poisson".to_string()),
        ("Link Function:", "log".to_string()),
        ("Method:", "IRLS".to_string()),
        ("Date:", at.format("%a, %d %b %Y").to_string()),
        ("Time:", at.format("%H:%M:%S").to_string()),
        ("No. Iterations:", fit.iterations.to_string()),
    ];
    let right = [
        ("No. Observations:", fit.nobs.to_string()),
        ("Df Residuals:", fit.df_resid.to_string()),
        ("Df Model:", fit.df_model.to_string()),
        ("Scale:", "1.0000".to_string()),
        ("Log-Likelihood:", format!("{:.4}", fit.log_likelihood)),
        ("Deviance:", format!("{:.4}", fit.deviance)),
        ("Pearson chi2:", format!("{:.4}", fit.pearson_chi2)),
        ("AIC:", format!("{:.4}", fit.aic)),
    ];

    writeln!(f, "{:^width$}", "Generalized Linear Model Regression Results", width = RULE_WIDTH)?;
    writeln!(f, "{}", rule)?;
    for ((l_label, l_value), (r_label, r_value)) in left.iter().zip(right.iter()) {
        writeln!(f, "{:<16}{:>21}   {:<18}{:>20}", l_label, l_value, r_label, r_value)?;
    }
    writeln!(f, "{}", rule)?;
    writeln!(
        f,
        "{:<21}{:>10}{:>10}{:>10}{:>9}{:>9}{:>9}",
        "", "coef", "std err", "z", "P>|z|", "[0.025", "0.975]"
    )?;
    writeln!(f, "{}", thin)?;
    for c in &fit.coefficients {
        writeln!(
            f,
            "{:<21}{:>10.4}{:>10.3}{:>10.3}{:>9.3}{:>9.3}{:>9.3}",
            truncate(&c.name, 20),
            c.estimate,
            c.std_error,
            c.z,
            c.p_value,
            c.ci_lower,
            c.ci_upper
        )?;
    }
    writeln!(f, "{}", rule)
}

fn write_result_row(f: &mut fmt::Formatter<'_>, index: usize, row: &PredictionRow) -> fmt::Result {
    writeln!(
        f,
        "{:>8}{:>21}{:>21}{:>21}{:>21}{:>21}{:>21}{:>21}",
        index,
        row.confirm_time,
        format_float(row.predict),
        row.round_gp_10gwei.map_or_else(nan, format_float),
        row.hashpower_accepting.map_or_else(nan, format_float),
        display_opt(row.tx_atabove),
        display_opt(row.tx_unchained),
        display_opt(row.highgas2),
    )
}

fn format_float(value: f64) -> String {
    format!("{:.6}", value)
}

fn nan() -> String {
    "NaN".to_string()
}

fn display_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(nan, |v| v.to_string())
}

fn truncate(name: &str, max: usize) -> &str {
    match name.char_indices().nth(max) {
        Some((i, _)) => &name[..i],
        None => name,
    }
}
